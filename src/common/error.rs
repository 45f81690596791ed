use thiserror::Error;

use crate::reader::DecodeStage;

// Builder error
//------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq, Copy, Clone)]
pub enum QRError {
    #[error("Empty data")]
    EmptyData,
    #[error("Data too long")]
    DataTooLong,
    #[error("Invalid version")]
    InvalidVersion,
    #[error("Invalid error correction level")]
    InvalidECLevel,
    #[error("Invalid masking pattern")]
    InvalidMaskingPattern,
}

pub type QRResult<T> = Result<T, QRError>;

// Decode error
//------------------------------------------------------------------------------

/// Reason a decode attempt stopped. Every pipeline stage reports exactly one
/// of these and later stages never rewrite it.
#[derive(Debug, Error, PartialEq, Eq, Copy, Clone, Hash)]
pub enum DecodeError {
    #[error("Image is smaller than the smallest symbol")]
    ImageTooSmall,
    #[error("Image has no usable contrast")]
    DecodeFailure,
    #[error("No finder patterns found")]
    NoFinderPatterns,
    #[error("Finder patterns are ambiguous")]
    AmbiguousFinderPatterns,
    #[error("Perspective transform is degenerate")]
    PerspectiveDegenerate,
    #[error("Format or version info is corrupt")]
    FormatInfoCorrupt,
    #[error("Symbol structure doesn't match its version")]
    StructuralMismatch,
    #[error("Too many errors to correct in a block")]
    UncorrectableBlock,
    #[error("Payload bit stream is corrupt")]
    PayloadCorrupt,
}

/// Coarse grouping of decode errors for user guidance.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum ErrorCategory {
    /// No symbol could be read from the image, retaking the photo may help
    NoCode,
    /// A symbol was found but it is too damaged to read
    Damaged,
    /// The symbol was read but its contents are not valid
    Malformed,
}

impl DecodeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ImageTooSmall
            | Self::DecodeFailure
            | Self::NoFinderPatterns
            | Self::AmbiguousFinderPatterns
            | Self::PerspectiveDegenerate => ErrorCategory::NoCode,
            Self::FormatInfoCorrupt | Self::StructuralMismatch | Self::UncorrectableBlock => {
                ErrorCategory::Damaged
            }
            Self::PayloadCorrupt => ErrorCategory::Malformed,
        }
    }

    /// Stage that was being produced when the error was raised
    pub fn stage(&self) -> DecodeStage {
        match self {
            Self::ImageTooSmall | Self::DecodeFailure => DecodeStage::Sampled,
            Self::NoFinderPatterns | Self::AmbiguousFinderPatterns => DecodeStage::FindersLocated,
            Self::PerspectiveDegenerate => DecodeStage::GridSampled,
            Self::FormatInfoCorrupt => DecodeStage::FormatKnown,
            Self::StructuralMismatch => DecodeStage::Unmasked,
            Self::UncorrectableBlock => DecodeStage::ErrorCorrected,
            Self::PayloadCorrupt => DecodeStage::Decoded,
        }
    }
}

impl ErrorCategory {
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::NoCode => "No QR code found, try a sharper or closer photo",
            Self::Damaged => "QR code is too damaged to read",
            Self::Malformed => "QR code contents are not valid",
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;
