//! # qrsight
//!
//! A Rust library for reading QR codes from raster images, with Reed-Solomon error correction
//! and a companion encoder for producing symbols to test against.
//!
//! ## Features
//!
//! - **QR Code Reading**: Locates the finder patterns, corrects perspective, and decodes
//!   numeric, alphanumeric, byte, kanji and ECI segments
//! - **Reed-Solomon Error Correction**: Syndromes over GF(256), Berlekamp-Massey, Chien search
//!   and Forney, up to half the ec codewords of each block
//! - **Typed Failures**: Every stage reports exactly one [`DecodeError`], grouped into
//!   [`ErrorCategory`] for user guidance
//! - **QR Code Generation**: Versions 1-40, all ec levels, optimal segmentation and mask
//!   selection by penalty score
//!
//! ## Quick Start
//!
//! ### Reading a QR Code
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("qr_code.png")?;
//!
//! match qrsight::decode(&img) {
//!     Ok(payload) => println!("Decoded: {}", payload.text),
//!     Err(e) => println!("{e}: {}", e.category().guidance()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Round Trip
//!
//! ```rust
//! use qrsight::{decode, ECLevel, MaskPattern, PayloadMode, QRBuilder, Version};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = QRBuilder::new(b"HELLO WORLD")
//!     .version(Version::new(1))     // QR version (size) - if not provided, finds smallest version to fit data
//!     .ec_level(ECLevel::M)         // Error correction level - if not provided, defaults to ECLevel::M
//!     .mask(MaskPattern::new(0))    // Mask pattern - if not provided, finds best mask based on penalty score
//!     .build()?;
//!
//! let img = qr.to_image(4); // 4 pixels per module with a 4 module quiet zone
//! let payload = decode(&img)?;
//! assert_eq!(payload.text, "HELLO WORLD");
//! assert_eq!(payload.mode, PayloadMode::Alphanumeric);
//! # Ok(())
//! # }
//! ```
//!
//! ### Configured Reader
//!
//! ```rust
//! use qrsight::{Binarizer, DecoderConfig, QRBuilder, QRReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = DecoderConfig::new();
//! config.binarizer(Binarizer::Adaptive).min_contrast(16);
//!
//! let img = QRBuilder::new("héllo".as_bytes()).build()?.to_image(3);
//! let payload = QRReader::new(config).decode(&img)?;
//! assert_eq!(payload.text, "héllo");
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! 1. **Sampled**: grayscale then Otsu or block adaptive threshold
//! 2. **FindersLocated**: 1:1:3:1:1 run scan, best L shaped triple
//! 3. **GridSampled**: homography through the finders and the bottom right alignment pattern
//! 4. **FormatKnown**: ec level, mask and version from the BCH protected info
//! 5. **Unmasked**: zig-zag walk of the data region into codewords
//! 6. **ErrorCorrected**: per block Reed-Solomon correction
//! 7. **Decoded**: mode segments into text
//!
//! ### Error Correction Levels
//! - **L (Low)**: ~7% error correction
//! - **M (Medium)**: ~15% error correction
//! - **Q (Quartile)**: ~25% error correction
//! - **H (High)**: ~30% error correction

#![allow(clippy::items_after_test_module)]

pub mod builder;
pub(crate) mod common;
pub mod reader;

pub use builder::{Module, QRBuilder, QR};
pub use common::codec::{DecodedPayload, Fnc1, Mode, PayloadMode, PayloadSegment, StructuredAppend};
pub use common::ec::ec_capacity;
pub use common::error::{DecodeError, DecodeResult, ErrorCategory, QRError, QRResult};
pub use common::mask::MaskPattern;
pub use common::metadata::{Color, ECLevel, Metadata, Version};
pub use reader::*;
