use crate::common::metadata::Metadata;

// Mode
//------------------------------------------------------------------------------

// Discriminants are the 4 bit mode indicators
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Mode {
    Terminator = 0b0000,
    Numeric = 0b0001,
    Alphanumeric = 0b0010,
    StructuredAppend = 0b0011,
    Byte = 0b0100,
    Fnc1First = 0b0101,
    Eci = 0b0111,
    Kanji = 0b1000,
    Fnc1Second = 0b1001,
}

impl Mode {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b0000 => Some(Self::Terminator),
            0b0001 => Some(Self::Numeric),
            0b0010 => Some(Self::Alphanumeric),
            0b0011 => Some(Self::StructuredAppend),
            0b0100 => Some(Self::Byte),
            0b0101 => Some(Self::Fnc1First),
            0b0111 => Some(Self::Eci),
            0b1000 => Some(Self::Kanji),
            0b1001 => Some(Self::Fnc1Second),
            _ => None,
        }
    }

    #[inline]
    fn numeric_digit(char: u8) -> u16 {
        debug_assert!(Mode::Numeric.contains(char), "Invalid numeric data: {char}");
        (char - b'0') as u16
    }

    #[inline]
    fn alphanumeric_digit(char: u8) -> u16 {
        debug_assert!(Mode::Alphanumeric.contains(char), "Invalid alphanumeric data: {char}");
        ALPHANUMERIC_CHARSET.iter().position(|&c| c == char).unwrap_or(0) as u16
    }

    pub fn encode_chunk(&self, data: &[u8]) -> u16 {
        let len = data.len();
        match self {
            Self::Numeric => {
                debug_assert!(len <= 3, "Data is too long for numeric conversion: {len}");
                data.iter().fold(0_u16, |n, b| n * 10 + Self::numeric_digit(*b))
            }
            Self::Alphanumeric => {
                debug_assert!(len <= 2, "Data is too long for alphanumeric conversion: {len}");
                data.iter().fold(0_u16, |n, b| n * 45 + Self::alphanumeric_digit(*b))
            }
            Self::Byte => {
                debug_assert!(len == 1, "Data is too long for byte conversion: {len}");
                data[0] as u16
            }
            _ => unreachable!("Encoder never emits {self:?} chunks"),
        }
    }

    /// Characters packed in a `bit_len` wide group, or None when the group
    /// value is out of range for the mode
    pub fn decode_chunk(&self, data: u16, bit_len: usize) -> Option<Vec<u8>> {
        match self {
            Self::Numeric => Self::decode_numeric_chunk(data, bit_len),
            Self::Alphanumeric => Self::decode_alphanumeric_chunk(data, bit_len),
            Self::Byte => Some(vec![data as u8]),
            Self::Kanji => Some(Self::decode_kanji_chunk(data)),
            _ => None,
        }
    }

    fn decode_numeric_chunk(mut data: u16, bit_len: usize) -> Option<Vec<u8>> {
        let (len, max) = match bit_len {
            10 => (3, 999),
            7 => (2, 99),
            4 => (1, 9),
            _ => return None,
        };
        if data > max {
            return None;
        }

        let mut res = vec![0; len];
        for i in 0..len {
            res[len - 1 - i] = (data % 10) as u8 + b'0';
            data /= 10;
        }
        Some(res)
    }

    fn decode_alphanumeric_chunk(mut data: u16, bit_len: usize) -> Option<Vec<u8>> {
        let (len, max) = match bit_len {
            11 => (2, 45 * 45 - 1),
            6 => (1, 44),
            _ => return None,
        };
        if data > max {
            return None;
        }

        let mut res = vec![0; len];
        for i in 0..len {
            res[len - 1 - i] = ALPHANUMERIC_CHARSET[(data % 45) as usize];
            data /= 45;
        }
        Some(res)
    }

    // Shift JIS double byte for a 13 bit kanji group
    fn decode_kanji_chunk(data: u16) -> Vec<u8> {
        let msbyte = data / 0xc0;
        let lsbyte = data % 0xc0;
        let temp = ((msbyte << 8) | lsbyte) + 0x8140;
        let sjw = if temp <= 0x9ffc { temp } else { temp + 0x4000 };

        vec![(sjw >> 8) as u8, (sjw & 0xff) as u8]
    }

    pub fn contains(&self, byte: u8) -> bool {
        match self {
            Self::Numeric => byte.is_ascii_digit(),
            Self::Alphanumeric => ALPHANUMERIC_CHARSET.contains(&byte),
            Self::Byte => true,
            _ => false,
        }
    }

    /// Bits taken by `len` characters of the mode, headers excluded
    pub fn encoded_len(&self, len: usize) -> usize {
        match *self {
            Self::Numeric => (len * 10).div_ceil(3),
            Self::Alphanumeric => (len * 11).div_ceil(2),
            Self::Byte => len * 8,
            Self::Kanji => len * 13,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod mode_tests {

    use super::Mode;
    use super::Mode::*;

    #[test]
    fn test_from_bits() {
        assert_eq!(Mode::from_bits(0b0001), Some(Numeric));
        assert_eq!(Mode::from_bits(0b0111), Some(Eci));
        assert_eq!(Mode::from_bits(0b1001), Some(Fnc1Second));
        assert_eq!(Mode::from_bits(0b0110), None);
        assert_eq!(Mode::from_bits(0b1111), None);
    }

    #[test]
    fn test_numeric_digit() {
        assert_eq!(Mode::numeric_digit(b'0'), 0);
        assert_eq!(Mode::numeric_digit(b'9'), 9);
    }

    #[test]
    #[should_panic]
    fn test_invalid_numeric_digit() {
        Mode::numeric_digit(b'A');
    }

    #[test]
    fn test_alphanumeric_digit() {
        assert_eq!(Mode::alphanumeric_digit(b'0'), 0);
        assert_eq!(Mode::alphanumeric_digit(b'9'), 9);
        assert_eq!(Mode::alphanumeric_digit(b'A'), 10);
        assert_eq!(Mode::alphanumeric_digit(b'Z'), 35);
        assert_eq!(Mode::alphanumeric_digit(b' '), 36);
        assert_eq!(Mode::alphanumeric_digit(b':'), 44);
    }

    #[test]
    #[should_panic]
    fn test_invalid_alphanumeric_digit() {
        Mode::alphanumeric_digit(b'a');
    }

    #[test]
    fn test_numeric_encoding() {
        assert_eq!(Numeric.encode_chunk("012".as_bytes()), 0b0000001100);
        assert_eq!(Numeric.encode_chunk("345".as_bytes()), 0b0101011001);
        assert_eq!(Numeric.encode_chunk("901".as_bytes()), 0b1110000101);
        assert_eq!(Numeric.encode_chunk("67".as_bytes()), 0b1000011);
        assert_eq!(Numeric.encode_chunk("8".as_bytes()), 0b1000);
    }

    #[test]
    #[should_panic]
    fn test_invalid_numeric_encoding() {
        Numeric.encode_chunk("1234".as_bytes());
    }

    #[test]
    fn test_numeric_decoding() {
        assert_eq!(Numeric.decode_chunk(0b0000001100, 10), Some(b"012".to_vec()));
        assert_eq!(Numeric.decode_chunk(0b1000011, 7), Some(b"67".to_vec()));
        assert_eq!(Numeric.decode_chunk(0b1000, 4), Some(b"8".to_vec()));
        assert_eq!(Numeric.decode_chunk(1000, 10), None);
        assert_eq!(Numeric.decode_chunk(100, 7), None);
        assert_eq!(Numeric.decode_chunk(10, 4), None);
    }

    #[test]
    fn test_alphanumeric_encoding() {
        assert_eq!(Alphanumeric.encode_chunk("AC".as_bytes()), 0b00111001110);
        assert_eq!(Alphanumeric.encode_chunk("-4".as_bytes()), 0b11100111001);
        assert_eq!(Alphanumeric.encode_chunk("2".as_bytes()), 0b000010);
    }

    #[test]
    #[should_panic]
    fn test_invalid_alphanumeric_encoding() {
        Alphanumeric.encode_chunk("1234".as_bytes());
    }

    #[test]
    fn test_alphanumeric_decoding() {
        assert_eq!(Alphanumeric.decode_chunk(0b00111001110, 11), Some(b"AC".to_vec()));
        assert_eq!(Alphanumeric.decode_chunk(0b11100111001, 11), Some(b"-4".to_vec()));
        assert_eq!(Alphanumeric.decode_chunk(0b000010, 6), Some(b"2".to_vec()));
        assert_eq!(Alphanumeric.decode_chunk(2024, 11), Some(b"::".to_vec()));
        assert_eq!(Alphanumeric.decode_chunk(2025, 11), None);
        assert_eq!(Alphanumeric.decode_chunk(45, 6), None);
    }

    #[test]
    fn test_kanji_decoding() {
        // 点 is 0x935F in Shift JIS
        assert_eq!(Kanji.decode_chunk(0b0_1101_1001_1111, 13), Some(vec![0x93, 0x5f]));
        // 茗 is 0xE4AA in Shift JIS
        assert_eq!(Kanji.decode_chunk(0b1_1010_1010_1010, 13), Some(vec![0xe4, 0xaa]));
    }

    #[test]
    fn test_is_numeric() {
        assert!(Numeric.contains(b'0'));
        assert!(Numeric.contains(b'9'));
        assert!(!Numeric.contains(b'A'));
        assert!(!Numeric.contains(b' '));
    }

    #[test]
    fn test_is_alphanumeric() {
        assert!(Alphanumeric.contains(b'0'));
        assert!(Alphanumeric.contains(b'Z'));
        assert!(Alphanumeric.contains(b' '));
        assert!(Alphanumeric.contains(b':'));
        assert!(!Alphanumeric.contains(b'a'));
        assert!(!Alphanumeric.contains(b'@'));
        assert!(!Eci.contains(b'0'));
    }

    #[test]
    fn test_encoded_len() {
        assert_eq!(Numeric.encoded_len(3), 10);
        assert_eq!(Numeric.encoded_len(2), 7);
        assert_eq!(Numeric.encoded_len(1), 4);
        assert_eq!(Numeric.encoded_len(4), 14);
        assert_eq!(Alphanumeric.encoded_len(2), 11);
        assert_eq!(Alphanumeric.encoded_len(3), 17);
        assert_eq!(Byte.encoded_len(2), 16);
        assert_eq!(Kanji.encoded_len(2), 26);
    }
}

// Segment
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub mode: Mode,
    pub mode_bits: usize, // Bit len of mode
    pub len_bits: usize,  // Bit len of char count
    pub data: &'a [u8],   // Reference to raw data
}

impl<'a> Segment<'a> {
    pub fn new(mode: Mode, mode_bits: usize, len_bits: usize, data: &'a [u8]) -> Self {
        Self { mode, mode_bits, len_bits, data }
    }

    pub fn bit_len(&self) -> usize {
        let encoded_bits = self.mode.encoded_len(self.data.len());
        self.mode_bits + self.len_bits + encoded_bits
    }
}

#[cfg(test)]
mod segment_tests {
    use test_case::test_case;

    use super::{Mode, Segment};
    use crate::Version;

    #[test_case(1, Mode::Numeric, "123", 24)]
    #[test_case(1, Mode::Numeric, "45", 21)]
    #[test_case(1, Mode::Numeric, "6", 18)]
    #[test_case(10, Mode::Numeric, "123", 26)]
    #[test_case(27, Mode::Numeric, "6", 22)]
    #[test_case(1, Mode::Alphanumeric, "AZ", 24)]
    #[test_case(10, Mode::Alphanumeric, "-", 21)]
    #[test_case(27, Mode::Alphanumeric, "AZ", 28)]
    #[test_case(1, Mode::Byte, "a", 20)]
    #[test_case(10, Mode::Byte, "ab", 36)]
    #[test_case(27, Mode::Byte, "abc", 44)]
    fn test_bit_len(ver: usize, mode: Mode, data: &str, exp: usize) {
        let ver = Version::new(ver);
        let seg = Segment::new(mode, ver.mode_bits(), ver.char_cnt_bits(mode), data.as_bytes());
        assert_eq!(seg.bit_len(), exp);
    }
}

// Decoded payload
//------------------------------------------------------------------------------

/// Overall mode of a payload. `Mixed` when segments of different modes occur.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum PayloadMode {
    Numeric,
    Alphanumeric,
    Byte,
    Kanji,
    Mixed,
}

/// Run of characters decoded under one mode. Adjacent byte segments sharing a
/// charset are joined into one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSegment {
    pub mode: Mode,
    /// Characters for numeric, alphanumeric and kanji, bytes for byte mode
    pub char_count: usize,
    pub text: String,
    /// ECI assignment the bytes were decoded under, if any
    pub eci: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructuredAppend {
    /// Position of this symbol in the sequence, starting at 0
    pub index: u8,
    pub total: u8,
    pub parity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fnc1 {
    First,
    /// Carries the application indicator
    Second(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub text: String,
    pub mode: PayloadMode,
    pub segments: Vec<PayloadSegment>,
    pub metadata: Metadata,
    pub structured_append: Option<StructuredAppend>,
    pub fnc1: Option<Fnc1>,
}

impl DecodedPayload {
    pub(crate) fn new(segments: Vec<PayloadSegment>, metadata: Metadata) -> Self {
        let text = segments.iter().map(|s| s.text.as_str()).collect::<String>();
        let mode = payload_mode(&segments);
        Self { text, mode, segments, metadata, structured_append: None, fnc1: None }
    }
}

fn payload_mode(segments: &[PayloadSegment]) -> PayloadMode {
    let to_payload_mode = |m: Mode| match m {
        Mode::Numeric => PayloadMode::Numeric,
        Mode::Alphanumeric => PayloadMode::Alphanumeric,
        Mode::Kanji => PayloadMode::Kanji,
        _ => PayloadMode::Byte,
    };

    let mut modes = segments.iter().map(|s| to_payload_mode(s.mode));
    match modes.next() {
        None => PayloadMode::Byte,
        Some(first) if modes.all(|m| m == first) => first,
        Some(_) => PayloadMode::Mixed,
    }
}


// Global constants
//------------------------------------------------------------------------------

pub static PADDING_CODEWORDS: [u8; 2] = [0b1110_1100, 0b0001_0001];

pub static MODES: [Mode; 3] = [Mode::Numeric, Mode::Alphanumeric, Mode::Byte];

pub static ALPHANUMERIC_CHARSET: [u8; 45] = *b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";
