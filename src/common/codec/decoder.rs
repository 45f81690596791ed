use std::cmp::min;

use encoding_rs::{
    Encoding, BIG5, EUC_KR, GB18030, SHIFT_JIS, UTF_16BE, UTF_8, WINDOWS_1250, WINDOWS_1251,
    WINDOWS_1252, WINDOWS_1256,
};
use tracing::trace;

use super::{DecodedPayload, Fnc1, Mode, PayloadSegment, StructuredAppend};
use crate::common::bitstream::BitStream;
use crate::common::error::{DecodeError, DecodeResult};
use crate::common::metadata::{Metadata, Version};

// Payload decoder
//------------------------------------------------------------------------------

/// Reads mode segments until a terminator or until fewer than 4 bits remain
pub fn decode_payload(inp: &mut BitStream, metadata: Metadata) -> DecodeResult<DecodedPayload> {
    let ver = metadata.version;
    let mut segments = Vec::new();
    let mut bytes = ByteRun::default();
    let mut eci = None;
    let mut structured_append = None;
    let mut fnc1 = None;

    while inp.remaining() >= 4 {
        let mode = take_mode(inp)?;
        match mode {
            Mode::Terminator => break,
            Mode::Eci => eci = Some(take_eci(inp)?),
            Mode::StructuredAppend => structured_append = Some(take_structured_append(inp)?),
            Mode::Fnc1First => fnc1 = Some(Fnc1::First),
            Mode::Fnc1Second => {
                let app = inp.take_bits(8).ok_or(DecodeError::PayloadCorrupt)?;
                fnc1 = Some(Fnc1::Second(app));
            }
            Mode::Byte => {
                let char_cnt = take_char_count(inp, ver, mode)?;
                if bytes.eci != eci {
                    bytes.flush(&mut segments)?;
                    bytes.eci = eci;
                }
                take_bytes(inp, char_cnt, &mut bytes.data)?;
            }
            Mode::Numeric | Mode::Alphanumeric | Mode::Kanji => {
                bytes.flush(&mut segments)?;
                let char_cnt = take_char_count(inp, ver, mode)?;
                let text = match mode {
                    Mode::Numeric => take_numeric(inp, char_cnt)?,
                    Mode::Alphanumeric => take_alphanumeric(inp, char_cnt)?,
                    _ => take_kanji(inp, char_cnt)?,
                };
                segments.push(PayloadSegment { mode, char_count: char_cnt, text, eci: None });
            }
        }
    }
    bytes.flush(&mut segments)?;

    trace!(segments = segments.len(), "Payload decoded");

    let mut payload = DecodedPayload::new(segments, metadata);
    payload.structured_append = structured_append;
    payload.fnc1 = fnc1;
    Ok(payload)
}

fn take_mode(inp: &mut BitStream) -> DecodeResult<Mode> {
    let bits = inp.take_bits::<u8>(4).ok_or(DecodeError::PayloadCorrupt)?;
    Mode::from_bits(bits).ok_or_else(|| {
        trace!(bits, "Unknown mode indicator");
        DecodeError::PayloadCorrupt
    })
}

// Reads the char count and checks the segment body fits in what remains
fn take_char_count(inp: &mut BitStream, ver: Version, mode: Mode) -> DecodeResult<usize> {
    let len_bits = ver.char_cnt_bits(mode);
    let char_cnt = inp.take_bits::<usize>(len_bits).ok_or(DecodeError::PayloadCorrupt)?;
    if mode.encoded_len(char_cnt) > inp.remaining() {
        trace!(?mode, char_cnt, remaining = inp.remaining(), "Char count overruns stream");
        return Err(DecodeError::PayloadCorrupt);
    }
    Ok(char_cnt)
}

// 1, 2 or 3 byte assignment number, prefixed 0, 10 and 110 respectively
fn take_eci(inp: &mut BitStream) -> DecodeResult<u32> {
    let first = inp.take_bits::<u32>(8).ok_or(DecodeError::PayloadCorrupt)?;
    let (value, rest) = match first {
        b if b & 0x80 == 0 => (b, 0),
        b if b & 0xc0 == 0x80 => (b & 0x3f, 8),
        b if b & 0xe0 == 0xc0 => (b & 0x1f, 16),
        _ => return Err(DecodeError::PayloadCorrupt),
    };
    let low = inp.take_bits::<u32>(rest).ok_or(DecodeError::PayloadCorrupt)?;
    Ok((value << rest) | low)
}

fn take_structured_append(inp: &mut BitStream) -> DecodeResult<StructuredAppend> {
    let index = inp.take_bits::<u8>(4).ok_or(DecodeError::PayloadCorrupt)?;
    let total = inp.take_bits::<u8>(4).ok_or(DecodeError::PayloadCorrupt)? + 1;
    let parity = inp.take_bits::<u8>(8).ok_or(DecodeError::PayloadCorrupt)?;
    Ok(StructuredAppend { index, total, parity })
}

fn take_numeric(inp: &mut BitStream, mut char_cnt: usize) -> DecodeResult<String> {
    let mut res = Vec::with_capacity(char_cnt);
    while char_cnt > 0 {
        let bit_len = if char_cnt > 2 { 10 } else { (char_cnt % 3) * 3 + 1 };
        res.extend(take_chunk(inp, Mode::Numeric, bit_len)?);
        char_cnt -= min(3, char_cnt);
    }
    // Digits are ascii
    Ok(res.into_iter().map(char::from).collect())
}

fn take_alphanumeric(inp: &mut BitStream, mut char_cnt: usize) -> DecodeResult<String> {
    let mut res = Vec::with_capacity(char_cnt);
    while char_cnt > 0 {
        let bit_len = if char_cnt > 1 { 11 } else { 6 };
        res.extend(take_chunk(inp, Mode::Alphanumeric, bit_len)?);
        char_cnt -= min(2, char_cnt);
    }
    Ok(res.into_iter().map(char::from).collect())
}

fn take_bytes(inp: &mut BitStream, char_cnt: usize, out: &mut Vec<u8>) -> DecodeResult<()> {
    for _ in 0..char_cnt {
        out.extend(take_chunk(inp, Mode::Byte, 8)?);
    }
    Ok(())
}

fn take_kanji(inp: &mut BitStream, char_cnt: usize) -> DecodeResult<String> {
    let mut sjis = Vec::with_capacity(char_cnt * 2);
    for _ in 0..char_cnt {
        sjis.extend(take_chunk(inp, Mode::Kanji, 13)?);
    }
    SHIFT_JIS
        .decode_without_bom_handling_and_without_replacement(&sjis)
        .map(|s| s.into_owned())
        .ok_or(DecodeError::PayloadCorrupt)
}

fn take_chunk(inp: &mut BitStream, mode: Mode, bit_len: usize) -> DecodeResult<Vec<u8>> {
    let chunk = inp.take_bits::<u16>(bit_len).ok_or(DecodeError::PayloadCorrupt)?;
    mode.decode_chunk(chunk, bit_len).ok_or_else(|| {
        trace!(?mode, chunk, "Group value out of range");
        DecodeError::PayloadCorrupt
    })
}

// Byte segments
//------------------------------------------------------------------------------

// Bytes of consecutive byte segments under the same ECI, decoded together so
// multi byte characters split across segments survive
#[derive(Default)]
struct ByteRun {
    eci: Option<u32>,
    data: Vec<u8>,
}

impl ByteRun {
    fn flush(&mut self, segments: &mut Vec<PayloadSegment>) -> DecodeResult<()> {
        if self.data.is_empty() {
            return Ok(());
        }
        let text = decode_bytes(&self.data, self.eci)?;
        segments.push(PayloadSegment {
            mode: Mode::Byte,
            char_count: self.data.len(),
            text,
            eci: self.eci,
        });
        self.data.clear();
        Ok(())
    }
}

enum Charset {
    Latin1,
    Encoding(&'static Encoding),
}

fn eci_charset(eci: u32) -> Option<Charset> {
    let enc = match eci {
        1 | 3 => return Some(Charset::Latin1),
        4..=18 => Encoding::for_label(format!("iso-8859-{}", eci - 2).as_bytes())?,
        20 => SHIFT_JIS,
        21 => WINDOWS_1250,
        22 => WINDOWS_1251,
        23 => WINDOWS_1252,
        24 => WINDOWS_1256,
        25 => UTF_16BE,
        26 => UTF_8,
        27 => Encoding::for_label(b"us-ascii")?,
        28 => BIG5,
        29 => GB18030,
        30 => EUC_KR,
        _ => return None,
    };
    Some(Charset::Encoding(enc))
}

fn decode_bytes(bytes: &[u8], eci: Option<u32>) -> DecodeResult<String> {
    let Some(eci) = eci else {
        return String::from_utf8(bytes.to_vec()).or(Err(DecodeError::PayloadCorrupt));
    };

    match eci_charset(eci) {
        Some(Charset::Latin1) => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        Some(Charset::Encoding(enc)) => enc
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|s| s.into_owned())
            .ok_or(DecodeError::PayloadCorrupt),
        None => {
            trace!(eci, "Unsupported ECI assignment");
            Err(DecodeError::PayloadCorrupt)
        }
    }
}
