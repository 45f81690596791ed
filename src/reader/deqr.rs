use tracing::debug;

use super::symbol::SymbolGrid;
use crate::common::{
    bitstream::BitStream,
    codec::{decode_payload, DecodedPayload},
    ec::{rectify_info, Block},
    error::{DecodeError, DecodeResult},
    iter::DataRegionIter,
    mask::MaskPattern,
    metadata::{
        ECLevel, Metadata, Version, FORMAT_ERROR_CAPACITY, FORMAT_INFOS, FORMAT_INFO_COORDS_MAIN,
        FORMAT_INFO_COORDS_SIDE, VERSION_ERROR_CAPACITY, VERSION_INFOS, VERSION_INFO_COORDS_BL,
        VERSION_INFO_COORDS_TR,
    },
};

/// Reads a sampled symbol: format and version info, unmasking, error
/// correction and the payload segments
pub fn decode_symbol(grid: &SymbolGrid) -> DecodeResult<DecodedPayload> {
    let (ec_level, mask) = read_format_info(grid)?;
    let version = read_version_info(grid)?;
    let metadata = Metadata::new(version, ec_level, mask);
    debug!(%metadata, "Format known");

    let codewords = extract_codewords(grid, version, mask)?;
    debug!(codewords = codewords.len(), "Unmasked");

    let data = rectify_blocks(codewords.data(), version, ec_level)?;
    debug!(data_codewords = data.len(), "Error corrected");

    let mut data = BitStream::from(&data[..]);
    let payload = decode_payload(&mut data, metadata)?;
    debug!(mode = ?payload.mode, chars = payload.text.chars().count(), "Decoded");
    Ok(payload)
}

// Format & version info
//------------------------------------------------------------------------------

// Reads bits listed from the most significant
fn read_number(grid: &SymbolGrid, coords: &[(i16, i16)]) -> u32 {
    coords.iter().fold(0, |acc, &(r, c)| (acc << 1) | grid.get(r, c) as u32)
}

pub fn read_format_info(grid: &SymbolGrid) -> DecodeResult<(ECLevel, MaskPattern)> {
    let main = read_number(grid, &FORMAT_INFO_COORDS_MAIN);
    let side = read_number(grid, &FORMAT_INFO_COORDS_SIDE);
    let idx = rectify_info([main, side], &FORMAT_INFOS, FORMAT_ERROR_CAPACITY)?;
    Ok((ECLevel::from_bits((idx >> 3) as u8), MaskPattern::new((idx & 0b111) as u8)))
}

/// Version info is only drawn from version 7 up, smaller symbols go by side
pub fn read_version_info(grid: &SymbolGrid) -> DecodeResult<Version> {
    let implied = grid.version();
    if *implied < 7 {
        return Ok(implied);
    }

    let ver = read_version_field(grid)?;
    if ver != implied {
        return Err(DecodeError::StructuralMismatch);
    }
    Ok(ver)
}

/// Version carried by the version info blocks of a grid at least 45 modules
/// wide, whatever its side says
pub fn read_version_field(grid: &SymbolGrid) -> DecodeResult<Version> {
    if *grid.version() < 7 {
        return Err(DecodeError::StructuralMismatch);
    }
    let tr = read_number(grid, &VERSION_INFO_COORDS_TR);
    let bl = read_number(grid, &VERSION_INFO_COORDS_BL);
    Ok(Version::new(rectify_info([tr, bl], &VERSION_INFOS, VERSION_ERROR_CAPACITY)? + 7))
}

// Codewords
//------------------------------------------------------------------------------

/// Walks the data region, removes the mask and packs the bits into codewords.
/// Remainder bits past the last codeword are dropped.
pub fn extract_codewords(grid: &SymbolGrid, ver: Version, mask: MaskPattern) -> DecodeResult<BitStream> {
    if grid.side() != ver.width() {
        return Err(DecodeError::StructuralMismatch);
    }

    let bit_len = ver.total_codewords() << 3;
    let mask_fn = mask.mask_functions();
    let mut bits = BitStream::new(bit_len);
    for (r, c) in DataRegionIter::new(ver).take(bit_len) {
        bits.push(grid.get(r, c) ^ mask_fn(r, c));
    }

    if bits.len() < bit_len {
        return Err(DecodeError::StructuralMismatch);
    }
    Ok(bits)
}

/// Splits interleaved codewords back into blocks, corrects each and joins the
/// data codewords in block order
pub fn rectify_blocks(codewords: &[u8], ver: Version, ecl: ECLevel) -> DecodeResult<Vec<u8>> {
    let (size1, count1, size2, count2) = ver.data_codewords_per_block(ecl);
    let ec_len = ver.ecc_per_block(ecl);
    let data_lens = std::iter::repeat(size1).take(count1).chain(std::iter::repeat(size2).take(count2));

    let mut blocks = data_lens.map(|dlen| (dlen, Vec::with_capacity(dlen + ec_len))).collect::<Vec<_>>();
    let mut cws = codewords.iter().copied();

    // Data codewords, the longer blocks come last
    for i in 0..size1.max(size2) {
        for (dlen, blk) in blocks.iter_mut() {
            if i < *dlen {
                blk.push(cws.next().ok_or(DecodeError::StructuralMismatch)?);
            }
        }
    }
    for _ in 0..ec_len {
        for (_, blk) in blocks.iter_mut() {
            blk.push(cws.next().ok_or(DecodeError::StructuralMismatch)?);
        }
    }

    let mut data = Vec::with_capacity(ver.data_codewords(ecl));
    for (i, (dlen, blk)) in blocks.iter().enumerate() {
        let mut block = Block::with_encoded(blk, *dlen);
        let rectified = block.rectify().inspect_err(|_| debug!(block = i, "Block uncorrectable"))?;
        data.extend_from_slice(rectified);
    }
    Ok(data)
}
