mod block;
mod decoder;
mod encoder;
mod galois;

pub use block::*;
pub use decoder::*;
pub use encoder::*;

// RS blocks over GF(256) hold at most 255 codewords
pub const MAX_BLOCK_SIZE: usize = 256;

/// Number of codeword errors every block of the symbol can correct
pub fn ec_capacity(version: crate::Version, ec_level: crate::ECLevel) -> usize {
    version.ecc_per_block(ec_level) / 2
}
