use super::{
    galois::{generator_polynomial, G},
    Block,
};
use crate::common::metadata::{ECLevel, Version};

// ECC generator
//------------------------------------------------------------------------------

impl Block {
    pub(super) fn compute_ecc(&mut self) {
        let ecc = ecc_per_block(self.data(), self.ec_len());
        self.data[self.dlen..self.len].copy_from_slice(&ecc);
    }
}

/// Splits data codewords into blocks and computes the ecc of each
pub fn ecc(data: &[u8], version: Version, ec_level: ECLevel) -> Vec<Block> {
    let ec_len = version.ecc_per_block(ec_level);
    blockify(data, version, ec_level).into_iter().map(|b| Block::new(b, ec_len)).collect()
}

pub fn blockify(data: &[u8], version: Version, ec_level: ECLevel) -> Vec<&[u8]> {
    let (block1_size, block1_count, block2_size, block2_count) =
        version.data_codewords_per_block(ec_level);

    let total_blocks = block1_count + block2_count;
    let total_block1_size = block1_size * block1_count;
    let total_size = total_block1_size + block2_size * block2_count;

    debug_assert!(
        total_size == data.len(),
        "Data len doesn't match total size of blocks: Data len {}, Total block size {}",
        data.len(),
        total_size
    );

    let mut data_blocks = Vec::with_capacity(total_blocks);
    data_blocks.extend(data[..total_block1_size].chunks(block1_size));
    if block2_size > 0 {
        data_blocks.extend(data[total_block1_size..].chunks(block2_size));
    }
    data_blocks
}

// Performs polynomial long division with data polynomial(num)
// and generator polynomial(den) to compute remainder polynomial,
// the coefficients of which are the ecc
pub fn ecc_per_block(block: &[u8], ecc_count: usize) -> Vec<u8> {
    let len = block.len();
    let gen_poly = generator_polynomial(ecc_count);

    let mut res = block.to_vec();
    res.resize(len + ecc_count, 0);

    for i in 0..len {
        let lead_coeff = G(res[i]);
        if lead_coeff.is_zero() {
            continue;
        }

        for (u, &v) in res[i + 1..].iter_mut().zip(gen_poly.iter()) {
            *u ^= (lead_coeff * v).0;
        }
    }

    res.split_off(len)
}
