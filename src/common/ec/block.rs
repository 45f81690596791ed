use super::MAX_BLOCK_SIZE;

// Reed-Solomon block holding data codewords followed by ecc codewords
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Block {
    pub(super) data: [u8; MAX_BLOCK_SIZE],
    // Block length
    pub(super) len: usize,
    // Data length
    pub(super) dlen: usize,
}

impl Block {
    /// Builds a block from data codewords and appends `ec_len` ecc codewords
    pub fn new(raw: &[u8], ec_len: usize) -> Self {
        let dlen = raw.len();
        let len = dlen + ec_len;
        debug_assert!(len <= MAX_BLOCK_SIZE, "Block too long: {len}");

        let mut data = [0u8; MAX_BLOCK_SIZE];
        data[..dlen].copy_from_slice(raw);
        let mut block = Self { data, len, dlen };
        block.compute_ecc();
        block
    }

    /// Wraps codewords read from a symbol, of which the first `dlen` are data
    pub fn with_encoded(encoded: &[u8], dlen: usize) -> Self {
        let len = encoded.len();
        debug_assert!(len <= MAX_BLOCK_SIZE, "Block too long: {len}");
        debug_assert!(dlen <= len, "Data length {dlen} exceeds block length {len}");

        let mut data = [0u8; MAX_BLOCK_SIZE];
        data[..len].copy_from_slice(encoded);
        Self { data, len, dlen }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ec_len(&self) -> usize {
        self.len - self.dlen
    }

    pub fn data_len(&self) -> usize {
        self.dlen
    }

    pub fn full(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[cfg(test)]
    pub fn full_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlen]
    }

    pub fn ecc(&self) -> &[u8] {
        &self.data[self.dlen..self.len]
    }
}

#[cfg(test)]
mod block_tests {
    use super::Block;

    #[test]
    fn test_block_layout() {
        let blk = Block::new(&[1, 2, 3, 4], 6);
        assert_eq!(blk.len(), 10);
        assert_eq!(blk.data(), &[1, 2, 3, 4]);
        assert_eq!(blk.ecc().len(), 6);
        assert_eq!(blk.ec_len(), 6);
        assert_eq!(&blk.full()[..4], &[1, 2, 3, 4]);

        let copy = Block::with_encoded(blk.full(), 4);
        assert_eq!(copy, blk);
    }
}
