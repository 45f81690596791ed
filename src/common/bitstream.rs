use num_traits::PrimInt;

// Bit stream, written MSB first and read back through a cursor
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStream {
    data: Vec<u8>,
    // Bit length
    len: usize,
    // Max bit capacity
    capacity: usize,
    // Read position
    cursor: usize,
}

impl BitStream {
    pub fn new(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity.div_ceil(8)), len: 0, capacity, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bits left between the cursor and the end of the stream
    pub fn remaining(&self) -> usize {
        self.len - self.cursor
    }

    pub fn push(&mut self, bit: bool) {
        debug_assert!(
            self.len < self.capacity,
            "Insufficient capacity: Capacity {}, Size {}",
            self.capacity,
            self.len + 1
        );

        let offset = self.len & 7;
        if offset == 0 {
            self.data.push(0);
        }
        if bit {
            let pos = self.len >> 3;
            self.data[pos] |= 0b1000_0000 >> offset;
        }

        self.len += 1;
    }

    pub fn push_bits<T: PrimInt>(&mut self, bits: T, size: usize) {
        debug_assert!(
            size <= T::zero().count_zeros() as usize,
            "Bit count exceeds type width: Size {size}"
        );
        debug_assert!(
            size == T::zero().count_zeros() as usize || bits >> size == T::zero(),
            "Bits don't fit in given size: Size {size}"
        );

        for i in (0..size).rev() {
            self.push((bits >> i) & T::one() == T::one());
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push_bits(b, 8);
        }
    }

    pub fn get(&self, pos: usize) -> Option<bool> {
        if pos >= self.len {
            return None;
        }
        Some(self.data[pos >> 3] & (0b1000_0000 >> (pos & 7)) != 0)
    }

    /// Reads the next `size` bits as a number, or None without moving the
    /// cursor if fewer bits remain
    pub fn take_bits<T: PrimInt>(&mut self, size: usize) -> Option<T> {
        debug_assert!(size <= T::zero().count_zeros() as usize, "Bit count exceeds type width");

        if size > self.remaining() {
            return None;
        }

        let mut res = T::zero();
        for _ in 0..size {
            let bit = self.get(self.cursor)?;
            res = (res << 1) | if bit { T::one() } else { T::zero() };
            self.cursor += 1;
        }
        Some(res)
    }
}

impl From<&[u8]> for BitStream {
    fn from(bytes: &[u8]) -> Self {
        let len = bytes.len() << 3;
        Self { data: bytes.to_vec(), len, capacity: len, cursor: 0 }
    }
}

impl Iterator for BitStream {
    type Item = bool;
    fn next(&mut self) -> Option<Self::Item> {
        let bit = self.get(self.cursor)?;
        self.cursor += 1;
        Some(bit)
    }
}
