//! Little-endian bit streams for 128-bit blocks.
//!
//! Fields are packed LSB-first: the first field written occupies the lowest
//! bits of the block. Index lists drop the MSB of each anchor pixel; the
//! writer requires (and the reader restores) a zero MSB there.

pub(crate) struct BitWriter {
    data: u128,
    bits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self { data: 0, bits: 0 }
    }

    #[inline]
    pub fn write(&mut self, value: u32, bits: u32) {
        debug_assert!(bits < 32);
        debug_assert!((value as u64) < (1_u64 << bits));

        self.data |= (value as u128) << self.bits;
        self.bits += bits;
    }

    /// Writes the unary mode selector: `mode` zero bits followed by a one.
    pub fn write_mode(&mut self, mode: u32) {
        debug_assert!(mode < 8);
        self.write(1 << mode, mode + 1);
    }

    /// Writes 16 palette indices of `bits` bits each, omitting the MSB at
    /// every anchor position.
    ///
    /// Callers must have canonicalized the list so that anchor indices fit
    /// in `bits - 1` bits.
    pub fn write_indices(&mut self, indices: &[u8; 16], bits: u32, anchors: &[u8]) {
        for (i, &index) in indices.iter().enumerate() {
            let field_bits = if anchors.contains(&(i as u8)) {
                debug_assert!(
                    (index >> (bits - 1)) == 0,
                    "anchor index must have a zero MSB"
                );
                bits - 1
            } else {
                bits
            };
            self.write(index as u32, field_bits);
        }
    }

    pub fn finish(self) -> [u8; 16] {
        debug_assert_eq!(self.bits, 128);
        self.data.to_le_bytes()
    }
}

pub(crate) struct BitReader {
    state: u128,
}

impl BitReader {
    pub fn new(block: [u8; 16]) -> Self {
        Self {
            state: u128::from_le_bytes(block),
        }
    }

    pub fn low_u8(&self) -> u8 {
        self.state as u8
    }

    #[inline]
    pub fn read(&mut self, bits: u32) -> u32 {
        debug_assert!(0 < bits && bits < 32);
        let mask = (1_u64 << bits) - 1;
        let value = (self.state as u64 & mask) as u32;
        self.state >>= bits;
        value
    }

    /// Reads 16 palette indices of `bits` bits each, restoring the implied
    /// zero MSB at every anchor position.
    pub fn read_indices(&mut self, bits: u32, anchors: &[u8]) -> [u8; 16] {
        let mut indices = [0_u8; 16];
        for (i, index) in indices.iter_mut().enumerate() {
            let field_bits = if anchors.contains(&(i as u8)) {
                bits - 1
            } else {
                bits
            };
            *index = self.read(field_bits) as u8;
        }
        indices
    }
}
