//! Carry-over state for unaligned bit reads.
//!
//! Bits are consumed MSB-first: the high bit of the first byte pulled from the
//! stream is the first bit returned. Up to 7 bits left over from one read stay
//! in the buffer and are served first by the next one.

/// Leftover bits of the most recently pulled byte(s).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitBuffer {
    bits: u64,
    bits_left: u8,
}

impl BitBuffer {
    /// Number of valid leftover bits (0..=7).
    pub fn bits_left(&self) -> u8 {
        self.bits_left
    }

    pub fn is_empty(&self) -> bool {
        self.bits_left == 0
    }

    /// Discards any leftover bits.
    pub fn clear(&mut self) {
        self.bits = 0;
        self.bits_left = 0;
    }

    /// Whole bytes that must be pulled from the stream before `n` bits
    /// (`n <= 64`) can be served.
    pub fn bytes_needed(&self, n: u32) -> usize {
        let left = self.bits_left as u32;
        if n <= left {
            0
        } else {
            ((n - left - 1) / 8 + 1) as usize
        }
    }

    /// Takes `n` bits (`n <= 64`): the leftover bits first, then `fresh`, which
    /// must hold exactly [`bytes_needed(n)`](Self::bytes_needed) bytes.
    /// Bits of `fresh` that are not returned become the new leftover.
    pub fn take(&mut self, n: u32, fresh: &[u8]) -> u64 {
        debug_assert!(n <= 64);
        debug_assert_eq!(fresh.len(), self.bytes_needed(n));

        let bits_needed = n as i32 - self.bits_left as i32;
        // -bits_needed mod 8
        let new_left = (-bits_needed & 7) as u8;

        let value = if bits_needed > 0 {
            let mut pulled = 0u64;
            for &byte in fresh {
                pulled = (pulled << 8) | byte as u64;
            }

            let carried = if bits_needed < 64 {
                self.bits << bits_needed
            } else {
                0
            };

            let value = (pulled >> new_left) | carried;
            self.bits = pulled;
            value
        } else {
            self.bits >> -bits_needed
        };

        self.bits_left = new_left;
        self.bits &= mask_ones(new_left as u32);

        value
    }
}

/// Low `n` bits set (`n <= 64`).
pub fn mask_ones(n: u32) -> u64 {
    if n >= 64 { u64::MAX } else { (1u64 << n) - 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_whole_byte() {
        let mut buffer = BitBuffer::default();
        assert_eq!(buffer.bytes_needed(8), 1);
        assert_eq!(buffer.take(8, &[0b10101010]), 0b10101010);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_keeps_leftover() {
        let mut buffer = BitBuffer::default();
        assert_eq!(buffer.take(3, &[0b101_11001]), 0b101);
        assert_eq!(buffer.bits_left(), 5);

        assert_eq!(buffer.bytes_needed(5), 0);
        assert_eq!(buffer.take(5, &[]), 0b11001);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_across_byte_boundary() {
        let mut buffer = BitBuffer::default();
        assert_eq!(buffer.take(4, &[0xAB]), 0xA);

        assert_eq!(buffer.bytes_needed(12), 1);
        assert_eq!(buffer.take(12, &[0xCD]), 0xBCD);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_64_with_leftover() {
        let mut buffer = BitBuffer::default();
        assert_eq!(buffer.take(1, &[0x80]), 1);
        assert_eq!(buffer.bits_left(), 7);

        assert_eq!(buffer.bytes_needed(64), 8);
        let value = buffer.take(64, &[0xFF, 0, 0, 0, 0, 0, 0, 0x01]);
        // 7 zero leftover bits, then the top 57 bits of the pulled bytes
        assert_eq!(value, 0xFF00_0000_0000_0001u64 >> 7);
        assert_eq!(buffer.bits_left(), 7);
    }

    #[test]
    fn test_clear() {
        let mut buffer = BitBuffer::default();
        buffer.take(2, &[0xFF]);
        buffer.clear();
        assert_eq!(buffer, BitBuffer::default());
    }

    #[test]
    fn test_mask_ones() {
        assert_eq!(mask_ones(0), 0);
        assert_eq!(mask_ones(3), 0b111);
        assert_eq!(mask_ones(64), u64::MAX);
    }
}
