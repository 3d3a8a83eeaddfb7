// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{decode_error, Result};

/// `BitReaderRtl` reads bits right-to-left from a borrowed byte buffer: within every byte the
/// least-significant bit is consumed first.
///
/// The Bink bitstream is documented as a sequence of little-endian 32-bit words consumed from
/// the least-significant bit upwards. Since little-endian byte order and LSB-first bit order
/// compose, that is byte-for-byte identical to reading the buffer front to back, low bit first,
/// and the reader therefore never has to care about word boundaries. It keeps a single bit
/// cursor into the buffer; the cursor doubles as the position query the plane decoder uses for
/// its 32-bit realignment.
pub struct BitReaderRtl<'a> {
    buf: &'a [u8],
    pos: u64,
}

impl<'a> BitReaderRtl<'a> {
    /// Instantiate a new `BitReaderRtl` over the given buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        BitReaderRtl { buf, pos: 0 }
    }

    /// The total length of the bitstream in bits.
    pub fn bits_len(&self) -> u64 {
        8 * self.buf.len() as u64
    }

    /// The number of bits that have not been consumed yet.
    pub fn bits_left(&self) -> u64 {
        self.bits_len() - self.pos
    }

    /// The position of the stream in bits relative to the start of the buffer.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Read a single bit or returns an error.
    #[inline(always)]
    pub fn read_bit(&mut self) -> Result<u32> {
        if self.pos >= self.bits_len() {
            return decode_error("io: unexpected end of bitstream");
        }

        let bit = self.buf[(self.pos >> 3) as usize] >> (self.pos & 7) & 1;
        self.pos += 1;

        Ok(u32::from(bit))
    }

    /// Read a single bit as a boolean value or returns an error.
    #[inline(always)]
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bit()? == 1)
    }

    /// Reads up to 32 bits and interprets them as an unsigned integer or returns an error.
    ///
    /// A bit width of 0 reads nothing and yields 0, which the delta-width fields of the
    /// bitstream rely on.
    pub fn read_bits(&mut self, bit_width: u32) -> Result<u32> {
        debug_assert!(bit_width <= u32::BITS);

        if u64::from(bit_width) > self.bits_left() {
            return decode_error("io: unexpected end of bitstream");
        }

        let mut value = 0u32;
        let mut gathered = 0u32;

        // Take what remains of the current byte, then whole bytes, assembling low bits first.
        while gathered < bit_width {
            let byte = self.buf[(self.pos >> 3) as usize];
            let skip = (self.pos & 7) as u32;

            let take = (8 - skip).min(bit_width - gathered);
            let chunk = u32::from(byte >> skip) & ((1 << take) - 1);

            value |= chunk << gathered;
            gathered += take;
            self.pos += u64::from(take);
        }

        Ok(value)
    }

    /// Discards the given number of bits from the stream or returns an error.
    pub fn ignore_bits(&mut self, num_bits: u32) -> Result<()> {
        if u64::from(num_bits) > self.bits_left() {
            return decode_error("io: unexpected end of bitstream");
        }

        self.pos += u64::from(num_bits);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::BitReaderRtl;

    #[test]
    fn verify_read_bit() {
        // 0xb5 = 0b1011_0101, read LSB first.
        let mut bs = BitReaderRtl::new(&[0xb5]);

        let expected = [1, 0, 1, 0, 1, 1, 0, 1];
        for &bit in expected.iter() {
            assert_eq!(bs.read_bit().unwrap(), bit);
        }

        assert!(bs.read_bit().is_err());
    }

    #[test]
    fn verify_read_bits() {
        let mut bs = BitReaderRtl::new(&[0xab, 0xcd]);

        assert_eq!(bs.read_bits(4).unwrap(), 0xb);
        assert_eq!(bs.read_bits(4).unwrap(), 0xa);
        assert_eq!(bs.read_bits(8).unwrap(), 0xcd);

        // A 16-bit read straddling byte boundaries is a little-endian word.
        let mut bs = BitReaderRtl::new(&[0x34, 0x12]);
        assert_eq!(bs.read_bits(16).unwrap(), 0x1234);

        // A 32-bit read.
        let mut bs = BitReaderRtl::new(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(bs.read_bits(32).unwrap(), 0x1234_5678);

        // A zero-width read consumes nothing.
        let mut bs = BitReaderRtl::new(&[0xff]);
        assert_eq!(bs.read_bits(0).unwrap(), 0);
        assert_eq!(bs.pos(), 0);
    }

    #[test]
    fn verify_read_bits_unaligned() {
        // A wide read starting mid-byte gathers the tail of one byte and the head of the next.
        let buf = [0xff, 0x00, 0xff, 0x00, 0xff, 0x00, 0xff, 0x00, 0x55];
        let mut bs = BitReaderRtl::new(&buf);

        bs.ignore_bits(60).unwrap();
        assert_eq!(bs.read_bits(12).unwrap(), 0x550);
        assert_eq!(bs.pos(), 72);
    }

    #[test]
    fn verify_pos_and_len() {
        let mut bs = BitReaderRtl::new(&[0x00; 8]);

        assert_eq!(bs.bits_len(), 64);
        assert_eq!(bs.pos(), 0);

        bs.read_bits(11).unwrap();
        assert_eq!(bs.pos(), 11);

        bs.ignore_bits(21).unwrap();
        assert_eq!(bs.pos(), 32);
        assert_eq!(bs.bits_left(), 32);
    }

    #[test]
    fn verify_ignore_bits_at_end() {
        let mut bs = BitReaderRtl::new(&[0x00; 4]);

        assert!(bs.ignore_bits(32).is_ok());
        assert!(bs.ignore_bits(1).is_err());
    }

    #[test]
    fn verify_short_read_consumes_nothing() {
        // A read that would pass the end of the buffer fails without moving the cursor.
        let mut bs = BitReaderRtl::new(&[0xff]);

        bs.ignore_bits(4).unwrap();
        assert!(bs.read_bits(8).is_err());
        assert_eq!(bs.pos(), 4);
        assert_eq!(bs.read_bits(4).unwrap(), 0xf);
    }
}
