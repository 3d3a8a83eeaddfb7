// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical Huffman trees and bitstream-selected symbol mappings.
//!
//! Bink codes all bundle symbols through one of sixteen fixed Huffman trees over the sixteen
//! 4-bit symbols. Tree 0 is the identity: every symbol is a raw nibble. A bundle additionally
//! carries a symbol permutation read from the bitstream, so the effective mapping is
//! `permutation[tree.decode(bits)]`.

use std::mem;

use borealis_core::errors::{decode_error, Result};
use borealis_core::io::BitReaderRtl;

use lazy_static::lazy_static;

/// Code lengths of the sixteen fixed trees. Every tree is a complete prefix code: the Kraft sum
/// of each row is exactly one, so any bit sequence decodes to a symbol.
const BINK_TREE_LENS: [[u8; 16]; 16] = [
    [4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4],
    [1, 2, 3, 5, 5, 6, 7, 8, 8, 8, 8, 8, 8, 8, 8, 7],
    [2, 2, 3, 3, 4, 4, 5, 6, 6, 7, 7, 7, 7, 7, 7, 6],
    [2, 2, 3, 3, 4, 4, 5, 6, 6, 6, 7, 7, 7, 7, 7, 7],
    [2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 8, 8, 8, 8, 7],
    [2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 8, 7, 8, 8, 8],
    [2, 3, 3, 3, 4, 4, 4, 5, 5, 5, 5, 6, 6, 6, 7, 7],
    [7, 7, 6, 6, 6, 5, 5, 5, 5, 4, 4, 4, 3, 3, 3, 2],
    [3, 3, 3, 3, 3, 4, 4, 4, 5, 5, 5, 5, 6, 6, 6, 6],
    [2, 3, 3, 3, 4, 4, 4, 4, 5, 5, 6, 6, 7, 7, 7, 7],
    [3, 2, 3, 4, 3, 4, 4, 5, 5, 5, 5, 6, 6, 6, 7, 7],
    [6, 6, 6, 6, 5, 5, 5, 5, 4, 4, 4, 3, 3, 3, 3, 3],
    [3, 3, 3, 3, 4, 4, 4, 4, 4, 5, 5, 5, 5, 5, 6, 6],
    [3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5, 5, 5],
    [3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5],
    [3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 5, 5],
];

/// Codes of the sixteen fixed trees, stored in read order: bit N of a code is the (N+1)-th bit
/// read from the stream.
const BINK_TREE_CODES: [[u16; 16]; 16] = [
    [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F],
    [0x00, 0x01, 0x03, 0x07, 0x17, 0x0F, 0x2F, 0x1F, 0x9F, 0x5F, 0xDF, 0x3F, 0xBF, 0x7F, 0xFF, 0x6F],
    [0x00, 0x02, 0x01, 0x05, 0x03, 0x0B, 0x07, 0x17, 0x37, 0x2F, 0x6F, 0x1F, 0x5F, 0x3F, 0x7F, 0x0F],
    [0x00, 0x02, 0x01, 0x05, 0x03, 0x0B, 0x07, 0x17, 0x37, 0x0F, 0x2F, 0x6F, 0x1F, 0x5F, 0x3F, 0x7F],
    [0x00, 0x02, 0x01, 0x05, 0x03, 0x0B, 0x07, 0x17, 0x0F, 0x2F, 0x1F, 0x3F, 0xBF, 0x7F, 0xFF, 0x5F],
    [0x00, 0x02, 0x01, 0x05, 0x03, 0x0B, 0x07, 0x17, 0x0F, 0x2F, 0x1F, 0x3F, 0x5F, 0xBF, 0x7F, 0xFF],
    [0x00, 0x02, 0x06, 0x01, 0x05, 0x0D, 0x03, 0x0B, 0x1B, 0x07, 0x17, 0x0F, 0x2F, 0x1F, 0x3F, 0x7F],
    [0x3F, 0x7F, 0x0F, 0x2F, 0x1F, 0x0B, 0x1B, 0x07, 0x17, 0x05, 0x0D, 0x03, 0x02, 0x06, 0x01, 0x00],
    [0x00, 0x04, 0x02, 0x06, 0x01, 0x05, 0x0D, 0x03, 0x0B, 0x1B, 0x07, 0x17, 0x0F, 0x2F, 0x1F, 0x3F],
    [0x00, 0x02, 0x01, 0x05, 0x03, 0x0B, 0x07, 0x17, 0x0F, 0x2F, 0x1F, 0x5F, 0x3F, 0xBF, 0x7F, 0xFF],
    [0x02, 0x00, 0x06, 0x05, 0x01, 0x0D, 0x03, 0x0B, 0x1B, 0x07, 0x17, 0x0F, 0x2F, 0x1F, 0x3F, 0x7F],
    [0x0F, 0x2F, 0x1F, 0x3F, 0x0B, 0x1B, 0x07, 0x17, 0x05, 0x0D, 0x03, 0x00, 0x04, 0x02, 0x06, 0x01],
    [0x00, 0x04, 0x02, 0x06, 0x01, 0x09, 0x05, 0x0D, 0x03, 0x0B, 0x1B, 0x07, 0x17, 0x0F, 0x1F, 0x3F],
    [0x00, 0x04, 0x02, 0x06, 0x0E, 0x01, 0x09, 0x05, 0x0D, 0x03, 0x0B, 0x1B, 0x07, 0x17, 0x0F, 0x1F],
    [0x00, 0x04, 0x02, 0x0A, 0x06, 0x0E, 0x01, 0x09, 0x05, 0x0D, 0x03, 0x0B, 0x07, 0x17, 0x0F, 0x1F],
    [0x00, 0x08, 0x04, 0x0C, 0x02, 0x0A, 0x06, 0x0E, 0x01, 0x09, 0x05, 0x0D, 0x03, 0x0B, 0x07, 0x0F],
];

/// A canonical Huffman tree over sixteen symbols, decoded one bit at a time.
pub struct Tree {
    codes: [u16; 16],
    lens: [u8; 16],
    max_len: u8,
}

impl Tree {
    fn new(codes: &[u16; 16], lens: &[u8; 16]) -> Tree {
        let max_len = lens.iter().cloned().max().unwrap_or(0);
        Tree { codes: *codes, lens: *lens, max_len }
    }

    /// Reads one symbol from the bitstream.
    pub fn get_symbol(&self, bs: &mut BitReaderRtl<'_>) -> Result<u8> {
        let mut code: u16 = 0;

        for len in 1..=self.max_len {
            code |= (bs.read_bit()? as u16) << (len - 1);

            for sym in 0..16 {
                if self.lens[sym] == len && self.codes[sym] == code {
                    return Ok(sym as u8);
                }
            }
        }

        decode_error("bink: invalid huffman code")
    }
}

lazy_static! {
    /// The sixteen fixed trees, shared by all decoder instances.
    pub static ref TREES: Vec<Tree> = {
        (0..16).map(|i| Tree::new(&BINK_TREE_CODES[i], &BINK_TREE_LENS[i])).collect()
    };
}

/// A `HuffmanSelector` names one of the sixteen fixed trees and carries a symbol permutation
/// applied after decoding. It is re-read from the bitstream at the start of every plane.
#[derive(Copy, Clone, Debug)]
pub struct HuffmanSelector {
    /// Index of the fixed tree to decode with.
    pub index: usize,
    /// The symbol permutation.
    pub symbols: [u8; 16],
}

impl Default for HuffmanSelector {
    fn default() -> Self {
        HuffmanSelector::identity()
    }
}

impl HuffmanSelector {
    /// The identity selector: tree 0 with an identity permutation, decoding raw 4-bit nibbles.
    pub fn identity() -> Self {
        let mut symbols = [0u8; 16];
        for (i, sym) in symbols.iter_mut().enumerate() {
            *sym = i as u8;
        }
        HuffmanSelector { index: 0, symbols }
    }

    /// Reads a selector from the bitstream.
    pub fn read(bs: &mut BitReaderRtl<'_>) -> Result<HuffmanSelector> {
        let index = bs.read_bits(4)? as usize;

        if index == 0 {
            // The first tree always gives raw nibbles.
            return Ok(HuffmanSelector::identity());
        }

        let mut symbols = [0u8; 16];

        if bs.read_bool()? {
            // Symbol selection: an explicit list of the leading symbols, the rest appended in
            // ascending order.
            let mut has_symbol = [false; 16];

            let length = bs.read_bits(3)? as usize;
            for symbol in symbols.iter_mut().take(length + 1) {
                *symbol = bs.read_bits(4)? as u8;
                has_symbol[*symbol as usize] = true;
            }

            let mut next = length;
            for i in 0..16u8 {
                if !has_symbol[i as usize] {
                    next += 1;
                    // A list with repeated symbols leaves more than 16 - length absentees.
                    if next > 15 {
                        return decode_error("bink: invalid huffman symbol list");
                    }
                    symbols[next] = i;
                }
            }

            return Ok(HuffmanSelector { index, symbols });
        }

        // Symbol shuffling: a merge network of the given depth.
        let mut tmp1 = [0u8; 16];
        let mut tmp2 = [0u8; 16];

        for (i, sym) in tmp1.iter_mut().enumerate() {
            *sym = i as u8;
        }

        let mut src = &mut tmp1;
        let mut dst = &mut tmp2;

        let depth = bs.read_bits(2)?;

        for i in 0..=depth {
            let size = 1usize << i;

            for j in (0..16).step_by(size << 1) {
                merge_symbols(bs, &mut dst[j..j + (size << 1)], &src[j..j + (size << 1)], size)?;
            }

            mem::swap(&mut src, &mut dst);
        }

        symbols.copy_from_slice(&src[..]);

        Ok(HuffmanSelector { index, symbols })
    }

    /// Decodes one symbol and maps it through the permutation.
    pub fn read_symbol(&self, bs: &mut BitReaderRtl<'_>) -> Result<u8> {
        Ok(self.symbols[TREES[self.index].get_symbol(bs)? as usize])
    }
}

/// Interleaves the two adjacent `size`-long runs of `src` into `dst`: while both runs are
/// non-empty a flag bit chooses which one contributes the next symbol, and once one run is
/// exhausted the other is copied verbatim.
fn merge_symbols(
    bs: &mut BitReaderRtl<'_>,
    dst: &mut [u8],
    src: &[u8],
    size: usize,
) -> Result<()> {
    let mut lo = 0;
    let mut hi = size;
    let mut out = 0;

    while lo < size && hi < size * 2 {
        if !bs.read_bool()? {
            dst[out] = src[lo];
            lo += 1;
        }
        else {
            dst[out] = src[hi];
            hi += 1;
        }
        out += 1;
    }

    while lo < size {
        dst[out] = src[lo];
        lo += 1;
        out += 1;
    }

    while hi < size * 2 {
        dst[out] = src[hi];
        hi += 1;
        out += 1;
    }

    Ok(())
}
