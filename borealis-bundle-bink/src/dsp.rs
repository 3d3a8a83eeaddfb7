// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The block transform kernel: scan tables, coefficient readers, dequantisation, the integer
//! inverse DCT, and the 8x8 pixel copy/add primitives used by motion compensation.

use borealis_core::errors::{decode_error, Result};
use borealis_core::io::BitReaderRtl;

use lazy_static::lazy_static;

use crate::bundles::fold_sign;

/// A block of 64 transform coefficients or spatial residuals.
pub type DctBlock = [i32; 64];

/// The block transform scan order: maps coefficient-list positions onto raster positions within
/// an 8x8 block.
pub const BINK_SCAN: [u8; 64] = [
     0,  1,  8,  9,  2,  3, 10, 11,
     4,  5, 12, 13,  6,  7, 14, 15,
    20, 21, 28, 29, 22, 23, 30, 31,
    16, 17, 24, 25, 32, 33, 40, 41,
    34, 35, 42, 43, 48, 49, 56, 57,
    50, 51, 58, 59, 18, 19, 26, 27,
    36, 37, 44, 45, 38, 39, 46, 47,
    52, 53, 60, 61, 54, 55, 62, 63,
];

/// Base 8x8 quantiser matrix for intra blocks, in raster order.
const INTRA_BASE: [i32; 64] = [
    16, 11, 10, 16,  24,  40,  51,  61,
    12, 12, 14, 19,  26,  58,  60,  55,
    14, 13, 16, 24,  40,  57,  69,  56,
    14, 17, 22, 29,  51,  87,  80,  62,
    18, 22, 37, 56,  68, 109, 103,  77,
    24, 35, 55, 64,  81, 104, 113,  92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103,  99,
];

/// Base quantiser matrix for inter blocks: residuals quantise uniformly.
const INTER_BASE: [i32; 64] = [16; 64];

/// Per-level quantiser scale in 4.4 fixed point, one half-octave per step.
const QUANT_SCALE: [i64; 16] =
    [16, 23, 32, 45, 64, 91, 128, 181, 256, 362, 512, 724, 1024, 1448, 2048, 2896];

fn build_quant_matrices(base: &[i32; 64]) -> Vec<[i32; 64]> {
    let mut tables = Vec::with_capacity(16);

    for scale in QUANT_SCALE.iter() {
        let mut table = [0i32; 64];
        for (pos, entry) in table.iter_mut().enumerate() {
            // Quantisers are indexed in coefficient-list order and hold 21.11 fixed point
            // values, normalised so the level-0 DC quantiser is exactly 1.0.
            let b = i64::from(base[BINK_SCAN[pos] as usize]);
            *entry = ((b * scale * 2048) >> 8) as i32;
        }
        tables.push(table);
    }

    tables
}

fn build_scan_patterns() -> Vec<[u8; 64]> {
    let mut patterns = vec![[0u8; 64]; 16];

    // 0/1: row raster and its reverse.
    for i in 0..64 {
        patterns[0][i] = i as u8;
        patterns[1][i] = (63 - i) as u8;
    }

    // 2/3: column raster and its reverse.
    for i in 0..64 {
        let v = (((i & 7) << 3) | (i >> 3)) as u8;
        patterns[2][i] = v;
        patterns[3][63 - i] = v;
    }

    // 4/5: serpentine rows and serpentine columns.
    for y in 0..8usize {
        for x in 0..8usize {
            let sx = if y & 1 == 0 { x } else { 7 - x };
            patterns[4][y * 8 + x] = (y * 8 + sx) as u8;

            let sy = if x & 1 == 0 { y } else { 7 - y };
            patterns[5][x * 8 + y] = (sy * 8 + x) as u8;
        }
    }

    // 6/7: diagonal zigzag from the top-left corner and its reverse.
    {
        let mut idx = 0;
        for d in 0..15i32 {
            let y_min = (d - 7).max(0);
            let y_max = d.min(7);

            if d & 1 == 0 {
                let mut y = y_max;
                while y >= y_min {
                    patterns[6][idx] = (y * 8 + (d - y)) as u8;
                    idx += 1;
                    y -= 1;
                }
            }
            else {
                let mut y = y_min;
                while y <= y_max {
                    patterns[6][idx] = (y * 8 + (d - y)) as u8;
                    idx += 1;
                    y += 1;
                }
            }
        }

        for i in 0..64 {
            patterns[7][i] = patterns[6][63 - i];
        }
    }

    // 8/9: clockwise spiral inward from the top-left corner, and the same walked outward.
    {
        let mut idx = 0;
        let (mut top, mut bottom, mut left, mut right) = (0i32, 7i32, 0i32, 7i32);

        while top <= bottom && left <= right {
            for x in left..=right {
                patterns[8][idx] = (top * 8 + x) as u8;
                idx += 1;
            }
            for y in top + 1..=bottom {
                patterns[8][idx] = (y * 8 + right) as u8;
                idx += 1;
            }
            if top < bottom {
                for x in (left..right).rev() {
                    patterns[8][idx] = (bottom * 8 + x) as u8;
                    idx += 1;
                }
            }
            if left < right {
                for y in (top + 1..bottom).rev() {
                    patterns[8][idx] = (y * 8 + left) as u8;
                    idx += 1;
                }
            }

            top += 1;
            bottom -= 1;
            left += 1;
            right -= 1;
        }

        for i in 0..64 {
            patterns[9][i] = patterns[8][63 - i];
        }
    }

    // 10/11: 2x2 and 4x4 sub-block raster order.
    {
        let mut idx = 0;
        for qy in 0..4usize {
            for qx in 0..4usize {
                for sy in 0..2usize {
                    for sx in 0..2usize {
                        patterns[10][idx] = ((qy * 2 + sy) * 8 + qx * 2 + sx) as u8;
                        idx += 1;
                    }
                }
            }
        }

        let mut idx = 0;
        for qy in 0..2usize {
            for qx in 0..2usize {
                for sy in 0..4usize {
                    for sx in 0..4usize {
                        patterns[11][idx] = ((qy * 4 + sy) * 8 + qx * 4 + sx) as u8;
                        idx += 1;
                    }
                }
            }
        }
    }

    // 12/13: even rows then odd rows, even columns then odd columns.
    {
        let mut idx = 0;
        for y in (0..8usize).step_by(2).chain((1..8).step_by(2)) {
            for x in 0..8usize {
                patterns[12][idx] = (y * 8 + x) as u8;
                idx += 1;
            }
        }

        let mut idx = 0;
        for x in (0..8usize).step_by(2).chain((1..8).step_by(2)) {
            for y in 0..8usize {
                patterns[13][idx] = (y * 8 + x) as u8;
                idx += 1;
            }
        }
    }

    // 14: rows interleaved between the two block halves.
    {
        let mut idx = 0;
        for pair in 0..4usize {
            for &y in [pair, pair + 4].iter() {
                for x in 0..8usize {
                    patterns[14][idx] = (y * 8 + x) as u8;
                    idx += 1;
                }
            }
        }
    }

    // 15: diagonal zigzag from the top-right corner.
    for i in 0..64 {
        let v = patterns[6][i];
        patterns[15][i] = (v & !7) | (7 - (v & 7));
    }

    patterns
}

lazy_static! {
    /// The sixteen run-block scan patterns. Each is a permutation of the 64 block positions.
    pub static ref SCAN_PATTERNS: Vec<[u8; 64]> = build_scan_patterns();

    static ref INTRA_QUANT: Vec<[i32; 64]> = build_quant_matrices(&INTRA_BASE);
    static ref INTER_QUANT: Vec<[i32; 64]> = build_quant_matrices(&INTER_BASE);
}

#[inline(always)]
fn clamp_u8(val: i32) -> u8 {
    val.max(0).min(255) as u8
}

#[inline(always)]
fn mul_quant(coef: i32, quant: i32) -> i32 {
    ((i64::from(coef) * i64::from(quant)) >> 11) as i32
}

/// Zeroes a coefficient block.
pub fn clear_block(block: &mut DctBlock) {
    *block = [0; 64];
}

/// Copies an 8x8 pixel block.
pub fn put_pixels(dst: &mut [u8], dst_stride: usize, src: &[u8], src_stride: usize) {
    for y in 0..8 {
        let d = y * dst_stride;
        let s = y * src_stride;
        dst[d..d + 8].copy_from_slice(&src[s..s + 8]);
    }
}

/// Adds a spatial residual block onto an 8x8 pixel block, saturating to byte range.
pub fn add_block(dst: &mut [u8], stride: usize, block: &DctBlock) {
    for y in 0..8 {
        for x in 0..8 {
            let d = &mut dst[y * stride + x];
            *d = clamp_u8(i32::from(*d) + block[y * 8 + x]);
        }
    }
}

// Fixed-point inverse DCT constants: 2048 * sqrt(2) * cos(k * pi / 16).
const W1: i32 = 2841;
const W2: i32 = 2676;
const W3: i32 = 2408;
const W5: i32 = 1609;
const W6: i32 = 1108;
const W7: i32 = 565;

fn idct_row(row: &mut [i32]) {
    let mut x1 = row[4] << 11;
    let mut x2 = row[6];
    let mut x3 = row[2];
    let mut x4 = row[1];
    let mut x5 = row[7];
    let mut x6 = row[5];
    let mut x7 = row[3];

    if (x1 | x2 | x3 | x4 | x5 | x6 | x7) == 0 {
        let v = row[0] << 3;
        for out in row.iter_mut() {
            *out = v;
        }
        return;
    }

    let mut x0 = (row[0] << 11) + 128;

    // First stage.
    let mut x8 = W7 * (x4 + x5);
    x4 = x8 + (W1 - W7) * x4;
    x5 = x8 - (W1 + W7) * x5;
    x8 = W3 * (x6 + x7);
    x6 = x8 - (W3 - W5) * x6;
    x7 = x8 - (W3 + W5) * x7;

    // Second stage.
    x8 = x0 + x1;
    x0 -= x1;
    x1 = W6 * (x3 + x2);
    x2 = x1 - (W2 + W6) * x2;
    x3 = x1 + (W2 - W6) * x3;
    x1 = x4 + x6;
    x4 -= x6;
    x6 = x5 + x7;
    x5 -= x7;

    // Third stage.
    x7 = x8 + x3;
    x8 -= x3;
    x3 = x0 + x2;
    x0 -= x2;
    x2 = (181 * (x4 + x5) + 128) >> 8;
    x4 = (181 * (x4 - x5) + 128) >> 8;

    // Fourth stage.
    row[0] = (x7 + x1) >> 8;
    row[1] = (x3 + x2) >> 8;
    row[2] = (x0 + x4) >> 8;
    row[3] = (x8 + x6) >> 8;
    row[4] = (x8 - x6) >> 8;
    row[5] = (x0 - x4) >> 8;
    row[6] = (x3 - x2) >> 8;
    row[7] = (x7 - x1) >> 8;
}

fn idct_col(block: &mut DctBlock, col: usize) {
    let mut x1 = block[8 * 4 + col] << 8;
    let mut x2 = block[8 * 6 + col];
    let mut x3 = block[8 * 2 + col];
    let mut x4 = block[8 + col];
    let mut x5 = block[8 * 7 + col];
    let mut x6 = block[8 * 5 + col];
    let mut x7 = block[8 * 3 + col];

    if (x1 | x2 | x3 | x4 | x5 | x6 | x7) == 0 {
        let v = (block[col] + 32) >> 6;
        for y in 0..8 {
            block[8 * y + col] = v;
        }
        return;
    }

    let mut x0 = (block[col] << 8) + 8192;

    // First stage.
    let mut x8 = W7 * (x4 + x5) + 4;
    x4 = (x8 + (W1 - W7) * x4) >> 3;
    x5 = (x8 - (W1 + W7) * x5) >> 3;
    x8 = W3 * (x6 + x7) + 4;
    x6 = (x8 - (W3 - W5) * x6) >> 3;
    x7 = (x8 - (W3 + W5) * x7) >> 3;

    // Second stage.
    x8 = x0 + x1;
    x0 -= x1;
    x1 = W6 * (x3 + x2) + 4;
    x2 = (x1 - (W2 + W6) * x2) >> 3;
    x3 = (x1 + (W2 - W6) * x3) >> 3;
    x1 = x4 + x6;
    x4 -= x6;
    x6 = x5 + x7;
    x5 -= x7;

    // Third stage.
    x7 = x8 + x3;
    x8 -= x3;
    x3 = x0 + x2;
    x0 -= x2;
    x2 = (181 * (x4 + x5) + 128) >> 8;
    x4 = (181 * (x4 - x5) + 128) >> 8;

    // Fourth stage.
    block[col] = (x7 + x1) >> 14;
    block[8 + col] = (x3 + x2) >> 14;
    block[8 * 2 + col] = (x0 + x4) >> 14;
    block[8 * 3 + col] = (x8 + x6) >> 14;
    block[8 * 4 + col] = (x8 - x6) >> 14;
    block[8 * 5 + col] = (x0 - x4) >> 14;
    block[8 * 6 + col] = (x3 - x2) >> 14;
    block[8 * 7 + col] = (x7 - x1) >> 14;
}

/// Performs the 8x8 inverse DCT in place.
pub fn idct(block: &mut DctBlock) {
    for row in block.chunks_exact_mut(8) {
        idct_row(row);
    }
    for col in 0..8 {
        idct_col(block, col);
    }
}

/// Inverse-transforms a coefficient block and stores it as pixels.
pub fn idct_put(dst: &mut [u8], stride: usize, block: &mut DctBlock) {
    idct(block);
    for y in 0..8 {
        for x in 0..8 {
            dst[y * stride + x] = clamp_u8(block[y * 8 + x]);
        }
    }
}

/// Inverse-transforms a coefficient block and adds it onto existing pixels.
pub fn idct_add(dst: &mut [u8], stride: usize, block: &mut DctBlock) {
    idct(block);
    add_block(dst, stride, block);
}

/// Inverse-transforms a coefficient block into a free-standing 8x8 byte block.
pub fn idct_bytes(block: &mut DctBlock) -> [u8; 64] {
    idct(block);

    let mut out = [0u8; 64];
    for (o, &v) in out.iter_mut().zip(block.iter()) {
        *o = clamp_u8(v);
    }
    out
}

fn read_coef(bs: &mut BitReaderRtl<'_>, bits: u32) -> Result<i32> {
    if bits == 0 {
        // Amplitude class zero codes +/-1 with a lone sign bit.
        Ok(1 - ((bs.read_bit()? as i32) << 1))
    }
    else {
        let t = (bs.read_bits(bits)? | (1 << bits)) as i32;
        let sign = -(bs.read_bit()? as i32);
        Ok(fold_sign(t, sign))
    }
}

/// Reads an 8x8 block of DCT coefficients.
///
/// The 63 AC positions are organised as a binary partition: three 20-coefficient regions plus
/// the three lowest-frequency singles. Each bitstream pass walks the active list at one
/// amplitude class, either refining regions into quads and singles or emitting coefficients.
/// Afterwards a 4-bit index selects the dequantisation level.
pub fn read_dct_coeffs(
    bs: &mut BitReaderRtl<'_>,
    block: &mut DctBlock,
    scan: &[u8; 64],
    is_intra: bool,
) -> Result<()> {
    let mut coef_list = [0i32; 128];
    let mut mode_list = [0u8; 128];
    let mut list_start = 64usize;
    let mut list_end = 64usize;

    let mut coef_idx = [0usize; 64];
    let mut coef_count = 0usize;

    for &(coef, mode) in [(4, 0u8), (24, 0), (44, 0), (1, 3), (2, 3), (3, 3)].iter() {
        coef_list[list_end] = coef;
        mode_list[list_end] = mode;
        list_end += 1;
    }

    let mut bits = bs.read_bits(4)? as i32 - 1;
    while bits >= 0 {
        let mut pos = list_start;

        while pos < list_end {
            if (coef_list[pos] | i32::from(mode_list[pos])) == 0 || !bs.read_bool()? {
                pos += 1;
                continue;
            }

            let ccoef = coef_list[pos];
            let mode = mode_list[pos];

            match mode {
                0 | 2 => {
                    if mode == 0 {
                        // The region's head quad decodes now; the remaining sixteen
                        // coefficients stay behind as a mode 1 entry.
                        coef_list[pos] = ccoef + 4;
                        mode_list[pos] = 1;
                    }
                    else {
                        coef_list[pos] = 0;
                        mode_list[pos] = 0;
                        pos += 1;
                    }

                    for i in 0..4 {
                        let c = (ccoef + i) as usize;
                        if bs.read_bool()? {
                            list_start -= 1;
                            coef_list[list_start] = c as i32;
                            mode_list[list_start] = 3;
                        }
                        else {
                            block[scan[c] as usize] = read_coef(bs, bits as u32)?;
                            coef_idx[coef_count] = c;
                            coef_count += 1;
                        }
                    }
                }
                1 => {
                    mode_list[pos] = 2;
                    for i in 1..=3 {
                        coef_list[list_end] = ccoef + 4 * i;
                        mode_list[list_end] = 2;
                        list_end += 1;
                    }
                }
                3 => {
                    block[scan[ccoef as usize] as usize] = read_coef(bs, bits as u32)?;
                    coef_idx[coef_count] = ccoef as usize;
                    coef_count += 1;
                    coef_list[pos] = 0;
                    mode_list[pos] = 0;
                    pos += 1;
                }
                _ => return decode_error("bink: invalid coefficient list state"),
            }
        }

        bits -= 1;
    }

    let quant_idx = bs.read_bits(4)? as usize;
    let quant = if is_intra { &INTRA_QUANT[quant_idx] } else { &INTER_QUANT[quant_idx] };

    block[0] = mul_quant(block[0], quant[0]);
    for &idx in coef_idx[..coef_count].iter() {
        block[scan[idx] as usize] = mul_quant(block[scan[idx] as usize], quant[idx]);
    }

    Ok(())
}

/// Reads an 8x8 block of spatial residuals after motion compensation.
///
/// Residuals are coded as bit planes from the most-significant mask downwards: each plane first
/// refines the coefficients known so far, then walks the partition list for newly significant
/// ones. At most `masks_count` significant bits are read.
pub fn read_residue(
    bs: &mut BitReaderRtl<'_>,
    block: &mut DctBlock,
    masks_count: i32,
) -> Result<()> {
    let mut coef_list = [0i32; 128];
    let mut mode_list = [0u8; 128];
    let mut list_start = 64usize;
    let mut list_end = 64usize;

    let mut nz_coeff = [0usize; 64];
    let mut nz_count = 0usize;

    let mut masks_left = masks_count;

    for &(coef, mode) in [(4, 0u8), (24, 0), (44, 0), (0, 2)].iter() {
        coef_list[list_end] = coef;
        mode_list[list_end] = mode;
        list_end += 1;
    }

    let mut mask = 1i32 << bs.read_bits(3)?;
    while mask != 0 {
        for i in 0..nz_count {
            if !bs.read_bool()? {
                continue;
            }

            let idx = nz_coeff[i];
            if block[idx] < 0 {
                block[idx] -= mask;
            }
            else {
                block[idx] += mask;
            }

            masks_left -= 1;
            if masks_left <= 0 {
                return Ok(());
            }
        }

        let mut pos = list_start;
        while pos < list_end {
            if (coef_list[pos] | i32::from(mode_list[pos])) == 0 || !bs.read_bool()? {
                pos += 1;
                continue;
            }

            let ccoef = coef_list[pos];
            let mode = mode_list[pos];

            match mode {
                0 | 2 => {
                    if mode == 0 {
                        coef_list[pos] = ccoef + 4;
                        mode_list[pos] = 1;
                    }
                    else {
                        coef_list[pos] = 0;
                        mode_list[pos] = 0;
                        pos += 1;
                    }

                    for i in 0..4 {
                        let c = (ccoef + i) as usize;
                        if bs.read_bool()? {
                            list_start -= 1;
                            coef_list[list_start] = c as i32;
                            mode_list[list_start] = 3;
                        }
                        else {
                            let raster = BINK_SCAN[c] as usize;
                            nz_coeff[nz_count] = raster;
                            nz_count += 1;

                            block[raster] = if bs.read_bool()? { -mask } else { mask };

                            masks_left -= 1;
                            if masks_left <= 0 {
                                return Ok(());
                            }
                        }
                    }
                }
                1 => {
                    mode_list[pos] = 2;
                    for i in 1..=3 {
                        coef_list[list_end] = ccoef + 4 * i;
                        mode_list[list_end] = 2;
                        list_end += 1;
                    }
                }
                3 => {
                    let raster = BINK_SCAN[ccoef as usize] as usize;
                    nz_coeff[nz_count] = raster;
                    nz_count += 1;

                    block[raster] = if bs.read_bool()? { -mask } else { mask };

                    coef_list[pos] = 0;
                    mode_list[pos] = 0;
                    pos += 1;

                    masks_left -= 1;
                    if masks_left <= 0 {
                        return Ok(());
                    }
                }
                _ => return decode_error("bink: invalid coefficient list state"),
            }
        }

        mask >>= 1;
    }

    Ok(())
}
