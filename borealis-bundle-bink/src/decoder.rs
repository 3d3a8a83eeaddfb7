// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::mem;

use borealis_core::codecs::{
    VideoCodecParameters, VideoDecoder, VideoDecoderOptions, CODEC_ID_BINK_VIDEO,
};
use borealis_core::errors::{decode_error, unsupported_error, Result};
use borealis_core::formats::Packet;
use borealis_core::io::BitReaderRtl;
use borealis_core::video::{BgraBuffer, YuvaBuffer, PLANE_A};

use crate::bundles::{BundleSource, BundleStore};
use crate::common::{BinkVersion, DC_START_BITS, VIDEO_FLAG_ALPHA};
use crate::dsp::{self, DctBlock};

/// The ten block kinds of the video bitstream.
///
/// Block type values 3 and 11 are unused; 12..=15 are RLE escapes resolved by the block type
/// bundle and never reach the dispatcher.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BlockKind {
    /// Copy the co-located block of the previous frame.
    Skip,
    /// A 16x16 block; the sub-kind comes from the sub-block-type bundle.
    Scaled,
    /// Copy a displaced block of the previous frame.
    Motion,
    /// A scan-patterned sequence of colour runs.
    Run,
    /// Motion copy plus a coded spatial residual.
    Residue,
    /// A transform-coded block.
    Intra,
    /// A single colour.
    Fill,
    /// Motion copy plus a transform-coded correction.
    Inter,
    /// A two-colour bit pattern.
    Pattern,
    /// 64 verbatim colour values.
    Raw,
}

impl BlockKind {
    fn from_value(value: i32) -> Result<BlockKind> {
        match value {
            0 => Ok(BlockKind::Skip),
            1 => Ok(BlockKind::Scaled),
            2 => Ok(BlockKind::Motion),
            4 => Ok(BlockKind::Run),
            5 => Ok(BlockKind::Residue),
            6 => Ok(BlockKind::Intra),
            7 => Ok(BlockKind::Fill),
            8 => Ok(BlockKind::Inter),
            9 => Ok(BlockKind::Pattern),
            10 => Ok(BlockKind::Raw),
            _ => decode_error("bink: unknown block type"),
        }
    }
}

/// Decoding state for one plane: the bitstream, the bundles, and the destination and reference
/// plane surfaces.
struct PlaneCtx<'a, 'b> {
    bs: &'a mut BitReaderRtl<'b>,
    bundles: &'a mut BundleStore,
    dst: &'a mut [u8],
    prev: &'a [u8],
    stride: usize,
    rows: usize,
    block: DctBlock,
}

impl<'a, 'b> PlaneCtx<'a, 'b> {
    fn decode(&mut self, bw: usize, bh: usize) -> Result<()> {
        for by in 0..bh {
            self.read_row_bundles()?;

            let mut bx = 0;
            while bx < bw {
                let kind = BlockKind::from_value(self.bundles.get_value(BundleSource::BlockTypes)?)?;

                // A 16x16 block type on an odd row is the bottom half of the block decoded
                // above it; skip it and the extra column it covers.
                if (by & 1) == 1 && kind == BlockKind::Scaled {
                    bx += 2;
                    continue;
                }

                match kind {
                    BlockKind::Skip => self.block_skip(bx, by)?,
                    BlockKind::Scaled => {
                        self.block_scaled(bx, by)?;
                        // A scaled block covers one extra column.
                        bx += 1;
                    }
                    BlockKind::Motion => self.block_motion(bx, by)?,
                    BlockKind::Run => self.block_run(bx, by)?,
                    BlockKind::Residue => self.block_residue(bx, by)?,
                    BlockKind::Intra => self.block_intra(bx, by)?,
                    BlockKind::Fill => self.block_fill(bx, by)?,
                    BlockKind::Inter => self.block_inter(bx, by)?,
                    BlockKind::Pattern => self.block_pattern(bx, by)?,
                    BlockKind::Raw => self.block_raw(bx, by)?,
                }

                bx += 1;
            }
        }

        Ok(())
    }

    /// Decodes the next segment of every bundle. Bundles that still hold unconsumed values
    /// read nothing.
    fn read_row_bundles(&mut self) -> Result<()> {
        self.bundles.read_block_types(self.bs, BundleSource::BlockTypes)?;
        self.bundles.read_block_types(self.bs, BundleSource::SubBlockTypes)?;
        self.bundles.read_colors(self.bs)?;
        self.bundles.read_patterns(self.bs)?;
        self.bundles.read_motion_values(self.bs, BundleSource::XOff)?;
        self.bundles.read_motion_values(self.bs, BundleSource::YOff)?;
        self.bundles.read_dcs(self.bs, BundleSource::IntraDc, DC_START_BITS, false)?;
        self.bundles.read_dcs(self.bs, BundleSource::InterDc, DC_START_BITS, true)?;
        self.bundles.read_runs(self.bs)?;
        Ok(())
    }

    #[inline(always)]
    fn block_off(&self, bx: usize, by: usize) -> usize {
        by * 8 * self.stride + bx * 8
    }

    fn block_skip(&mut self, bx: usize, by: usize) -> Result<()> {
        let off = self.block_off(bx, by);
        dsp::put_pixels(&mut self.dst[off..], self.stride, &self.prev[off..], self.stride);
        Ok(())
    }

    /// Copies the previous-frame block displaced by the decoded motion vector and returns the
    /// destination offset.
    fn motion_copy(&mut self, bx: usize, by: usize) -> Result<usize> {
        let xoff = self.bundles.get_value(BundleSource::XOff)?;
        let yoff = self.bundles.get_value(BundleSource::YOff)?;

        let src_x = bx as i32 * 8 + xoff;
        let src_y = by as i32 * 8 + yoff;

        if src_x < 0
            || src_y < 0
            || src_x as usize + 8 > self.stride
            || src_y as usize + 8 > self.rows
        {
            return decode_error("bink: copy out of bounds");
        }

        let off = self.block_off(bx, by);
        let src_off = src_y as usize * self.stride + src_x as usize;

        dsp::put_pixels(&mut self.dst[off..], self.stride, &self.prev[src_off..], self.stride);

        Ok(off)
    }

    fn block_motion(&mut self, bx: usize, by: usize) -> Result<()> {
        self.motion_copy(bx, by)?;
        Ok(())
    }

    fn block_run(&mut self, bx: usize, by: usize) -> Result<()> {
        let off = self.block_off(bx, by);
        let pattern = &dsp::SCAN_PATTERNS[self.bs.read_bits(4)? as usize];

        let mut i = 0usize;
        loop {
            let run = self.bundles.get_value(BundleSource::Run)? as usize + 1;

            if i + run > 64 {
                return decode_error("bink: run went out of bounds");
            }

            if self.bs.read_bool()? {
                let v = self.bundles.get_value(BundleSource::Colors)? as u8;
                for &p in pattern[i..i + run].iter() {
                    self.put_scan(off, p, v);
                }
            }
            else {
                for &p in pattern[i..i + run].iter() {
                    let v = self.bundles.get_value(BundleSource::Colors)? as u8;
                    self.put_scan(off, p, v);
                }
            }

            i += run;
            if i >= 63 {
                break;
            }
        }

        if i == 63 {
            let v = self.bundles.get_value(BundleSource::Colors)? as u8;
            self.put_scan(off, pattern[63], v);
        }

        Ok(())
    }

    #[inline(always)]
    fn put_scan(&mut self, off: usize, scan_pos: u8, v: u8) {
        let p = usize::from(scan_pos);
        self.dst[off + (p & 7) + (p >> 3) * self.stride] = v;
    }

    fn block_residue(&mut self, bx: usize, by: usize) -> Result<()> {
        let off = self.motion_copy(bx, by)?;

        let masks_count = self.bs.read_bits(7)? as i32;

        dsp::clear_block(&mut self.block);
        dsp::read_residue(self.bs, &mut self.block, masks_count)?;
        dsp::add_block(&mut self.dst[off..], self.stride, &self.block);

        Ok(())
    }

    fn block_intra(&mut self, bx: usize, by: usize) -> Result<()> {
        let off = self.block_off(bx, by);

        dsp::clear_block(&mut self.block);
        self.block[0] = self.bundles.get_value(BundleSource::IntraDc)?;
        dsp::read_dct_coeffs(self.bs, &mut self.block, &dsp::BINK_SCAN, true)?;
        dsp::idct_put(&mut self.dst[off..], self.stride, &mut self.block);

        Ok(())
    }

    fn block_fill(&mut self, bx: usize, by: usize) -> Result<()> {
        let off = self.block_off(bx, by);
        let v = self.bundles.get_value(BundleSource::Colors)? as u8;

        for row in 0..8 {
            let d = off + row * self.stride;
            self.dst[d..d + 8].iter_mut().for_each(|p| *p = v);
        }

        Ok(())
    }

    fn block_inter(&mut self, bx: usize, by: usize) -> Result<()> {
        let off = self.motion_copy(bx, by)?;

        dsp::clear_block(&mut self.block);
        self.block[0] = self.bundles.get_value(BundleSource::InterDc)?;
        dsp::read_dct_coeffs(self.bs, &mut self.block, &dsp::BINK_SCAN, false)?;
        dsp::idct_add(&mut self.dst[off..], self.stride, &mut self.block);

        Ok(())
    }

    fn block_pattern(&mut self, bx: usize, by: usize) -> Result<()> {
        let off = self.block_off(bx, by);

        let mut col = [0u8; 2];
        for c in col.iter_mut() {
            *c = self.bundles.get_value(BundleSource::Colors)? as u8;
        }

        for i in 0..8 {
            let mut v = self.bundles.get_value(BundleSource::Pattern)? as u8;
            for j in 0..8 {
                self.dst[off + i * self.stride + j] = col[usize::from(v >> 7)];
                v <<= 1;
            }
        }

        Ok(())
    }

    fn block_raw(&mut self, bx: usize, by: usize) -> Result<()> {
        let off = self.block_off(bx, by);
        let stride = self.stride;
        let colors = self.bundles.take_colors(64)?;

        for row in 0..8 {
            let d = off + row * stride;
            self.dst[d..d + 8].copy_from_slice(&colors[row * 8..row * 8 + 8]);
        }

        Ok(())
    }

    fn block_scaled(&mut self, bx: usize, by: usize) -> Result<()> {
        if bx * 8 + 16 > self.stride || by * 8 + 16 > self.rows {
            return decode_error("bink: scaled block outside plane");
        }

        let off = self.block_off(bx, by);

        let sub = BlockKind::from_value(self.bundles.get_value(BundleSource::SubBlockTypes)?)?;
        match sub {
            BlockKind::Run => self.block_scaled_run(off),
            BlockKind::Intra => self.block_scaled_intra(off),
            BlockKind::Fill => self.block_scaled_fill(off),
            BlockKind::Pattern => self.block_scaled_pattern(off),
            BlockKind::Raw => self.block_scaled_raw(off),
            _ => decode_error("bink: invalid 16x16 block type"),
        }
    }

    fn block_scaled_run(&mut self, off: usize) -> Result<()> {
        let pattern = &dsp::SCAN_PATTERNS[self.bs.read_bits(4)? as usize];

        let mut ublock = [0u8; 64];

        let mut i = 0usize;
        loop {
            let run = self.bundles.get_value(BundleSource::Run)? as usize + 1;

            if i + run > 64 {
                return decode_error("bink: run went out of bounds");
            }

            if self.bs.read_bool()? {
                let v = self.bundles.get_value(BundleSource::Colors)? as u8;
                for &p in pattern[i..i + run].iter() {
                    ublock[usize::from(p)] = v;
                }
            }
            else {
                for &p in pattern[i..i + run].iter() {
                    ublock[usize::from(p)] = self.bundles.get_value(BundleSource::Colors)? as u8;
                }
            }

            i += run;
            if i >= 63 {
                break;
            }
        }

        if i == 63 {
            ublock[usize::from(pattern[63])] = self.bundles.get_value(BundleSource::Colors)? as u8;
        }

        self.upsample(off, &ublock);
        Ok(())
    }

    fn block_scaled_intra(&mut self, off: usize) -> Result<()> {
        dsp::clear_block(&mut self.block);
        self.block[0] = self.bundles.get_value(BundleSource::IntraDc)?;
        dsp::read_dct_coeffs(self.bs, &mut self.block, &dsp::BINK_SCAN, true)?;

        let ublock = dsp::idct_bytes(&mut self.block);
        self.upsample(off, &ublock);

        Ok(())
    }

    fn block_scaled_fill(&mut self, off: usize) -> Result<()> {
        let v = self.bundles.get_value(BundleSource::Colors)? as u8;

        for row in 0..16 {
            let d = off + row * self.stride;
            self.dst[d..d + 16].iter_mut().for_each(|p| *p = v);
        }

        Ok(())
    }

    fn block_scaled_pattern(&mut self, off: usize) -> Result<()> {
        let mut col = [0u8; 2];
        for c in col.iter_mut() {
            *c = self.bundles.get_value(BundleSource::Colors)? as u8;
        }

        for i in 0..8 {
            let mut v = self.bundles.get_value(BundleSource::Pattern)? as u8;
            for j in 0..8 {
                let c = col[usize::from(v >> 7)];
                v <<= 1;

                let d = off + 2 * i * self.stride + 2 * j;
                self.dst[d] = c;
                self.dst[d + 1] = c;
                self.dst[d + self.stride] = c;
                self.dst[d + self.stride + 1] = c;
            }
        }

        Ok(())
    }

    fn block_scaled_raw(&mut self, off: usize) -> Result<()> {
        let mut ublock = [0u8; 64];
        ublock.copy_from_slice(self.bundles.take_colors(64)?);

        self.upsample(off, &ublock);
        Ok(())
    }

    /// Writes an 8x8 byte block into a 16x16 destination area, doubling every pixel.
    fn upsample(&mut self, off: usize, ublock: &[u8; 64]) {
        for i in 0..8 {
            for j in 0..8 {
                let v = ublock[i * 8 + j];
                let d = off + 2 * i * self.stride + 2 * j;

                self.dst[d] = v;
                self.dst[d + 1] = v;
                self.dst[d + self.stride] = v;
                self.dst[d + self.stride + 1] = v;
            }
        }
    }
}

/// Bink video decoder.
///
/// Owns two plane sets which swap roles after every frame: blocks referencing the previous
/// frame read from one while the other is written.
pub struct BinkDecoder {
    params: VideoCodecParameters,
    version: BinkVersion,
    width: u32,
    height: u32,
    has_alpha: bool,
    swap_planes: bool,
    cur: YuvaBuffer,
    prev: YuvaBuffer,
    bundles: BundleStore,
    frame: BgraBuffer,
    have_frame: bool,
}

impl BinkDecoder {
    /// Gets the plane set of the most recently decoded frame, if any.
    pub fn last_planes(&self) -> Option<&YuvaBuffer> {
        // The plane sets swap after every decode, so the last decoded picture is in `prev`.
        if self.have_frame {
            Some(&self.prev)
        }
        else {
            None
        }
    }

    fn decode_plane(
        &mut self,
        bs: &mut BitReaderRtl<'_>,
        plane_idx: usize,
        is_chroma: bool,
    ) -> Result<()> {
        let bw = if is_chroma { (self.width as usize + 15) >> 4 } else { (self.width as usize + 7) >> 3 };
        let bh = if is_chroma { (self.height as usize + 15) >> 4 } else { (self.height as usize + 7) >> 3 };
        let pw = if is_chroma { self.width >> 1 } else { self.width };

        self.bundles.init_lengths(pw.max(8), bw as u32);
        for source in BundleSource::USED.iter() {
            self.bundles.read_bundle(*source, bs)?;
        }

        let spec = self.cur.spec(plane_idx);

        let mut ctx = PlaneCtx {
            bs: &mut *bs,
            bundles: &mut self.bundles,
            dst: self.cur.plane_mut(plane_idx),
            prev: self.prev.plane(plane_idx),
            stride: spec.stride,
            rows: spec.rows,
            block: [0; 64],
        };

        ctx.decode(bw, bh)?;

        // The next plane's data starts at a 32-bit boundary.
        let rem = (bs.pos() & 0x1f) as u32;
        if rem != 0 {
            bs.ignore_bits(32 - rem)?;
        }

        Ok(())
    }
}

impl VideoDecoder for BinkDecoder {
    fn try_new(params: &VideoCodecParameters, _options: &VideoDecoderOptions) -> Result<Self> {
        if params.codec != CODEC_ID_BINK_VIDEO {
            return unsupported_error("bink: invalid codec");
        }

        let version = match params.profile.and_then(BinkVersion::from_profile) {
            Some(version) => version,
            None => return unsupported_error("bink: unknown container revision"),
        };

        let width = params.width.unwrap_or(0);
        let height = params.height.unwrap_or(0);

        if width == 0 || height == 0 || width > 7680 || height > 7680 {
            return decode_error("bink: invalid video dimensions");
        }

        let video_flags = match params.extra_data {
            Some(ref data) if data.len() == 4 => {
                u32::from_le_bytes([data[0], data[1], data[2], data[3]])
            }
            _ => 0,
        };

        Ok(BinkDecoder {
            params: params.clone(),
            version,
            width,
            height,
            has_alpha: video_flags & VIDEO_FLAG_ALPHA != 0,
            swap_planes: version.swaps_planes(),
            cur: YuvaBuffer::new(width, height),
            prev: YuvaBuffer::new(width, height),
            bundles: BundleStore::new(width, height, version.folds_colors()),
            frame: BgraBuffer::new(width, height),
            have_frame: false,
        })
    }

    fn decode(&mut self, packet: &Packet) -> Result<&BgraBuffer> {
        let mut bs = BitReaderRtl::new(packet.buf());

        if self.has_alpha {
            if self.version.has_plane_skips() {
                bs.ignore_bits(32)?;
            }
            self.decode_plane(&mut bs, PLANE_A, false)?;
        }

        if self.version.has_plane_skips() {
            bs.ignore_bits(32)?;
        }

        for i in 0..3 {
            let plane_idx = if i == 0 || !self.swap_planes { i } else { i ^ 3 };

            self.decode_plane(&mut bs, plane_idx, i != 0)?;

            if bs.pos() >= bs.bits_len() {
                break;
            }
        }

        self.frame.convert_from_yuva(&self.cur);
        mem::swap(&mut self.cur, &mut self.prev);
        self.have_frame = true;

        Ok(&self.frame)
    }

    fn reset(&mut self) {
        self.cur.reset();
        self.prev.reset();
        self.have_frame = false;
    }

    fn codec_params(&self) -> &VideoCodecParameters {
        &self.params
    }

    fn last_decoded(&self) -> Option<&BgraBuffer> {
        if self.have_frame {
            Some(&self.frame)
        }
        else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BlockKind;

    #[test]
    fn verify_block_kind_values() {
        assert_eq!(BlockKind::from_value(0).unwrap(), BlockKind::Skip);
        assert_eq!(BlockKind::from_value(1).unwrap(), BlockKind::Scaled);
        assert_eq!(BlockKind::from_value(10).unwrap(), BlockKind::Raw);

        assert!(BlockKind::from_value(3).is_err());
        assert!(BlockKind::from_value(11).is_err());
        assert!(BlockKind::from_value(-1).is_err());
    }
}
