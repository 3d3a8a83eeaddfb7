// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use borealis_core::codecs::CodecProfile;
use borealis_core::units::TimeBase;

/// FourCC of revision `f` Bink containers.
pub const BIK_ID_F: u32 = u32::from_be_bytes(*b"BIKf");
/// FourCC of revision `g` Bink containers.
pub const BIK_ID_G: u32 = u32::from_be_bytes(*b"BIKg");
/// FourCC of revision `h` Bink containers.
pub const BIK_ID_H: u32 = u32::from_be_bytes(*b"BIKh");
/// FourCC of revision `i` Bink containers.
pub const BIK_ID_I: u32 = u32::from_be_bytes(*b"BIKi");

/// Bit 20 of the video flags word indicates the stream carries an alpha plane.
pub const VIDEO_FLAG_ALPHA: u32 = 0x0010_0000;

/// Number of bits used to store the first DC value of a bundle segment.
pub const DC_START_BITS: u32 = 11;

/// Bink video profile for revision `f` containers.
pub const CODEC_PROFILE_BINK_F: CodecProfile = CodecProfile(b'f' as u32);
/// Bink video profile for revision `g` containers.
pub const CODEC_PROFILE_BINK_G: CodecProfile = CodecProfile(b'g' as u32);
/// Bink video profile for revision `h` containers.
pub const CODEC_PROFILE_BINK_H: CodecProfile = CodecProfile(b'h' as u32);
/// Bink video profile for revision `i` containers.
pub const CODEC_PROFILE_BINK_I: CodecProfile = CodecProfile(b'i' as u32);

/// The container revision, as identified by the FourCC.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinkVersion {
    BikF,
    BikG,
    BikH,
    BikI,
}

impl BinkVersion {
    /// Maps a container FourCC onto a revision.
    pub fn from_fourcc(id: u32) -> Option<BinkVersion> {
        match id {
            BIK_ID_F => Some(BinkVersion::BikF),
            BIK_ID_G => Some(BinkVersion::BikG),
            BIK_ID_H => Some(BinkVersion::BikH),
            BIK_ID_I => Some(BinkVersion::BikI),
            _ => None,
        }
    }

    /// Maps a codec profile onto a revision.
    pub fn from_profile(profile: CodecProfile) -> Option<BinkVersion> {
        match profile {
            CODEC_PROFILE_BINK_F => Some(BinkVersion::BikF),
            CODEC_PROFILE_BINK_G => Some(BinkVersion::BikG),
            CODEC_PROFILE_BINK_H => Some(BinkVersion::BikH),
            CODEC_PROFILE_BINK_I => Some(BinkVersion::BikI),
            _ => None,
        }
    }

    /// Gets the codec profile of this revision.
    pub fn profile(&self) -> CodecProfile {
        match self {
            BinkVersion::BikF => CODEC_PROFILE_BINK_F,
            BinkVersion::BikG => CODEC_PROFILE_BINK_G,
            BinkVersion::BikH => CODEC_PROFILE_BINK_H,
            BinkVersion::BikI => CODEC_PROFILE_BINK_I,
        }
    }

    /// Revisions `h` and `i` store their chroma planes in V, U order.
    pub fn swaps_planes(&self) -> bool {
        matches!(self, BinkVersion::BikH | BinkVersion::BikI)
    }

    /// Revision `i` inserts a 32-bit word ahead of each plane group.
    pub fn has_plane_skips(&self) -> bool {
        matches!(self, BinkVersion::BikI)
    }

    /// All revisions except `i` store colour values sign-folded around mid-grey.
    pub fn folds_colors(&self) -> bool {
        !matches!(self, BinkVersion::BikI)
    }
}

/// One entry of the frame index.
#[derive(Copy, Clone, Debug)]
pub struct FrameRecord {
    /// Absolute byte offset of the frame.
    pub offset: u64,
    /// Byte size of the frame, spanning to the next frame or the end of the file.
    pub size: u32,
    /// True if the frame does not reference the previous frame.
    pub keyframe: bool,
}

/// Properties of one audio track, as described by the container header.
#[derive(Copy, Clone, Debug)]
pub struct AudioTrackInfo {
    /// The sample rate in Hz.
    pub sample_rate: u16,
    /// Codec-defined flags.
    pub flags: u16,
}

/// A parsed Bink container header plus the frame index.
#[derive(Clone, Debug)]
pub struct BinkHeader {
    /// The container revision.
    pub version: BinkVersion,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// The timebase of one frame.
    pub frame_rate: TimeBase,
    /// The size of the largest frame in bytes.
    pub largest_frame_size: u32,
    /// The raw video flags word.
    pub video_flags: u32,
    /// The audio tracks carried by the container.
    pub audio_tracks: Vec<AudioTrackInfo>,
    /// The frame index.
    pub frames: Vec<FrameRecord>,
}

impl BinkHeader {
    /// True if the video flags indicate an alpha plane.
    pub fn has_alpha(&self) -> bool {
        self.video_flags & VIDEO_FLAG_ALPHA != 0
    }
}
