// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `codecs` module provides the traits and support structures necessary to implement codecs.

use std::fmt;

use crate::errors::Result;
use crate::formats::Packet;
use crate::units::TimeBase;
use crate::video::BgraBuffer;

/// A `VideoCodecId` is a unique identifier used to identify a specific video codec.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VideoCodecId(u32);

/// Null video codec ID.
pub const CODEC_ID_NULL_VIDEO: VideoCodecId = VideoCodecId(0x0);

/// Bink Video (RAD Game Tools).
pub const CODEC_ID_BINK_VIDEO: VideoCodecId = VideoCodecId(0x200);

impl Default for VideoCodecId {
    fn default() -> Self {
        CODEC_ID_NULL_VIDEO
    }
}

impl fmt::Display for VideoCodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// An `AudioCodecId` is a unique identifier used to identify a specific audio codec.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AudioCodecId(u32);

/// Null audio codec ID.
pub const CODEC_ID_NULL_AUDIO: AudioCodecId = AudioCodecId(0x0);

/// Bink Audio (RAD Game Tools).
pub const CODEC_ID_BINK_AUDIO: AudioCodecId = AudioCodecId(0x200);

impl Default for AudioCodecId {
    fn default() -> Self {
        CODEC_ID_NULL_AUDIO
    }
}

impl fmt::Display for AudioCodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A codec-defined profile, revision, or sub-format identifier.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodecProfile(pub u32);

/// Codec parameters for video codecs.
#[derive(Clone, Debug, Default)]
pub struct VideoCodecParameters {
    /// The codec ID.
    pub codec: VideoCodecId,
    /// The codec-defined profile.
    pub profile: Option<CodecProfile>,
    /// Video width in pixels.
    pub width: Option<u32>,
    /// Video height in pixels.
    pub height: Option<u32>,
    /// The timebase of one frame.
    pub frame_rate: Option<TimeBase>,
    /// The total number of frames, if known.
    pub n_frames: Option<u64>,
    /// Extra data (defined by the codec).
    pub extra_data: Option<Box<[u8]>>,
}

impl VideoCodecParameters {
    pub fn new() -> VideoCodecParameters {
        Default::default()
    }

    /// Provide the `VideoCodecId`.
    pub fn for_codec(&mut self, codec: VideoCodecId) -> &mut Self {
        self.codec = codec;
        self
    }

    /// Provide the codec-defined profile.
    pub fn with_profile(&mut self, profile: CodecProfile) -> &mut Self {
        self.profile = Some(profile);
        self
    }

    /// Provide video width.
    pub fn with_width(&mut self, width: u32) -> &mut Self {
        self.width = Some(width);
        self
    }

    /// Provide video height.
    pub fn with_height(&mut self, height: u32) -> &mut Self {
        self.height = Some(height);
        self
    }

    /// Provide the timebase of one frame.
    pub fn with_frame_rate(&mut self, frame_rate: TimeBase) -> &mut Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    /// Provide the total number of frames.
    pub fn with_n_frames(&mut self, n_frames: u64) -> &mut Self {
        self.n_frames = Some(n_frames);
        self
    }

    /// Provide codec extra data.
    pub fn with_extra_data(&mut self, data: Box<[u8]>) -> &mut Self {
        self.extra_data = Some(data);
        self
    }
}

/// Codec parameters for audio codecs.
#[derive(Clone, Debug, Default)]
pub struct AudioCodecParameters {
    /// The codec ID.
    pub codec: AudioCodecId,
    /// The sample rate of the audio in Hz.
    pub sample_rate: Option<u32>,
    /// Codec-defined flags.
    pub flags: Option<u32>,
}

impl AudioCodecParameters {
    pub fn new() -> AudioCodecParameters {
        Default::default()
    }

    /// Provide the `AudioCodecId`.
    pub fn for_codec(&mut self, codec: AudioCodecId) -> &mut Self {
        self.codec = codec;
        self
    }

    /// Provide the sample rate in Hz.
    pub fn with_sample_rate(&mut self, sample_rate: u32) -> &mut Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Provide codec-defined flags.
    pub fn with_flags(&mut self, flags: u32) -> &mut Self {
        self.flags = Some(flags);
        self
    }
}

/// `CodecParameters` describes the encoded bitstream of a single track well enough to instantiate
/// a decoder for it.
#[derive(Clone, Debug)]
pub enum CodecParameters {
    Video(VideoCodecParameters),
    Audio(AudioCodecParameters),
}

impl CodecParameters {
    /// Get the video codec parameters, if the track is a video track.
    pub fn video(&self) -> Option<&VideoCodecParameters> {
        match self {
            CodecParameters::Video(params) => Some(params),
            _ => None,
        }
    }

    /// Get the audio codec parameters, if the track is an audio track.
    pub fn audio(&self) -> Option<&AudioCodecParameters> {
        match self {
            CodecParameters::Audio(params) => Some(params),
            _ => None,
        }
    }
}

/// `VideoDecoderOptions` is a common set of options that all video decoders use.
#[derive(Copy, Clone, Debug, Default)]
pub struct VideoDecoderOptions {
    // None yet.
}

/// A `VideoDecoder` implements a video codec's decode algorithm. It consumes `Packet`s and
/// produces video frames.
pub trait VideoDecoder: Sized {
    /// Attempt to instantiate the decoder from the given codec parameters.
    fn try_new(params: &VideoCodecParameters, options: &VideoDecoderOptions) -> Result<Self>;

    /// Decodes one `Packet` of encoded video data and returns the decoded frame.
    ///
    /// An error is unrecoverable: the stream is malformed and decoding cannot continue.
    fn decode(&mut self, packet: &Packet) -> Result<&BgraBuffer>;

    /// Reset the decoder.
    ///
    /// A decoder must be reset when the next packet is discontinuous with respect to the last
    /// decoded packet.
    fn reset(&mut self);

    /// Gets a reference to the codec parameters the decoder was instantiated with.
    fn codec_params(&self) -> &VideoCodecParameters;

    /// Gets a reference to the last decoded frame, if any packet has been decoded yet.
    fn last_decoded(&self) -> Option<&BgraBuffer>;
}
