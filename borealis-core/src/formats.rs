// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `formats` module provides the traits and support structures necessary to implement media
//! demuxers.

use crate::codecs::CodecParameters;
use crate::errors::Result;
use crate::io::MediaSourceStream;
use crate::units::TimeStamp;

/// `FormatOptions` is a common set of options that all demuxers use.
#[derive(Copy, Clone, Debug, Default)]
pub struct FormatOptions {
    // None yet.
}

/// A `SeekTo` describes a position in a stream to seek to, in track timestamps.
#[derive(Copy, Clone, Debug)]
pub struct SeekTo {
    /// The timestamp to seek to.
    pub ts: TimeStamp,
}

/// A `SeekedTo` describes the result of a seek operation.
#[derive(Copy, Clone, Debug)]
pub struct SeekedTo {
    /// The timestamp the stream was actually seeked to.
    pub actual_ts: TimeStamp,
}

/// A `Track` is an independently coded media bitstream. A media format may contain multiple tracks
/// in one container. Each of those tracks are represented by one `Track`.
#[derive(Clone, Debug)]
pub struct Track {
    /// A unique identifier for the track.
    pub id: u32,
    /// The codec parameters for the track.
    pub codec_params: CodecParameters,
    /// The language of the track. May be unknown.
    pub language: Option<String>,
}

impl Track {
    pub fn new(id: u32, codec_params: CodecParameters) -> Self {
        Track { id, codec_params, language: None }
    }
}

/// A `FormatReader` is a container demuxer. It provides methods to probe a media container for
/// information and access the tracks encapsulated in the container.
///
/// While demuxing, packets are read one-by-one and may be discarded or decoded at the choice of
/// the caller. The contents of a packet is undefined: it may be a frame of video or a packet of
/// audio, but a packet will never contain data from two different bitstreams. Therefore the
/// caller can be selective in what tracks(s) should be decoded and consumed.
pub trait FormatReader: Sized {
    /// Attempt to instantiate a `FormatReader` using the provided `FormatOptions` and
    /// `MediaSourceStream`. The reader will probe the container to verify format support,
    /// determine the number of tracks, and read the frame index.
    fn try_new(source: MediaSourceStream, options: &FormatOptions) -> Result<Self>;

    /// Gets a list of tracks in the container.
    fn tracks(&self) -> &[Track];

    /// Gets the default track. If the `FormatReader` has a method of determining the default
    /// track, this function should return it. Otherwise, the first track is returned. If no
    /// tracks are present then `None` is returned.
    fn default_track(&self) -> Option<&Track> {
        self.tracks().first()
    }

    /// Get the next packet from the container.
    ///
    /// Once the end of the container is reached, `Error::EndOfStream` is returned. All other
    /// errors are unrecoverable.
    fn next_packet(&mut self) -> Result<Packet>;

    /// Seek, as precisely as possible, to the `TimeStamp` requested.
    ///
    /// After a seek, all decoders consuming packets from this reader should be reset.
    fn seek(&mut self, to: SeekTo) -> Result<SeekedTo>;

    /// Destroys the `FormatReader` and returns the underlying media source stream.
    fn into_inner(self) -> MediaSourceStream;
}

/// A `Packet` contains a discrete amount of encoded data for a single codec bitstream. The exact
/// amount of data is bounded, but not defined, and is dependant on the container and/or the
/// encapsulated codec.
#[derive(Clone)]
pub struct Packet {
    /// The track id.
    track_id: u32,
    /// The timestamp of the packet in `TimeBase` units.
    pub ts: TimeStamp,
    /// The duration of the packet in `TimeBase` units.
    pub dur: u64,
    /// The packet buffer.
    pub data: Box<[u8]>,
}

impl Packet {
    /// Create a new `Packet` from a slice.
    pub fn new_from_slice(track_id: u32, ts: TimeStamp, dur: u64, buf: &[u8]) -> Self {
        Packet { track_id, ts, dur, data: Box::from(buf) }
    }

    /// Create a new `Packet` from a boxed slice.
    pub fn new_from_boxed_slice(track_id: u32, ts: TimeStamp, dur: u64, data: Box<[u8]>) -> Self {
        Packet { track_id, ts, dur, data }
    }

    /// The track identifier of the track this packet belongs to.
    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    /// Get the timestamp of the packet in `TimeBase` units.
    pub fn ts(&self) -> TimeStamp {
        self.ts
    }

    /// Get the duration of the packet in `TimeBase` units.
    pub fn dur(&self) -> u64 {
        self.dur
    }

    /// Get an immutable slice to the packet buffer.
    pub fn buf(&self) -> &[u8] {
        &self.data
    }
}
