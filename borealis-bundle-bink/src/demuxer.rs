// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::SeekFrom;

use borealis_core::codecs::{
    AudioCodecParameters, CodecParameters, VideoCodecParameters, CODEC_ID_BINK_AUDIO,
    CODEC_ID_BINK_VIDEO,
};
use borealis_core::errors::{
    decode_error, end_of_stream_error, limit_error, seek_error, unsupported_error, Result,
    SeekErrorKind,
};
use borealis_core::formats::{FormatOptions, FormatReader, Packet, SeekTo, SeekedTo, Track};
use borealis_core::io::{MediaSourceStream, ReadBytes, SeekableStream};
use borealis_core::units::TimeBase;

use log::debug;

use crate::common::{AudioTrackInfo, BinkHeader, BinkVersion, FrameRecord};

/// The track id of the video bitstream. Audio tracks follow with ids 1..=n.
pub const VIDEO_TRACK_ID: u32 = 0;

/// Demuxing state within one frame.
struct FrameState {
    /// Bytes of the frame not yet handed out.
    remaining: u32,
    /// The next audio track whose packet has not been read yet.
    next_audio: usize,
}

/// Bink container demuxer.
///
/// `BinkReader` implements a demuxer for the Bink video container, revisions `BIKf` through
/// `BIKi`. Every frame yields one packet per audio track (when present) followed by one video
/// packet.
pub struct BinkReader {
    reader: MediaSourceStream,
    tracks: Vec<Track>,
    header: BinkHeader,
    next_frame: usize,
    frame_state: Option<FrameState>,
}

impl BinkReader {
    /// Gets the parsed container header.
    pub fn header(&self) -> &BinkHeader {
        &self.header
    }
}

fn read_header(source: &mut MediaSourceStream) -> Result<BinkHeader> {
    let id = source.read_be_u32()?;

    let version = match BinkVersion::from_fourcc(id) {
        Some(version) => version,
        None => return unsupported_error("bink: unknown fourcc"),
    };

    let file_size = u64::from(source.read_u32()?) + 8;
    let frame_count = source.read_u32()?;
    let largest_frame_size = source.read_u32()?;

    if u64::from(largest_frame_size) > file_size {
        return decode_error("bink: largest frame size greater than file size");
    }
    if frame_count == 0 {
        return decode_error("bink: no frames");
    }
    if frame_count > 1_000_000 {
        return limit_error("bink: too many frames");
    }

    source.ignore_bytes(4)?;

    let width = source.read_u32()?;
    let height = source.read_u32()?;

    if width == 0 || height == 0 || width > 7680 || height > 7680 {
        return decode_error("bink: invalid video dimensions");
    }

    let fps_num = source.read_u32()?;
    let fps_den = source.read_u32()?;

    if fps_num == 0 || fps_den == 0 {
        return decode_error("bink: invalid frame rate");
    }

    let video_flags = source.read_u32()?;

    let audio_track_count = source.read_u32()?;
    if audio_track_count > 256 {
        return limit_error("bink: too many audio tracks");
    }

    let mut audio_tracks = Vec::with_capacity(audio_track_count as usize);
    if audio_track_count > 0 {
        source.ignore_bytes(4 * u64::from(audio_track_count))?;

        for _ in 0..audio_track_count {
            let sample_rate = source.read_u16()?;
            let flags = source.read_u16()?;
            audio_tracks.push(AudioTrackInfo { sample_rate, flags });
        }

        source.ignore_bytes(4 * u64::from(audio_track_count))?;
    }

    // The frame index: the low bit of each offset is the keyframe flag.
    let mut frames: Vec<FrameRecord> = Vec::with_capacity(frame_count as usize);
    for _ in 0..frame_count {
        let raw = source.read_u32()?;

        let offset = u64::from(raw & !1);
        let keyframe = raw & 1 == 1;

        if let Some(prev) = frames.last_mut() {
            if offset <= prev.offset {
                return decode_error("bink: frame offsets not increasing");
            }
            prev.size = (offset - prev.offset) as u32;
        }

        frames.push(FrameRecord { offset, size: 0, keyframe });
    }

    // The last frame extends to the end of the file.
    let end = source.byte_len().unwrap_or(file_size);
    if let Some(last) = frames.last_mut() {
        if end < last.offset {
            return decode_error("bink: frame offsets past end of stream");
        }
        last.size = (end - last.offset) as u32;
    }

    Ok(BinkHeader {
        version,
        width,
        height,
        frame_rate: TimeBase::new(fps_den, fps_num),
        largest_frame_size,
        video_flags,
        audio_tracks,
        frames,
    })
}

impl FormatReader for BinkReader {
    fn try_new(mut source: MediaSourceStream, _options: &FormatOptions) -> Result<Self> {
        let header = read_header(&mut source)?;

        let mut video_params = VideoCodecParameters::new();

        video_params
            .for_codec(CODEC_ID_BINK_VIDEO)
            .with_profile(header.version.profile())
            .with_width(header.width)
            .with_height(header.height)
            .with_frame_rate(header.frame_rate)
            .with_n_frames(header.frames.len() as u64)
            .with_extra_data(Box::new(header.video_flags.to_le_bytes()));

        let mut tracks = vec![Track::new(VIDEO_TRACK_ID, CodecParameters::Video(video_params))];

        for (i, audio) in header.audio_tracks.iter().enumerate() {
            let mut params = AudioCodecParameters::new();

            params
                .for_codec(CODEC_ID_BINK_AUDIO)
                .with_sample_rate(u32::from(audio.sample_rate))
                .with_flags(u32::from(audio.flags));

            tracks.push(Track::new(i as u32 + 1, CodecParameters::Audio(params)));
        }

        debug!(
            "bink: {}x{}, {} frames, {} audio tracks",
            header.width,
            header.height,
            header.frames.len(),
            header.audio_tracks.len()
        );

        Ok(BinkReader { reader: source, tracks, header, next_frame: 0, frame_state: None })
    }

    fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn next_packet(&mut self) -> Result<Packet> {
        loop {
            let state = match self.frame_state.as_mut() {
                Some(state) => state,
                None => {
                    if self.next_frame >= self.header.frames.len() {
                        return end_of_stream_error();
                    }

                    let frame = self.header.frames[self.next_frame];
                    self.reader.seek(SeekFrom::Start(frame.offset))?;

                    self.frame_state = Some(FrameState { remaining: frame.size, next_audio: 0 });
                    continue;
                }
            };

            let ts = self.next_frame as u64;

            if state.next_audio < self.header.audio_tracks.len() {
                let track_id = state.next_audio as u32 + 1;
                state.next_audio += 1;

                let packet_len = self.reader.read_u32()?;

                if u64::from(state.remaining) < u64::from(packet_len) + 4 {
                    return decode_error("bink: audio packet too big for the frame");
                }
                state.remaining -= packet_len + 4;

                if packet_len >= 4 {
                    let sample_count = self.reader.read_u32()?;
                    let payload = self.reader.read_boxed_slice_exact(packet_len as usize - 4)?;

                    debug!(
                        "bink: audio packet, track {}, {} samples, {} bytes",
                        track_id,
                        sample_count,
                        payload.len()
                    );

                    return Ok(Packet::new_from_boxed_slice(track_id, ts, 1, payload));
                }
                else if packet_len > 0 {
                    self.reader.ignore_bytes(u64::from(packet_len))?;
                }

                // A degenerate audio packet yields nothing; move on to the next track.
                continue;
            }

            // The residual frame bytes are the video packet.
            let data = self.reader.read_boxed_slice_exact(state.remaining as usize)?;

            self.next_frame += 1;
            self.frame_state = None;

            return Ok(Packet::new_from_boxed_slice(VIDEO_TRACK_ID, ts, 1, data));
        }
    }

    fn seek(&mut self, _to: SeekTo) -> Result<SeekedTo> {
        // Bink is decoded strictly forward: every frame may reference the previous one and the
        // container carries no recovery points beyond the keyframe flags.
        seek_error(SeekErrorKind::Unseekable)
    }

    fn into_inner(self) -> MediaSourceStream {
        self.reader
    }
}
