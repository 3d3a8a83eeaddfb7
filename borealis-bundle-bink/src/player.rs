// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Instant;

use borealis_core::codecs::{VideoDecoder, VideoDecoderOptions};
use borealis_core::errors::{unsupported_error, Result};
use borealis_core::formats::FormatReader;
use borealis_core::units::TimeBase;
use borealis_core::video::BgraBuffer;

use log::debug;

use crate::decoder::BinkDecoder;
use crate::demuxer::{BinkReader, VIDEO_TRACK_ID};

/// A monotonic millisecond clock. The player never reads the system time itself; the embedding
/// application decides what clock playback follows.
pub trait TimeSource {
    /// The current time in milliseconds. Must be monotonic.
    fn now_ms(&self) -> u64;
}

/// A `TimeSource` backed by [`std::time::Instant`].
pub struct InstantClock {
    epoch: Instant,
}

impl InstantClock {
    pub fn new() -> InstantClock {
        InstantClock { epoch: Instant::now() }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        InstantClock::new()
    }
}

impl TimeSource for InstantClock {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// Frames are reported due slightly ahead of their exact time to absorb scheduling jitter.
const FRAME_SLACK_MS: u64 = 11;

/// Paces a Bink stream against a wall clock, decoding one frame per call once due.
///
/// The player is cooperative: the embedding application polls [`got_time`](BinkPlayer::got_time)
/// and [`process_data`](BinkPlayer::process_data); there is no internal thread. Abandoning the
/// player between calls cancels playback.
pub struct BinkPlayer<C: TimeSource> {
    reader: BinkReader,
    decoder: BinkDecoder,
    clock: C,
    frame_rate: TimeBase,
    n_frames: u64,
    cur_frame: u64,
    started: bool,
    start_time: u64,
    finished: bool,
}

impl<C: TimeSource> BinkPlayer<C> {
    /// Builds a player over an opened container, instantiating the video decoder from the
    /// reader's video track.
    pub fn try_new(reader: BinkReader, clock: C) -> Result<BinkPlayer<C>> {
        let video_params = match reader
            .tracks()
            .iter()
            .find(|track| track.id == VIDEO_TRACK_ID)
            .and_then(|track| track.codec_params.video())
        {
            Some(params) => params.clone(),
            None => return unsupported_error("bink: no video track"),
        };

        let decoder = BinkDecoder::try_new(&video_params, &VideoDecoderOptions::default())?;

        let frame_rate = match video_params.frame_rate {
            Some(tb) => tb,
            None => return unsupported_error("bink: missing frame rate"),
        };

        let n_frames = video_params.n_frames.unwrap_or(0);

        Ok(BinkPlayer {
            reader,
            decoder,
            clock,
            frame_rate,
            n_frames,
            cur_frame: 0,
            started: false,
            start_time: 0,
            finished: false,
        })
    }

    /// True once every frame has been decoded.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// The number of frames decoded so far.
    pub fn current_frame(&self) -> u64 {
        self.cur_frame
    }

    /// Gets the decoder, e.g. to access the last decoded frame.
    pub fn decoder(&self) -> &BinkDecoder {
        &self.decoder
    }

    /// True while there is still time left before the next frame is due.
    pub fn got_time(&self) -> bool {
        let now = self.clock.now_ms();
        let start = if self.started { self.start_time } else { now };

        let due = self.frame_rate.calc_time_ms(self.cur_frame);

        now - start + FRAME_SLACK_MS < due
    }

    /// Decodes the next frame once it is due, returning the frame when one was produced.
    ///
    /// Returns `None` without doing work when the next frame is not due yet, or when playback
    /// has finished.
    pub fn process_data(&mut self) -> Result<Option<&BgraBuffer>> {
        let now = self.clock.now_ms();

        if !self.started {
            self.start_time = now;
            self.started = true;
        }

        if now - self.start_time < self.frame_rate.calc_time_ms(self.cur_frame) {
            return Ok(None);
        }

        if self.cur_frame >= self.n_frames {
            self.finished = true;
            return Ok(None);
        }

        loop {
            let packet = self.reader.next_packet()?;

            if packet.track_id() == VIDEO_TRACK_ID {
                self.decoder.decode(&packet)?;
                self.cur_frame += 1;

                debug!("bink: frame {} / {}", self.cur_frame, self.n_frames);

                return Ok(self.decoder.last_decoded());
            }

            // Audio packets are carried for a future audio decoder; the player has nowhere to
            // route them yet.
        }
    }
}
