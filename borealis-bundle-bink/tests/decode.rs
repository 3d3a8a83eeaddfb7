// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end decoding tests over synthetic in-memory containers.

use std::cell::Cell;
use std::io::Cursor;

use borealis_core::codecs::{VideoDecoder, VideoDecoderOptions};
use borealis_core::errors::Error;
use borealis_core::formats::{FormatOptions, FormatReader};
use borealis_core::io::{MediaSourceStream, MediaSourceStreamOptions};
use borealis_core::video::{PLANE_A, PLANE_U, PLANE_V, PLANE_Y};

use borealis_bundle_bink::{
    BinkDecoder, BinkPlayer, BinkReader, TimeSource, VIDEO_TRACK_ID,
};

/// Writes bit fields least-significant bit first, matching the video bitstream layout.
struct BitWriter {
    bytes: Vec<u8>,
    acc: u64,
    len: u32,
}

impl BitWriter {
    fn new() -> BitWriter {
        BitWriter { bytes: Vec::new(), acc: 0, len: 0 }
    }

    fn put(&mut self, value: u32, count: u32) {
        self.acc |= u64::from(value) << self.len;
        self.len += count;

        while self.len >= 8 {
            self.bytes.push((self.acc & 0xff) as u8);
            self.acc >>= 8;
            self.len -= 8;
        }
    }

    /// Pads with zero bits up to the next 32-bit boundary, as plane data requires.
    fn align32(&mut self) {
        let pos = self.bytes.len() as u32 * 8 + self.len;
        let rem = pos & 0x1f;
        if rem != 0 {
            let mut pad = 32 - rem;
            while pad > 0 {
                let chunk = pad.min(24);
                self.put(0, chunk);
                pad -= chunk;
            }
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.len > 0 {
            self.bytes.push((self.acc & 0xff) as u8);
        }
        self.bytes
    }
}

/// The segment count prefix width used by the decoder for a given scale term.
fn count_len(v: u32) -> u32 {
    32 - (v + 511).leading_zeros()
}

/// Count prefix widths for one plane of a video whose plane width is `pw` (clamped to 8) and
/// whose block width is `bw`.
struct CountLens {
    block_types: u32,
    sub_block_types: u32,
    colors: u32,
    pattern: u32,
    motion: u32,
    dc: u32,
    run: u32,
}

impl CountLens {
    fn new(pw: u32, bw: u32) -> CountLens {
        let pw = pw.max(8);
        CountLens {
            block_types: count_len(pw >> 3),
            sub_block_types: count_len(pw >> 4),
            colors: count_len((pw >> 3) * 64),
            pattern: count_len(bw << 3),
            motion: count_len(pw >> 3),
            dc: count_len(pw >> 3),
            run: count_len((pw >> 3) * 48),
        }
    }
}

/// Inverts the colour sign fold: returns the raw coded byte whose decoded value is `decoded`.
fn inv_fold_color(decoded: u8) -> u8 {
    if decoded >= 0x80 {
        decoded - 0x80
    }
    else if decoded == 0 {
        0x80
    }
    else {
        (0x100 - u16::from(decoded)) as u8
    }
}

/// Writes the per-plane Huffman selectors, picking the identity (raw nibble) mapping for every
/// bundle including the sixteen colour high-nibble selectors.
fn write_identity_selectors(w: &mut BitWriter) {
    w.put(0, 4); // block types
    w.put(0, 4); // sub-block types
    for _ in 0..16 {
        w.put(0, 4); // colour high-nibble selectors
    }
    w.put(0, 4); // colours
    w.put(0, 4); // pattern
    w.put(0, 4); // x offsets
    w.put(0, 4); // y offsets
    w.put(0, 4); // runs
}

/// The per-row bundle payloads of a single-row plane, as `(count, bit fields)` per bundle.
/// Absent bundles write a zero count.
#[derive(Default)]
struct RowBundles {
    block_types: Option<(u32, Vec<(u32, u32)>)>,
    sub_block_types: Option<(u32, Vec<(u32, u32)>)>,
    colors: Option<(u32, Vec<(u32, u32)>)>,
    pattern: Option<(u32, Vec<(u32, u32)>)>,
}

/// Writes one single-row plane: identity selectors, the row's bundle segments, then 32-bit
/// alignment padding.
fn write_plane(w: &mut BitWriter, lens: &CountLens, row: &RowBundles) {
    write_identity_selectors(w);

    let segments: [(&Option<(u32, Vec<(u32, u32)>)>, u32); 4] = [
        (&row.block_types, lens.block_types),
        (&row.sub_block_types, lens.sub_block_types),
        (&row.colors, lens.colors),
        (&row.pattern, lens.pattern),
    ];

    for (segment, count_bits) in segments.iter() {
        match segment {
            Some((count, fields)) => {
                w.put(*count, *count_bits);
                for &(value, bits) in fields.iter() {
                    w.put(value, bits);
                }
            }
            None => w.put(0, *count_bits),
        }
    }

    w.put(0, lens.motion); // x offsets
    w.put(0, lens.motion); // y offsets
    w.put(0, lens.dc); // intra DC
    w.put(0, lens.dc); // inter DC
    w.put(0, lens.run); // runs

    w.align32();
}

/// A single-row plane holding one broadcast block type and nothing else: used for Skip planes.
fn skip_plane(w: &mut BitWriter, lens: &CountLens) {
    let row = RowBundles {
        block_types: Some((1, vec![(1, 1), (0, 4)])),
        ..Default::default()
    };
    write_plane(w, lens, &row);
}

/// Assembles a complete container around per-frame video packets and optional audio packets.
///
/// `audio_tracks` carries `(sample_rate, flags)` per track; `audio_packets[frame][track]` is
/// `(sample_count, payload)`.
fn write_container(
    fourcc: &[u8; 4],
    width: u32,
    height: u32,
    fps: (u32, u32),
    video_flags: u32,
    audio_tracks: &[(u16, u16)],
    audio_packets: &[Vec<(u32, Vec<u8>)>],
    video_packets: &[Vec<u8>],
) -> Vec<u8> {
    let n_tracks = audio_tracks.len();
    let n_frames = video_packets.len();

    // Frame payloads: audio packet envelopes followed by the video packet.
    let mut frames: Vec<Vec<u8>> = Vec::new();
    for (i, video) in video_packets.iter().enumerate() {
        let mut frame = Vec::new();

        for track in 0..n_tracks {
            let (sample_count, payload) = &audio_packets[i][track];
            let packet_len = payload.len() as u32 + 4;

            frame.extend_from_slice(&packet_len.to_le_bytes());
            frame.extend_from_slice(&sample_count.to_le_bytes());
            frame.extend_from_slice(payload);
        }

        frame.extend_from_slice(video);
        frames.push(frame);
    }

    let header_len = 44 + 12 * n_tracks + 4 * n_frames;
    let total_len: usize = header_len + frames.iter().map(|f| f.len()).sum::<usize>();
    let largest = frames.iter().map(|f| f.len()).max().unwrap_or(0) as u32;

    let mut out = Vec::with_capacity(total_len);

    out.extend_from_slice(fourcc);
    out.extend_from_slice(&((total_len as u32) - 8).to_le_bytes());
    out.extend_from_slice(&(n_frames as u32).to_le_bytes());
    out.extend_from_slice(&largest.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&fps.0.to_le_bytes());
    out.extend_from_slice(&fps.1.to_le_bytes());
    out.extend_from_slice(&video_flags.to_le_bytes());
    out.extend_from_slice(&(n_tracks as u32).to_le_bytes());

    if n_tracks > 0 {
        out.extend_from_slice(&vec![0u8; 4 * n_tracks]);
        for (sample_rate, flags) in audio_tracks.iter() {
            out.extend_from_slice(&sample_rate.to_le_bytes());
            out.extend_from_slice(&flags.to_le_bytes());
        }
        out.extend_from_slice(&vec![0u8; 4 * n_tracks]);
    }

    let mut offset = header_len;
    for (i, frame) in frames.iter().enumerate() {
        // The first frame is a keyframe; the flag lives in the offset's low bit.
        let flagged = offset as u32 | u32::from(i == 0);
        out.extend_from_slice(&flagged.to_le_bytes());
        offset += frame.len();
    }

    for frame in frames.iter() {
        out.extend_from_slice(frame);
    }

    assert_eq!(out.len(), total_len);
    out
}

fn open_reader(data: Vec<u8>) -> borealis_core::errors::Result<BinkReader> {
    let mss = MediaSourceStream::new(
        Box::new(Cursor::new(data)),
        MediaSourceStreamOptions::default(),
    );
    BinkReader::try_new(mss, &FormatOptions::default())
}

fn make_decoder(reader: &BinkReader) -> BinkDecoder {
    let params = reader.tracks()[0].codec_params.video().expect("video track");
    BinkDecoder::try_new(params, &VideoDecoderOptions::default()).expect("decoder")
}

#[test]
fn reject_unknown_fourcc() {
    let mut data = b"XXXX".to_vec();
    data.extend_from_slice(&[0u8; 64]);

    match open_reader(data) {
        Err(Error::Unsupported(_)) => (),
        other => panic!("expected unsupported container, got {:?}", other.is_ok()),
    }
}

#[test]
fn reject_zero_frame_rate() {
    let video = vec![0u8; 4];
    let data = write_container(b"BIKf", 8, 8, (0, 1), 0, &[], &[], &[video]);

    match open_reader(data) {
        Err(Error::DecodeError(msg)) => assert!(msg.contains("frame rate")),
        other => panic!("expected decode error, got {:?}", other.is_ok()),
    }
}

#[test]
fn reject_non_increasing_frame_offsets() {
    let packets = vec![vec![0u8; 4], vec![0u8; 4]];
    let mut data = write_container(b"BIKf", 8, 8, (25, 1), 0, &[], &[], &packets);

    // Rewrite the second frame offset to equal the first (keyframe bit masked off by the
    // reader). The offset table starts at byte 44 in an audio-less container.
    let first = u32::from_le_bytes([data[44], data[45], data[46], data[47]]) & !1;
    data[48..52].copy_from_slice(&first.to_le_bytes());

    match open_reader(data) {
        Err(Error::DecodeError(msg)) => assert!(msg.contains("offsets")),
        other => panic!("expected decode error, got {:?}", other.is_ok()),
    }
}

/// One 8x8 frame made of a single Fill block of mid-grey, with Skip chroma planes. The video
/// bits of each plane end unaligned, so this also exercises the 32-bit plane realignment.
#[test]
fn decode_single_fill_frame() {
    let luma_lens = CountLens::new(8, 1);
    let chroma_lens = CountLens::new(4, 1);

    let mut w = BitWriter::new();

    // Luminance: one Fill block (type 7) of colour 0x80 (raw nibbles 0, 0 under the fold).
    let row = RowBundles {
        block_types: Some((1, vec![(1, 1), (7, 4)])),
        colors: Some((1, vec![(1, 1), (0, 4), (0, 4)])),
        ..Default::default()
    };
    write_plane(&mut w, &luma_lens, &row);

    // Chrominance planes are skipped: the previous frame is solid black.
    skip_plane(&mut w, &chroma_lens);
    skip_plane(&mut w, &chroma_lens);

    let data = write_container(b"BIKf", 8, 8, (25, 1), 0, &[], &[], &[w.finish()]);

    let mut reader = open_reader(data).expect("reader");
    let mut decoder = make_decoder(&reader);

    let packet = reader.next_packet().expect("video packet");
    assert_eq!(packet.track_id(), VIDEO_TRACK_ID);

    let frame = decoder.decode(&packet).expect("decode");

    // Every output pixel derives from Y = 128, U = V = 0, A = 255 under integer BT.601.
    for px in frame.bytes().chunks_exact(4) {
        assert_eq!(px, &[0, 255, 0, 255]);
    }

    let planes = decoder.last_planes().expect("planes");
    assert!(planes.plane(PLANE_Y).iter().all(|&p| p == 0x80));
    assert!(planes.plane(PLANE_U).iter().all(|&p| p == 0x00));
    assert!(planes.plane(PLANE_V).iter().all(|&p| p == 0x00));
    assert!(planes.plane(PLANE_A).iter().all(|&p| p == 0xff));

    // The container is exhausted.
    assert!(matches!(reader.next_packet(), Err(Error::EndOfStream)));
}

/// An 8x8 frame with the alpha flag set: the alpha plane is a Raw block carrying the bytes
/// 0..=63 and the colour planes are skipped.
#[test]
fn decode_alpha_raw_frame() {
    let luma_lens = CountLens::new(8, 1);
    let chroma_lens = CountLens::new(4, 1);

    let mut w = BitWriter::new();

    // Alpha plane: one Raw block (type 10) backed by 64 colour values decoding to 0..=63.
    let mut color_fields = Vec::new();
    color_fields.push((0, 1)); // per-value path
    for v in 0..64u8 {
        let raw = inv_fold_color(v);
        color_fields.push((u32::from(raw >> 4), 4));
        color_fields.push((u32::from(raw & 0xf), 4));
    }

    let alpha_row = RowBundles {
        block_types: Some((1, vec![(1, 1), (10, 4)])),
        colors: Some((64, color_fields)),
        ..Default::default()
    };
    write_plane(&mut w, &luma_lens, &alpha_row);

    skip_plane(&mut w, &luma_lens); // Y
    skip_plane(&mut w, &chroma_lens); // U
    skip_plane(&mut w, &chroma_lens); // V

    let data = write_container(
        b"BIKf",
        8,
        8,
        (25, 1),
        0x0010_0000,
        &[],
        &[],
        &[w.finish()],
    );

    let mut reader = open_reader(data).expect("reader");
    let mut decoder = make_decoder(&reader);

    let packet = reader.next_packet().expect("video packet");
    decoder.decode(&packet).expect("decode");

    let planes = decoder.last_planes().expect("planes");
    let alpha = planes.plane(PLANE_A);

    for (i, &a) in alpha[..64].iter().enumerate() {
        assert_eq!(a, i as u8);
    }
}

/// An 8x8 frame with one Pattern block: colours {0x10, 0x20} and eight 0xAA pattern bytes give
/// rows alternating 0x20, 0x10 starting with 0x20.
#[test]
fn decode_pattern_block() {
    let luma_lens = CountLens::new(8, 1);
    let chroma_lens = CountLens::new(4, 1);

    let mut w = BitWriter::new();

    let mut color_fields = vec![(0u32, 1u32)]; // per-value path
    for &c in [0x10u8, 0x20].iter() {
        let raw = inv_fold_color(c);
        color_fields.push((u32::from(raw >> 4), 4));
        color_fields.push((u32::from(raw & 0xf), 4));
    }

    // Eight pattern bytes of 0xAA, each packed as two raw nibbles, low first.
    let mut pattern_fields = Vec::new();
    for _ in 0..8 {
        pattern_fields.push((0xa, 4));
        pattern_fields.push((0xa, 4));
    }

    let row = RowBundles {
        block_types: Some((1, vec![(1, 1), (9, 4)])),
        colors: Some((2, color_fields)),
        pattern: Some((8, pattern_fields)),
        ..Default::default()
    };
    write_plane(&mut w, &luma_lens, &row);

    skip_plane(&mut w, &chroma_lens);
    skip_plane(&mut w, &chroma_lens);

    let data = write_container(b"BIKf", 8, 8, (25, 1), 0, &[], &[], &[w.finish()]);

    let mut reader = open_reader(data).expect("reader");
    let mut decoder = make_decoder(&reader);

    let packet = reader.next_packet().expect("video packet");
    decoder.decode(&packet).expect("decode");

    let planes = decoder.last_planes().expect("planes");
    let luma = planes.plane(PLANE_Y);
    let stride = planes.spec(PLANE_Y).stride;

    for row in 0..8 {
        for col in 0..8 {
            let expected = if col % 2 == 0 { 0x20 } else { 0x10 };
            assert_eq!(luma[row * stride + col], expected, "row {} col {}", row, col);
        }
    }
}

/// A `BIKi` container: plane groups are preceded by a skipped 32-bit word, colours are not
/// sign-folded, and the chroma planes arrive in V, U order.
#[test]
fn decode_biki_plane_order() {
    let luma_lens = CountLens::new(8, 1);
    let chroma_lens = CountLens::new(4, 1);

    fn fill_plane(w: &mut BitWriter, lens: &CountLens, color: u8) {
        let row = RowBundles {
            block_types: Some((1, vec![(1, 1), (7, 4)])),
            colors: Some((
                1,
                vec![(1, 1), (u32::from(color >> 4), 4), (u32::from(color & 0xf), 4)],
            )),
            ..Default::default()
        };
        write_plane(w, lens, &row);
    }

    let mut w = BitWriter::new();

    // The pre-plane word the decoder must skip.
    w.put(0xbeef, 16);
    w.put(0xdead, 16);

    fill_plane(&mut w, &luma_lens, 0x55); // Y
    fill_plane(&mut w, &chroma_lens, 0xa0); // decoded second: V
    fill_plane(&mut w, &chroma_lens, 0x0b); // decoded third: U

    let data = write_container(b"BIKi", 8, 8, (25, 1), 0, &[], &[], &[w.finish()]);

    let mut reader = open_reader(data).expect("reader");
    let mut decoder = make_decoder(&reader);

    let packet = reader.next_packet().expect("video packet");
    decoder.decode(&packet).expect("decode");

    let planes = decoder.last_planes().expect("planes");
    assert!(planes.plane(PLANE_Y).iter().all(|&p| p == 0x55));
    assert!(planes.plane(PLANE_V).iter().all(|&p| p == 0xa0));
    assert!(planes.plane(PLANE_U).iter().all(|&p| p == 0x0b));
}

/// Audio packet envelopes are split off ahead of the video packet and surfaced on their own
/// track; oversized audio packets are a hard error.
#[test]
fn demux_audio_packets() {
    let luma_lens = CountLens::new(8, 1);
    let chroma_lens = CountLens::new(4, 1);

    let mut w = BitWriter::new();
    skip_plane(&mut w, &luma_lens);
    skip_plane(&mut w, &chroma_lens);
    skip_plane(&mut w, &chroma_lens);

    let data = write_container(
        b"BIKf",
        8,
        8,
        (25, 1),
        0,
        &[(22050, 0)],
        &[vec![(2, vec![0x01, 0x02, 0x03, 0x04])]],
        &[w.finish()],
    );

    let mut reader = open_reader(data).expect("reader");
    assert_eq!(reader.tracks().len(), 2);

    let audio = reader.next_packet().expect("audio packet");
    assert_eq!(audio.track_id(), 1);
    assert_eq!(audio.buf(), &[0x01, 0x02, 0x03, 0x04]);

    let video = reader.next_packet().expect("video packet");
    assert_eq!(video.track_id(), VIDEO_TRACK_ID);
}

#[test]
fn demux_rejects_oversized_audio_packet() {
    // A frame of 8 bytes claiming a 1000-byte audio packet.
    let mut data = write_container(
        b"BIKf",
        8,
        8,
        (25, 1),
        0,
        &[(22050, 0)],
        &[vec![(0, vec![])]],
        &[vec![0u8; 4]],
    );

    // Overwrite the audio packet length field with an oversized value. The frame starts right
    // after the header: 44 bytes + 12 per track + 4 per frame.
    let frame_start = 44 + 12 + 4;
    data[frame_start..frame_start + 4].copy_from_slice(&1000u32.to_le_bytes());

    let mut reader = open_reader(data).expect("reader");
    match reader.next_packet() {
        Err(Error::DecodeError(msg)) => assert!(msg.contains("audio packet")),
        other => panic!("expected decode error, got {:?}", other.is_ok()),
    }
}

/// A scripted clock for pacing tests.
struct ScriptedClock {
    now: Cell<u64>,
}

impl ScriptedClock {
    fn new() -> ScriptedClock {
        ScriptedClock { now: Cell::new(0) }
    }
}

impl TimeSource for &ScriptedClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Two frames at 10 fps: frame 0 is due immediately, frame 1 at 100 ms.
#[test]
fn player_paces_frames() {
    let luma_lens = CountLens::new(8, 1);
    let chroma_lens = CountLens::new(4, 1);

    let mut packets = Vec::new();
    for _ in 0..2 {
        let mut w = BitWriter::new();
        skip_plane(&mut w, &luma_lens);
        skip_plane(&mut w, &chroma_lens);
        skip_plane(&mut w, &chroma_lens);
        packets.push(w.finish());
    }

    let data = write_container(b"BIKf", 8, 8, (10, 1), 0, &[], &[], &packets);

    let reader = open_reader(data).expect("reader");
    let clock = ScriptedClock::new();
    let mut player = BinkPlayer::try_new(reader, &clock).expect("player");

    // Frame 0 is due at once.
    assert!(!player.got_time());
    assert!(player.process_data().expect("frame 0").is_some());
    assert_eq!(player.current_frame(), 1);

    // Frame 1 is due at 100 ms; before that the player idles and reports spare time.
    assert!(player.got_time());
    assert!(player.process_data().expect("not due").is_none());
    assert_eq!(player.current_frame(), 1);

    // Within the 11 ms slack of the due time there is no spare time left.
    clock.now.set(95);
    assert!(!player.got_time());

    clock.now.set(100);
    assert!(player.process_data().expect("frame 1").is_some());
    assert_eq!(player.current_frame(), 2);

    // One more call past the last frame marks the stream finished.
    assert!(!player.finished());
    assert!(player.process_data().expect("end").is_none());
    assert!(player.finished());
}
