// Borealis
// Copyright (c) 2026 The Borealis Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io;
use std::io::{Read, Seek, SeekFrom};

use crate::errors::Result;

use super::{MediaSource, ReadBytes, SeekableStream};

/// `MediaSourceStreamOptions` specifies the buffering behaviour of a `MediaSourceStream`.
pub struct MediaSourceStreamOptions {
    /// The read-ahead buffer size in bytes.
    pub buffer_len: usize,
}

impl Default for MediaSourceStreamOptions {
    fn default() -> Self {
        MediaSourceStreamOptions { buffer_len: 64 * 1024 }
    }
}

/// A `MediaSourceStream` is the common `Read`er type for Borealis. By using type erasure and
/// dynamic dispatch, `MediaSourceStream` wraps and hides the inner reader from the consumer,
/// allowing any typical `Read`er to be used in a generic way, selectable at runtime.
///
/// Reads are buffered through a [`std::io::BufReader`] to amortize system call and dynamic
/// dispatch overhead, and the absolute stream position is tracked so demuxers can account for
/// every byte without querying the source.
pub struct MediaSourceStream {
    /// The source reader.
    inner: io::BufReader<Box<dyn MediaSource>>,
    /// Absolute position of the stream.
    pos: u64,
    /// The total length of the source in bytes, if known. Cached at instantiation.
    len: Option<u64>,
    /// True if the source supports seeking. Cached at instantiation.
    is_seekable: bool,
}

impl MediaSourceStream {
    pub fn new(source: Box<dyn MediaSource>, options: MediaSourceStreamOptions) -> Self {
        let len = source.byte_len();
        let is_seekable = source.is_seekable();

        MediaSourceStream {
            inner: io::BufReader::with_capacity(options.buffer_len, source),
            pos: 0,
            len,
            is_seekable,
        }
    }

    /// Returns if the underlying source is seekable.
    pub fn is_seekable(&self) -> bool {
        self.is_seekable
    }
}

impl ReadBytes for MediaSourceStream {
    #[inline(always)]
    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_buf_exact(&mut buf)?;
        Ok(buf[0])
    }

    #[inline(always)]
    fn read_double_bytes(&mut self) -> Result<[u8; 2]> {
        let mut buf = [0u8; 2];
        self.read_buf_exact(&mut buf)?;
        Ok(buf)
    }

    #[inline(always)]
    fn read_quad_bytes(&mut self) -> Result<[u8; 4]> {
        let mut buf = [0u8; 4];
        self.read_buf_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn ignore_bytes(&mut self, count: u64) -> Result<()> {
        if self.is_seekable {
            self.seek(SeekFrom::Current(count as i64))?;
        }
        else {
            let mut remaining = count;
            let mut sink = [0u8; 1024];

            while remaining > 0 {
                let len = remaining.min(sink.len() as u64) as usize;
                self.read_buf_exact(&mut sink[..len])?;
                remaining -= len as u64;
            }
        }
        Ok(())
    }

    #[inline(always)]
    fn pos(&self) -> u64 {
        self.pos
    }
}

impl SeekableStream for MediaSourceStream {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        // Resolve relative seeks against the tracked position, since the BufReader's inner
        // position is ahead of the consumed position by the length of its buffer.
        let target = match pos {
            SeekFrom::Current(delta) => {
                SeekFrom::Start((self.pos as i64 + delta).max(0) as u64)
            }
            other => other,
        };

        self.pos = self.inner.seek(target)?;
        Ok(self.pos)
    }

    fn byte_len(&self) -> Option<u64> {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, SeekFrom};

    use super::{MediaSourceStream, MediaSourceStreamOptions};
    use crate::io::{ReadBytes, SeekableStream};

    fn make_stream(data: Vec<u8>) -> MediaSourceStream {
        MediaSourceStream::new(Box::new(Cursor::new(data)), MediaSourceStreamOptions::default())
    }

    #[test]
    fn verify_endian_reads() {
        let mut mss = make_stream(vec![0x42, 0x49, 0x4b, 0x66, 0x10, 0x00, 0x00, 0x00]);

        assert_eq!(mss.read_be_u32().unwrap(), 0x42494b66);
        assert_eq!(mss.read_u32().unwrap(), 0x10);
        assert_eq!(mss.pos(), 8);
    }

    #[test]
    fn verify_position_tracking() {
        let mut mss = make_stream((0u8..64).collect());

        assert_eq!(mss.read_byte().unwrap(), 0);
        mss.ignore_bytes(10).unwrap();
        assert_eq!(mss.pos(), 11);
        assert_eq!(mss.read_byte().unwrap(), 11);

        mss.seek(SeekFrom::Start(32)).unwrap();
        assert_eq!(mss.pos(), 32);
        assert_eq!(mss.read_byte().unwrap(), 32);

        assert_eq!(mss.byte_len(), Some(64));
    }

    #[test]
    fn verify_end_of_stream() {
        let mut mss = make_stream(vec![0x01]);

        assert_eq!(mss.read_byte().unwrap(), 1);
        assert!(mss.read_byte().is_err());
    }
}
