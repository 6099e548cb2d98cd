//! Channel isolation filter for interleaved stereo f32 byte streams
//!
//! Wraps a `Read + Seek` source of native-endian stereo f32 frames and
//! silences one channel as bytes are read, so each of two players can carry
//! a single side of the same source and be volume-controlled on its own.

use std::io::{self, Read, Seek, SeekFrom};

/// Bytes in one stereo f32 frame: 4 bytes left + 4 bytes right
pub const FRAME_SIZE: usize = 8;

/// Bytes in one f32 sample
pub const SAMPLE_SIZE: usize = 4;

/// Which stereo channel survives the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    /// Byte range inside a frame that gets zeroed when this channel is kept
    #[inline]
    fn silenced_range(self) -> std::ops::Range<usize> {
        match self {
            Channel::Left => SAMPLE_SIZE..FRAME_SIZE,
            Channel::Right => 0..SAMPLE_SIZE,
        }
    }
}

/// Zero the unwanted channel of every complete frame in `buf`.
///
/// A trailing partial frame (1-7 bytes) is left untouched.
pub fn isolate_frames(buf: &mut [u8], keep: Channel) {
    let silenced = keep.silenced_range();
    for frame in buf.chunks_exact_mut(FRAME_SIZE) {
        frame[silenced.clone()].fill(0);
    }
}

/// Stream adapter that passes only one stereo channel through
///
/// Reads assume the inner stream hands back frame-aligned data. A read that
/// ends mid-frame leaves that partial frame unmodified, and the bytes of the
/// same frame delivered by the next read are treated as the start of a new
/// frame.
#[derive(Debug)]
pub struct ChannelIsolation<R> {
    inner: R,
    keep: Channel,
}

impl<R> ChannelIsolation<R> {
    pub fn new(inner: R, keep: Channel) -> Self {
        Self { inner, keep }
    }

    /// The channel this filter lets through
    pub fn keep(&self) -> Channel {
        self.keep
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ChannelIsolation<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        isolate_frames(&mut buf[..n], self.keep);
        Ok(n)
    }
}

impl<R: Seek> Seek for ChannelIsolation<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
