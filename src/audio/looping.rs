//! Endless reader over decoded PCM bytes

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// Reads the same PCM buffer over and over
///
/// Each instance keeps its own cursor, so several loops can share one decoded
/// buffer and still be read and sought independently. Reads wrap around the
/// end of the buffer and fill the whole destination, which keeps them
/// frame-aligned whenever the destination length is.
#[derive(Debug, Clone)]
pub struct InfiniteLoop {
    data: Arc<[u8]>,
    pos: usize,
}

impl InfiniteLoop {
    pub fn new(data: Arc<[u8]>) -> Self {
        Self { data, pos: 0 }
    }

    /// Length of one loop iteration in bytes
    pub fn loop_len(&self) -> usize {
        self.data.len()
    }

    /// Cursor position within the current iteration
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Read for InfiniteLoop {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.data.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        while written < buf.len() {
            let available = self.data.len() - self.pos;
            let count = available.min(buf.len() - written);
            buf[written..written + count].copy_from_slice(&self.data[self.pos..self.pos + count]);
            written += count;
            self.pos = (self.pos + count) % self.data.len();
        }
        Ok(written)
    }
}

impl Seek for InfiniteLoop {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.data.len() as i128;
        let next = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.pos as i128 + delta as i128,
            SeekFrom::End(delta) => len + delta as i128,
        };

        if next < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }

        self.pos = if len == 0 { 0 } else { (next % len) as usize };
        Ok(self.pos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looped(bytes: &[u8]) -> InfiniteLoop {
        InfiniteLoop::new(Arc::from(bytes))
    }

    #[test]
    fn test_read_wraps_around() {
        let mut source = looped(&[1, 2, 3, 4]);
        let mut buf = [0u8; 10];
        assert_eq!(source.read(&mut buf).unwrap(), 10);
        assert_eq!(buf, [1, 2, 3, 4, 1, 2, 3, 4, 1, 2]);
        assert_eq!(source.position(), 2);

        let mut buf = [0u8; 3];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [3, 4, 1]);
    }

    #[test]
    fn test_empty_source_reports_eof() {
        let mut source = looped(&[]);
        assert_eq!(source.read(&mut [0u8; 8]).unwrap(), 0);
        assert_eq!(source.seek(SeekFrom::Start(5)).unwrap(), 0);
    }

    #[test]
    fn test_independent_cursors_share_data() {
        let data: Arc<[u8]> = Arc::from(&[9u8, 8, 7, 6][..]);
        let mut a = InfiniteLoop::new(Arc::clone(&data));
        let mut b = InfiniteLoop::new(data);

        let mut buf = [0u8; 3];
        a.read_exact(&mut buf).unwrap();
        assert_eq!(a.position(), 3);
        assert_eq!(b.position(), 0);

        b.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [9, 8, 7]);
    }

    #[test]
    fn test_seek_wraps_past_end() {
        let mut source = looped(&[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(source.seek(SeekFrom::Start(10)).unwrap(), 2);
        assert_eq!(source.seek(SeekFrom::Current(7)).unwrap(), 1);
        assert_eq!(source.seek(SeekFrom::End(-3)).unwrap(), 5);
        assert_eq!(source.seek(SeekFrom::Current(0)).unwrap(), 5);
    }

    #[test]
    fn test_negative_seek_is_rejected() {
        let mut source = looped(&[0, 1, 2, 3]);
        let err = source.seek(SeekFrom::Current(-1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(source.position(), 0);
    }
}
