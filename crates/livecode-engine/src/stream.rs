//! Checked block transfers over raw byte streams.
//!
//! Each wrapper owns its stream handle plus one byte buffer sized to a block,
//! so the hot loop does not allocate.

use std::io::{ErrorKind, Read, Write};

use crate::block::{decode_samples, encode_samples};
use crate::error::{Direction, StreamError};
use crate::StreamConfig;

pub struct BlockReader<R> {
    inner: R,
    bytes: Vec<u8>,
}

impl<R: Read> BlockReader<R> {
    pub fn new(inner: R, cfg: &StreamConfig) -> Self {
        Self { inner, bytes: vec![0; cfg.bytes_per_block()] }
    }

    /// Fill `samples` with exactly one block.
    ///
    /// `samples` is only written once the whole block has arrived, so it is
    /// left untouched on every error path.
    pub fn read_block(&mut self, samples: &mut [f32]) -> Result<(), StreamError> {
        let expected = self.bytes.len();
        let mut filled = 0;
        while filled < expected {
            match self.inner.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::io(Direction::Read, e)),
            }
        }
        if filled == 0 {
            return Err(StreamError::EndOfStream);
        }
        if filled < expected {
            return Err(StreamError::IncompleteTransfer {
                direction: Direction::Read,
                expected,
                actual: filled,
            });
        }
        decode_samples(&self.bytes, samples);
        Ok(())
    }
}

pub struct BlockWriter<W> {
    inner: W,
    bytes: Vec<u8>,
}

impl<W: Write> BlockWriter<W> {
    pub fn new(inner: W, cfg: &StreamConfig) -> Self {
        Self { inner, bytes: vec![0; cfg.bytes_per_block()] }
    }

    /// Write one whole block and flush it downstream.
    pub fn write_block(&mut self, samples: &[f32]) -> Result<(), StreamError> {
        encode_samples(samples, &mut self.bytes);
        let expected = self.bytes.len();
        let mut written = 0;
        while written < expected {
            match self.inner.write(&self.bytes[written..]) {
                Ok(0) => {
                    return Err(StreamError::IncompleteTransfer {
                        direction: Direction::Write,
                        expected,
                        actual: written,
                    })
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::io(Direction::Write, e)),
            }
        }
        self.inner
            .flush()
            .map_err(|e| StreamError::io(Direction::Write, e))
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{from_bytes, to_bytes};
    use std::io::{self, Cursor};

    fn tiny() -> StreamConfig {
        StreamConfig::new(2, 2).unwrap()
    }

    /// Hands out at most `step` bytes per read, interrupting once up front.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        step: usize,
        interrupted: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            let n = buf.len().min(self.step);
            self.data.read(&mut buf[..n])
        }
    }

    /// Accepts `budget` bytes, then reports a zero-length write.
    struct Cramped {
        out: Vec<u8>,
        budget: usize,
    }

    impl Write for Cramped {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.budget);
            self.budget -= n;
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::Other, "device gone"))
        }
    }

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn reads_block_delivered_in_pieces() {
        let input = [0.1, 0.2, 0.3, 0.4];
        let mut reader = BlockReader::new(
            Trickle { data: Cursor::new(to_bytes(&input)), step: 3, interrupted: false },
            &tiny(),
        );
        let mut samples = [0.0; 4];
        reader.read_block(&mut samples).unwrap();
        assert_eq!(samples, input);
    }

    #[test]
    fn empty_stream_is_end_of_stream() {
        let mut reader = BlockReader::new(Cursor::new(Vec::new()), &tiny());
        let mut samples = [0.0; 4];
        assert!(matches!(reader.read_block(&mut samples), Err(StreamError::EndOfStream)));
    }

    #[test]
    fn trailing_partial_block_is_incomplete_and_not_decoded() {
        let mut bytes = to_bytes(&[0.5; 4]);
        bytes.extend_from_slice(&to_bytes(&[0.9])[..]);
        let mut reader = BlockReader::new(Cursor::new(bytes), &tiny());
        let mut samples = [0.0; 4];
        reader.read_block(&mut samples).unwrap();

        let mut fresh = [7.0; 4];
        match reader.read_block(&mut fresh) {
            Err(StreamError::IncompleteTransfer { direction, expected, actual }) => {
                assert_eq!(direction, Direction::Read);
                assert_eq!(expected, 16);
                assert_eq!(actual, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fresh, [7.0; 4]);
    }

    #[test]
    fn read_error_is_reported_as_io() {
        let mut reader = BlockReader::new(Broken, &tiny());
        let mut samples = [0.0; 4];
        assert!(matches!(
            reader.read_block(&mut samples),
            Err(StreamError::Io { direction: Direction::Read, .. })
        ));
    }

    #[test]
    fn writes_whole_block() {
        let mut writer = BlockWriter::new(Vec::new(), &tiny());
        writer.write_block(&[1.0, -1.0, 0.0, 0.5]).unwrap();
        let out = writer.into_inner();
        assert_eq!(out.len(), 16);
        assert_eq!(from_bytes(&out), vec![1.0, -1.0, 0.0, 0.5]);
    }

    #[test]
    fn short_write_is_incomplete() {
        let mut writer = BlockWriter::new(Cramped { out: Vec::new(), budget: 10 }, &tiny());
        match writer.write_block(&[0.0; 4]) {
            Err(StreamError::IncompleteTransfer { direction, expected, actual }) => {
                assert_eq!(direction, Direction::Write);
                assert_eq!(expected, 16);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn write_error_is_reported_as_io() {
        let mut writer = BlockWriter::new(Broken, &tiny());
        assert!(matches!(
            writer.write_block(&[0.0; 4]),
            Err(StreamError::Io { direction: Direction::Write, .. })
        ));
    }
}
