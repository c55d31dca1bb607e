use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which half of a block transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => f.write_str("read"),
            Direction::Write => f.write_str("write"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("block size must be at least one frame")]
    ZeroBlockFrames,
    #[error("channel count must be at least one")]
    ZeroChannels,
    #[error("block of {block_frames} frames x {channels} channels does not fit in memory")]
    BlockTooLarge { block_frames: usize, channels: usize },
    #[error("chain prepared for {chain} channels but stream carries {config}")]
    ChannelMismatch { config: usize, chain: usize },
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("incomplete {direction}: expected {expected} bytes, transferred {actual}")]
    IncompleteTransfer {
        direction: Direction,
        expected: usize,
        actual: usize,
    },
    #[error("end of stream")]
    EndOfStream,
    #[error("{direction} failed: {source}")]
    Io {
        direction: Direction,
        #[source]
        source: io::Error,
    },
}

impl StreamError {
    pub(crate) fn io(direction: Direction, source: io::Error) -> Self {
        Self::Io { direction, source }
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("child process was started without piped stdin/stdout")]
    MissingPipe,
    #[error("failed to watch program file: {0}")]
    Watch(#[from] notify::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_transfer_names_direction_and_sizes() {
        let err = StreamError::IncompleteTransfer {
            direction: Direction::Read,
            expected: 8192,
            actual: 100,
        };
        assert_eq!(
            err.to_string(),
            "incomplete read: expected 8192 bytes, transferred 100"
        );
    }

    #[test]
    fn io_error_keeps_source() {
        let err = StreamError::io(
            Direction::Write,
            io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"),
        );
        assert_eq!(err.to_string(), "write failed: pipe closed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
