pub mod block;
pub mod dsp;
pub mod error;
pub mod graph;
pub mod host;
pub mod processor;
pub mod stream;

pub use block::Block;
pub use error::{ConfigError, Direction, HostError, StreamError};
pub use graph::Chain;
pub use processor::{Breaker, Processor, RunSummary, Termination};

/// Frames per block expected by a livecode program unless told otherwise.
pub const DEFAULT_BLOCK_FRAMES: usize = 1024;
/// Interleaved channels per frame (left/right).
pub const DEFAULT_CHANNELS: usize = 2;
/// Width of one native-endian f32 sample on the wire.
pub const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// Shape of the raw sample stream. Both sides of the pipe must agree on it;
/// the bytes themselves carry no header to check against.
///
/// Only constructed through [`StreamConfig::new`] or `Default`, so every
/// value in circulation has passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    block_frames: usize,
    channels: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            block_frames: DEFAULT_BLOCK_FRAMES,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl StreamConfig {
    pub fn new(block_frames: usize, channels: usize) -> Result<Self, ConfigError> {
        let cfg = Self { block_frames, channels };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_frames == 0 {
            return Err(ConfigError::ZeroBlockFrames);
        }
        if self.channels == 0 {
            return Err(ConfigError::ZeroChannels);
        }
        self.block_frames
            .checked_mul(self.channels)
            .and_then(|n| n.checked_mul(SAMPLE_BYTES))
            .filter(|&n| n <= isize::MAX as usize)
            .map(|_| ())
            .ok_or(ConfigError::BlockTooLarge {
                block_frames: self.block_frames,
                channels: self.channels,
            })
    }

    pub fn block_frames(&self) -> usize {
        self.block_frames
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples_per_block(&self) -> usize {
        self.block_frames * self.channels
    }

    pub fn bytes_per_block(&self) -> usize {
        self.samples_per_block() * SAMPLE_BYTES
    }
}
