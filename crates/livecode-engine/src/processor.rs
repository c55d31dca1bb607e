use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, trace};

use crate::block::Block;
use crate::dsp::rectify::Rectify;
use crate::error::{ConfigError, StreamError};
use crate::graph::Chain;
use crate::stream::{BlockReader, BlockWriter};
use crate::StreamConfig;

/// Shared stop flag, checked between blocks.
#[derive(Debug, Clone, Default)]
pub struct Breaker(Arc<AtomicBool>);

impl Breaker {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn brake(&self) {
        self.0.store(true, Ordering::Release);
    }
    pub fn test(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why a run stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    EndOfStream,
    Cancelled,
    BlockLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub blocks: u64,
    pub frames: u64,
    pub termination: Termination,
}

/// Read a block, run the chain over it, write it back out.
pub struct Processor {
    cfg: StreamConfig,
    chain: Chain,
    breaker: Breaker,
    block_limit: Option<u64>,
}

impl Processor {
    pub fn new(cfg: StreamConfig, chain: Chain) -> Result<Self, ConfigError> {
        cfg.validate()?;
        if chain.channels() != cfg.channels() {
            return Err(ConfigError::ChannelMismatch {
                config: cfg.channels(),
                chain: chain.channels(),
            });
        }
        Ok(Self { cfg, chain, breaker: Breaker::new(), block_limit: None })
    }

    /// The stock livecode processor: absolute-value distortion on every frame.
    pub fn rectifier(cfg: StreamConfig) -> Result<Self, ConfigError> {
        Self::new(cfg, Chain::new(cfg.channels()).with(Box::new(Rectify::new())))
    }

    /// Stop after `blocks` blocks even if more input is available.
    pub fn with_block_limit(mut self, blocks: Option<u64>) -> Self {
        self.block_limit = blocks;
        self
    }

    pub fn with_breaker(mut self, breaker: Breaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn breaker(&self) -> Breaker {
        self.breaker.clone()
    }

    pub fn run<R: Read, W: Write>(
        &mut self,
        input: R,
        output: W,
    ) -> Result<RunSummary, StreamError> {
        let mut reader = BlockReader::new(input, &self.cfg);
        let mut writer = BlockWriter::new(output, &self.cfg);
        let mut block = Block::new(&self.cfg);
        let mut blocks = 0u64;

        info!(
            "streaming {} frames x {} channels per block through [{}]",
            self.cfg.block_frames(),
            self.cfg.channels(),
            self.chain.names().collect::<Vec<_>>().join(", ")
        );

        let termination = loop {
            if self.breaker.test() {
                break Termination::Cancelled;
            }
            if self.block_limit.is_some_and(|limit| blocks >= limit) {
                break Termination::BlockLimit;
            }
            match reader.read_block(block.samples_mut()) {
                Ok(()) => {}
                Err(StreamError::EndOfStream) => break Termination::EndOfStream,
                Err(e) => {
                    debug!("read failed after {blocks} blocks: {e}");
                    return Err(e);
                }
            }
            self.chain.process(block.samples_mut());
            writer.write_block(block.samples())?;
            blocks += 1;
            trace!("block {blocks} done");
        };

        let summary = RunSummary {
            blocks,
            frames: blocks * self.cfg.block_frames() as u64,
            termination,
        };
        info!("stopped ({:?}) after {} blocks", termination, blocks);
        Ok(summary)
    }
}
