use std::slice::{ChunksExact, ChunksExactMut};

use crate::{StreamConfig, SAMPLE_BYTES};

/// One block of interleaved frames, reused across loop iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    samples: Vec<f32>,
    channels: usize,
}

impl Block {
    pub fn new(cfg: &StreamConfig) -> Self {
        Self {
            samples: vec![0.0; cfg.samples_per_block()],
            channels: cfg.channels(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn byte_len(&self) -> usize {
        self.samples.len() * SAMPLE_BYTES
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn frames(&self) -> ChunksExact<'_, f32> {
        self.samples.chunks_exact(self.channels)
    }

    pub fn frames_mut(&mut self) -> ChunksExactMut<'_, f32> {
        self.samples.chunks_exact_mut(self.channels)
    }
}

/// Decode native-endian f32s. `bytes` must hold exactly `out.len()` samples.
pub(crate) fn decode_samples(bytes: &[u8], out: &mut [f32]) {
    debug_assert_eq!(bytes.len(), out.len() * SAMPLE_BYTES);
    for (o, chunk) in out.iter_mut().zip(bytes.chunks_exact(SAMPLE_BYTES)) {
        *o = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

pub(crate) fn encode_samples(samples: &[f32], out: &mut [u8]) {
    debug_assert_eq!(out.len(), samples.len() * SAMPLE_BYTES);
    for (chunk, s) in out.chunks_exact_mut(SAMPLE_BYTES).zip(samples) {
        chunk.copy_from_slice(&s.to_ne_bytes());
    }
}

/// Encode a run of samples as wire bytes.
pub fn to_bytes(samples: &[f32]) -> Vec<u8> {
    let mut out = vec![0u8; samples.len() * SAMPLE_BYTES];
    encode_samples(samples, &mut out);
    out
}

/// Decode wire bytes into samples; a trailing partial sample is ignored.
pub fn from_bytes(bytes: &[u8]) -> Vec<f32> {
    let n = bytes.len() / SAMPLE_BYTES;
    let mut out = vec![0.0; n];
    decode_samples(&bytes[..n * SAMPLE_BYTES], &mut out);
    out
}
