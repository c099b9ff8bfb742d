//! Host configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub const MIN_SAMPLE_RATE: u32 = 8000;
pub const MAX_SAMPLE_RATE: u32 = 384000;

/// Largest block the audio graph may hand to a plugin in one `run`.
pub const MAX_BLOCK_SIZE: usize = 8192;

/// Audio graph parameters the host adapter is driven with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    pub sample_rate: u32,
    /// Upper bound on frames per block. Sizes per-instance scratch buffers.
    pub max_block_size: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            max_block_size: 1024,
        }
    }
}

impl HostConfig {
    pub fn new(sample_rate: u32, max_block_size: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_sample_rate(self.sample_rate)?;
        if self.max_block_size == 0 || self.max_block_size > MAX_BLOCK_SIZE {
            return Err(Error::InvalidBlockSize(self.max_block_size));
        }
        Ok(())
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }
}

pub(crate) fn validate_sample_rate(rate: u32) -> Result<()> {
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
        return Err(Error::InvalidSampleRate(rate));
    }
    Ok(())
}
