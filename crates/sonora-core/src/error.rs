//! Error types for sonora-core.

use thiserror::Error;

/// Error type for sonora-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid sample rate: {0} Hz. Must be between {min} and {max} Hz", min = crate::MIN_SAMPLE_RATE, max = crate::MAX_SAMPLE_RATE)]
    InvalidSampleRate(u32),

    #[error("Invalid block size: {0}. Must be between 1 and {max}", max = crate::MAX_BLOCK_SIZE)]
    InvalidBlockSize(usize),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
