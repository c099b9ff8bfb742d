//! Core types shared by the sonora host crates.
//!
//! - [`HostConfig`]: sample rate and block size chosen by the audio graph
//! - [`AtomicFloat`] / [`AtomicFlag`]: lock-free primitives for audio/control thread sharing
//! - [`Error`] / [`Result`]: configuration errors

pub mod error;
pub use error::{Error, Result};

mod config;
pub use config::{HostConfig, MAX_BLOCK_SIZE, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};

pub(crate) mod lockfree;
pub use lockfree::{AtomicFlag, AtomicFloat};

pub use std::sync::atomic::Ordering;
