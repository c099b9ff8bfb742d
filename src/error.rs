//! Centralized error type for the sonora umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] sonora_core::Error),

    #[error("Plugin: {0}")]
    Plugin(#[from] sonora_plugin::HostError),
}

impl Error {
    /// The plugin host error, if this is one.
    pub fn as_host_error(&self) -> Option<&sonora_plugin::HostError> {
        match self {
            Error::Plugin(e) => Some(e),
            Error::Core(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
