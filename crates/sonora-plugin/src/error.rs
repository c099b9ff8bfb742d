//! Error types for the plugin host adapter

use crate::instance::InstanceState;
use thiserror::Error;

/// Why a port could not be classified during introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeFault {
    /// Declared neither input nor output.
    NoDirection,
    /// Neither a control port nor an audio port.
    UnsupportedKind,
}

impl std::fmt::Display for ShapeFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeFault::NoDirection => write!(f, "is neither input nor output"),
            ShapeFault::UnsupportedKind => write!(f, "has an unsupported type"),
        }
    }
}

/// A single port that failed classification. The rest of the plugin stays usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{plugin}: port {index} ({name}) {fault}")]
pub struct PortShapeError {
    pub plugin: String,
    pub index: usize,
    pub name: String,
    pub fault: ShapeFault,
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Plugin catalog unavailable ({backend}): {reason}")]
    CatalogUnavailable { backend: String, reason: String },

    #[error("Plugin not found: {uri}")]
    PluginNotFound { uri: String },

    #[error(transparent)]
    PortShape(#[from] PortShapeError),

    #[error("Failed to instantiate {uri} at {sample_rate} Hz\n  Reason: {reason}")]
    InstantiationFailure {
        uri: String,
        sample_rate: u32,
        reason: String,
    },

    #[error("Invalid state transition: cannot {operation} while {from}")]
    InvalidStateTransition {
        from: InstanceState,
        operation: &'static str,
    },

    #[error("Unknown port symbol: {symbol}")]
    UnknownPort { symbol: String },

    #[error("Port {symbol} is an output and cannot be written by the host")]
    ReadOnlyPort { symbol: String },

    #[error(transparent)]
    Config(#[from] sonora_core::Error),
}

impl HostError {
    /// Whether the caller can carry on (typically by bypassing the slot).
    ///
    /// Only a missing catalog and programming errors are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            HostError::CatalogUnavailable { .. } | HostError::InvalidStateTransition { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
