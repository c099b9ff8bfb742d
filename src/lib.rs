//! # Sonora - Real-time LV2 Plugin Host
//!
//! Loads LV2 plugins by URI and runs them inside a real-time effect chain.
//!
//! ## Architecture
//!
//! Sonora is an umbrella crate that coordinates:
//! - **sonora-core** - Host configuration and lock-free primitives
//! - **sonora-plugin** - Plugin catalog, port introspection, instance lifecycle, RT processing
//!
//! ## Quick Start
//!
//! ```ignore
//! use sonora::prelude::*;
//!
//! let host = PluginHost::builder().sample_rate(48000).build()?;
//!
//! // Control thread
//! let slot = host.load("http://lsp-plug.in/plugins/lv2/comp_delay_x2_stereo")?;
//! let mut processor = slot.processor().unwrap();
//! slot.set_parameter("time_l", 12.5)?;
//!
//! // Audio thread
//! processor.process(&mut AudioBuffers::stereo(&in_l, &in_r, &mut out_l, &mut out_r), frames);
//!
//! // Device changed rate
//! host.set_sample_rate(44100)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `lilv` - Native LV2 hosting (default backend for `PluginHost`)
//! - `test-utils` - In-memory mock backend

/// Re-export of sonora-core for direct access
pub use sonora_core as core;

/// Re-export of sonora-plugin for direct access
pub use sonora_plugin as plugin;

pub use sonora_core::{AtomicFlag, AtomicFloat, HostConfig};

pub use sonora_plugin::{
    AudioBuffers, ChannelLayout, ControlRange, ControlSnapshot, HostError, InstanceState, Port,
    PortDirection, PortKind, PortTable, PluginDescriptor, PluginSlot, PluginSummary, SlotEvent,
    SlotProcessor,
};

mod error;
pub use error::{Error, Result};

mod builder;
mod host;

pub use builder::PluginHostBuilder;
pub use host::PluginHost;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{PluginHost, PluginHostBuilder};
    pub use crate::{AudioBuffers, ControlSnapshot, InstanceState, PluginSlot, SlotEvent};
    pub use crate::{Error, Result};
}
