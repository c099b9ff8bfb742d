//! LV2 plugin hosting for sonora.
//!
//! Loads a plugin by URI, classifies its ports, and runs it inside a
//! real-time effect chain.
//!
//! ## Usage
//!
//! ```ignore
//! use sonora_plugin::{AudioBuffers, LilvBackend, PluginCatalog, PluginSlot};
//!
//! let catalog = PluginCatalog::new(Arc::new(LilvBackend::new()));
//! let descriptor = catalog.resolve("http://lsp-plug.in/plugins/lv2/comp_delay_x2_stereo")?;
//!
//! // Control thread
//! let slot = PluginSlot::new(descriptor, 1024);
//! let mut processor = slot.processor().unwrap();
//! slot.create(48000)?;
//! slot.set_parameter("time_l", 12.5)?;
//!
//! // Audio thread
//! processor.process(&mut AudioBuffers::stereo(&in_l, &in_r, &mut out_l, &mut out_r), frames);
//! ```
//!
//! ## Threads
//!
//! - Control thread: [`PluginCatalog`], [`PluginSlot`] create/replace/destroy, parameters
//! - Audio thread: [`SlotProcessor::process`] only (no allocation, no blocking)

pub mod error;
pub use error::{HostError, PortShapeError, Result, ShapeFault};

pub mod backend;
pub use backend::{NativeInstance, NativePlugin, PluginBackend, RawPort};

mod port;
pub use port::{introspect, ChannelLayout, ControlRange, Port, PortDirection, PortKind, PortTable};

mod descriptor;
pub use descriptor::PluginDescriptor;

mod catalog;
pub use catalog::{is_valid_uri, PluginCatalog, PluginSummary};

mod controls;
pub use controls::{ControlSnapshot, ControlStorage};

mod instance;
pub use instance::{Instance, InstanceState};

mod binder;
pub use binder::{AudioBuffers, AudioRouting, BoundInstance};

mod runner;

mod slot;
pub use slot::{PluginSlot, SlotEvent, SlotProcessor, WeakPluginSlot};

#[cfg(feature = "lilv")]
mod lilv_backend;
#[cfg(feature = "lilv")]
pub use lilv_backend::LilvBackend;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
