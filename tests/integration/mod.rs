//! Integration test modules for sonora
//!
//! - lifecycle: catalog resolution, create/destroy, binding, unity gain
//! - handover: instance replacement under a running audio thread
//! - host: PluginHost facade, sample-rate changes, events

pub mod handover;
pub mod host;
pub mod lifecycle;
