//! Native plugin API seam.
//!
//! The adapter never talks to a plugin library directly. A [`PluginBackend`]
//! discovers installed plugins, each exposed as a [`NativePlugin`] that can
//! report raw port facts and produce [`NativeInstance`]s. Implementations:
//!
//! - `LilvBackend` (feature `lilv`): the system LV2 world
//! - `MockBackend` (feature `test-utils`): in-memory plugins with resource counters

use std::sync::Arc;

/// Port facts exactly as the plugin declares them. Classified by `port::introspect`.
///
/// Numeric fields are `NaN` when the plugin declares no value.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPort {
    pub name: String,
    pub symbol: String,
    pub is_input: bool,
    pub is_output: bool,
    pub is_audio: bool,
    pub is_control: bool,
    /// The plugin tolerates this port being left unconnected.
    pub connection_optional: bool,
    pub default: f32,
    pub minimum: f32,
    pub maximum: f32,
}

impl RawPort {
    fn new(symbol: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            is_input: false,
            is_output: false,
            is_audio: false,
            is_control: false,
            connection_optional: false,
            default: f32::NAN,
            minimum: f32::NAN,
            maximum: f32::NAN,
        }
    }

    pub fn audio_input(symbol: &str, name: &str) -> Self {
        Self {
            is_input: true,
            is_audio: true,
            ..Self::new(symbol, name)
        }
    }

    pub fn audio_output(symbol: &str, name: &str) -> Self {
        Self {
            is_output: true,
            is_audio: true,
            ..Self::new(symbol, name)
        }
    }

    pub fn control_input(symbol: &str, name: &str, min: f32, max: f32, default: f32) -> Self {
        Self {
            is_input: true,
            is_control: true,
            minimum: min,
            maximum: max,
            default,
            ..Self::new(symbol, name)
        }
    }

    pub fn control_output(symbol: &str, name: &str) -> Self {
        Self {
            is_output: true,
            is_control: true,
            ..Self::new(symbol, name)
        }
    }

    /// A port with no recognised class, e.g. an atom or CV port.
    pub fn other(symbol: &str, name: &str) -> Self {
        Self::new(symbol, name)
    }

    pub fn input(mut self) -> Self {
        self.is_input = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.connection_optional = true;
        self
    }
}

/// Discovers the installed plugins. Called once per catalog.
pub trait PluginBackend: Send + Sync {
    /// Short name used in logs, e.g. `"lilv"`.
    fn name(&self) -> &str;

    /// Build the plugin index. An `Err` means no plugin can ever be resolved.
    fn discover(&self) -> std::result::Result<Vec<Arc<dyn NativePlugin>>, String>;
}

/// One installable plugin type, as indexed by a backend.
pub trait NativePlugin: Send + Sync {
    fn uri(&self) -> &str;

    fn name(&self) -> &str;

    /// Host features the plugin refuses to instantiate without.
    fn required_features(&self) -> Vec<String>;

    fn port_count(&self) -> usize;

    /// Facts for port `index`, `0..port_count()`.
    fn port(&self, index: usize) -> RawPort;

    /// `None` when the plugin rejects the rate, lacks a host feature, or faults.
    fn instantiate(&self, sample_rate: f64) -> Option<Box<dyn NativeInstance>>;
}

/// A live native handle. Dropping it releases the handle.
pub trait NativeInstance: Send {
    /// # Safety
    /// `data` must stay valid for every `run` until the port is reconnected
    /// or the instance is dropped.
    unsafe fn connect_port(&mut self, index: usize, data: *mut f32);

    fn activate(&mut self);

    fn deactivate(&mut self);

    /// # Safety
    /// Every connected buffer must hold at least `frames` samples.
    unsafe fn run(&mut self, frames: usize);
}
