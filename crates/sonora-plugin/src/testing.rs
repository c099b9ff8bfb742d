//! In-memory plugin backend for tests.
//!
//! [`MockPlugin`] behaves like a small LV2 gain plugin: every audio output
//! is its matching input (or the first input) scaled by the `gain_db`
//! control, and a `level` control output, if declared, receives the block
//! peak. [`InstanceCounters`] track every native handle so tests can check
//! that nothing leaks and that instances are deactivated before being freed.

use crate::backend::{NativeInstance, NativePlugin, PluginBackend, RawPort};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Host features the mock pretends to provide.
pub const MOCK_HOST_FEATURES: &[&str] = &["http://lv2plug.in/ns/ext/urid#map"];

/// Native handle bookkeeping, shared by every instance of one [`MockPlugin`].
#[derive(Debug, Default)]
pub struct InstanceCounters {
    created: AtomicUsize,
    freed: AtomicUsize,
    freed_while_active: AtomicUsize,
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    runs: AtomicUsize,
}

impl InstanceCounters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn freed(&self) -> usize {
        self.freed.load(Ordering::SeqCst)
    }

    /// Handles created and not yet freed.
    pub fn live(&self) -> usize {
        self.created() - self.freed()
    }

    /// Handles freed without being deactivated first. Always 0 for a correct host.
    pub fn freed_while_active(&self) -> usize {
        self.freed_while_active.load(Ordering::SeqCst)
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

/// `(port index, address)` of every `connect_port` call, across instances.
pub type ConnectionLog = Arc<Mutex<Vec<(usize, usize)>>>;

pub struct MockPlugin {
    uri: String,
    name: String,
    ports: Arc<[RawPort]>,
    required: Vec<String>,
    rejected_rates: Vec<u32>,
    panic_on_run: bool,
    counters: Arc<InstanceCounters>,
    connections: ConnectionLog,
    port_queries: AtomicUsize,
}

impl MockPlugin {
    pub fn new(uri: &str, name: &str) -> Self {
        Self {
            uri: uri.to_string(),
            name: name.to_string(),
            ports: Arc::from(Vec::new()),
            required: Vec::new(),
            rejected_rates: Vec::new(),
            panic_on_run: false,
            counters: Arc::default(),
            connections: Arc::default(),
            port_queries: AtomicUsize::new(0),
        }
    }

    /// Mono gain: `in`, `out`, `gain_db` (-60..20 dB, default 0).
    pub fn gain(uri: &str) -> Self {
        Self::new(uri, "Gain")
            .port(RawPort::audio_input("in", "In"))
            .port(RawPort::audio_output("out", "Out"))
            .port(RawPort::control_input("gain_db", "Gain", -60.0, 20.0, 0.0))
    }

    /// Stereo gain: `in_l`, `in_r`, `out_l`, `out_r`, `gain_db`.
    pub fn stereo_gain(uri: &str) -> Self {
        Self::new(uri, "Stereo Gain")
            .port(RawPort::audio_input("in_l", "In L"))
            .port(RawPort::audio_input("in_r", "In R"))
            .port(RawPort::audio_output("out_l", "Out L"))
            .port(RawPort::audio_output("out_r", "Out R"))
            .port(RawPort::control_input("gain_db", "Gain", -60.0, 20.0, 0.0))
    }

    pub fn port(mut self, port: RawPort) -> Self {
        let mut ports = self.ports.to_vec();
        ports.push(port);
        self.ports = Arc::from(ports);
        self
    }

    pub fn requires(mut self, feature: &str) -> Self {
        self.required.push(feature.to_string());
        self
    }

    /// Return no instance at `sample_rate`.
    pub fn reject_sample_rate(mut self, sample_rate: u32) -> Self {
        self.rejected_rates.push(sample_rate);
        self
    }

    /// Panic inside every `run`.
    pub fn panic_on_run(mut self) -> Self {
        self.panic_on_run = true;
        self
    }

    pub fn counters(&self) -> Arc<InstanceCounters> {
        Arc::clone(&self.counters)
    }

    pub fn connection_log(&self) -> ConnectionLog {
        Arc::clone(&self.connections)
    }

    /// How many times `port()` was called.
    pub fn port_queries(&self) -> usize {
        self.port_queries.load(Ordering::SeqCst)
    }
}

impl NativePlugin for MockPlugin {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn required_features(&self) -> Vec<String> {
        self.required.clone()
    }

    fn port_count(&self) -> usize {
        self.ports.len()
    }

    fn port(&self, index: usize) -> RawPort {
        self.port_queries.fetch_add(1, Ordering::SeqCst);
        self.ports[index].clone()
    }

    fn instantiate(&self, sample_rate: f64) -> Option<Box<dyn NativeInstance>> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return None;
        }
        if self.rejected_rates.contains(&(sample_rate as u32)) {
            return None;
        }
        if self
            .required
            .iter()
            .any(|feature| !MOCK_HOST_FEATURES.contains(&feature.as_str()))
        {
            return None;
        }

        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(MockInstance {
            ports: Arc::clone(&self.ports),
            connected: vec![std::ptr::null_mut(); self.ports.len()],
            active: false,
            panic_on_run: self.panic_on_run,
            counters: Arc::clone(&self.counters),
            log: Arc::clone(&self.connections),
        }))
    }
}

struct MockInstance {
    ports: Arc<[RawPort]>,
    connected: Vec<*mut f32>,
    active: bool,
    panic_on_run: bool,
    counters: Arc<InstanceCounters>,
    log: ConnectionLog,
}

// SAFETY: the raw pointers are only dereferenced inside `run`, under the
// host's connect/run contract.
unsafe impl Send for MockInstance {}

impl MockInstance {
    fn control(&self, symbol: &str) -> Option<*mut f32> {
        self.ports
            .iter()
            .zip(&self.connected)
            .find(|(port, ptr)| port.is_control && port.symbol == symbol && !ptr.is_null())
            .map(|(_, &ptr)| ptr)
    }

    fn nth_audio(&self, input: bool, n: usize) -> Option<*mut f32> {
        self.ports
            .iter()
            .zip(&self.connected)
            .filter(|(port, _)| port.is_audio && if input { port.is_input } else { port.is_output })
            .nth(n)
            .map(|(_, &ptr)| ptr)
            .filter(|ptr| !ptr.is_null())
    }
}

impl NativeInstance for MockInstance {
    unsafe fn connect_port(&mut self, index: usize, data: *mut f32) {
        if let Some(slot) = self.connected.get_mut(index) {
            *slot = data;
            self.log.lock().push((index, data as usize));
        }
    }

    fn activate(&mut self) {
        self.active = true;
        self.counters.activations.fetch_add(1, Ordering::SeqCst);
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.counters.deactivations.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn run(&mut self, frames: usize) {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_run {
            panic!("mock plugin fault");
        }

        let gain_db = self.control("gain_db").map_or(0.0, |ptr| *ptr);
        let gain = 10f32.powf(gain_db / 20.0);

        let mut peak = 0.0f32;
        let mut n = 0;
        while let Some(out) = self.nth_audio(false, n) {
            let source = self.nth_audio(true, n).or_else(|| self.nth_audio(true, 0));
            for i in 0..frames {
                let sample = source.map_or(0.0, |inp| *inp.add(i)) * gain;
                *out.add(i) = sample;
                peak = peak.max(sample.abs());
            }
            n += 1;
        }

        for (port, &ptr) in self.ports.iter().zip(&self.connected) {
            if port.is_control && port.is_output && !ptr.is_null() {
                *ptr = peak;
            }
        }
    }
}

impl Drop for MockInstance {
    fn drop(&mut self) {
        if self.active {
            self.counters.freed_while_active.fetch_add(1, Ordering::SeqCst);
        }
        self.counters.freed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend over a fixed set of in-memory plugins. Named `"mock"`.
#[derive(Default)]
pub struct MockBackend {
    plugins: Vec<Arc<dyn NativePlugin>>,
    failure: Option<String>,
    discover_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose index cannot be built.
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn with_plugin(mut self, plugin: MockPlugin) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }
}

impl PluginBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn discover(&self) -> std::result::Result<Vec<Arc<dyn NativePlugin>>, String> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(reason) => Err(reason.clone()),
            None => Ok(self.plugins.clone()),
        }
    }
}
