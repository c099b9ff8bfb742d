//! System LV2 hosting through lilv.

use crate::backend::{NativeInstance, NativePlugin, PluginBackend, RawPort};
use lilv::instance::{ActiveInstance, Instance};
use lilv::node::Node;
use lilv::plugin::Plugin;
use lilv::World;
use lv2_raw::{LV2Feature, LV2Urid, LV2UridMap, LV2UridMapHandle, LV2_URID__MAP};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr, CString};
use std::sync::Arc;

const LV2_INPUT_PORT: &str = "http://lv2plug.in/ns/lv2core#InputPort";
const LV2_OUTPUT_PORT: &str = "http://lv2plug.in/ns/lv2core#OutputPort";
const LV2_AUDIO_PORT: &str = "http://lv2plug.in/ns/lv2core#AudioPort";
const LV2_CONTROL_PORT: &str = "http://lv2plug.in/ns/lv2core#ControlPort";
const LV2_CONNECTION_OPTIONAL: &str = "http://lv2plug.in/ns/lv2core#connectionOptional";

/// The lilv world and the class nodes used to classify ports.
struct LilvWorld {
    input_port: Node,
    output_port: Node,
    audio_port: Node,
    control_port: Node,
    connection_optional: Node,
    world: World,
}

// SAFETY: every access goes through the `Mutex` in `SharedWorld`.
unsafe impl Send for LilvWorld {}

type SharedWorld = Arc<Mutex<LilvWorld>>;

impl LilvWorld {
    fn load() -> Self {
        let world = World::new();
        world.load_all();
        Self {
            input_port: world.new_uri(LV2_INPUT_PORT),
            output_port: world.new_uri(LV2_OUTPUT_PORT),
            audio_port: world.new_uri(LV2_AUDIO_PORT),
            control_port: world.new_uri(LV2_CONTROL_PORT),
            connection_optional: world.new_uri(LV2_CONNECTION_OPTIONAL),
            world,
        }
    }

    fn plugin(&self, uri: &str) -> Option<Plugin> {
        let node = self.world.new_uri(uri);
        self.world.plugins().plugin(&node)
    }
}

/// Backend over every LV2 bundle on the system `LV2_PATH`.
pub struct LilvBackend {
    world: Mutex<Option<SharedWorld>>,
}

impl LilvBackend {
    pub fn new() -> Self {
        Self {
            world: Mutex::new(None),
        }
    }

    fn world(&self) -> SharedWorld {
        let mut world = self.world.lock();
        Arc::clone(world.get_or_insert_with(|| Arc::new(Mutex::new(LilvWorld::load()))))
    }
}

impl Default for LilvBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginBackend for LilvBackend {
    fn name(&self) -> &str {
        "lilv"
    }

    fn discover(&self) -> std::result::Result<Vec<Arc<dyn NativePlugin>>, String> {
        let shared = self.world();
        let lilv = shared.lock();

        let plugins = lilv
            .world
            .plugins()
            .iter()
            .filter(|plugin| {
                let valid = plugin.verify();
                if !valid {
                    tracing::warn!(
                        "Skipping plugin that failed verification: {}",
                        plugin.uri().as_uri().unwrap_or("<no uri>")
                    );
                }
                valid
            })
            .filter_map(|plugin| {
                let uri = plugin.uri().as_uri()?.to_string();
                let name = plugin.name().as_str().unwrap_or(&uri).to_string();
                let native: Arc<dyn NativePlugin> = Arc::new(LilvPlugin {
                    required_features: feature_uris(&plugin),
                    port_count: plugin.ports_count(),
                    uri,
                    name,
                    world: Arc::clone(&shared),
                });
                Some(native)
            })
            .collect();

        Ok(plugins)
    }
}

struct LilvPlugin {
    uri: String,
    name: String,
    required_features: Vec<String>,
    port_count: usize,
    world: SharedWorld,
}

fn feature_uris(plugin: &Plugin) -> Vec<String> {
    plugin
        .required_features()
        .iter()
        .filter_map(|feature| {
            feature
                .as_uri()
                .map(str::to_string)
                .or_else(|| feature.as_str().map(str::to_string))
        })
        .collect()
}

fn float_or_nan(node: Option<Node>) -> f32 {
    node.and_then(|node| node.as_float()).unwrap_or(f32::NAN)
}

impl NativePlugin for LilvPlugin {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn required_features(&self) -> Vec<String> {
        self.required_features.clone()
    }

    fn port_count(&self) -> usize {
        self.port_count
    }

    fn port(&self, index: usize) -> RawPort {
        let lilv = self.world.lock();
        let port = lilv
            .plugin(&self.uri)
            .and_then(|plugin| plugin.iter_ports().find(|port| port.index() == index));

        let Some(port) = port else {
            // Shows up as an unclassifiable port with a fault.
            return RawPort::other(&format!("port_{index}"), &format!("port {index}"));
        };

        let symbol = port
            .symbol()
            .and_then(|node| node.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("port_{index}"));
        let name = port
            .name()
            .and_then(|node| node.as_str().map(str::to_string))
            .unwrap_or_else(|| symbol.clone());
        let range = port.range();

        RawPort {
            name,
            symbol,
            is_input: port.is_a(&lilv.input_port),
            is_output: port.is_a(&lilv.output_port),
            is_audio: port.is_a(&lilv.audio_port),
            is_control: port.is_a(&lilv.control_port),
            connection_optional: port.has_property(&lilv.connection_optional),
            default: float_or_nan(range.default),
            minimum: float_or_nan(range.minimum),
            maximum: float_or_nan(range.maximum),
        }
    }

    fn instantiate(&self, sample_rate: f64) -> Option<Box<dyn NativeInstance>> {
        let lilv = self.world.lock();
        let plugin = lilv.plugin(&self.uri)?;

        let urid_map = match UridMapFeature::new() {
            Ok(feature) => feature,
            Err(e) => {
                tracing::error!("{}", e);
                return None;
            }
        };
        let features = [urid_map.feature()];
        // SAFETY: the feature data lives in `urid_map`, which the returned
        // instance owns and drops after the native handle.
        let instance = unsafe { plugin.instantiate(sample_rate, features) }?;

        Some(Box::new(LilvInstance {
            handle: Handle::Inactive(instance),
            _urid_map: urid_map,
        }))
    }
}

enum Handle {
    Inactive(Instance),
    Active(ActiveInstance),
    Released,
}

struct LilvInstance {
    // Declared first: dropped before the features it was instantiated with.
    handle: Handle,
    _urid_map: UridMapFeature,
}

// SAFETY: a plugin instance is used by one thread at a time (the slot's
// `Mutex`); LV2 instances carry no thread affinity.
unsafe impl Send for LilvInstance {}

impl NativeInstance for LilvInstance {
    unsafe fn connect_port(&mut self, index: usize, data: *mut f32) {
        match &mut self.handle {
            Handle::Inactive(instance) => instance.connect_port_mut(index, data),
            Handle::Active(active) => active.instance_mut().connect_port_mut(index, data),
            Handle::Released => {}
        }
    }

    fn activate(&mut self) {
        if let Handle::Inactive(instance) = std::mem::replace(&mut self.handle, Handle::Released) {
            // SAFETY: all ports were connected before the host activates.
            self.handle = Handle::Active(unsafe { instance.activate() });
        }
    }

    fn deactivate(&mut self) {
        match std::mem::replace(&mut self.handle, Handle::Released) {
            Handle::Active(active) => {
                // SAFETY: not running; `run` needs `&mut self`.
                if let Some(instance) = unsafe { active.deactivate() } {
                    self.handle = Handle::Inactive(instance);
                }
            }
            other => self.handle = other,
        }
    }

    unsafe fn run(&mut self, frames: usize) {
        if let Handle::Active(active) = &mut self.handle {
            active.run(frames);
        }
    }
}

#[derive(Default)]
struct UridMapState {
    next_urid: LV2Urid,
    by_uri: HashMap<String, LV2Urid>,
}

/// `urid:map` host feature. One per instance.
struct UridMapFeature {
    _uri: CString,
    feature: LV2Feature,
    _map: Box<LV2UridMap>,
    _state: Box<Mutex<UridMapState>>,
}

impl UridMapFeature {
    fn new() -> std::result::Result<Self, String> {
        let state = Box::new(Mutex::new(UridMapState {
            next_urid: 1,
            by_uri: HashMap::new(),
        }));
        let mut map = Box::new(LV2UridMap {
            handle: (&*state as *const Mutex<UridMapState>) as *mut c_void,
            map: urid_map_callback,
        });

        let uri = CString::new(LV2_URID__MAP)
            .map_err(|e| format!("Invalid URID feature URI: {e}"))?;
        let feature = LV2Feature {
            uri: uri.as_ptr(),
            data: (&mut *map as *mut LV2UridMap).cast::<c_void>(),
        };

        Ok(Self {
            _uri: uri,
            feature,
            _map: map,
            _state: state,
        })
    }

    fn feature(&self) -> &LV2Feature {
        &self.feature
    }
}

extern "C" fn urid_map_callback(handle: LV2UridMapHandle, uri: *const c_char) -> LV2Urid {
    if handle.is_null() || uri.is_null() {
        return 0;
    }
    // SAFETY: plugins pass a NUL-terminated URI.
    let Ok(uri) = unsafe { CStr::from_ptr(uri) }.to_str() else {
        return 0;
    };

    // SAFETY: `handle` points at the boxed state owned by the feature.
    let state = unsafe { &*(handle as *const Mutex<UridMapState>) };
    let mut state = state.lock();
    if let Some(&urid) = state.by_uri.get(uri) {
        return urid;
    }

    let urid = state.next_urid;
    state.next_urid = state.next_urid.saturating_add(1);
    state.by_uri.insert(uri.to_string(), urid);
    urid
}
