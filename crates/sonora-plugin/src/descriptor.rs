use crate::backend::NativePlugin;
use crate::port::{introspect, PortTable};
use std::sync::{Arc, OnceLock};

/// Immutable catalog record for one installable plugin type.
///
/// Instances borrow the port table through an `Arc`; the table is built the
/// first time [`ports`](Self::ports) is called and reused afterwards.
pub struct PluginDescriptor {
    uri: String,
    name: String,
    required_features: Vec<String>,
    plugin: Arc<dyn NativePlugin>,
    ports: OnceLock<Arc<PortTable>>,
}

impl PluginDescriptor {
    pub(crate) fn new(plugin: Arc<dyn NativePlugin>) -> Self {
        Self {
            uri: plugin.uri().to_string(),
            name: plugin.name().to_string(),
            required_features: plugin.required_features(),
            plugin,
            ports: OnceLock::new(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_features(&self) -> &[String] {
        &self.required_features
    }

    pub fn ports(&self) -> &Arc<PortTable> {
        self.ports
            .get_or_init(|| Arc::new(introspect(self.plugin.as_ref())))
    }

    pub(crate) fn native(&self) -> &dyn NativePlugin {
        self.plugin.as_ref()
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .field("required_features", &self.required_features)
            .finish()
    }
}
