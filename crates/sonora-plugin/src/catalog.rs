//! Plugin catalog.
//!
//! Indexes the plugins a [`PluginBackend`] discovers and resolves plugin URIs
//! to shared [`PluginDescriptor`]s. The index is built on first use and never
//! rebuilt; a failed build is remembered and reported on every later call.

use crate::backend::{NativePlugin, PluginBackend};
use crate::descriptor::PluginDescriptor;
use crate::error::{HostError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Entry in the plugin picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSummary {
    pub uri: String,
    pub name: String,
    pub audio_inputs: usize,
    pub audio_outputs: usize,
}

struct PluginIndex {
    plugins: HashMap<String, Arc<dyn NativePlugin>>,
}

pub struct PluginCatalog {
    backend: Arc<dyn PluginBackend>,
    index: OnceLock<std::result::Result<PluginIndex, String>>,
    descriptors: Mutex<HashMap<String, Arc<PluginDescriptor>>>,
}

impl PluginCatalog {
    pub fn new(backend: Arc<dyn PluginBackend>) -> Self {
        Self {
            backend,
            index: OnceLock::new(),
            descriptors: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Whether the index has been built (successfully or not).
    pub fn is_loaded(&self) -> bool {
        self.index.get().is_some()
    }

    fn index(&self) -> Result<&PluginIndex> {
        let index = self.index.get_or_init(|| {
            let plugins = self.backend.discover().map_err(|reason| {
                tracing::error!(
                    "Failed to build plugin index ({}): {}",
                    self.backend.name(),
                    reason
                );
                reason
            })?;

            let mut by_uri = HashMap::with_capacity(plugins.len());
            for plugin in plugins {
                let uri = plugin.uri().to_string();
                if by_uri.contains_key(&uri) {
                    tracing::warn!("Duplicate plugin URI {}, keeping the first", uri);
                    continue;
                }
                by_uri.insert(uri, plugin);
            }

            tracing::info!(
                "Indexed {} plugins ({})",
                by_uri.len(),
                self.backend.name()
            );
            Ok(PluginIndex { plugins: by_uri })
        });

        index
            .as_ref()
            .map_err(|reason| HostError::CatalogUnavailable {
                backend: self.backend.name().to_string(),
                reason: reason.clone(),
            })
    }

    /// Resolve a plugin URI.
    ///
    /// A malformed or unknown URI yields [`HostError::PluginNotFound`]. The
    /// same URI always resolves to the same descriptor.
    pub fn resolve(&self, uri: &str) -> Result<Arc<PluginDescriptor>> {
        if !is_valid_uri(uri) {
            tracing::warn!("Invalid plugin URI: {}", uri);
            return Err(HostError::PluginNotFound {
                uri: uri.to_string(),
            });
        }

        let index = self.index()?;
        let Some(plugin) = index.plugins.get(uri) else {
            tracing::warn!("Could not find the plugin: {}", uri);
            return Err(HostError::PluginNotFound {
                uri: uri.to_string(),
            });
        };

        Ok(self.descriptor_for(plugin))
    }

    /// Every indexed plugin, sorted by name.
    pub fn plugins(&self) -> Result<Vec<PluginSummary>> {
        let index = self.index()?;

        let mut summaries: Vec<PluginSummary> = index
            .plugins
            .values()
            .map(|plugin| {
                let descriptor = self.descriptor_for(plugin);
                let ports = descriptor.ports();
                PluginSummary {
                    uri: descriptor.uri().to_string(),
                    name: descriptor.name().to_string(),
                    audio_inputs: ports.audio_inputs(),
                    audio_outputs: ports.audio_outputs(),
                }
            })
            .collect();

        summaries.sort_by(|left, right| left.name.cmp(&right.name).then(left.uri.cmp(&right.uri)));
        Ok(summaries)
    }

    fn descriptor_for(&self, plugin: &Arc<dyn NativePlugin>) -> Arc<PluginDescriptor> {
        let mut descriptors = self.descriptors.lock();
        let descriptor = descriptors
            .entry(plugin.uri().to_string())
            .or_insert_with(|| {
                let descriptor = PluginDescriptor::new(Arc::clone(plugin));
                for feature in descriptor.required_features() {
                    tracing::debug!("{} requires feature: {}", descriptor.uri(), feature);
                }
                Arc::new(descriptor)
            });
        Arc::clone(descriptor)
    }
}

/// `scheme:rest`, where the scheme starts with a letter and continues with
/// letters, digits, `+`, `-` or `.`, and nothing contains whitespace.
pub fn is_valid_uri(uri: &str) -> bool {
    let Some((scheme, rest)) = uri.split_once(':') else {
        return false;
    };

    let mut chars = scheme.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_with_letter
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
        && !uri.chars().any(char::is_whitespace)
}
