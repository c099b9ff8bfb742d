//! Builder for configuring and constructing a `PluginHost`.

use crate::core::HostConfig;
use crate::plugin::PluginBackend;
use crate::{PluginHost, Result};
use std::sync::Arc;

/// The sample rate and block size normally come from the audio graph that
/// owns the effect chain. The backend defaults to the system LV2 world when
/// the `lilv` feature is enabled and must be given explicitly otherwise.
///
/// # Example
///
/// ```ignore
/// use sonora::prelude::*;
///
/// let host = PluginHost::builder()
///     .sample_rate(48000)
///     .max_block_size(512)
///     .build()?;
/// ```
#[derive(Default)]
pub struct PluginHostBuilder {
    config: HostConfig,
    backend: Option<Arc<dyn PluginBackend>>,
}

impl PluginHostBuilder {
    /// Default: 48000
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 1024
    pub fn max_block_size(mut self, frames: usize) -> Self {
        self.config.max_block_size = frames;
        self
    }

    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Where plugins are discovered. Replaces the default `lilv` backend.
    pub fn backend(mut self, backend: Arc<dyn PluginBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<PluginHost> {
        self.config.validate()?;

        let backend = match self.backend {
            Some(backend) => backend,
            None => default_backend()?,
        };

        tracing::info!(
            "Plugin host ready: {} Hz, {} frames max, backend {}",
            self.config.sample_rate,
            self.config.max_block_size,
            backend.name()
        );
        Ok(PluginHost::new(self.config, backend))
    }
}

#[cfg(feature = "lilv")]
fn default_backend() -> Result<Arc<dyn PluginBackend>> {
    Ok(Arc::new(crate::plugin::LilvBackend::new()))
}

#[cfg(not(feature = "lilv"))]
fn default_backend() -> Result<Arc<dyn PluginBackend>> {
    Err(crate::Error::Core(crate::core::Error::InvalidConfig(
        "no plugin backend: enable the `lilv` feature or call .backend()".to_string(),
    )))
}
