//! Plugin instance lifecycle.
//!
//! An [`Instance`] owns one native handle bound to a sample rate. Creating it
//! instantiates the plugin and connects every control port to the slot's
//! [`ControlStorage`]; dropping it deactivates (if needed) and frees the
//! handle, on every exit path.
//!
//! ```text
//! Uninstantiated --create--> Instantiated --activate--> Active
//!       ^                         |  ^                     |
//!       +--------drop-------------+  +-----deactivate------+
//! ```

use crate::backend::NativeInstance;
use crate::binder::{self, AudioBindings};
use crate::controls::ControlStorage;
use crate::descriptor::PluginDescriptor;
use crate::error::{HostError, Result};
use crate::port::PortTable;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Uninstantiated,
    Instantiated,
    Active,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceState::Uninstantiated => write!(f, "uninstantiated"),
            InstanceState::Instantiated => write!(f, "instantiated"),
            InstanceState::Active => write!(f, "active"),
        }
    }
}

pub struct Instance {
    descriptor: Arc<PluginDescriptor>,
    ports: Arc<PortTable>,
    controls: Arc<ControlStorage>,
    sample_rate: u32,
    pub(crate) state: InstanceState,
    pub(crate) native: Box<dyn NativeInstance>,
    pub(crate) audio: AudioBindings,
    /// Sink for a second output port when the host supplies no right buffer.
    pub(crate) scratch: Box<[f32]>,
}

impl Instance {
    /// Instantiate `descriptor` at `sample_rate` and connect its control ports.
    ///
    /// `controls` must have been built from `descriptor.ports()`. The returned
    /// instance is `Instantiated`; call [`activate`](Self::activate) before running.
    pub fn create(
        descriptor: Arc<PluginDescriptor>,
        controls: Arc<ControlStorage>,
        sample_rate: u32,
        max_block_size: usize,
    ) -> Result<Self> {
        let failure = |reason: String| {
            tracing::warn!(
                "failed to instantiate {} at {} Hz: {}",
                descriptor.uri(),
                sample_rate,
                reason
            );
            HostError::InstantiationFailure {
                uri: descriptor.uri().to_string(),
                sample_rate,
                reason,
            }
        };

        if sample_rate == 0 {
            return Err(failure("sample rate must be positive".to_string()));
        }

        if max_block_size == 0 || max_block_size > sonora_core::MAX_BLOCK_SIZE {
            return Err(sonora_core::Error::InvalidBlockSize(max_block_size).into());
        }

        let ports = Arc::clone(descriptor.ports());
        if !controls.matches(&ports) {
            return Err(failure(
                "control storage was built for a different port table".to_string(),
            ));
        }

        let Some(mut native) = descriptor.native().instantiate(f64::from(sample_rate)) else {
            let reason = if descriptor.required_features().is_empty() {
                "plugin returned no instance".to_string()
            } else {
                format!(
                    "plugin returned no instance. Required features: {}",
                    descriptor.required_features().join(", ")
                )
            };
            return Err(failure(reason));
        };

        binder::connect_controls(native.as_mut(), &controls);

        tracing::info!("Instantiated {} at {} Hz", descriptor.uri(), sample_rate);

        let audio = AudioBindings::new(&ports);
        Ok(Self {
            descriptor,
            ports,
            controls,
            sample_rate,
            state: InstanceState::Instantiated,
            native,
            audio,
            scratch: vec![0.0; max_block_size].into_boxed_slice(),
        })
    }

    /// [`create`](Self::create) followed by [`activate`](Self::activate).
    pub fn create_active(
        descriptor: Arc<PluginDescriptor>,
        controls: Arc<ControlStorage>,
        sample_rate: u32,
        max_block_size: usize,
    ) -> Result<Self> {
        let mut instance = Self::create(descriptor, controls, sample_rate, max_block_size)?;
        instance.activate();
        Ok(instance)
    }

    /// No-op when already active.
    pub fn activate(&mut self) {
        if self.state == InstanceState::Active {
            return;
        }
        self.native.activate();
        self.state = InstanceState::Active;
        tracing::debug!("Activated {}", self.descriptor.uri());
    }

    /// No-op when not active.
    pub fn deactivate(&mut self) {
        if self.state != InstanceState::Active {
            return;
        }
        self.native.deactivate();
        self.state = InstanceState::Instantiated;
        tracing::debug!("Deactivated {}", self.descriptor.uri());
    }

    /// Deactivate if needed, then free the native handle.
    pub fn destroy(self) {
        drop(self);
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == InstanceState::Active
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn descriptor(&self) -> &Arc<PluginDescriptor> {
        &self.descriptor
    }

    pub fn ports(&self) -> &Arc<PortTable> {
        &self.ports
    }

    pub fn controls(&self) -> &Arc<ControlStorage> {
        &self.controls
    }

    pub fn max_block_size(&self) -> usize {
        self.scratch.len()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.deactivate();
        tracing::debug!(
            "Freed {} ({} Hz)",
            self.descriptor.uri(),
            self.sample_rate
        );
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("uri", &self.descriptor.uri())
            .field("sample_rate", &self.sample_rate)
            .field("state", &self.state)
            .finish()
    }
}
