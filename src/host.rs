//! PluginHost: the entry point the UI and audio graph talk to.

use crate::core::HostConfig;
use crate::plugin::{
    PluginBackend, PluginCatalog, PluginSlot, PluginSummary, SlotEvent, WeakPluginSlot,
};
use crate::Result;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

/// Lifecycle events buffered for the UI before new ones are dropped.
const EVENT_CAPACITY: usize = 256;

/// Loads plugins by URI into [`PluginSlot`]s and keeps every live slot at the
/// graph's sample rate.
///
/// All methods run on the control thread. The audio thread only touches the
/// [`SlotProcessor`](crate::plugin::SlotProcessor) taken from each slot.
pub struct PluginHost {
    config: Mutex<HostConfig>,
    catalog: PluginCatalog,
    slots: Mutex<Vec<WeakPluginSlot>>,
    events_tx: Sender<SlotEvent>,
    events_rx: Receiver<SlotEvent>,
}

impl PluginHost {
    pub fn builder() -> crate::PluginHostBuilder {
        crate::PluginHostBuilder::default()
    }

    pub(crate) fn new(config: HostConfig, backend: Arc<dyn PluginBackend>) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::bounded(EVENT_CAPACITY);
        Self {
            config: Mutex::new(config),
            catalog: PluginCatalog::new(backend),
            slots: Mutex::new(Vec::new()),
            events_tx,
            events_rx,
        }
    }

    pub fn config(&self) -> HostConfig {
        *self.config.lock()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.lock().sample_rate
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    /// Installed plugins, sorted by name.
    pub fn plugins(&self) -> Result<Vec<PluginSummary>> {
        Ok(self.catalog.plugins()?)
    }

    /// Resolve `uri` and return a slot with an active instance at the current rate.
    pub fn load(&self, uri: &str) -> Result<PluginSlot> {
        let descriptor = self.catalog.resolve(uri)?;
        let config = self.config();

        let slot = PluginSlot::with_events(
            descriptor,
            config.max_block_size,
            self.events_tx.clone(),
        );
        slot.create(config.sample_rate)?;

        let mut slots = self.slots.lock();
        slots.retain(|weak| weak.upgrade().is_some());
        slots.push(slot.downgrade());
        Ok(slot)
    }

    /// Every slot still held somewhere.
    pub fn slots(&self) -> Vec<PluginSlot> {
        self.slots
            .lock()
            .iter()
            .filter_map(WeakPluginSlot::upgrade)
            .collect()
    }

    /// Re-instantiate every slot that holds an instance at `sample_rate`.
    ///
    /// Destroyed slots stay empty. Every other slot is attempted. A slot that fails keeps its previous instance
    /// running, and the first failure is returned. Returns the number of
    /// slots replaced.
    pub fn set_sample_rate(&self, sample_rate: u32) -> Result<usize> {
        let config = self.config().with_sample_rate(sample_rate);
        config.validate()?;
        *self.config.lock() = config;

        tracing::info!("Sample rate changed to {} Hz", sample_rate);

        let mut replaced = 0;
        let mut first_error = None;
        for slot in self.slots() {
            match slot.replace(sample_rate) {
                Ok(true) => replaced += 1,
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(replaced),
        }
    }

    /// Free retired instances across all slots. Call periodically from the control thread.
    pub fn reclaim(&self) -> usize {
        self.slots().iter().map(PluginSlot::reclaim).sum()
    }

    /// Lifecycle notifications from every slot this host loaded.
    pub fn events(&self) -> Receiver<SlotEvent> {
        self.events_rx.clone()
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("config", &self.config())
            .field("backend", &self.catalog.backend_name())
            .field("slots", &self.slots().len())
            .finish()
    }
}
