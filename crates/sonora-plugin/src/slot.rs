//! Plugin slot: one plugin in the effect chain, shared by the control and
//! audio threads.
//!
//! The control thread creates, replaces and destroys instances; the audio
//! thread only ever runs the currently published one. Publishing is a single
//! `ArcSwapOption` store. A replaced instance is parked in a retired list and
//! freed on the control thread once the audio thread has let go of it, so
//! the audio thread never deactivates or frees a plugin.
//!
//! ```text
//! control thread                          audio thread
//! --------------                          ------------
//! create(rate) -> Instance (off to side)
//! current.swap(new) -------------------->  current.load() -> try_lock -> run
//! retired.push(old)                        (old stays alive while loaded)
//! reclaim(): free when unreferenced
//! ```

use crate::binder::AudioBuffers;
use crate::controls::{ControlSnapshot, ControlStorage};
use crate::descriptor::PluginDescriptor;
use crate::error::Result;
use crate::instance::{Instance, InstanceState};
use crate::port::PortTable;
use arc_swap::ArcSwapOption;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use sonora_core::AtomicFlag;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Lifecycle notifications, sent from the control thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEvent {
    Instantiated { uri: String, sample_rate: u32 },
    InstantiationFailed {
        uri: String,
        sample_rate: u32,
        reason: String,
    },
    Destroyed { uri: String, sample_rate: u32 },
}

struct InstanceCell {
    instance: Mutex<Instance>,
    sample_rate: u32,
    faulted: AtomicFlag,
}

struct SlotShared {
    descriptor: Arc<PluginDescriptor>,
    controls: Arc<ControlStorage>,
    max_block_size: usize,
    current: ArcSwapOption<InstanceCell>,
    retired: Mutex<Vec<Arc<InstanceCell>>>,
    /// Serializes create / replace / destroy.
    lifecycle: Mutex<()>,
    processor_taken: AtomicFlag,
    /// Blocks the plugin ran. Bypassed blocks are counted separately.
    processed_blocks: AtomicU64,
    bypassed_blocks: AtomicU64,
    events: Option<Sender<SlotEvent>>,
}

impl SlotShared {
    fn emit(&self, event: SlotEvent) {
        if let Some(events) = &self.events {
            // Nobody listening is fine.
            let _ = events.try_send(event);
        }
    }
}

/// Control-thread handle. Cheap to clone.
#[derive(Clone)]
pub struct PluginSlot {
    shared: Arc<SlotShared>,
}

impl PluginSlot {
    pub fn new(descriptor: Arc<PluginDescriptor>, max_block_size: usize) -> Self {
        Self::build(descriptor, max_block_size, None)
    }

    /// Like [`new`](Self::new), reporting lifecycle changes on `events`.
    pub fn with_events(
        descriptor: Arc<PluginDescriptor>,
        max_block_size: usize,
        events: Sender<SlotEvent>,
    ) -> Self {
        Self::build(descriptor, max_block_size, Some(events))
    }

    fn build(
        descriptor: Arc<PluginDescriptor>,
        max_block_size: usize,
        events: Option<Sender<SlotEvent>>,
    ) -> Self {
        let controls = Arc::new(ControlStorage::new(descriptor.ports()));
        Self {
            shared: Arc::new(SlotShared {
                descriptor,
                controls,
                max_block_size,
                current: ArcSwapOption::empty(),
                retired: Mutex::new(Vec::new()),
                lifecycle: Mutex::new(()),
                processor_taken: AtomicFlag::new(false),
                processed_blocks: AtomicU64::new(0),
                bypassed_blocks: AtomicU64::new(0),
                events,
            }),
        }
    }

    pub fn descriptor(&self) -> &Arc<PluginDescriptor> {
        &self.shared.descriptor
    }

    pub fn uri(&self) -> &str {
        self.shared.descriptor.uri()
    }

    pub fn ports(&self) -> &Arc<PortTable> {
        self.shared.descriptor.ports()
    }

    pub fn controls(&self) -> &Arc<ControlStorage> {
        &self.shared.controls
    }

    /// `Active` while an instance is published, otherwise `Uninstantiated`.
    pub fn state(&self) -> InstanceState {
        if self.shared.current.load().is_some() {
            InstanceState::Active
        } else {
            InstanceState::Uninstantiated
        }
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.shared
            .current
            .load()
            .as_deref()
            .map(|cell| cell.sample_rate)
    }

    /// Instantiate and activate at `sample_rate`, replacing any existing instance.
    ///
    /// The new instance is fully set up before it is published. On failure the
    /// previous instance (if any) keeps running and the error is returned.
    pub fn create(&self, sample_rate: u32) -> Result<()> {
        let _lifecycle = self.shared.lifecycle.lock();
        self.publish(sample_rate)
    }

    /// Re-instantiate the current instance at a new sample rate. Control values carry over.
    ///
    /// A slot without an instance stays empty: returns `Ok(false)` and
    /// creates nothing. `Ok(true)` once the new instance is published.
    pub fn replace(&self, sample_rate: u32) -> Result<bool> {
        let _lifecycle = self.shared.lifecycle.lock();
        if self.shared.current.load().is_none() {
            tracing::debug!("Not replacing {}: no instance", self.uri());
            return Ok(false);
        }
        tracing::info!("Replacing {} at {} Hz", self.uri(), sample_rate);
        self.publish(sample_rate)?;
        Ok(true)
    }

    /// Build, activate and swap in a new instance. Caller holds `lifecycle`.
    fn publish(&self, sample_rate: u32) -> Result<()> {
        let shared = &*self.shared;
        let instance = match Instance::create_active(
            Arc::clone(&shared.descriptor),
            Arc::clone(&shared.controls),
            sample_rate,
            shared.max_block_size,
        ) {
            Ok(instance) => instance,
            Err(e) => {
                shared.emit(SlotEvent::InstantiationFailed {
                    uri: self.uri().to_string(),
                    sample_rate,
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let cell = Arc::new(InstanceCell {
            instance: Mutex::new(instance),
            sample_rate,
            faulted: AtomicFlag::new(false),
        });
        if let Some(previous) = shared.current.swap(Some(cell)) {
            tracing::debug!(
                "Retiring {} instance at {} Hz",
                self.uri(),
                previous.sample_rate
            );
            shared.retired.lock().push(previous);
        }
        shared.emit(SlotEvent::Instantiated {
            uri: self.uri().to_string(),
            sample_rate,
        });

        self.reclaim();
        Ok(())
    }

    /// Unpublish the current instance. The audio thread bypasses from the next block.
    pub fn destroy(&self) {
        let shared = &*self.shared;
        let _lifecycle = shared.lifecycle.lock();
        if let Some(previous) = shared.current.swap(None) {
            shared.retired.lock().push(previous);
        }
        self.reclaim();
    }

    /// Free retired instances the audio thread no longer holds. Returns how many were freed.
    pub fn reclaim(&self) -> usize {
        let idle = {
            let mut retired = self.shared.retired.lock();
            let (idle, busy): (Vec<_>, Vec<_>) = retired
                .drain(..)
                .partition(|cell| Arc::strong_count(cell) == 1);
            *retired = busy;
            idle
        };

        let freed = idle.len();
        for cell in idle {
            let sample_rate = cell.sample_rate;
            drop(cell);
            self.shared.emit(SlotEvent::Destroyed {
                uri: self.uri().to_string(),
                sample_rate,
            });
        }
        freed
    }

    /// Instances waiting for the audio thread to let go.
    pub fn retired_count(&self) -> usize {
        self.shared.retired.lock().len()
    }

    /// Reclaim until nothing is retired or `timeout` passes. Returns whether all were freed.
    pub fn wait_for_reclaim(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.reclaim();
            if self.retired_count() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Set an input control. Takes effect from the next processed block.
    pub fn set_parameter(&self, symbol: &str, value: f32) -> Result<f32> {
        self.shared.controls.set(symbol, value)
    }

    pub fn parameter(&self, symbol: &str) -> Option<f32> {
        self.shared.controls.get(symbol)
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        self.shared.controls.snapshot()
    }

    pub fn apply_snapshot(&self, snapshot: &ControlSnapshot) -> usize {
        self.shared.controls.apply(snapshot)
    }

    /// Whether the published instance panicked while running.
    pub fn is_faulted(&self) -> bool {
        self.shared
            .current
            .load()
            .as_deref()
            .is_some_and(|cell| cell.faulted.get())
    }

    /// Blocks the plugin ran.
    pub fn processed_blocks(&self) -> u64 {
        self.shared.processed_blocks.load(Ordering::Relaxed)
    }

    /// Blocks copied through because no instance could run.
    pub fn bypassed_blocks(&self) -> u64 {
        self.shared.bypassed_blocks.load(Ordering::Relaxed)
    }

    /// The audio-thread handle. Only one exists at a time; `None` while it is taken.
    pub fn processor(&self) -> Option<SlotProcessor> {
        if self.shared.processor_taken.swap(true) {
            return None;
        }
        Some(SlotProcessor {
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn downgrade(&self) -> WeakPluginSlot {
        WeakPluginSlot {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl std::fmt::Debug for PluginSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSlot")
            .field("uri", &self.uri())
            .field("state", &self.state())
            .field("sample_rate", &self.sample_rate())
            .finish()
    }
}

/// Non-owning slot reference, held by the host for sample-rate changes.
#[derive(Clone)]
pub struct WeakPluginSlot {
    shared: Weak<SlotShared>,
}

impl WeakPluginSlot {
    pub fn upgrade(&self) -> Option<PluginSlot> {
        self.shared.upgrade().map(|shared| PluginSlot { shared })
    }
}

/// Audio-thread handle.
///
/// `process` never blocks, allocates, or frees a plugin. When no instance is
/// published, or it has faulted, the block is bypassed (input copied to
/// output). The instance mutex only hands out `&mut` through the shared
/// cell; this processor is its one user, so `try_lock` does not contend.
pub struct SlotProcessor {
    shared: Arc<SlotShared>,
}

impl SlotProcessor {
    /// Run one block, or bypass it whole.
    ///
    /// A block longer than the slot's max block size is a caller bug: it
    /// panics in debug builds and is bypassed in release builds.
    pub fn process(&mut self, buffers: &mut AudioBuffers<'_>, frames: usize) {
        let shared = &*self.shared;
        let frames = frames.min(buffers.frames());

        if frames > shared.max_block_size {
            debug_assert!(
                false,
                "block of {} frames exceeds max block size {}",
                frames, shared.max_block_size
            );
            shared.bypassed_blocks.fetch_add(1, Ordering::Relaxed);
            buffers.bypass(frames);
            return;
        }

        let current = shared.current.load();
        if let Some(cell) = current.as_deref() {
            if !cell.faulted.get() {
                if let Some(mut instance) = cell.instance.try_lock() {
                    let ran = panic::catch_unwind(AssertUnwindSafe(|| {
                        instance.process(buffers, frames)
                    }));
                    match ran {
                        Ok(true) => {
                            shared.processed_blocks.fetch_add(1, Ordering::Relaxed);
                            return;
                        }
                        Ok(false) => {}
                        Err(_) => cell.faulted.set(true),
                    }
                }
            }
        }

        shared.bypassed_blocks.fetch_add(1, Ordering::Relaxed);
        buffers.bypass(frames);
    }

    /// Whether an instance is currently published.
    pub fn is_active(&self) -> bool {
        self.shared.current.load().is_some()
    }
}

impl Drop for SlotProcessor {
    fn drop(&mut self) {
        self.shared.processor_taken.set(false);
    }
}
