//! Control-port value storage.
//!
//! One [`AtomicFloat`] per control port, in a boxed slice allocated once per
//! plugin slot. The plugin keeps the raw address of each value from
//! connect time until it is freed, so the slice never reallocates and is
//! shared (`Arc`) by every instance created for the slot.
//!
//! The control thread writes with single atomic stores; the plugin reads the
//! same words from the audio thread. No value is ever observed half-written.

use crate::error::{HostError, Result};
use crate::port::{ControlRange, PortDirection, PortTable};
use serde::{Deserialize, Serialize};
use sonora_core::AtomicFloat;
use std::collections::{BTreeMap, HashMap};

struct ControlSlot {
    port_index: usize,
    symbol: String,
    direction: PortDirection,
    range: ControlRange,
    value: AtomicFloat,
}

/// Input control values keyed by port symbol, for presets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    pub values: BTreeMap<String, f32>,
}

impl ControlSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: impl Into<String>, value: f32) -> Self {
        self.values.insert(symbol.into(), value);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<f32> {
        self.values.get(symbol).copied()
    }
}

pub struct ControlStorage {
    slots: Box<[ControlSlot]>,
    by_symbol: HashMap<String, usize>,
}

impl ControlStorage {
    /// One slot per control port of `ports`, initialised to the port defaults.
    pub fn new(ports: &PortTable) -> Self {
        let slots: Box<[ControlSlot]> = ports
            .control_ports()
            .filter_map(|port| {
                port.control_range().map(|range| ControlSlot {
                    port_index: port.index,
                    symbol: port.symbol.clone(),
                    direction: port.direction,
                    range,
                    value: AtomicFloat::new(port.default),
                })
            })
            .collect();

        let by_symbol = slots
            .iter()
            .enumerate()
            .map(|(slot, control)| (control.symbol.clone(), slot))
            .collect();

        Self { slots, by_symbol }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, symbol: &str) -> Result<&ControlSlot> {
        self.by_symbol
            .get(symbol)
            .map(|&slot| &self.slots[slot])
            .ok_or_else(|| HostError::UnknownPort {
                symbol: symbol.to_string(),
            })
    }

    /// Current value of a control port, input or output.
    pub fn get(&self, symbol: &str) -> Option<f32> {
        self.slot(symbol).ok().map(|slot| slot.value.get())
    }

    /// Write an input control, clamped into the port's range. Returns the stored value.
    pub fn set(&self, symbol: &str, value: f32) -> Result<f32> {
        let slot = self.slot(symbol)?;
        if slot.direction != PortDirection::Input {
            return Err(HostError::ReadOnlyPort {
                symbol: symbol.to_string(),
            });
        }

        let clamped = slot.range.clamp(value);
        slot.value.set(clamped);
        Ok(clamped)
    }

    /// Every control port's `(symbol, value)`, in port order.
    pub fn values(&self) -> Vec<(String, f32)> {
        self.slots
            .iter()
            .map(|slot| (slot.symbol.clone(), slot.value.get()))
            .collect()
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        let values = self
            .slots
            .iter()
            .filter(|slot| slot.direction == PortDirection::Input)
            .map(|slot| (slot.symbol.clone(), slot.value.get()))
            .collect();
        ControlSnapshot { values }
    }

    /// Restore input controls from a snapshot. Returns how many were applied.
    ///
    /// Symbols the plugin no longer has are skipped.
    pub fn apply(&self, snapshot: &ControlSnapshot) -> usize {
        let mut applied = 0;
        for (symbol, &value) in &snapshot.values {
            match self.set(symbol, value) {
                Ok(_) => applied += 1,
                Err(e) => tracing::debug!("Skipping preset value: {}", e),
            }
        }
        applied
    }

    /// Put every input control back to its default.
    pub fn reset(&self) {
        for slot in self.slots.iter() {
            if slot.direction == PortDirection::Input {
                slot.value.set(slot.range.default);
            }
        }
    }

    /// Whether this storage was built from `ports` (same control ports, same indices).
    pub(crate) fn matches(&self, ports: &PortTable) -> bool {
        self.slots.len() == ports.control_ports().count()
            && self.slots.iter().all(|slot| {
                ports
                    .get(slot.port_index)
                    .is_some_and(|port| port.symbol == slot.symbol)
            })
    }

    /// `(port index, value address)` for every control port.
    ///
    /// The addresses stay valid for the lifetime of `self`.
    pub(crate) fn addresses(&self) -> impl Iterator<Item = (usize, *mut f32)> + '_ {
        self.slots
            .iter()
            .map(|slot| (slot.port_index, slot.value.as_mut_ptr()))
    }
}

impl std::fmt::Debug for ControlStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|slot| (&slot.symbol, slot.value.get())))
            .finish()
    }
}
