//! Port introspection.
//!
//! Each port is classified once, when a descriptor is first asked for its
//! ports. Everything downstream matches on [`PortKind`] instead of probing
//! the plugin again.

use crate::backend::NativePlugin;
use crate::error::{PortShapeError, ShapeFault};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
    /// Neither, on an optional port. Non-optional ports end up here too, with a fault.
    Undeclared,
}

/// Value range of a control port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ControlRange {
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PortKind {
    Control(ControlRange),
    Audio,
    /// Atom, CV, event... never connected by this host.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub index: usize,
    pub name: String,
    pub symbol: String,
    pub direction: PortDirection,
    pub kind: PortKind,
    pub optional: bool,
    /// Default value, never NaN.
    pub default: f32,
}

impl Port {
    pub fn is_audio_input(&self) -> bool {
        self.kind == PortKind::Audio && self.direction == PortDirection::Input
    }

    pub fn is_audio_output(&self) -> bool {
        self.kind == PortKind::Audio && self.direction == PortDirection::Output
    }

    pub fn control_range(&self) -> Option<ControlRange> {
        match self.kind {
            PortKind::Control(range) => Some(range),
            _ => None,
        }
    }
}

/// Mono or stereo routing, decided from the audio port counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

/// Ordered result of one introspection pass. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct PortTable {
    ports: Vec<Port>,
    audio_inputs: usize,
    audio_outputs: usize,
    by_symbol: HashMap<String, usize>,
    faults: Vec<PortShapeError>,
}

impl PortTable {
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Port> {
        self.ports.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&Port> {
        self.by_symbol.get(symbol).map(|&index| &self.ports[index])
    }

    pub fn control_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .filter(|port| matches!(port.kind, PortKind::Control(_)))
    }

    pub fn audio_inputs(&self) -> usize {
        self.audio_inputs
    }

    pub fn audio_outputs(&self) -> usize {
        self.audio_outputs
    }

    pub fn channel_layout(&self) -> ChannelLayout {
        if self.audio_inputs <= 1 && self.audio_outputs <= 1 {
            ChannelLayout::Mono
        } else {
            ChannelLayout::Stereo
        }
    }

    /// Ports that could not be classified during the pass.
    pub fn faults(&self) -> &[PortShapeError] {
        &self.faults
    }
}

impl<'a> IntoIterator for &'a PortTable {
    type Item = &'a Port;
    type IntoIter = std::slice::Iter<'a, Port>;

    fn into_iter(self) -> Self::IntoIter {
        self.ports.iter()
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value
    }
}

/// Classify every port of `plugin`, in index order.
///
/// A port that cannot be classified is kept (indices stay `0..N-1`), logged,
/// and recorded in [`PortTable::faults`]; the remaining ports are unaffected.
pub fn introspect(plugin: &dyn NativePlugin) -> PortTable {
    let uri = plugin.uri();
    let count = plugin.port_count();
    let mut table = PortTable {
        ports: Vec::with_capacity(count),
        ..Default::default()
    };

    for index in 0..count {
        let raw = plugin.port(index);
        let default = finite_or(raw.default, 0.0);
        let mut fault = None;

        let direction = if raw.is_input {
            PortDirection::Input
        } else if raw.is_output {
            PortDirection::Output
        } else {
            if !raw.connection_optional {
                fault = Some(ShapeFault::NoDirection);
            }
            PortDirection::Undeclared
        };

        let kind = if raw.is_control {
            PortKind::Control(ControlRange {
                min: finite_or(raw.minimum, f32::MIN),
                max: finite_or(raw.maximum, f32::MAX),
                default,
            })
        } else if raw.is_audio {
            match direction {
                PortDirection::Input => table.audio_inputs += 1,
                PortDirection::Output => table.audio_outputs += 1,
                PortDirection::Undeclared => {}
            }
            PortKind::Audio
        } else {
            if !raw.connection_optional && fault.is_none() {
                fault = Some(ShapeFault::UnsupportedKind);
            }
            PortKind::Unsupported
        };

        if let Some(fault) = fault {
            let err = PortShapeError {
                plugin: uri.to_string(),
                index,
                name: raw.name.clone(),
                fault,
            };
            tracing::warn!("{}", err);
            table.faults.push(err);
        }

        table.by_symbol.entry(raw.symbol.clone()).or_insert(index);
        table.ports.push(Port {
            index,
            name: raw.name,
            symbol: raw.symbol,
            direction,
            kind,
            optional: raw.connection_optional,
            default,
        });
    }

    if table.audio_inputs > 2 || table.audio_outputs > 2 {
        tracing::warn!(
            "{}: {} audio inputs / {} audio outputs, only the first two of each are connected",
            uri,
            table.audio_inputs,
            table.audio_outputs
        );
    }

    tracing::debug!(
        "{}: {} ports ({} audio in, {} audio out)",
        uri,
        table.len(),
        table.audio_inputs,
        table.audio_outputs
    );

    table
}
