//! Test helpers and fixtures for sonora integration tests.
//!
//! Everything runs against the in-memory mock backend, so no LV2 bundles
//! need to be installed.

#![allow(dead_code)]

pub mod tolerances;

use sonora::plugin::testing::{InstanceCounters, MockBackend, MockPlugin};
use sonora::prelude::*;
use std::sync::Arc;

pub const TEST_SAMPLE_RATE: u32 = 48000;

pub const TEST_BLOCK_SIZE: usize = 512;

pub const GAIN_URI: &str = "urn:example:gain";

pub const STEREO_GAIN_URI: &str = "http://example.org/plugins/stereo-gain";

/// A mock backend with a mono and a stereo gain plugin, plus their counters.
pub struct Fixture {
    pub backend: Arc<MockBackend>,
    pub gain: Arc<InstanceCounters>,
    pub stereo: Arc<InstanceCounters>,
}

pub fn fixture() -> Fixture {
    fixture_with(MockPlugin::gain(GAIN_URI))
}

/// Like [`fixture`], with a customised mono gain plugin.
pub fn fixture_with(gain: MockPlugin) -> Fixture {
    let stereo = MockPlugin::stereo_gain(STEREO_GAIN_URI);
    let counters = (gain.counters(), stereo.counters());
    Fixture {
        backend: Arc::new(MockBackend::new().with_plugin(gain).with_plugin(stereo)),
        gain: counters.0,
        stereo: counters.1,
    }
}

pub fn test_host(fixture: &Fixture) -> PluginHost {
    PluginHost::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .max_block_size(TEST_BLOCK_SIZE)
        .backend(fixture.backend.clone())
        .build()
        .expect("Failed to create test host")
}

/// Sine wave at `frequency` Hz.
pub fn generate_sine(frequency: f32, sample_rate: u32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}
