//! Plugin lifecycle integration tests
//!
//! Resolve, introspect, create, bind, run, destroy, against the mock backend.

use crate::helpers::tolerances::{FLOAT_EPSILON, GAIN_EPSILON};
use crate::helpers::*;
use approx::assert_relative_eq;
use sonora::plugin::testing::MockPlugin;
use sonora::plugin::{ControlStorage, Instance, PluginCatalog};
use sonora::prelude::*;
use sonora::{HostError, PortDirection};
use std::sync::Arc;

#[test]
fn test_unity_gain_baseline() {
    let fixture = fixture();
    let catalog = PluginCatalog::new(fixture.backend.clone());
    let descriptor = catalog.resolve(GAIN_URI).unwrap();

    let ports = descriptor.ports();
    assert_eq!(ports.audio_inputs(), 1);
    assert_eq!(ports.audio_outputs(), 1);
    let gain = ports.by_symbol("gain_db").unwrap();
    assert_eq!(gain.direction, PortDirection::Input);
    let range = gain.control_range().unwrap();
    assert_eq!((range.min, range.max, range.default), (-60.0, 20.0, 0.0));

    let controls = Arc::new(ControlStorage::new(ports));
    let mut instance = Instance::create(descriptor, controls.clone(), 48000, 2).unwrap();
    assert_eq!(instance.state(), InstanceState::Instantiated);
    instance.activate();

    let input = [1.0f32, -1.0];
    let mut output = [0.0f32; 2];
    assert_eq!(controls.get("gain_db"), Some(0.0));
    instance.bind(&mut AudioBuffers::mono(&input, &mut output)).run(2);

    assert_relative_eq!(output[0], 1.0, epsilon = FLOAT_EPSILON);
    assert_relative_eq!(output[1], -1.0, epsilon = FLOAT_EPSILON);
}

#[test]
fn test_zero_sample_rate_is_instantiation_failure() {
    let fixture = fixture();
    let catalog = PluginCatalog::new(fixture.backend.clone());
    let slot = PluginSlot::new(catalog.resolve(GAIN_URI).unwrap(), TEST_BLOCK_SIZE);

    let err = slot.create(0).unwrap_err();
    assert!(matches!(err, HostError::InstantiationFailure { sample_rate: 0, .. }));
    assert!(err.is_recoverable());
    assert_eq!(slot.state(), InstanceState::Uninstantiated);
    assert_eq!(fixture.gain.created(), 0);
}

#[test]
fn test_sequential_creates_do_not_leak() {
    let fixture = fixture();
    let catalog = PluginCatalog::new(fixture.backend.clone());
    let slot = PluginSlot::new(catalog.resolve(GAIN_URI).unwrap(), TEST_BLOCK_SIZE);

    slot.create(44100).unwrap();
    slot.create(48000).unwrap();
    slot.create(96000).unwrap();

    assert_eq!(fixture.gain.created(), 3);
    assert_eq!(fixture.gain.live(), 1);
    assert_eq!(fixture.gain.freed_while_active(), 0);

    drop(slot);
    assert_eq!(fixture.gain.live(), 0);
}

#[test]
fn test_create_then_destroy() {
    let fixture = fixture();
    let catalog = PluginCatalog::new(fixture.backend.clone());
    let slot = PluginSlot::new(catalog.resolve(GAIN_URI).unwrap(), TEST_BLOCK_SIZE);

    // Destroying an empty slot is a no-op.
    slot.destroy();
    assert_eq!(slot.state(), InstanceState::Uninstantiated);

    slot.create(TEST_SAMPLE_RATE).unwrap();
    slot.destroy();
    assert_eq!(slot.state(), InstanceState::Uninstantiated);
    assert_eq!(fixture.gain.live(), 0);
    assert_eq!(fixture.gain.deactivations(), 1);
}

#[test]
fn test_missing_plugin_is_recoverable() {
    let fixture = fixture();
    let catalog = PluginCatalog::new(fixture.backend.clone());

    let err = catalog.resolve("urn:example:not-installed").unwrap_err();
    assert!(matches!(err, HostError::PluginNotFound { .. }));
    assert!(err.is_recoverable());

    // The catalog keeps working.
    assert!(catalog.resolve(GAIN_URI).is_ok());
}

#[test]
fn test_failed_instantiation_falls_back_to_bypass() {
    let fixture = fixture_with(
        MockPlugin::gain(GAIN_URI).requires("http://lv2plug.in/ns/ext/worker#schedule"),
    );
    let catalog = PluginCatalog::new(fixture.backend.clone());
    let slot = PluginSlot::new(catalog.resolve(GAIN_URI).unwrap(), TEST_BLOCK_SIZE);
    let mut processor = slot.processor().unwrap();

    assert!(slot.create(TEST_SAMPLE_RATE).is_err());
    slot.set_parameter("gain_db", -12.0).unwrap();

    let input = generate_sine(440.0, TEST_SAMPLE_RATE, 64);
    let mut output = vec![0.0f32; 64];
    processor.process(&mut AudioBuffers::mono(&input, &mut output), 64);

    assert_eq!(output, input);
    assert_eq!(slot.bypassed_blocks(), 1);
}

#[test]
fn test_stereo_plugin_processes_both_channels() {
    let fixture = fixture();
    let host = test_host(&fixture);
    let slot = host.load(STEREO_GAIN_URI).unwrap();
    let mut processor = slot.processor().unwrap();
    slot.set_parameter("gain_db", 6.0).unwrap();

    let left = generate_sine(220.0, TEST_SAMPLE_RATE, 128);
    let right = generate_sine(330.0, TEST_SAMPLE_RATE, 128);
    let mut out_l = vec![0.0f32; 128];
    let mut out_r = vec![0.0f32; 128];
    processor.process(
        &mut AudioBuffers::stereo(&left, &right, &mut out_l, &mut out_r),
        128,
    );

    let gain = db_to_gain(6.0);
    for i in 0..128 {
        assert_relative_eq!(out_l[i], left[i] * gain, epsilon = GAIN_EPSILON);
        assert_relative_eq!(out_r[i], right[i] * gain, epsilon = GAIN_EPSILON);
    }
}

#[test]
fn test_mono_plugin_in_stereo_chain_leaves_right_untouched() {
    let fixture = fixture();
    let host = test_host(&fixture);
    let slot = host.load(GAIN_URI).unwrap();
    let mut processor = slot.processor().unwrap();

    let left = vec![0.25f32; 32];
    let right = vec![0.5f32; 32];
    let mut out_l = vec![0.0f32; 32];
    let mut out_r = vec![-7.0f32; 32];
    processor.process(
        &mut AudioBuffers::stereo(&left, &right, &mut out_l, &mut out_r),
        32,
    );

    assert_eq!(out_l, left);
    // Only the left channel is bound for a mono plugin.
    assert!(out_r.iter().all(|&s| s == -7.0));
}

#[test]
fn test_presets_survive_reload() {
    let fixture = fixture();
    let host = test_host(&fixture);

    let slot = host.load(GAIN_URI).unwrap();
    slot.set_parameter("gain_db", -9.5).unwrap();
    let json = serde_json::to_string(&slot.snapshot()).unwrap();
    drop(slot);

    let restored: ControlSnapshot = serde_json::from_str(&json).unwrap();
    let slot = host.load(GAIN_URI).unwrap();
    assert_eq!(slot.parameter("gain_db"), Some(0.0));
    assert_eq!(slot.apply_snapshot(&restored), 1);
    assert_eq!(slot.parameter("gain_db"), Some(-9.5));
}
