//! PluginHost facade integration tests

use crate::helpers::*;
use sonora::plugin::testing::MockBackend;
use sonora::prelude::*;
use sonora::HostError;
use std::sync::Arc;

#[test]
fn test_builder_validates_config() {
    let fixture = fixture();

    let err = PluginHost::builder()
        .sample_rate(1000)
        .backend(fixture.backend.clone())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Core(_)));

    let err = PluginHost::builder()
        .max_block_size(0)
        .backend(fixture.backend.clone())
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("block size"));

    let host = test_host(&fixture);
    assert_eq!(host.sample_rate(), TEST_SAMPLE_RATE);
    assert_eq!(host.config().max_block_size, TEST_BLOCK_SIZE);
}

#[test]
fn test_plugins_lists_catalog() {
    let fixture = fixture();
    let host = test_host(&fixture);

    let plugins = host.plugins().unwrap();
    let names: Vec<_> = plugins.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Gain", "Stereo Gain"]);
    assert_eq!(fixture.backend.discover_calls(), 1);
}

#[test]
fn test_load_unknown_uri() {
    let fixture = fixture();
    let host = test_host(&fixture);

    let err = host.load("urn:example:nope").unwrap_err();
    assert!(matches!(
        err.as_host_error(),
        Some(HostError::PluginNotFound { .. })
    ));
}

#[test]
fn test_unavailable_catalog_is_fatal() {
    let host = PluginHost::builder()
        .backend(Arc::new(MockBackend::failing("no LV2_PATH")))
        .build()
        .unwrap();

    let err = host.load(GAIN_URI).unwrap_err();
    let host_error = err.as_host_error().unwrap();
    assert!(matches!(host_error, HostError::CatalogUnavailable { .. }));
    assert!(!host_error.is_recoverable());
    assert!(host.plugins().is_err());
}

#[test]
fn test_set_sample_rate_replaces_live_slots() {
    let fixture = fixture();
    let host = test_host(&fixture);

    let mono = host.load(GAIN_URI).unwrap();
    let stereo = host.load(STEREO_GAIN_URI).unwrap();
    let dropped = host.load(GAIN_URI).unwrap();
    drop(dropped);

    assert_eq!(host.set_sample_rate(96000).unwrap(), 2);
    assert_eq!(host.sample_rate(), 96000);
    assert_eq!(mono.sample_rate(), Some(96000));
    assert_eq!(stereo.sample_rate(), Some(96000));
    assert_eq!(fixture.gain.live(), 1);
    assert_eq!(fixture.stereo.live(), 1);

    // New loads use the new rate.
    let late = host.load(GAIN_URI).unwrap();
    assert_eq!(late.sample_rate(), Some(96000));
}

#[test]
fn test_set_sample_rate_leaves_destroyed_slot_empty() {
    let fixture = fixture();
    let host = test_host(&fixture);

    let slot = host.load(GAIN_URI).unwrap();
    slot.destroy();
    assert_eq!(fixture.gain.live(), 0);

    assert_eq!(host.set_sample_rate(44100).unwrap(), 0);
    assert_eq!(slot.state(), InstanceState::Uninstantiated);
    assert_eq!(slot.sample_rate(), None);
    assert_eq!(fixture.gain.live(), 0);
    assert_eq!(fixture.gain.created(), 1);

    // Re-creating picks up the new rate explicitly.
    slot.create(host.sample_rate()).unwrap();
    assert_eq!(slot.sample_rate(), Some(44100));
}

#[test]
fn test_set_sample_rate_rejects_invalid_rate() {
    let fixture = fixture();
    let host = test_host(&fixture);
    let slot = host.load(GAIN_URI).unwrap();

    assert!(host.set_sample_rate(0).is_err());
    assert_eq!(host.sample_rate(), TEST_SAMPLE_RATE);
    assert_eq!(slot.sample_rate(), Some(TEST_SAMPLE_RATE));
}

#[test]
fn test_events_report_lifecycle() {
    let fixture = fixture();
    let host = test_host(&fixture);
    let events = host.events();

    let slot = host.load(GAIN_URI).unwrap();
    host.set_sample_rate(44100).unwrap();
    slot.destroy();

    let received: Vec<_> = events.try_iter().collect();
    assert_eq!(
        received,
        [
            SlotEvent::Instantiated {
                uri: GAIN_URI.to_string(),
                sample_rate: TEST_SAMPLE_RATE,
            },
            SlotEvent::Instantiated {
                uri: GAIN_URI.to_string(),
                sample_rate: 44100,
            },
            SlotEvent::Destroyed {
                uri: GAIN_URI.to_string(),
                sample_rate: TEST_SAMPLE_RATE,
            },
            SlotEvent::Destroyed {
                uri: GAIN_URI.to_string(),
                sample_rate: 44100,
            },
        ]
    );
}
