//! Instance hand-over integration tests
//!
//! A real audio thread keeps processing while the control thread replaces
//! the instance. Every block must come out of either the old or the new
//! instance in full, never a half-bound one.

use crate::helpers::tolerances::GAIN_EPSILON;
use crate::helpers::*;
use sonora::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const HALF_GAIN_DB: f32 = -6.020_6;

#[test]
fn test_replace_under_running_audio_thread() {
    let fixture = fixture();
    let host = test_host(&fixture);
    let slot = host.load(GAIN_URI).unwrap();
    slot.set_parameter("gain_db", HALF_GAIN_DB).unwrap();

    let mut processor = slot.processor().unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let blocks = Arc::new(AtomicUsize::new(0));

    let audio = {
        let running = Arc::clone(&running);
        let blocks = Arc::clone(&blocks);
        thread::spawn(move || {
            let input = vec![1.0f32; TEST_BLOCK_SIZE];
            let mut output = vec![0.0f32; TEST_BLOCK_SIZE];
            let mut bad_blocks = 0;
            while running.load(Ordering::Relaxed) {
                output.fill(0.0);
                processor.process(&mut AudioBuffers::mono(&input, &mut output), TEST_BLOCK_SIZE);
                if output.iter().any(|&s| (s - 0.5).abs() > GAIN_EPSILON) {
                    bad_blocks += 1;
                }
                blocks.fetch_add(1, Ordering::Relaxed);
            }
            bad_blocks
        })
    };

    let rates = [44100, 48000, 88200, 96000];
    for round in 0..40 {
        slot.replace(rates[round % rates.len()]).unwrap();
        thread::sleep(Duration::from_micros(200));
    }

    // Let the audio thread observe the final instance.
    let seen = blocks.load(Ordering::Relaxed);
    while blocks.load(Ordering::Relaxed) < seen + 10 {
        thread::yield_now();
    }
    running.store(false, Ordering::Relaxed);
    let bad_blocks = audio.join().unwrap();

    assert_eq!(bad_blocks, 0);
    assert_eq!(slot.bypassed_blocks(), 0);
    assert_eq!(slot.sample_rate(), Some(96000));
    assert!(slot.wait_for_reclaim(Duration::from_secs(1)));
    assert_eq!(fixture.gain.created(), 41);
    assert_eq!(fixture.gain.live(), 1);
    assert_eq!(fixture.gain.freed_while_active(), 0);
}

#[test]
fn test_parameter_writes_reach_running_instance() {
    let fixture = fixture();
    let host = test_host(&fixture);
    let slot = host.load(GAIN_URI).unwrap();
    let mut processor = slot.processor().unwrap();

    let input = vec![1.0f32; 64];
    let mut output = vec![0.0f32; 64];

    for db in [-20.0f32, -6.0, 0.0, 12.0] {
        slot.set_parameter("gain_db", db).unwrap();
        processor.process(&mut AudioBuffers::mono(&input, &mut output), 64);
        let expected = db_to_gain(db);
        assert!(output.iter().all(|&s| (s - expected).abs() < GAIN_EPSILON));
    }

    // Values carry over to a replaced instance.
    slot.replace(44100).unwrap();
    processor.process(&mut AudioBuffers::mono(&input, &mut output), 64);
    assert!((output[0] - db_to_gain(12.0)).abs() < GAIN_EPSILON);
}

#[test]
fn test_destroy_while_processing_bypasses() {
    let fixture = fixture();
    let host = test_host(&fixture);
    let slot = host.load(GAIN_URI).unwrap();
    slot.set_parameter("gain_db", -60.0).unwrap();
    let mut processor = slot.processor().unwrap();

    let audio = thread::spawn(move || {
        let input = vec![1.0f32; 128];
        let mut output = vec![0.0f32; 128];
        let mut passthrough = 0;
        for _ in 0..2000 {
            processor.process(&mut AudioBuffers::mono(&input, &mut output), 128);
            if output[0] == 1.0 {
                passthrough += 1;
            }
            if !processor.is_active() && passthrough > 0 {
                break;
            }
        }
        passthrough
    });

    thread::sleep(Duration::from_millis(1));
    slot.destroy();
    let passthrough = audio.join().unwrap();

    assert!(slot.wait_for_reclaim(Duration::from_secs(1)));
    assert_eq!(slot.state(), InstanceState::Uninstantiated);
    assert_eq!(fixture.gain.live(), 0);
    // Blocks after the destroy were copied through, not silenced.
    assert!(passthrough == 0 || slot.bypassed_blocks() > 0);
}
