//! Integration tests for the equalizer engine
//!
//! These tests drive the engine the way a host would: prepare once, then per
//! block either refresh settings from the shared parameter store or let a
//! controller on another thread hand over designed coefficients.

use basic_eq_core::domain::{
    ChainCoefficients, ChainSettings, EngineConfig, EqualizerConfig, EqualizerEngine, ParameterId,
    SharedParameters, Slope,
};
use basic_eq_tests::{generate_sine_wave, level_change_db, SAMPLE_RATE};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const BLOCK: usize = 512;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Run `input` through a prepared engine block by block, refreshing settings
/// from `store` before every block like an audio callback would
fn run_blocks(engine: &mut EqualizerEngine, store: &SharedParameters, input: &[f32]) -> Vec<f32> {
    let mut output = input.to_vec();
    for block in output.chunks_mut(BLOCK) {
        engine.update_if_changed(&store.chain_settings());
        engine.process(&mut [block]);
    }
    output
}

/// Steady-state level change over the last 100 ms of a one second tone
fn steady_state_db(settings: &ChainSettings, frequency: f64) -> f64 {
    let mut engine = EqualizerEngine::new();
    engine.prepare(SAMPLE_RATE, BLOCK, 1).unwrap();
    let store = SharedParameters::from_settings(settings);

    let input = generate_sine_wave(frequency, 48000);
    let output = run_blocks(&mut engine, &store, &input);
    let tail = 48000 - 4800;
    level_change_db(&input[tail..], &output[tail..])
}

// ============================================================================
// FREQUENCY RESPONSE
// ============================================================================

#[test]
fn test_peak_boost_through_engine() {
    init_tracing();
    let settings = ChainSettings {
        peak_frequency: 1000.0,
        peak_quality: 1.0,
        peak_gain_db: 6.0,
        ..ChainSettings::default()
    };

    let center = steady_state_db(&settings, 1000.0);
    assert!((center - 6.0).abs() < 0.2, "1 kHz changed by {center} dB");

    for probe in [100.0, 10000.0] {
        let change = steady_state_db(&settings, probe);
        assert!(change.abs() < 0.5, "{probe} Hz changed by {change} dB");
    }
}

#[test]
fn test_flat_peak_is_transparent() {
    let settings = ChainSettings {
        peak_frequency: 3000.0,
        peak_quality: 7.5,
        peak_gain_db: 0.0,
        ..ChainSettings::default()
    };

    for probe in [300.0, 3000.0] {
        let change = steady_state_db(&settings, probe);
        assert!(change.abs() < 0.05, "{probe} Hz changed by {change} dB");
    }
}

#[test]
fn test_high_cut_slopes() {
    for slope in Slope::ALL {
        let settings = ChainSettings {
            high_cut_frequency: 1000.0,
            high_cut_slope: slope,
            ..ChainSettings::default()
        };

        let octave = steady_state_db(&settings, 2000.0);
        let expected = -12.4 * slope.stages() as f64;
        assert!(
            (octave - expected).abs() < 1.0,
            "{}: one octave above corner was {octave} dB",
            slope.label()
        );
    }
}

#[test]
fn test_low_cut_removes_rumble() {
    let settings = ChainSettings {
        low_cut_frequency: 400.0,
        low_cut_slope: Slope::Db48,
        ..ChainSettings::default()
    };

    let rumble = steady_state_db(&settings, 100.0);
    assert!(rumble < -80.0, "100 Hz only dropped {rumble} dB");

    let voice = steady_state_db(&settings, 4000.0);
    assert!(voice.abs() < 0.1, "4 kHz changed by {voice} dB");
}

// ============================================================================
// CHANNEL HANDLING
// ============================================================================

#[test]
fn test_mono_engine_zeroes_second_channel() {
    let mut engine = EqualizerEngine::new();
    engine.prepare(SAMPLE_RATE, BLOCK, 1).unwrap();

    let mut buffer = vec![generate_sine_wave(440.0, BLOCK), generate_sine_wave(880.0, BLOCK)];
    engine.process(&mut buffer);

    assert!(buffer[0].iter().any(|&s| s != 0.0));
    assert!(buffer[1].iter().all(|&s| s == 0.0));
}

#[test]
fn test_stereo_channels_keep_independent_history() {
    let mut engine = EqualizerEngine::with_settings(ChainSettings {
        peak_frequency: 500.0,
        peak_gain_db: 9.0,
        ..ChainSettings::default()
    });
    engine.prepare(SAMPLE_RATE, BLOCK, 2).unwrap();

    let mut left = generate_sine_wave(500.0, BLOCK);
    let mut right = vec![0.0; BLOCK];
    engine.process(&mut [&mut left[..], &mut right[..]]);

    // Signal on the left must not leak into the right chain
    assert!(right.iter().all(|&s| s == 0.0));
    assert!(left.iter().any(|&s| s.abs() > 1.5));
}

// ============================================================================
// AUTOMATION
// ============================================================================

#[test]
fn test_automation_from_control_thread() {
    init_tracing();
    let store = Arc::new(SharedParameters::new());
    let mut engine = EqualizerEngine::new();
    engine.prepare(SAMPLE_RATE, BLOCK, 2).unwrap();
    assert_eq!(engine.coefficient_updates(), 1);

    let control = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            store.set(ParameterId::PeakFreq, 2000.0);
            store.set(ParameterId::PeakGain, -6.0);
            store.set(ParameterId::LowCutSlope, 3.0);
        })
    };
    control.join().unwrap();

    let mut left = generate_sine_wave(2000.0, BLOCK);
    let mut right = left.clone();
    for _ in 0..3 {
        engine.update_if_changed(&store.chain_settings());
        engine.process(&mut [&mut left[..], &mut right[..]]);
    }

    // Three blocks, one actual change
    assert_eq!(engine.coefficient_updates(), 2);
    assert_eq!(engine.settings().peak_gain_db, -6.0);
    assert_eq!(engine.settings().low_cut_slope, Slope::Db48);
    assert_eq!(engine.chain(1).unwrap().low_cut().active_stages(), 4);
}

#[test]
fn test_controller_write_lands_on_next_block() {
    init_tracing();
    let mut engine = EqualizerEngine::new();
    engine.prepare(SAMPLE_RATE, BLOCK, 2).unwrap();
    let controller = engine.controller();

    let wanted = ChainSettings {
        low_cut_frequency: 120.0,
        low_cut_slope: Slope::Db24,
        peak_frequency: 2000.0,
        peak_gain_db: -6.0,
        ..ChainSettings::default()
    };

    // Whole snapshot designed and sent from the control thread
    let control = thread::spawn(move || {
        let mut controller = controller;
        assert!(controller.update_if_changed(&wanted));
        controller
    });
    let controller = control.join().unwrap();
    assert_eq!(controller.designs(), 1);

    let mut left = generate_sine_wave(2000.0, BLOCK);
    let mut right = left.clone();
    assert_eq!(*engine.settings(), ChainSettings::default());
    engine.process(&mut [&mut left[..], &mut right[..]]);

    assert_eq!(*engine.settings(), wanted);
    let expected = ChainCoefficients::design(&wanted, SAMPLE_RATE);
    let chain = engine.chain(1).unwrap();
    assert_eq!(*chain.peak().coefficients(), expected.peak);
    assert_eq!(chain.low_cut().active_stages(), 2);
    assert_eq!(engine.coefficient_updates(), 1);
}

#[test]
fn test_controller_runs_alongside_audio() {
    let mut engine = EqualizerEngine::new();
    engine.prepare(SAMPLE_RATE, 128, 2).unwrap();
    let mut controller = engine.controller_with_capacity(4);

    let control = thread::spawn(move || {
        for step in 0..200 {
            let settings = ChainSettings {
                peak_frequency: 500.0 + 10.0 * step as f32,
                peak_gain_db: (step % 48) as f32 - 24.0,
                ..ChainSettings::default()
            };
            controller.update_if_changed(&settings);
            thread::yield_now();
        }
        while !controller.flush() {
            thread::yield_now();
        }
        controller
    });

    let mut left = generate_sine_wave(1000.0, 128);
    let mut right = left.clone();
    while !control.is_finished() {
        engine.process(&mut [&mut left[..], &mut right[..]]);
        assert!(left.iter().chain(right.iter()).all(|s| s.is_finite()));
    }
    let controller = control.join().unwrap();

    // Whatever was still queued arrives with the next block
    engine.process(&mut [&mut left[..], &mut right[..]]);
    assert_eq!(engine.settings(), controller.settings());
    assert_eq!(engine.settings().peak_frequency, 2490.0);
}

#[test]
fn test_sweeping_gain_stays_continuous() {
    let store = SharedParameters::new();
    store.set(ParameterId::PeakFreq, 200.0);
    let mut engine = EqualizerEngine::new();
    engine.prepare(SAMPLE_RATE, 64, 1).unwrap();

    // Slow tone, gain swept every 64-sample block across the full range
    let input = generate_sine_wave(50.0, 64 * 400);
    let mut output = input.clone();
    for (index, block) in output.chunks_mut(64).enumerate() {
        store.set(ParameterId::PeakGain, -24.0 + 48.0 * index as f32 / 400.0);
        engine.update_if_changed(&store.chain_settings());
        engine.process(&mut [block]);
    }

    assert!(output.iter().all(|s| s.is_finite()));
    // A 50 Hz tone moves at most ~0.0066 per sample at unit level; the bell
    // adds gain but nothing resembling an impulse
    let max_step = output
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(0.0f32, f32::max);
    assert!(max_step < 0.05, "largest sample step was {max_step}");
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_reprepare_with_restored_settings() {
    let restored = ChainSettings {
        low_cut_frequency: 60.0,
        high_cut_frequency: 15000.0,
        peak_frequency: 1200.0,
        peak_gain_db: 4.5,
        peak_quality: 0.7,
        low_cut_slope: Slope::Db24,
        high_cut_slope: Slope::Db36,
    };

    let mut engine = EqualizerEngine::new();
    engine.prepare(44100.0, 256, 2).unwrap();
    engine.update_if_changed(&restored);
    engine.release_resources();

    engine.prepare(96000.0, 1024, 2).unwrap();
    assert_eq!(*engine.settings(), restored);
    let db = 20.0 * engine.magnitude_for_frequency(1200.0).unwrap().log10();
    assert!((db - 4.5).abs() < 0.1);
}

#[tokio::test]
async fn test_engine_from_config_file() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("eq.toml");

    let config = EqualizerConfig {
        engine: EngineConfig {
            sample_rate: SAMPLE_RATE,
            max_block_size: BLOCK,
            ..EngineConfig::default()
        },
        settings: ChainSettings {
            peak_frequency: 1000.0,
            peak_gain_db: -12.0,
            ..ChainSettings::default()
        },
    };
    config.save_to_file(&path).await.unwrap();

    let loaded = EqualizerConfig::load_from_file(&path).await.unwrap();
    let mut engine = EqualizerEngine::with_settings(loaded.settings);
    engine.prepare_with_config(&loaded.engine).unwrap();
    assert_eq!(engine.num_channels(), 2);

    let input = generate_sine_wave(1000.0, BLOCK);
    let mut left = input.clone();
    let mut right = input.clone();
    engine.process(&mut [&mut left[..], &mut right[..]]);

    // Steady state is not reached in one block; the cut must already bite
    assert!(level_change_db(&input[256..], &left[256..]) < -6.0);
}

#[test]
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
fn test_decay_reaches_true_silence() {
    let mut engine = EqualizerEngine::with_settings(ChainSettings {
        low_cut_slope: Slope::Db48,
        high_cut_slope: Slope::Db48,
        ..ChainSettings::default()
    });
    engine.prepare(SAMPLE_RATE, BLOCK, 1).unwrap();

    let mut impulse = vec![0.0f32; BLOCK];
    impulse[0] = 1.0;
    engine.process(&mut [&mut impulse[..]]);

    // Five seconds of silence; the output must settle at exact zero
    let mut block = vec![0.0f32; BLOCK];
    for _ in 0..(5 * 48000 / BLOCK) {
        block.fill(0.0);
        engine.process(&mut [&mut block[..]]);
    }
    assert!(block.iter().all(|&s| s == 0.0));
}
