//! Signal helpers shared by the integration tests

use std::f64::consts::PI;

pub const SAMPLE_RATE: f64 = 48000.0;

/// Unit-amplitude sine at `frequency`
pub fn generate_sine_wave(frequency: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * PI * frequency * i as f64 / SAMPLE_RATE).sin() as f32)
        .collect()
}

pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

/// Level change from `input` to `output` in dB, measured by RMS
pub fn level_change_db(input: &[f32], output: &[f32]) -> f64 {
    20.0 * (rms(output) / rms(input)).log10()
}
