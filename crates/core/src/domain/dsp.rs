//! Biquad building blocks for the equalizer signal path
//!
//! This module provides:
//! - Coefficient design for low-pass, high-pass and peaking responses
//! - A single second-order IIR stage with persistent history
//! - A fixed four-stage cascade for steeper cut slopes
//!
//! All processing is designed for:
//! - Zero allocations in the hot path
//! - Coefficient swaps that never touch filter history
//! - A branch-free, fixed-size serial topology
//!
//! Sample buffers are `f32`. Coefficients and history are `f64`: a 20 Hz
//! corner at high sample rates puts the poles within a few ulps of z = 1 in
//! single precision.

use crate::domain::audio::{MonoProcessor, ProcessSpec};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Q of a second-order Butterworth section (1/sqrt(2))
pub const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Number of biquads a cut cascade always materializes
pub const MAX_CASCADE_STAGES: usize = 4;

// ============================================================================
// COEFFICIENTS
// ============================================================================

/// Biquad filter coefficients
///
/// Normalized so that a0 is 1.0. Coefficient sets are small `Copy` values:
/// they are replaced wholesale, never edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    /// Denominator coefficients (a0 is normalized to 1.0)
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    /// Pass-through coefficients (b0 = 1, everything else 0)
    pub const fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let inv_a0 = 1.0 / a0;
        Self {
            b0: b0 * inv_a0,
            b1: b1 * inv_a0,
            b2: b2 * inv_a0,
            a1: a1 * inv_a0,
            a2: a2 * inv_a0,
        }
    }

    /// Second-order low-pass (bilinear transform, pre-warped corner)
    ///
    /// `frequency` must lie strictly inside (0, sample_rate / 2) and `q` must
    /// be positive. Callers clamp before getting here.
    #[must_use]
    pub fn low_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        debug_assert!(frequency > 0.0 && frequency < sample_rate * 0.5);
        debug_assert!(q > 0.0);

        let n = 1.0 / (PI * frequency / sample_rate).tan();
        let n_sq = n * n;
        let inv_q = 1.0 / q;

        Self::normalized(
            1.0,
            2.0,
            1.0,
            1.0 + inv_q * n + n_sq,
            2.0 * (1.0 - n_sq),
            1.0 - inv_q * n + n_sq,
        )
    }

    /// Second-order high-pass (bilinear transform, pre-warped corner)
    #[must_use]
    pub fn high_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        debug_assert!(frequency > 0.0 && frequency < sample_rate * 0.5);
        debug_assert!(q > 0.0);

        let n = (PI * frequency / sample_rate).tan();
        let n_sq = n * n;
        let inv_q = 1.0 / q;

        Self::normalized(
            1.0,
            -2.0,
            1.0,
            1.0 + inv_q * n + n_sq,
            2.0 * (n_sq - 1.0),
            1.0 - inv_q * n + n_sq,
        )
    }

    /// Peaking (bell) filter
    ///
    /// `gain_linear` is an amplitude ratio, not decibels; see [`db_to_gain`].
    /// A unity gain bell is exactly the identity, so it is returned as such.
    #[must_use]
    pub fn peak(sample_rate: f64, frequency: f64, q: f64, gain_linear: f64) -> Self {
        debug_assert!(frequency > 0.0 && frequency < sample_rate * 0.5);
        debug_assert!(q > 0.0);

        if gain_linear == 1.0 {
            return Self::identity();
        }

        let a = gain_linear.max(f64::EPSILON).sqrt();
        let omega = 2.0 * PI * frequency / sample_rate;
        let alpha = omega.sin() / (2.0 * q);
        let c2 = -2.0 * omega.cos();

        Self::normalized(
            1.0 + alpha * a,
            c2,
            1.0 - alpha * a,
            1.0 + alpha / a,
            c2,
            1.0 - alpha / a,
        )
    }

    /// True when both poles sit strictly inside the unit circle
    ///
    /// Uses the stability triangle for `1 + a1 z^-1 + a2 z^-2`.
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Magnitude of the frequency response at `frequency` (linear, not dB)
    ///
    /// Control-context helper for drawing response curves; evaluates
    /// H(e^jw) directly and is far too slow for per-sample use.
    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        let omega = 2.0 * PI * frequency / sample_rate;
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;

        let numerator = Complex64::new(self.b0, 0.0) + z1 * self.b1 + z2 * self.b2;
        let denominator = Complex64::new(1.0, 0.0) + z1 * self.a1 + z2 * self.a2;

        (numerator / denominator).norm()
    }
}

/// Convert decibels to a linear amplitude ratio
#[inline]
pub fn db_to_gain(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a linear amplitude ratio to decibels
#[inline]
pub fn gain_to_db(gain: f64) -> f64 {
    20.0 * gain.log10()
}

// ============================================================================
// FILTER STAGE
// ============================================================================

/// Single biquad using Direct Form I
///
/// Direct Form I keeps raw input and output history, so coefficients can be
/// swapped between blocks without rescaling any state.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    coeffs: BiquadCoeffs,
    prepared: bool,
    // Previous input samples (x[n-1], x[n-2])
    x1: f64,
    x2: f64,
    // Previous output samples (y[n-1], y[n-2])
    y1: f64,
    y2: f64,
}

impl Default for FilterStage {
    fn default() -> Self {
        Self::new(BiquadCoeffs::identity())
    }
}

impl FilterStage {
    /// Create an unprepared stage with the given coefficients
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            prepared: false,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Replace the active coefficients
    ///
    /// History is left alone so automation does not click.
    #[inline]
    pub fn set_coefficients(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coefficients(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Delayed input and output samples as `[x1, x2, y1, y2]`
    pub fn history(&self) -> [f64; 4] {
        [self.x1, self.x2, self.y1, self.y2]
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
        let x = input as f64;
        let c = &self.coeffs;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y as f32
    }
}

impl MonoProcessor for FilterStage {
    fn prepare(&mut self, _spec: &ProcessSpec) {
        self.reset();
        self.prepared = true;
    }

    fn process_block(&mut self, samples: &mut [f32]) {
        debug_assert!(self.prepared, "filter stage processed before prepare");
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

// ============================================================================
// CASCADE
// ============================================================================

/// Four biquads in series realizing 12 to 48 dB/oct cuts
///
/// All four stages always run. Stages beyond the active count carry
/// identity coefficients instead of being skipped.
#[derive(Debug, Clone, Default)]
pub struct CascadeFilter {
    stages: [FilterStage; MAX_CASCADE_STAGES],
    active: usize,
}

impl CascadeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `coeffs` into the first `count` stages and identity into the rest
    ///
    /// `count` is clamped to 1..=4.
    pub fn set_active_stages(&mut self, count: usize, coeffs: BiquadCoeffs) {
        let count = count.clamp(1, MAX_CASCADE_STAGES);
        for (index, stage) in self.stages.iter_mut().enumerate() {
            if index < count {
                stage.set_coefficients(coeffs);
            } else {
                stage.set_coefficients(BiquadCoeffs::identity());
            }
        }
        self.active = count;
    }

    /// Number of stages carrying non-identity coefficients (0 until first set)
    pub fn active_stages(&self) -> usize {
        self.active
    }

    pub fn stage(&self, index: usize) -> Option<&FilterStage> {
        self.stages.get(index)
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// Combined magnitude of all four stages at `frequency`
    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.stages
            .iter()
            .map(|stage| stage.coefficients().magnitude_for_frequency(frequency, sample_rate))
            .product()
    }
}

impl MonoProcessor for CascadeFilter {
    fn prepare(&mut self, spec: &ProcessSpec) {
        for stage in &mut self.stages {
            stage.prepare(spec);
        }
    }

    fn process_block(&mut self, samples: &mut [f32]) {
        for stage in &mut self.stages {
            stage.process_block(samples);
        }
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
