//! Mono signal path: low cut, peak, high cut
//!
//! `ChainSettings` is the plain value the host shell fills from its parameter
//! store. `ChainCoefficients` is what those settings turn into at a given
//! sample rate, and `ChannelChain` is the per-channel filter topology the
//! coefficients are pushed into.

use crate::domain::audio::{MonoProcessor, ProcessSpec};
use crate::domain::dsp::{db_to_gain, BiquadCoeffs, CascadeFilter, FilterStage, BUTTERWORTH_Q};
use crate::domain::params::{self, ParameterId};
use serde::{Deserialize, Serialize};

/// Steepness of a cut filter
///
/// Each step adds one more matched second-order stage (12 dB/oct).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Slope {
    #[default]
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    pub const ALL: [Slope; 4] = [Slope::Db12, Slope::Db24, Slope::Db36, Slope::Db48];

    /// Choice index as exposed to the host (0..=3)
    pub fn index(&self) -> usize {
        match self {
            Slope::Db12 => 0,
            Slope::Db24 => 1,
            Slope::Db36 => 2,
            Slope::Db48 => 3,
        }
    }

    /// Map a choice index to a slope, clamping out-of-range values
    pub fn from_index(index: i64) -> Self {
        match index {
            i64::MIN..=0 => Slope::Db12,
            1 => Slope::Db24,
            2 => Slope::Db36,
            _ => Slope::Db48,
        }
    }

    /// Number of active cascade stages
    pub fn stages(&self) -> usize {
        self.index() + 1
    }

    pub fn db_per_octave(&self) -> u32 {
        12 * self.stages() as u32
    }

    pub fn label(&self) -> &'static str {
        match self {
            Slope::Db12 => "12 dB/Oct",
            Slope::Db24 => "24 dB/Oct",
            Slope::Db36 => "36 dB/Oct",
            Slope::Db48 => "48 dB/Oct",
        }
    }
}

/// Snapshot of every user-facing equalizer parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    pub low_cut_frequency: f32,
    pub high_cut_frequency: f32,
    pub peak_frequency: f32,
    pub peak_gain_db: f32,
    pub peak_quality: f32,
    pub low_cut_slope: Slope,
    pub high_cut_slope: Slope,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            low_cut_frequency: ParameterId::LowCutFreq.default_value(),
            high_cut_frequency: ParameterId::HighCutFreq.default_value(),
            peak_frequency: ParameterId::PeakFreq.default_value(),
            peak_gain_db: ParameterId::PeakGain.default_value(),
            peak_quality: ParameterId::PeakQuality.default_value(),
            low_cut_slope: Slope::default(),
            high_cut_slope: Slope::default(),
        }
    }
}

impl ChainSettings {
    /// Clamp every field into its documented range
    ///
    /// Non-finite values fall back to the parameter default. Automation and UI
    /// races can briefly request anything, so this never fails.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        Self {
            low_cut_frequency: ParameterId::LowCutFreq.sanitize(self.low_cut_frequency),
            high_cut_frequency: ParameterId::HighCutFreq.sanitize(self.high_cut_frequency),
            peak_frequency: ParameterId::PeakFreq.sanitize(self.peak_frequency),
            peak_gain_db: ParameterId::PeakGain.sanitize(self.peak_gain_db),
            peak_quality: ParameterId::PeakQuality.sanitize(self.peak_quality),
            low_cut_slope: self.low_cut_slope,
            high_cut_slope: self.high_cut_slope,
        }
    }
}

/// Coefficients for one full chain at a given sample rate
///
/// Designed once per settings change and copied into every channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainCoefficients {
    pub low_cut: BiquadCoeffs,
    pub low_cut_stages: usize,
    pub peak: BiquadCoeffs,
    pub high_cut: BiquadCoeffs,
    pub high_cut_stages: usize,
}

impl ChainCoefficients {
    /// Design every stage from (already or not yet sanitized) settings
    pub fn design(settings: &ChainSettings, sample_rate: f64) -> Self {
        let settings = settings.sanitized();
        let freq = |hz: f32| params::clamp_below_nyquist(hz as f64, sample_rate);

        Self {
            low_cut: BiquadCoeffs::high_pass(sample_rate, freq(settings.low_cut_frequency), BUTTERWORTH_Q),
            low_cut_stages: settings.low_cut_slope.stages(),
            peak: BiquadCoeffs::peak(
                sample_rate,
                freq(settings.peak_frequency),
                settings.peak_quality as f64,
                db_to_gain(settings.peak_gain_db as f64),
            ),
            high_cut: BiquadCoeffs::low_pass(sample_rate, freq(settings.high_cut_frequency), BUTTERWORTH_Q),
            high_cut_stages: settings.high_cut_slope.stages(),
        }
    }
}

/// Full mono signal path
///
/// Stage order is fixed: low cut, then peak, then high cut.
#[derive(Debug, Clone, Default)]
pub struct ChannelChain {
    low_cut: CascadeFilter,
    peak: FilterStage,
    high_cut: CascadeFilter,
}

impl ChannelChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Design and load coefficients for `settings`
    pub fn apply_settings(&mut self, settings: &ChainSettings, sample_rate: f64) {
        self.apply_coefficients(&ChainCoefficients::design(settings, sample_rate));
    }

    /// Load pre-designed coefficients; filter history is untouched
    pub fn apply_coefficients(&mut self, coeffs: &ChainCoefficients) {
        self.low_cut.set_active_stages(coeffs.low_cut_stages, coeffs.low_cut);
        self.peak.set_coefficients(coeffs.peak);
        self.high_cut.set_active_stages(coeffs.high_cut_stages, coeffs.high_cut);
    }

    pub fn low_cut(&self) -> &CascadeFilter {
        &self.low_cut
    }

    pub fn peak(&self) -> &FilterStage {
        &self.peak
    }

    pub fn high_cut(&self) -> &CascadeFilter {
        &self.high_cut
    }

    /// Magnitude response of the whole chain (linear)
    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.low_cut.magnitude_for_frequency(frequency, sample_rate)
            * self.peak.coefficients().magnitude_for_frequency(frequency, sample_rate)
            * self.high_cut.magnitude_for_frequency(frequency, sample_rate)
    }
}

impl MonoProcessor for ChannelChain {
    fn prepare(&mut self, spec: &ProcessSpec) {
        self.low_cut.prepare(spec);
        self.peak.prepare(spec);
        self.high_cut.prepare(spec);
    }

    fn process_block(&mut self, samples: &mut [f32]) {
        self.low_cut.process_block(samples);
        self.peak.process_block(samples);
        self.high_cut.process_block(samples);
    }

    fn reset(&mut self) {
        self.low_cut.reset();
        self.peak.reset();
        self.high_cut.reset();
    }
}
