//! Parameter layout and the lock-free parameter store
//!
//! The host shell owns automation and persistence. The engine only needs to
//! know each parameter's identifier, range and default, and a way to read the
//! current raw values from the audio thread without locking.

use crate::domain::chain::{ChainSettings, Slope};
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicU32, Ordering};

/// Lowest frequency any band accepts (Hz)
pub const MIN_FREQUENCY: f32 = 20.0;
/// Highest frequency any band accepts (Hz)
pub const MAX_FREQUENCY: f32 = 20000.0;
/// Fraction of the sample rate a design frequency may reach
pub const NYQUIST_GUARD: f64 = 0.499;

/// Valid range of a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
    /// Host-facing step size
    pub step: f32,
}

impl ParameterRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Clamp then round to the nearest step from `min`
    pub fn snap(&self, value: f32) -> f32 {
        let clamped = self.clamp(value);
        let steps = ((clamped - self.min) / self.step).round();
        self.clamp(self.min + steps * self.step)
    }
}

/// The seven equalizer parameters, each with a distinct identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    LowCutFreq,
    HighCutFreq,
    PeakFreq,
    PeakGain,
    PeakQuality,
    LowCutSlope,
    HighCutSlope,
}

impl ParameterId {
    pub const ALL: [ParameterId; 7] = [
        ParameterId::LowCutFreq,
        ParameterId::HighCutFreq,
        ParameterId::PeakFreq,
        ParameterId::PeakGain,
        ParameterId::PeakQuality,
        ParameterId::LowCutSlope,
        ParameterId::HighCutSlope,
    ];

    /// Stable string identifier used by the host
    pub fn id(&self) -> &'static str {
        match self {
            ParameterId::LowCutFreq => "LowCut Freq",
            ParameterId::HighCutFreq => "HighCut Freq",
            ParameterId::PeakFreq => "Peak Freq",
            ParameterId::PeakGain => "Peak Gain",
            ParameterId::PeakQuality => "Peak Quality",
            ParameterId::LowCutSlope => "LowCut Slope",
            ParameterId::HighCutSlope => "HighCut Slope",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|param| param.id() == id)
    }

    pub fn range(&self) -> ParameterRange {
        match self {
            ParameterId::LowCutFreq | ParameterId::HighCutFreq | ParameterId::PeakFreq => {
                ParameterRange::new(MIN_FREQUENCY, MAX_FREQUENCY, 1.0)
            }
            ParameterId::PeakGain => ParameterRange::new(-24.0, 24.0, 0.1),
            ParameterId::PeakQuality => ParameterRange::new(0.1, 10.0, 0.05),
            ParameterId::LowCutSlope | ParameterId::HighCutSlope => {
                ParameterRange::new(0.0, (Slope::ALL.len() - 1) as f32, 1.0)
            }
        }
    }

    pub fn default_value(&self) -> f32 {
        match self {
            ParameterId::LowCutFreq => MIN_FREQUENCY,
            ParameterId::HighCutFreq => MAX_FREQUENCY,
            ParameterId::PeakFreq => 750.0,
            ParameterId::PeakGain => 0.0,
            ParameterId::PeakQuality => 1.0,
            ParameterId::LowCutSlope | ParameterId::HighCutSlope => 0.0,
        }
    }

    /// Choice labels for discrete parameters
    pub fn choices(&self) -> Option<[&'static str; 4]> {
        match self {
            ParameterId::LowCutSlope | ParameterId::HighCutSlope => {
                Some(Slope::ALL.map(|slope| slope.label()))
            }
            _ => None,
        }
    }

    /// Clamp into range; non-finite values become the default
    pub fn sanitize(&self, value: f32) -> f32 {
        if value.is_finite() {
            self.range().clamp(value)
        } else {
            self.default_value()
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Clamp a design frequency into [20 Hz, min(20 kHz, just below Nyquist)]
pub fn clamp_below_nyquist(frequency: f64, sample_rate: f64) -> f64 {
    let max = (MAX_FREQUENCY as f64).min(sample_rate * NYQUIST_GUARD);
    let min = (MIN_FREQUENCY as f64).min(max);
    frequency.clamp(min, max)
}

/// Raw parameter values shared between the control and audio contexts
///
/// Each value lives in its own cache-padded atomic cell. Writers and readers
/// never block each other; a reader sees every individual value either before
/// or after a write, never torn.
pub struct SharedParameters {
    values: [CachePadded<AtomicU32>; 7],
}

impl Default for SharedParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedParameters {
    /// Store holding every parameter's default
    pub fn new() -> Self {
        Self {
            values: ParameterId::ALL
                .map(|param| CachePadded::new(AtomicU32::new(param.default_value().to_bits()))),
        }
    }

    /// Store initialized from a settings snapshot
    pub fn from_settings(settings: &ChainSettings) -> Self {
        let store = Self::new();
        store.store_settings(settings);
        store
    }

    /// Current raw value of one parameter
    pub fn get(&self, param: ParameterId) -> f32 {
        f32::from_bits(self.values[param.slot()].load(Ordering::Acquire))
    }

    /// Set one parameter, clamped into its range
    pub fn set(&self, param: ParameterId, value: f32) {
        let value = param.sanitize(value);
        self.values[param.slot()].store(value.to_bits(), Ordering::Release);
    }

    /// Write every field of `settings`
    pub fn store_settings(&self, settings: &ChainSettings) {
        self.set(ParameterId::LowCutFreq, settings.low_cut_frequency);
        self.set(ParameterId::HighCutFreq, settings.high_cut_frequency);
        self.set(ParameterId::PeakFreq, settings.peak_frequency);
        self.set(ParameterId::PeakGain, settings.peak_gain_db);
        self.set(ParameterId::PeakQuality, settings.peak_quality);
        self.set(ParameterId::LowCutSlope, settings.low_cut_slope.index() as f32);
        self.set(ParameterId::HighCutSlope, settings.high_cut_slope.index() as f32);
    }

    /// Snapshot for the audio context; lock-free and allocation-free
    pub fn chain_settings(&self) -> ChainSettings {
        ChainSettings {
            low_cut_frequency: self.get(ParameterId::LowCutFreq),
            high_cut_frequency: self.get(ParameterId::HighCutFreq),
            peak_frequency: self.get(ParameterId::PeakFreq),
            peak_gain_db: self.get(ParameterId::PeakGain),
            peak_quality: self.get(ParameterId::PeakQuality),
            low_cut_slope: Slope::from_index(self.get(ParameterId::LowCutSlope).round() as i64),
            high_cut_slope: Slope::from_index(self.get(ParameterId::HighCutSlope).round() as i64),
        }
    }
}
