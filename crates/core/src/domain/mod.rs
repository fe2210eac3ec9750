//! Domain entities and signal-path rules

pub mod audio;
pub mod chain;
pub mod config;
pub mod control;
pub mod denormal;
pub mod dsp;
pub mod engine;
pub mod params;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{ChannelLayout, EqError, MonoProcessor, ProcessSpec, MAX_SAMPLE_RATE};
pub use chain::{ChainCoefficients, ChainSettings, ChannelChain, Slope};
pub use config::{ConfigError, EngineConfig, EqualizerConfig};
pub use control::{CoefficientUpdate, EqualizerController};
pub use denormal::ScopedNoDenormals;
pub use dsp::{db_to_gain, gain_to_db, BiquadCoeffs, CascadeFilter, FilterStage, BUTTERWORTH_Q};
pub use engine::EqualizerEngine;
pub use params::{ParameterId, ParameterRange, SharedParameters};
