//! Audio-facing domain models shared by every processing stage
//!
//! This module defines the error type, the preparation spec handed to
//! processors, and the channel layouts the engine accepts. Nothing in here
//! touches samples directly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while preparing the equalizer
///
/// These are only ever produced on the control context. The per-block
/// processing path has no error returns.
#[derive(Debug, Error, PartialEq)]
pub enum EqError {
    /// Sample rate was not finite or outside (0, MAX_SAMPLE_RATE]
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    /// Maximum block size was zero
    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    /// Only mono and stereo layouts are processed
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannelCount(usize),
}

pub type Result<T> = std::result::Result<T, EqError>;

/// Highest sample rate the engine can be prepared at (Hz)
pub const MAX_SAMPLE_RATE: f64 = 768_000.0;

/// Channel layouts the engine can be prepared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn count(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    pub fn from_count(channels: usize) -> Result<Self> {
        match channels {
            1 => Ok(ChannelLayout::Mono),
            2 => Ok(ChannelLayout::Stereo),
            n => Err(EqError::UnsupportedChannelCount(n)),
        }
    }
}

/// Everything a processor needs to know before it sees audio
///
/// Built once per `prepare` call. Sample rate and block size must not change
/// without another `prepare`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    pub sample_rate: f64,
    pub maximum_block_size: usize,
    pub num_channels: usize,
}

impl ProcessSpec {
    /// Validate and build a spec
    pub fn new(sample_rate: f64, maximum_block_size: usize, num_channels: usize) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 || sample_rate > MAX_SAMPLE_RATE {
            return Err(EqError::InvalidSampleRate(sample_rate));
        }
        if maximum_block_size == 0 {
            return Err(EqError::InvalidBlockSize(maximum_block_size));
        }
        ChannelLayout::from_count(num_channels)?;

        Ok(Self {
            sample_rate,
            maximum_block_size,
            num_channels,
        })
    }

    pub fn layout(&self) -> ChannelLayout {
        if self.num_channels == 1 {
            ChannelLayout::Mono
        } else {
            ChannelLayout::Stereo
        }
    }
}

/// Mono signal processor driven block by block
///
/// Implemented by every link of the filter chain. `process_block` runs on the
/// audio context and must not allocate, lock or log.
pub trait MonoProcessor: Send {
    /// Prepare for playback; clears any history
    fn prepare(&mut self, spec: &ProcessSpec);

    /// Process one channel's samples in place
    fn process_block(&mut self, samples: &mut [f32]);

    /// Clear history without touching coefficients
    fn reset(&mut self);
}
