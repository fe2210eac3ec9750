//! Control-context handle for the equalizer engine
//!
//! The controller lives on the control thread. It sanitizes settings, designs
//! coefficients there and pushes them to the engine through a single-producer
//! single-consumer ring. The engine drains the ring at the start of every
//! block and keeps only the newest update, so a settings change lands whole
//! on exactly one block boundary.

use crate::domain::chain::{ChainCoefficients, ChainSettings};
use rtrb::{Consumer, Producer, PushError, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Default number of updates the ring can hold
pub const DEFAULT_UPDATE_CAPACITY: usize = 64;

/// One settings change on its way to the audio context
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientUpdate {
    pub settings: ChainSettings,
    /// Coefficients and the sample rate they were designed for; `None` while
    /// the engine is unprepared
    pub designed: Option<(f64, ChainCoefficients)>,
}

/// Sample rate the engine is currently prepared at, readable from any thread
#[derive(Debug, Default)]
pub(crate) struct PreparedRate(AtomicU64);

impl PreparedRate {
    pub(crate) fn load(&self) -> Option<f64> {
        match self.0.load(Ordering::Acquire) {
            0 => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    pub(crate) fn store(&self, sample_rate: Option<f64>) {
        let bits = sample_rate.map_or(0, f64::to_bits);
        self.0.store(bits, Ordering::Release);
    }
}

/// Build a linked pair of ring ends
pub(crate) fn update_channel(capacity: usize) -> (Producer<CoefficientUpdate>, Consumer<CoefficientUpdate>) {
    RingBuffer::new(capacity.max(1))
}

/// Control-side handle returned by [`EqualizerEngine::controller`]
///
/// `update_if_changed` never blocks. If the ring is full because the audio
/// context has stopped draining it, the newest update is held back and sent
/// on the next call (or [`EqualizerController::flush`]).
///
/// [`EqualizerEngine::controller`]: crate::domain::engine::EqualizerEngine::controller
pub struct EqualizerController {
    updates: Producer<CoefficientUpdate>,
    prepared_rate: Arc<PreparedRate>,
    settings: ChainSettings,
    designed_rate: Option<f64>,
    pending: Option<CoefficientUpdate>,
    designs: u64,
}

impl EqualizerController {
    pub(crate) fn new(
        updates: Producer<CoefficientUpdate>,
        prepared_rate: Arc<PreparedRate>,
        settings: ChainSettings,
    ) -> Self {
        Self {
            updates,
            designed_rate: prepared_rate.load(),
            prepared_rate,
            settings,
            pending: None,
            designs: 0,
        }
    }

    /// Design and send coefficients if `settings` differ from the last sent
    ///
    /// A change of the engine's sample rate since the last call also counts
    /// as a change. Returns `true` when a new update was produced.
    pub fn update_if_changed(&mut self, settings: &ChainSettings) -> bool {
        let settings = settings.sanitized();
        let sample_rate = self.prepared_rate.load();

        if settings == self.settings && sample_rate == self.designed_rate {
            self.flush();
            return false;
        }
        self.settings = settings;
        self.designed_rate = sample_rate;

        let designed = sample_rate.map(|rate| {
            self.designs += 1;
            (rate, ChainCoefficients::design(&settings, rate))
        });
        self.pending = Some(CoefficientUpdate { settings, designed });
        self.flush();
        true
    }

    /// Retry a held-back update; returns `true` once nothing is pending
    pub fn flush(&mut self) -> bool {
        let Some(update) = self.pending.take() else {
            return true;
        };
        match self.updates.push(update) {
            Ok(()) => true,
            Err(PushError::Full(update)) => {
                debug!("Update ring full, holding newest settings back");
                self.pending = Some(update);
                false
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Last settings handed to the engine (sanitized)
    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }

    /// How many coefficient sets this controller has designed
    pub fn designs(&self) -> u64 {
        self.designs
    }
}
