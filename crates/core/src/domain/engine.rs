//! Equalizer engine driving one chain per channel
//!
//! The engine is owned by the audio context. Settings reach it one of two ways:
//!
//! - From the control context through an [`EqualizerController`], which
//!   designs coefficients off the audio thread. `process` picks up the newest
//!   update at the start of each block.
//! - From the audio context itself: the host calls
//!   [`EqualizerEngine::update_if_changed`] with a fresh snapshot (usually
//!   [`SharedParameters::chain_settings`]) before `process`.
//!
//! Either way coefficients are only redesigned when the settings actually
//! differ from the last ones applied.
//!
//! [`SharedParameters::chain_settings`]: crate::domain::params::SharedParameters::chain_settings

use crate::domain::audio::{ChannelLayout, MonoProcessor, ProcessSpec, Result};
use crate::domain::chain::{ChainCoefficients, ChainSettings, ChannelChain};
use crate::domain::config::EngineConfig;
use crate::domain::control::{self, CoefficientUpdate, EqualizerController, PreparedRate};
use crate::domain::denormal::ScopedNoDenormals;
use rtrb::Consumer;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Three-band equalizer for mono or stereo material
#[derive(Default)]
pub struct EqualizerEngine {
    spec: Option<ProcessSpec>,
    chains: Vec<ChannelChain>,
    settings: ChainSettings,
    coefficient_updates: u64,
    updates: Option<Consumer<CoefficientUpdate>>,
    prepared_rate: Arc<PreparedRate>,
}

impl fmt::Debug for EqualizerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EqualizerEngine")
            .field("spec", &self.spec)
            .field("num_channels", &self.chains.len())
            .field("settings", &self.settings)
            .field("coefficient_updates", &self.coefficient_updates)
            .field("has_controller", &self.updates.is_some())
            .finish()
    }
}

impl EqualizerEngine {
    /// Engine name reported to hosts
    pub const NAME: &'static str = "BasicEQ";

    /// IIR filters have no fixed tail worth reporting
    pub const TAIL_LENGTH_SECONDS: f64 = 0.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that will apply `settings` on its first `prepare`
    pub fn with_settings(settings: ChainSettings) -> Self {
        Self {
            settings: settings.sanitized(),
            ..Self::default()
        }
    }

    /// Control-side handle feeding this engine, with the default ring capacity
    pub fn controller(&mut self) -> EqualizerController {
        self.controller_with_capacity(control::DEFAULT_UPDATE_CAPACITY)
    }

    /// Control-side handle feeding this engine
    ///
    /// Creating a new controller unlinks any previous one. Updates still
    /// queued from the old link are applied first.
    pub fn controller_with_capacity(&mut self, capacity: usize) -> EqualizerController {
        self.receive_updates();
        let (producer, consumer) = control::update_channel(capacity);
        self.updates = Some(consumer);
        debug!(capacity, "Controller linked");
        EqualizerController::new(producer, Arc::clone(&self.prepared_rate), self.settings)
    }

    /// Whether a host bus layout can be processed
    ///
    /// Mono or stereo only, and the input must match the output.
    pub fn supports_layout(input_channels: usize, output_channels: usize) -> bool {
        let supported = ChannelLayout::from_count(output_channels).is_ok()
            && input_channels == output_channels;
        if !supported {
            debug!(input_channels, output_channels, "Rejected bus layout");
        }
        supported
    }

    /// Allocate and prepare one chain per channel
    ///
    /// The stored settings are applied immediately, so the very first block
    /// is already filtered. Any previous history is discarded.
    #[instrument(skip(self))]
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize, num_channels: usize) -> Result<()> {
        let spec = match ProcessSpec::new(sample_rate, max_block_size, num_channels) {
            Ok(spec) => spec,
            Err(e) => {
                warn!(error = %e, "Refusing to prepare equalizer");
                return Err(e);
            }
        };

        // Settings queued while unprepared or at the old rate
        self.take_latest_update();

        let mut chains = vec![ChannelChain::new(); spec.num_channels];
        let coeffs = self.design(&spec);
        for chain in &mut chains {
            chain.prepare(&spec);
            chain.apply_coefficients(&coeffs);
        }

        self.chains = chains;
        self.spec = Some(spec);
        self.prepared_rate.store(Some(spec.sample_rate));

        info!(
            sample_rate,
            max_block_size,
            layout = ?spec.layout(),
            "Equalizer prepared"
        );
        Ok(())
    }

    /// Prepare from a validated engine configuration
    pub fn prepare_with_config(&mut self, config: &EngineConfig) -> Result<()> {
        self.prepare(config.sample_rate, config.max_block_size, config.channels.count())
    }

    /// Redesign coefficients only if `settings` differ from the last applied
    ///
    /// Returns `true` when the chains were updated. Filter history is kept,
    /// so the change takes effect at the start of the next block without a
    /// click. Before `prepare` the snapshot is stored and applied later.
    pub fn update_if_changed(&mut self, settings: &ChainSettings) -> bool {
        let settings = settings.sanitized();
        if settings == self.settings {
            return false;
        }
        self.settings = settings;

        if let Some(spec) = self.spec {
            let coeffs = self.design(&spec);
            for chain in &mut self.chains {
                chain.apply_coefficients(&coeffs);
            }
        }
        true
    }

    /// Filter one block in place
    ///
    /// `channels` holds one slice per channel, all the same length. Channels
    /// without a prepared chain are cleared to silence. The newest update from
    /// a linked controller is applied before the first sample.
    ///
    /// # Panics
    /// If a channel is longer than the prepared maximum block size. Hosts
    /// must never hand over larger blocks.
    pub fn process<S: AsMut<[f32]>>(&mut self, channels: &mut [S]) {
        let _no_denormals = ScopedNoDenormals::new();
        self.receive_updates();

        if let Some(spec) = &self.spec {
            for channel in channels.iter_mut() {
                let len = channel.as_mut().len();
                assert!(
                    len <= spec.maximum_block_size,
                    "block of {len} samples exceeds prepared maximum of {}",
                    spec.maximum_block_size
                );
            }
        }

        let mut chains = self.chains.iter_mut();
        for channel in channels.iter_mut() {
            let samples = channel.as_mut();
            match chains.next() {
                Some(chain) => chain.process_block(samples),
                None => samples.fill(0.0),
            }
        }
    }

    /// Clear every chain's history, keeping coefficients
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        for chain in &mut self.chains {
            chain.reset();
        }
        debug!("Equalizer history cleared");
    }

    /// Drop the chains; the next `prepare` starts from silence
    #[instrument(skip(self))]
    pub fn release_resources(&mut self) {
        self.chains = Vec::new();
        self.spec = None;
        self.prepared_rate.store(None);
        info!("Equalizer resources released");
    }

    pub fn is_prepared(&self) -> bool {
        self.spec.is_some()
    }

    pub fn spec(&self) -> Option<&ProcessSpec> {
        self.spec.as_ref()
    }

    pub fn num_channels(&self) -> usize {
        self.chains.len()
    }

    /// Last settings snapshot applied (sanitized)
    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }

    pub fn chain(&self, channel: usize) -> Option<&ChannelChain> {
        self.chains.get(channel)
    }

    /// How many times the engine itself has designed coefficients
    pub fn coefficient_updates(&self) -> u64 {
        self.coefficient_updates
    }

    /// Magnitude response of the current settings at `frequency` (linear)
    ///
    /// Returns `None` before `prepare`, since the response depends on the
    /// sample rate.
    pub fn magnitude_for_frequency(&self, frequency: f64) -> Option<f64> {
        let spec = self.spec.as_ref()?;
        let chain = self.chains.first()?;
        Some(chain.magnitude_for_frequency(frequency, spec.sample_rate))
    }

    /// Drain the ring, keeping only the newest update's settings
    fn take_latest_update(&mut self) -> Option<CoefficientUpdate> {
        let updates = self.updates.as_mut()?;
        let mut latest = None;
        while let Ok(update) = updates.pop() {
            latest = Some(update);
        }
        if let Some(update) = &latest {
            self.settings = update.settings;
        }
        latest
    }

    /// Apply the newest controller update to every chain
    fn receive_updates(&mut self) {
        let Some(update) = self.take_latest_update() else {
            return;
        };
        let Some(spec) = self.spec else {
            return;
        };

        let coeffs = match update.designed {
            Some((sample_rate, coeffs)) if sample_rate == spec.sample_rate => coeffs,
            // Designed before a re-prepare at another rate
            _ => self.design(&spec),
        };
        for chain in &mut self.chains {
            chain.apply_coefficients(&coeffs);
        }
    }

    fn design(&mut self, spec: &ProcessSpec) -> ChainCoefficients {
        self.coefficient_updates += 1;
        ChainCoefficients::design(&self.settings, spec.sample_rate)
    }
}
