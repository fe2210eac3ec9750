//! Real-time three-band equalizer core
//!
//! Low cut, peak and high cut filters per channel, driven block by block from
//! a plain settings snapshot. See [`domain::EqualizerEngine`].

pub mod domain;
