//! Volnorm - Volume Normalization Control
//!
//! Platform-agnostic control loop that keeps music playback at a chosen
//! loudness by nudging the output volume one step at a time.
//!
//! This crate provides:
//! - Level policy table (named fixed bands plus the adaptive level)
//! - Adaptive band around a running mean of the readings
//! - Volume controller with silence-floor and minimum-volume guards
//! - Detection of manual volume changes (resets the running statistics)
//! - Scoped loudness sampler (enable/disable exactly once)
//! - Sessions with a read-only event side channel
//!
//! # Architecture
//!
//! `volnorm-control` knows nothing about how it is hosted:
//! - Audio capture is a [`LoudnessSource`]
//! - Volume actuation is a [`VolumeSink`]
//! - Pacing, cancellation and session lifetime belong to the host
//!
//! ```text
//! host loop ──► LoudnessSampler::sample ──► VolumeController::step ──► VolumeSink::raise/lower
//! ```
//!
//! # Example
//!
//! ```rust
//! use volnorm_control::{Action, LevelTable, VolumeController};
//! use volnorm_core::{LoudnessReading, Result, VolumeLevel, VolumeSink};
//!
//! struct Mixer { volume: i32 }
//!
//! impl VolumeSink for Mixer {
//!     fn volume(&self) -> Result<VolumeLevel> { Ok(VolumeLevel(self.volume)) }
//!     fn min_volume(&self) -> Result<VolumeLevel> { Ok(VolumeLevel(0)) }
//!     fn max_volume(&self) -> Result<VolumeLevel> { Ok(VolumeLevel(15)) }
//!     fn raise(&mut self) -> Result<()> { self.volume += 1; Ok(()) }
//!     fn lower(&mut self) -> Result<()> { self.volume -= 1; Ok(()) }
//! }
//!
//! let policy = LevelTable::builtin().resolve("Medium").unwrap();
//! let mut controller = VolumeController::start(Mixer { volume: 5 }, policy);
//!
//! assert_eq!(controller.step(LoudnessReading::new(-7000)).unwrap(), Action::Raise);
//! assert_eq!(controller.step(LoudnessReading::new(-4000)).unwrap(), Action::Hold);
//! ```
//!
//! [`LoudnessSource`]: volnorm_core::LoudnessSource
//! [`VolumeSink`]: volnorm_core::VolumeSink

#![deny(unsafe_code)]

mod adaptive;
mod controller;
mod events;
mod policy;
mod sampler;
mod session;

// Public exports
pub use adaptive::{
    AdaptiveTuning, RunningStats, DEFAULT_MARGIN_MULTIPLIER, DEFAULT_MARGIN_OFFSET,
    MEAN_CEILING_MB,
};
pub use controller::{decide, Action, ControllerState, VolumeController};
pub use events::{ControlEvent, TickStatus};
pub use policy::{
    Band, EffectiveBand, LevelEntry, LevelTable, Policy, LEVEL_DYNAMIC, LEVEL_HIGH, LEVEL_LOW,
    LEVEL_MEDIUM,
};
pub use sampler::LoudnessSampler;
pub use session::Session;
pub use volnorm_core::{Result, VolnormError};
