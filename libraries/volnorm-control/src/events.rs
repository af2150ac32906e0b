//! Control Events
//!
//! Read-only status side channel for hosts (notifications, UI, logs).
//! Nothing here feeds back into the control decision.

use crate::{controller::Action, policy::EffectiveBand, policy::Policy};
use serde::{Deserialize, Serialize};
use volnorm_core::{LoudnessReading, VolumeLevel};

/// Snapshot of one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickStatus {
    /// Tick number within the session, starting at 1
    pub tick: u64,

    /// Reading the decision was based on (after clamping)
    pub reading: LoudnessReading,

    /// Peak level of the same measurement, when the source reports one
    pub peak: Option<i32>,

    /// Band in effect for this tick
    pub band: EffectiveBand,

    /// Running mean (adaptive policy only)
    pub mean: Option<f64>,

    /// Decision taken
    pub action: Action,

    /// Volume before the decision
    pub volume_before: VolumeLevel,

    /// Volume after the decision
    pub volume_after: VolumeLevel,

    /// Volume recorded after the previous tick, when someone else has
    /// changed it since
    pub external_change: Option<VolumeLevel>,
}

/// Events emitted by a normalization session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlEvent {
    /// Session started and the sampler is enabled
    SessionStarted {
        /// Level name as requested
        level: String,
        /// Resolved policy
        policy: Policy,
    },

    /// One tick completed
    Tick(TickStatus),

    /// The volume moved without the controller asking; statistics were reset
    ExternalVolumeChange {
        /// Volume recorded after the previous tick
        expected: VolumeLevel,
        /// Volume found at this tick
        found: VolumeLevel,
    },

    /// Session stopped and the sampler was released
    SessionStopped {
        /// Ticks completed during the session
        ticks: u64,
    },
}
