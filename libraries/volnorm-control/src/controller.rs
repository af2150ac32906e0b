//! Volume controller - the normalization state machine
//!
//! One `step` per tick: read the volume, resolve the band, decide, and issue
//! at most one discrete volume step.

use crate::{
    adaptive::{AdaptiveTuning, RunningStats},
    events::TickStatus,
    policy::{EffectiveBand, Policy},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use volnorm_core::{LoudnessReading, Result, VolnormError, VolumeLevel, VolumeRange, VolumeSink};

/// Decision for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// One step up
    Raise,
    /// One step down
    Lower,
    /// No change
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Raise => "raise",
            Self::Lower => "lower",
            Self::Hold => "hold",
        };
        f.write_str(s)
    }
}

/// Decide the action for `reading` against `band`
///
/// The two guards are independent: raising needs a reading below the band
/// that is not silence and headroom below `max`; lowering needs a reading
/// above the band and a volume more than one step above `min`.
pub fn decide(
    reading: LoudnessReading,
    band: &EffectiveBand,
    current: VolumeLevel,
    range: &VolumeRange,
) -> Action {
    if band.is_below(reading) && !reading.is_silence() && current < range.max() {
        Action::Raise
    } else if band.is_above(reading) && current > range.min().step_up() {
        Action::Lower
    } else {
        Action::Hold
    }
}

/// Per-session controller state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    stats: RunningStats,
    last_observed_volume: Option<VolumeLevel>,
}

impl ControllerState {
    /// Sum of readings accumulated for the running mean
    pub fn running_sum(&self) -> i64 {
        self.stats.sum()
    }

    /// Number of readings accumulated for the running mean
    pub fn sample_count(&self) -> u64 {
        self.stats.count()
    }

    /// Running statistics
    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    /// Volume seen at the end of the previous tick
    pub fn last_observed_volume(&self) -> Option<VolumeLevel> {
        self.last_observed_volume
    }
}

/// Volume controller
///
/// Owns the volume sink and the session's control state. Must be driven by a
/// single sequential caller; each `step` finishes its sink calls before
/// returning.
pub struct VolumeController<S: VolumeSink> {
    sink: S,
    policy: Policy,
    tuning: AdaptiveTuning,
    state: ControllerState,
    ticks: u64,
    last_status: Option<TickStatus>,
    active: bool,
}

impl<S: VolumeSink> VolumeController<S> {
    /// Start a controller with empty statistics and default adaptive tuning
    pub fn start(sink: S, policy: Policy) -> Self {
        Self::with_tuning(sink, policy, AdaptiveTuning::default())
    }

    /// Start a controller with explicit adaptive tuning
    pub fn with_tuning(sink: S, policy: Policy, tuning: AdaptiveTuning) -> Self {
        Self {
            sink,
            policy,
            tuning,
            state: ControllerState::default(),
            ticks: 0,
            last_status: None,
            active: true,
        }
    }

    /// Run one tick and return the action taken
    ///
    /// # Errors
    /// Volume sink failures are returned unchanged; `SessionStopped` after
    /// [`VolumeController::stop`]
    pub fn step(&mut self, reading: LoudnessReading) -> Result<Action> {
        self.evaluate(reading, None).map(|status| status.action)
    }

    /// Run one tick and return the full status snapshot
    ///
    /// # Errors
    /// Same as [`VolumeController::step`]
    pub fn evaluate(&mut self, reading: LoudnessReading, peak: Option<i32>) -> Result<TickStatus> {
        if !self.active {
            return Err(VolnormError::SessionStopped);
        }

        let current = self.sink.volume()?;
        let range = VolumeRange::new(self.sink.min_volume()?, self.sink.max_volume()?)?;

        let external_change = match self.state.last_observed_volume {
            Some(expected) if expected != current => {
                info!(
                    expected = expected.value(),
                    found = current.value(),
                    "Volume changed externally, resetting running statistics"
                );
                self.state.stats.reset();
                Some(expected)
            }
            _ => None,
        };

        let (band, mean) = match self.policy {
            Policy::FixedBand(band) => (EffectiveBand::from(band), None),
            Policy::Adaptive => {
                self.state.stats.push(reading);
                let mean = self
                    .state
                    .stats
                    .mean()
                    .unwrap_or_else(|| f64::from(reading.millibels()));
                (self.tuning.band(mean), Some(mean))
            }
        };

        let action = decide(reading, &band, current, &range);
        let volume_after = match action {
            Action::Hold => current,
            Action::Raise | Action::Lower => {
                let stepped = if action == Action::Raise {
                    self.sink.raise()
                } else {
                    self.sink.lower()
                };
                match stepped.and_then(|()| self.sink.volume()) {
                    Ok(volume) => volume,
                    Err(e) => {
                        // The step may have landed; the next tick re-baselines
                        self.state.last_observed_volume = None;
                        return Err(e);
                    }
                }
            }
        };
        self.state.last_observed_volume = Some(volume_after);
        self.ticks += 1;

        debug!(
            tick = self.ticks,
            reading = reading.millibels(),
            lower = band.lower,
            upper = band.upper,
            %action,
            volume = volume_after.value(),
            "Tick"
        );

        let status = TickStatus {
            tick: self.ticks,
            reading,
            peak,
            band,
            mean,
            action,
            volume_before: current,
            volume_after,
            external_change,
        };
        self.last_status = Some(status.clone());
        Ok(status)
    }

    /// Forget the running statistics (new track, explicit reset)
    pub fn reset_statistics(&mut self) {
        self.state.stats.reset();
    }

    /// End the session; idempotent
    pub fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.state = ControllerState::default();
        }
    }

    /// Whether the controller still accepts ticks
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Policy selected for this session
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Adaptive tuning in use
    pub fn tuning(&self) -> AdaptiveTuning {
        self.tuning
    }

    /// Current control state
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Ticks completed
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Status of the most recent tick
    pub fn last_status(&self) -> Option<&TickStatus> {
        self.last_status.as_ref()
    }

    /// Borrow the volume sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutably borrow the volume sink
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the controller and return the sink
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volnorm_core::Result;

    /// In-memory sink that counts step calls
    struct FakeSink {
        volume: i32,
        min: i32,
        max: i32,
        raises: usize,
        lowers: usize,
    }

    impl FakeSink {
        fn new(volume: i32, min: i32, max: i32) -> Self {
            Self {
                volume,
                min,
                max,
                raises: 0,
                lowers: 0,
            }
        }
    }

    impl VolumeSink for FakeSink {
        fn volume(&self) -> Result<VolumeLevel> {
            Ok(VolumeLevel(self.volume))
        }

        fn min_volume(&self) -> Result<VolumeLevel> {
            Ok(VolumeLevel(self.min))
        }

        fn max_volume(&self) -> Result<VolumeLevel> {
            Ok(VolumeLevel(self.max))
        }

        fn raise(&mut self) -> Result<()> {
            self.raises += 1;
            self.volume = (self.volume + 1).min(self.max);
            Ok(())
        }

        fn lower(&mut self) -> Result<()> {
            self.lowers += 1;
            self.volume = (self.volume - 1).max(self.min);
            Ok(())
        }
    }

    fn medium() -> Policy {
        Policy::fixed(-6000, -3000).unwrap()
    }

    #[test]
    fn quiet_reading_raises_once() {
        let mut controller = VolumeController::start(FakeSink::new(5, 0, 15), medium());

        let action = controller.step(LoudnessReading::new(-7000)).unwrap();

        assert_eq!(action, Action::Raise);
        assert_eq!(controller.sink().raises, 1);
        assert_eq!(controller.sink().lowers, 0);
        assert_eq!(
            controller.state().last_observed_volume(),
            Some(VolumeLevel(6))
        );
    }

    #[test]
    fn loud_reading_lowers_once() {
        let mut controller = VolumeController::start(FakeSink::new(5, 0, 15), medium());

        assert_eq!(
            controller.step(LoudnessReading::new(-1000)).unwrap(),
            Action::Lower
        );
        assert_eq!(controller.sink().lowers, 1);
        assert_eq!(controller.sink().volume, 4);
    }

    #[test]
    fn reading_inside_band_holds() {
        let mut controller = VolumeController::start(FakeSink::new(5, 0, 15), medium());

        assert_eq!(
            controller.step(LoudnessReading::new(-4000)).unwrap(),
            Action::Hold
        );
        assert_eq!(controller.sink().raises + controller.sink().lowers, 0);
    }

    #[test]
    fn silence_floor_never_raises() {
        let mut controller = VolumeController::start(FakeSink::new(5, 0, 15), medium());

        assert_eq!(
            controller.step(LoudnessReading::SILENCE).unwrap(),
            Action::Hold
        );
        assert_eq!(controller.sink().raises, 0);
    }

    #[test]
    fn no_raise_at_max_volume() {
        let mut controller = VolumeController::start(FakeSink::new(15, 0, 15), medium());
        assert_eq!(
            controller.step(LoudnessReading::new(-8000)).unwrap(),
            Action::Hold
        );
    }

    #[test]
    fn lowering_keeps_one_step_above_minimum() {
        let mut controller = VolumeController::start(FakeSink::new(2, 0, 15), medium());
        assert_eq!(
            controller.step(LoudnessReading::new(-500)).unwrap(),
            Action::Lower
        );
        // Volume is now 1 = min + 1, so no further lowering
        assert_eq!(
            controller.step(LoudnessReading::new(-500)).unwrap(),
            Action::Hold
        );
        assert_eq!(controller.sink().volume, 1);
    }

    #[test]
    fn loud_reading_holds_when_minimum_is_the_largest_level() {
        let mut controller =
            VolumeController::start(FakeSink::new(i32::MAX, i32::MAX, i32::MAX), medium());

        assert_eq!(
            controller.step(LoudnessReading::new(-500)).unwrap(),
            Action::Hold
        );
        assert_eq!(controller.sink().lowers, 0);
    }

    #[test]
    fn first_adaptive_tick_holds_on_the_mean() {
        let mut controller = VolumeController::start(FakeSink::new(5, 0, 15), Policy::Adaptive);

        let status = controller
            .evaluate(LoudnessReading::new(-5000), None)
            .unwrap();

        assert_eq!(status.mean, Some(-5000.0));
        assert!(status.band.lower < -5000.0 && status.band.upper > -5000.0);
        assert_eq!(status.action, Action::Hold);
    }

    #[test]
    fn external_volume_change_resets_statistics() {
        let mut controller = VolumeController::start(FakeSink::new(5, 0, 15), Policy::Adaptive);
        controller.step(LoudnessReading::new(-5000)).unwrap();
        controller.step(LoudnessReading::new(-5200)).unwrap();
        assert_eq!(controller.state().sample_count(), 2);

        // The user turns the volume up by hand
        controller.sink_mut().volume = 9;
        let status = controller
            .evaluate(LoudnessReading::new(-4000), None)
            .unwrap();

        assert_eq!(status.external_change, Some(VolumeLevel(5)));
        assert_eq!(controller.state().sample_count(), 1);
        assert_eq!(controller.state().running_sum(), -4000);
        assert_eq!(status.mean, Some(-4000.0));
    }

    #[test]
    fn own_adjustments_are_not_external_changes() {
        let mut controller = VolumeController::start(FakeSink::new(5, 0, 15), medium());
        controller.step(LoudnessReading::new(-7000)).unwrap();
        let status = controller
            .evaluate(LoudnessReading::new(-7000), None)
            .unwrap();
        assert_eq!(status.external_change, None);
        assert_eq!(status.volume_before, VolumeLevel(6));
        assert_eq!(status.volume_after, VolumeLevel(7));
    }

    #[test]
    fn stop_is_idempotent_and_rejects_further_ticks() {
        let mut controller = VolumeController::start(FakeSink::new(5, 0, 15), Policy::Adaptive);
        controller.step(LoudnessReading::new(-5000)).unwrap();

        controller.stop();
        controller.stop();

        assert!(!controller.is_active());
        assert_eq!(controller.state().sample_count(), 0);
        assert!(matches!(
            controller.step(LoudnessReading::new(-5000)),
            Err(VolnormError::SessionStopped)
        ));
    }

    #[test]
    fn last_status_tracks_most_recent_tick() {
        let mut controller = VolumeController::start(FakeSink::new(5, 0, 15), medium());
        assert!(controller.last_status().is_none());

        controller.step(LoudnessReading::new(-4000)).unwrap();
        controller.step(LoudnessReading::new(-7000)).unwrap();

        let status = controller.last_status().unwrap();
        assert_eq!(status.tick, 2);
        assert_eq!(status.action, Action::Raise);
        assert_eq!(controller.ticks(), 2);
    }
}
