//! Normalization session
//!
//! Ties a [`LoudnessSampler`] and a [`VolumeController`] together for one
//! controller lifetime: `start` resolves the level and enables the sampler,
//! `tick` runs one sample-decide-act cycle, `stop` releases everything.

use crate::{
    adaptive::AdaptiveTuning,
    controller::VolumeController,
    events::{ControlEvent, TickStatus},
    policy::{LevelTable, Policy},
    sampler::{clamp_reading, LoudnessSampler},
};
use tracing::{error, info};
use volnorm_core::{LoudnessSource, Result, VolnormError, VolumeSink};

type Listener = Box<dyn FnMut(&ControlEvent) + Send>;

/// One normalization session
pub struct Session<L: LoudnessSource, S: VolumeSink> {
    level: String,
    sampler: LoudnessSampler<L>,
    controller: VolumeController<S>,
    listener: Option<Listener>,
    stopped: bool,
}

impl<L: LoudnessSource, S: VolumeSink> Session<L, S> {
    /// Start a session for `level`
    ///
    /// The level is resolved before the source is touched, so an unknown
    /// level never enables capture.
    ///
    /// # Errors
    /// `UnknownLevel` if `level` is not in `table`; the source's `Capture`
    /// error if it cannot be enabled
    pub fn start(
        table: &LevelTable,
        level: &str,
        source: L,
        sink: S,
        tuning: AdaptiveTuning,
    ) -> Result<Self> {
        let policy = table.resolve(level)?;
        Self::with_policy(level, policy, source, sink, tuning)
    }

    /// Start a session with an already resolved policy
    ///
    /// # Errors
    /// The source's `Capture` error if it cannot be enabled
    pub fn with_policy(
        level: &str,
        policy: Policy,
        source: L,
        sink: S,
        tuning: AdaptiveTuning,
    ) -> Result<Self> {
        let mut sampler = LoudnessSampler::new(source);
        sampler.enable()?;

        info!(level, %policy, "Normalizing audio");

        Ok(Self {
            level: level.to_string(),
            sampler,
            controller: VolumeController::with_tuning(sink, policy, tuning),
            listener: None,
            stopped: false,
        })
    }

    /// Register an observer for session events, replacing any previous one
    ///
    /// Emits `SessionStarted` to the new listener immediately.
    pub fn set_listener(&mut self, listener: impl FnMut(&ControlEvent) + Send + 'static) {
        let mut listener: Listener = Box::new(listener);
        if !self.stopped {
            listener(&ControlEvent::SessionStarted {
                level: self.level.clone(),
                policy: self.controller.policy(),
            });
        }
        self.listener = Some(listener);
    }

    /// Run one tick
    ///
    /// # Errors
    /// Capture and volume failures are returned unchanged; `SessionStopped`
    /// after [`Session::stop`]
    pub fn tick(&mut self) -> Result<TickStatus> {
        if self.stopped {
            return Err(VolnormError::SessionStopped);
        }

        let measurement = match self.sampler.measure() {
            Ok(measurement) => measurement,
            Err(e) => {
                error!(level = %self.level, "Loudness capture failed: {}", e);
                return Err(e);
            }
        };
        let reading = clamp_reading(measurement.rms);
        let status = self.controller.evaluate(reading, Some(measurement.peak))?;

        if let Some(expected) = status.external_change {
            self.emit(&ControlEvent::ExternalVolumeChange {
                expected,
                found: status.volume_before,
            });
        }
        self.emit(&ControlEvent::Tick(status.clone()));
        Ok(status)
    }

    /// Forget the adaptive statistics (track boundary signalled by the host)
    pub fn reset_statistics(&mut self) {
        self.controller.reset_statistics();
    }

    /// Stop the session and release the loudness source; idempotent
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        let ticks = self.controller.ticks();
        self.controller.stop();
        self.sampler.release();

        info!(level = %self.level, ticks, "Normalization stopped");
        self.emit(&ControlEvent::SessionStopped { ticks });
    }

    /// Level name the session was started with
    pub fn level(&self) -> &str {
        &self.level
    }

    /// Policy in effect
    pub fn policy(&self) -> Policy {
        self.controller.policy()
    }

    /// Ticks completed
    pub fn ticks(&self) -> u64 {
        self.controller.ticks()
    }

    /// Whether the session still accepts ticks
    pub fn is_active(&self) -> bool {
        !self.stopped
    }

    /// Borrow the controller
    pub fn controller(&self) -> &VolumeController<S> {
        &self.controller
    }

    /// Borrow the loudness source
    pub fn source(&self) -> &L {
        self.sampler.source()
    }

    fn emit(&mut self, event: &ControlEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(event);
        }
    }
}

impl<L: LoudnessSource, S: VolumeSink> Drop for Session<L, S> {
    fn drop(&mut self) {
        self.stop();
    }
}
