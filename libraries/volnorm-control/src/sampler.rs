//! Loudness sampler
//!
//! Wraps a [`LoudnessSource`] with a scoped enable/disable lifecycle and
//! turns raw measurements into clamped [`LoudnessReading`]s.

use tracing::{debug, warn};
use volnorm_core::{LoudnessReading, LoudnessSource, PeakRms, Result, VolnormError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SamplerState {
    Idle,
    Enabled,
    Released,
}

/// Scoped owner of a loudness source
///
/// The source is disabled at most once: by [`LoudnessSampler::release`] or,
/// failing that, on drop. Releasing a sampler that was never enabled does not
/// touch the source.
pub struct LoudnessSampler<L: LoudnessSource> {
    source: L,
    state: SamplerState,
}

impl<L: LoudnessSource> LoudnessSampler<L> {
    /// Wrap a source without enabling it
    pub fn new(source: L) -> Self {
        Self {
            source,
            state: SamplerState::Idle,
        }
    }

    /// Enable the underlying source; a no-op if already enabled
    ///
    /// # Errors
    /// Propagates the source's `Capture` error; `SessionStopped` after release
    pub fn enable(&mut self) -> Result<()> {
        match self.state {
            SamplerState::Enabled => Ok(()),
            SamplerState::Released => Err(VolnormError::SessionStopped),
            SamplerState::Idle => {
                self.source.enable()?;
                self.state = SamplerState::Enabled;
                debug!("Loudness source enabled");
                Ok(())
            }
        }
    }

    /// Take one raw measurement
    ///
    /// # Errors
    /// `Capture` if the sampler is not enabled or the source fails
    pub fn measure(&mut self) -> Result<PeakRms> {
        if self.state != SamplerState::Enabled {
            return Err(VolnormError::capture("loudness source is not enabled"));
        }
        self.source.measure()
    }

    /// Take one reading, clamping out-of-domain values
    ///
    /// # Errors
    /// Same as [`LoudnessSampler::measure`]
    pub fn sample(&mut self) -> Result<LoudnessReading> {
        let measurement = self.measure()?;
        Ok(clamp_reading(measurement.rms))
    }

    /// Release the underlying source; idempotent
    pub fn release(&mut self) {
        if self.state == SamplerState::Enabled {
            if let Err(e) = self.source.disable() {
                warn!("Failed to disable loudness source: {}", e);
            } else {
                debug!("Loudness source released");
            }
        }
        self.state = SamplerState::Released;
    }

    /// Whether the source is currently enabled
    pub fn is_enabled(&self) -> bool {
        self.state == SamplerState::Enabled
    }

    /// Borrow the underlying source
    pub fn source(&self) -> &L {
        &self.source
    }
}

impl<L: LoudnessSource> Drop for LoudnessSampler<L> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Convert a raw RMS value to a reading, logging when it had to be clamped
pub(crate) fn clamp_reading(raw: i32) -> LoudnessReading {
    if !LoudnessReading::in_domain(raw) {
        warn!(raw, "Loudness reading outside device domain, clamping");
    }
    LoudnessReading::new(raw)
}
