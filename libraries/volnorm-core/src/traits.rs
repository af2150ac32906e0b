/// Collaborator traits for Volnorm
use crate::error::Result;
use crate::types::{PeakRms, VolumeLevel};

/// Loudness source trait
///
/// Implementers wrap the platform's audio-output capture (a visualizer tap,
/// a loopback monitor, a replay file) and report one peak/RMS measurement per call.
///
/// Lifecycle: `enable()` before the first `measure()`, `disable()` after the last.
pub trait LoudnessSource: Send {
    /// Acquire the capture resource
    ///
    /// # Errors
    /// Returns a `Capture` error if the hardware is unavailable
    fn enable(&mut self) -> Result<()>;

    /// Take one measurement
    ///
    /// May block briefly on the hardware read, but never indefinitely.
    ///
    /// # Errors
    /// Returns a `Capture` error instead of a sentinel value when no reading
    /// can be produced
    fn measure(&mut self) -> Result<PeakRms>;

    /// Release the capture resource
    fn disable(&mut self) -> Result<()>;
}

/// Volume sink trait
///
/// Implementers expose the system-wide output volume. Every change is one
/// discrete step; the controller never sets an absolute value.
///
/// The sink is expected to serialize its own access to the hardware volume.
pub trait VolumeSink: Send {
    /// Current volume
    fn volume(&self) -> Result<VolumeLevel>;

    /// Lowest volume the device accepts
    fn min_volume(&self) -> Result<VolumeLevel>;

    /// Highest volume the device accepts
    fn max_volume(&self) -> Result<VolumeLevel>;

    /// Raise the volume by one step
    fn raise(&mut self) -> Result<()>;

    /// Lower the volume by one step
    fn lower(&mut self) -> Result<()>;
}

impl<T: LoudnessSource + ?Sized> LoudnessSource for Box<T> {
    fn enable(&mut self) -> Result<()> {
        (**self).enable()
    }

    fn measure(&mut self) -> Result<PeakRms> {
        (**self).measure()
    }

    fn disable(&mut self) -> Result<()> {
        (**self).disable()
    }
}

impl<T: VolumeSink + ?Sized> VolumeSink for Box<T> {
    fn volume(&self) -> Result<VolumeLevel> {
        (**self).volume()
    }

    fn min_volume(&self) -> Result<VolumeLevel> {
        (**self).min_volume()
    }

    fn max_volume(&self) -> Result<VolumeLevel> {
        (**self).max_volume()
    }

    fn raise(&mut self) -> Result<()> {
        (**self).raise()
    }

    fn lower(&mut self) -> Result<()> {
        (**self).lower()
    }
}

impl<T: VolumeSink + ?Sized> VolumeSink for &mut T {
    fn volume(&self) -> Result<VolumeLevel> {
        (**self).volume()
    }

    fn min_volume(&self) -> Result<VolumeLevel> {
        (**self).min_volume()
    }

    fn max_volume(&self) -> Result<VolumeLevel> {
        (**self).max_volume()
    }

    fn raise(&mut self) -> Result<()> {
        (**self).raise()
    }

    fn lower(&mut self) -> Result<()> {
        (**self).lower()
    }
}
