/// Simulated output volume
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use volnorm_core::{Result, VolumeLevel, VolumeRange, VolumeSink};

#[derive(Debug)]
struct Mixer {
    volume: VolumeLevel,
    range: VolumeRange,
    steps: u64,
}

/// In-memory volume with hardware-like bounds
///
/// Clones share the same mixer, so a clone can play the part of the user
/// turning the volume knob while a session runs.
#[derive(Debug, Clone)]
pub struct SimulatedVolume {
    mixer: Arc<Mutex<Mixer>>,
}

impl SimulatedVolume {
    /// Create a mixer at `initial`, clamped into `range`
    pub fn new(range: VolumeRange, initial: VolumeLevel) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer {
                volume: range.clamp(initial),
                range,
                steps: 0,
            })),
        }
    }

    /// Current volume
    pub fn current(&self) -> VolumeLevel {
        self.lock().volume
    }

    /// Change the volume from outside the control loop
    ///
    /// Returns the level actually applied after clamping.
    pub fn set_volume(&self, level: VolumeLevel) -> VolumeLevel {
        let mut mixer = self.lock();
        mixer.volume = mixer.range.clamp(level);
        tracing::debug!(volume = mixer.volume.value(), "Simulated volume set externally");
        mixer.volume
    }

    /// Steps applied through the [`VolumeSink`] interface
    pub fn steps(&self) -> u64 {
        self.lock().steps
    }

    fn lock(&self) -> MutexGuard<'_, Mixer> {
        self.mixer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VolumeSink for SimulatedVolume {
    fn volume(&self) -> Result<VolumeLevel> {
        Ok(self.lock().volume)
    }

    fn min_volume(&self) -> Result<VolumeLevel> {
        Ok(self.lock().range.min())
    }

    fn max_volume(&self) -> Result<VolumeLevel> {
        Ok(self.lock().range.max())
    }

    fn raise(&mut self) -> Result<()> {
        let mut mixer = self.lock();
        // Like real hardware, a step past the top is silently ignored
        if mixer.volume < mixer.range.max() {
            mixer.volume = mixer.volume.step_up();
            mixer.steps += 1;
        }
        Ok(())
    }

    fn lower(&mut self) -> Result<()> {
        let mut mixer = self.lock();
        if mixer.volume > mixer.range.min() {
            mixer.volume = mixer.volume.step_down();
            mixer.steps += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixer(initial: i32) -> SimulatedVolume {
        let range = VolumeRange::new(VolumeLevel(2), VolumeLevel(10)).unwrap();
        SimulatedVolume::new(range, VolumeLevel(initial))
    }

    #[test]
    fn initial_volume_is_clamped() {
        assert_eq!(mixer(40).current(), VolumeLevel(10));
        assert_eq!(mixer(-3).current(), VolumeLevel(2));
    }

    #[test]
    fn steps_stop_at_the_bounds() {
        let mut volume = mixer(9);
        volume.raise().unwrap();
        volume.raise().unwrap();

        assert_eq!(volume.current(), VolumeLevel(10));
        assert_eq!(volume.steps(), 1);

        let mut volume = mixer(3);
        volume.lower().unwrap();
        volume.lower().unwrap();

        assert_eq!(volume.current(), VolumeLevel(2));
        assert_eq!(volume.steps(), 1);
    }

    #[test]
    fn external_change_is_visible_to_clones() {
        let volume = mixer(5);
        let knob = volume.clone();

        assert_eq!(knob.set_volume(VolumeLevel(8)), VolumeLevel(8));
        assert_eq!(volume.volume().unwrap(), VolumeLevel(8));
        assert_eq!(volume.steps(), 0);
    }
}
