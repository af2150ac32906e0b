//! Audio devices for running off device
//!
//! The host opens a fresh loudness source and volume sink for every session
//! through a [`DeviceProvider`]. The simulated provider keeps one shared
//! mixer so the volume carries over between sessions, the way a real output
//! stream would.

mod program;
mod replay;
mod volume;

pub use program::{Passage, ProgramLoudness};
pub use replay::ReplayLoudness;
pub use volume::SimulatedVolume;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use volnorm_core::{LoudnessSource, Result, VolumeSink};

/// Opens the collaborators for one session
pub trait DeviceProvider: Send + Sync {
    /// Open a loudness source; the session enables it
    fn open_source(&self) -> Result<Box<dyn LoudnessSource>>;

    /// Open a handle on the output volume
    fn open_sink(&self) -> Result<Box<dyn VolumeSink>>;
}

/// Where simulated loudness comes from
#[derive(Debug, Clone, PartialEq)]
pub enum LoudnessFeed {
    /// Synthetic program with jitter
    Program {
        program: Vec<Passage>,
        jitter_mb: i32,
        seed: u64,
    },
    /// Readings replayed from a file
    Replay { path: PathBuf, looping: bool },
}

/// Simulated mixer plus a program or replay source
pub struct SimulatedDevices {
    volume: SimulatedVolume,
    source: LoudnessFeed,
    opened: AtomicUsize,
}

impl SimulatedDevices {
    pub fn new(volume: SimulatedVolume, source: LoudnessFeed) -> Self {
        Self {
            volume,
            source,
            opened: AtomicUsize::new(0),
        }
    }

    /// Handle on the shared mixer
    pub fn volume(&self) -> &SimulatedVolume {
        &self.volume
    }
}

impl DeviceProvider for SimulatedDevices {
    fn open_source(&self) -> Result<Box<dyn LoudnessSource>> {
        let opened = self.opened.fetch_add(1, Ordering::Relaxed);

        match &self.source {
            LoudnessFeed::Program {
                program,
                jitter_mb,
                seed,
            } => {
                // Each new session starts on the next passage
                let seed = seed.wrapping_add(opened as u64);
                let source =
                    ProgramLoudness::new(program.clone(), *jitter_mb, seed)?.starting_at(opened);
                Ok(Box::new(source))
            }
            LoudnessFeed::Replay { path, looping } => {
                Ok(Box::new(ReplayLoudness::from_path(path, *looping)?))
            }
        }
    }

    fn open_sink(&self) -> Result<Box<dyn VolumeSink>> {
        Ok(Box::new(self.volume.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volnorm_core::{VolumeLevel, VolumeRange};

    fn devices() -> SimulatedDevices {
        let range = VolumeRange::new(VolumeLevel(0), VolumeLevel(15)).unwrap();
        SimulatedDevices::new(
            SimulatedVolume::new(range, VolumeLevel(7)),
            LoudnessFeed::Program {
                program: ProgramLoudness::default_program(),
                jitter_mb: 0,
                seed: 1,
            },
        )
    }

    #[test]
    fn sinks_share_one_mixer() {
        let devices = devices();
        let mut first = devices.open_sink().unwrap();
        let second = devices.open_sink().unwrap();

        first.raise().unwrap();

        assert_eq!(second.volume().unwrap(), VolumeLevel(8));
        assert_eq!(devices.volume().current(), VolumeLevel(8));
    }

    #[test]
    fn successive_sources_advance_through_the_program() {
        let devices = devices();
        let program = ProgramLoudness::default_program();

        let mut first = devices.open_source().unwrap();
        let mut second = devices.open_source().unwrap();
        first.enable().unwrap();
        second.enable().unwrap();

        assert_eq!(first.measure().unwrap().rms, program[0].rms);
        assert_eq!(second.measure().unwrap().rms, program[1].rms);
    }

    #[test]
    fn missing_replay_file_fails_to_open() {
        let range = VolumeRange::new(VolumeLevel(0), VolumeLevel(15)).unwrap();
        let devices = SimulatedDevices::new(
            SimulatedVolume::new(range, VolumeLevel(7)),
            LoudnessFeed::Replay {
                path: PathBuf::from("/nonexistent/volnorm/replay.txt"),
                looping: false,
            },
        );

        assert!(devices.open_source().is_err());
    }
}
