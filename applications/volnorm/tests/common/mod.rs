//! Common test utilities and fixtures
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use volnorm::{DeviceProvider, SimulatedVolume};
use volnorm_core::{
    LoudnessSource, PeakRms, Result, VolnormError, VolumeLevel, VolumeRange, VolumeSink,
};

/// Lifecycle calls seen by every source a [`TestDevices`] opened
#[derive(Debug, Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub enables: AtomicUsize,
    pub disables: AtomicUsize,
    pub measures: AtomicUsize,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn enables(&self) -> usize {
        self.enables.load(Ordering::SeqCst)
    }

    pub fn disables(&self) -> usize {
        self.disables.load(Ordering::SeqCst)
    }

    pub fn measures(&self) -> usize {
        self.measures.load(Ordering::SeqCst)
    }
}

/// Source reporting a constant RMS, optionally failing after a few readings
struct ConstantSource {
    rms: i32,
    fail_after: Option<usize>,
    taken: usize,
    counters: Arc<Counters>,
}

impl LoudnessSource for ConstantSource {
    fn enable(&mut self) -> Result<()> {
        self.counters.enables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn measure(&mut self) -> Result<PeakRms> {
        self.counters.measures.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| self.taken >= limit) {
            return Err(VolnormError::capture("visualizer detached"));
        }
        self.taken += 1;
        Ok(PeakRms::new((self.rms + 1000).min(0), self.rms))
    }

    fn disable(&mut self) -> Result<()> {
        self.counters.disables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Device provider with a constant source and a shared simulated mixer
pub struct TestDevices {
    pub volume: SimulatedVolume,
    pub counters: Arc<Counters>,
    rms: i32,
    fail_after: Option<usize>,
}

impl TestDevices {
    pub fn new(rms: i32) -> Self {
        let range = VolumeRange::new(VolumeLevel(0), VolumeLevel(15)).unwrap();
        Self {
            volume: SimulatedVolume::new(range, VolumeLevel(7)),
            counters: Arc::new(Counters::default()),
            rms,
            fail_after: None,
        }
    }

    pub fn failing_after(rms: i32, readings: usize) -> Self {
        Self {
            fail_after: Some(readings),
            ..Self::new(rms)
        }
    }
}

impl DeviceProvider for TestDevices {
    fn open_source(&self) -> Result<Box<dyn LoudnessSource>> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ConstantSource {
            rms: self.rms,
            fail_after: self.fail_after,
            taken: 0,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn open_sink(&self) -> Result<Box<dyn VolumeSink>> {
        Ok(Box::new(self.volume.clone()))
    }
}
