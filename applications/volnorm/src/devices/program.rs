//! Synthetic loudness program
//!
//! Cycles through passages of roughly constant loudness, the way an album
//! alternates quiet and loud tracks with short gaps of silence in between.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use volnorm_core::{LoudnessSource, PeakRms, Result, VolnormError, SILENCE_FLOOR_MB};

/// Headroom of the peak over the RMS value
const CREST_FACTOR_MB: i32 = 1200;

/// A stretch of constant nominal loudness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Nominal RMS in millibels
    pub rms: i32,
    /// Number of measurements the passage lasts
    pub ticks: u32,
}

/// Deterministic loudness program with seeded jitter
pub struct ProgramLoudness {
    program: Vec<Passage>,
    passage: usize,
    elapsed: u32,
    jitter_mb: i32,
    rng: StdRng,
    enabled: bool,
}

impl ProgramLoudness {
    /// # Errors
    /// `InvalidInput` for an empty program, a program whose passages all
    /// last zero ticks, or a negative jitter
    pub fn new(program: Vec<Passage>, jitter_mb: i32, seed: u64) -> Result<Self> {
        if program.iter().all(|p| p.ticks == 0) {
            return Err(VolnormError::invalid_input(
                "loudness program has no measurable passages",
            ));
        }
        if jitter_mb < 0 {
            return Err(VolnormError::invalid_input(format!(
                "jitter must not be negative, got {}",
                jitter_mb
            )));
        }

        Ok(Self {
            program,
            passage: 0,
            elapsed: 0,
            jitter_mb,
            rng: StdRng::seed_from_u64(seed),
            enabled: false,
        })
    }

    /// Quiet, silent, loud and medium passages
    pub fn default_program() -> Vec<Passage> {
        vec![
            Passage { rms: -7200, ticks: 40 },
            Passage { rms: SILENCE_FLOOR_MB, ticks: 5 },
            Passage { rms: -1800, ticks: 40 },
            Passage { rms: SILENCE_FLOOR_MB, ticks: 5 },
            Passage { rms: -4500, ticks: 40 },
        ]
    }

    /// Begin at passage `index`, wrapping around the program
    #[must_use]
    pub fn starting_at(mut self, index: usize) -> Self {
        self.passage = index % self.program.len();
        self.elapsed = 0;
        self.skip_empty();
        self
    }

    fn skip_empty(&mut self) {
        while self.program[self.passage].ticks == 0 {
            self.passage = (self.passage + 1) % self.program.len();
        }
    }

    fn advance(&mut self) -> Passage {
        self.skip_empty();
        let current = self.program[self.passage];
        self.elapsed += 1;
        if self.elapsed >= current.ticks {
            self.elapsed = 0;
            self.passage = (self.passage + 1) % self.program.len();
        }
        current
    }
}

impl LoudnessSource for ProgramLoudness {
    fn enable(&mut self) -> Result<()> {
        self.enabled = true;
        Ok(())
    }

    fn measure(&mut self) -> Result<PeakRms> {
        if !self.enabled {
            return Err(VolnormError::capture("program source is not enabled"));
        }

        let passage = self.advance();
        if passage.rms <= SILENCE_FLOOR_MB {
            return Ok(PeakRms::silence());
        }

        let rms = passage.rms + self.rng.gen_range(-self.jitter_mb..=self.jitter_mb);
        let peak = (rms + CREST_FACTOR_MB + self.rng.gen_range(0..=300)).min(0);
        Ok(PeakRms::new(peak, rms))
    }

    fn disable(&mut self) -> Result<()> {
        self.enabled = false;
        Ok(())
    }
}
