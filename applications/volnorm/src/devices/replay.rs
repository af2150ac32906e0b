//! Replayed loudness readings
//!
//! Reads a text file with one measurement per line: either a single RMS
//! value or `peak rms`, both in millibels. Blank lines and anything after a
//! `#` are ignored.

use std::path::Path;
use volnorm_core::{LoudnessSource, PeakRms, Result, VolnormError};

/// Loudness source fed from a recorded capture
#[derive(Debug, Clone)]
pub struct ReplayLoudness {
    readings: Vec<PeakRms>,
    position: usize,
    looping: bool,
    enabled: bool,
}

impl ReplayLoudness {
    /// Load readings from `path`
    ///
    /// # Errors
    /// `Io` if the file cannot be read; `InvalidInput` for malformed lines or
    /// a file without readings
    pub fn from_path(path: &Path, looping: bool) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded replay file {}", path.display());
        Self::parse(&text, looping)
    }

    /// Parse readings from text
    ///
    /// # Errors
    /// `InvalidInput` for malformed lines or text without readings
    pub fn parse(text: &str, looping: bool) -> Result<Self> {
        let mut readings = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let content = line.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }

            let values = content
                .split_whitespace()
                .map(str::parse::<i32>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| {
                    VolnormError::invalid_input(format!("replay line {}: {}", index + 1, e))
                })?;

            let reading = match values.as_slice() {
                [rms] => PeakRms::new(*rms, *rms),
                [peak, rms] => PeakRms::new(*peak, *rms),
                _ => {
                    return Err(VolnormError::invalid_input(format!(
                        "replay line {}: expected `rms` or `peak rms`",
                        index + 1
                    )))
                }
            };
            readings.push(reading);
        }

        if readings.is_empty() {
            return Err(VolnormError::invalid_input("replay file has no readings"));
        }

        Ok(Self {
            readings,
            position: 0,
            looping,
            enabled: false,
        })
    }

    /// Readings left before the end of the file
    pub fn remaining(&self) -> usize {
        self.readings.len() - self.position
    }
}

impl LoudnessSource for ReplayLoudness {
    fn enable(&mut self) -> Result<()> {
        self.enabled = true;
        Ok(())
    }

    fn measure(&mut self) -> Result<PeakRms> {
        if !self.enabled {
            return Err(VolnormError::capture("replay source is not enabled"));
        }

        if self.position == self.readings.len() {
            if !self.looping {
                return Err(VolnormError::capture(format!(
                    "replay exhausted after {} readings",
                    self.readings.len()
                )));
            }
            self.position = 0;
        }

        let reading = self.readings[self.position];
        self.position += 1;
        Ok(reading)
    }

    fn disable(&mut self) -> Result<()> {
        self.enabled = false;
        Ok(())
    }
}
