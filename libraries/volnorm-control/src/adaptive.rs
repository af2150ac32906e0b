//! Adaptive band
//!
//! The adaptive policy tracks the running mean of the readings and places a
//! band around it. The half-width grows as the mean approaches full scale:
//!
//! ```text
//! noise_margin = -(multiplier * (SILENCE_FLOOR / mean) + offset)
//! band         = [mean + noise_margin, mean - noise_margin]
//! ```

use crate::policy::EffectiveBand;
use serde::{Deserialize, Serialize};
use volnorm_core::{LoudnessReading, Result, VolnormError, SILENCE_FLOOR_MB};

/// Largest mean fed into the margin formula; keeps the division defined
/// when readings sit at full scale.
pub const MEAN_CEILING_MB: f64 = -1.0;

/// Default margin multiplier
pub const DEFAULT_MARGIN_MULTIPLIER: f64 = 1000.0;

/// Default margin offset in millibels
pub const DEFAULT_MARGIN_OFFSET: f64 = 500.0;

/// Tunable constants of the noise-margin formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveTuning {
    /// Scales the `SILENCE_FLOOR / mean` ratio
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Constant added to the half-width
    #[serde(default = "default_offset")]
    pub offset: f64,
}

fn default_multiplier() -> f64 {
    DEFAULT_MARGIN_MULTIPLIER
}

fn default_offset() -> f64 {
    DEFAULT_MARGIN_OFFSET
}

impl Default for AdaptiveTuning {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_MARGIN_MULTIPLIER,
            offset: DEFAULT_MARGIN_OFFSET,
        }
    }
}

impl AdaptiveTuning {
    /// Create a tuning
    ///
    /// # Errors
    /// See [`AdaptiveTuning::validate`]
    pub fn new(multiplier: f64, offset: f64) -> Result<Self> {
        let tuning = Self { multiplier, offset };
        tuning.validate()?;
        Ok(tuning)
    }

    /// Check that the band is non-empty for every reachable mean
    ///
    /// The half-width is linear in `SILENCE_FLOOR / mean`, which ranges over
    /// `[1, 9600]` once the mean is clamped, so checking both ends suffices.
    ///
    /// # Errors
    /// Returns `InvalidInput` for non-finite constants or a non-positive half-width
    pub fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || !self.offset.is_finite() {
            return Err(VolnormError::invalid_input(
                "adaptive tuning constants must be finite",
            ));
        }
        let floor = f64::from(SILENCE_FLOOR_MB);
        let narrowest = self.half_width(floor).min(self.half_width(MEAN_CEILING_MB));
        if narrowest <= 0.0 {
            return Err(VolnormError::invalid_input(format!(
                "adaptive tuning (multiplier {}, offset {}) yields an empty band",
                self.multiplier, self.offset
            )));
        }
        Ok(())
    }

    /// Signed noise margin for `mean` (negative for valid tunings)
    pub fn noise_margin(&self, mean: f64) -> f64 {
        -self.half_width(mean)
    }

    /// Band around `mean`
    pub fn band(&self, mean: f64) -> EffectiveBand {
        let margin = self.noise_margin(mean);
        EffectiveBand {
            lower: mean + margin,
            upper: mean - margin,
        }
    }

    fn half_width(&self, mean: f64) -> f64 {
        let mean = mean.min(MEAN_CEILING_MB);
        self.multiplier * (f64::from(SILENCE_FLOOR_MB) / mean) + self.offset
    }
}

/// Running sum and count of readings since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningStats {
    sum: i64,
    count: u64,
}

impl RunningStats {
    /// Empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one reading
    pub fn push(&mut self, reading: LoudnessReading) {
        self.sum += i64::from(reading.millibels());
        self.count += 1;
    }

    /// Mean of the accumulated readings, if any
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }

    /// Drop all accumulated readings
    pub fn reset(&mut self) {
        self.sum = 0;
        self.count = 0;
    }

    /// Sum of the accumulated readings in millibels
    pub fn sum(&self) -> i64 {
        self.sum
    }

    /// Number of accumulated readings
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Whether nothing has been accumulated
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_margin_at_silence_floor() {
        let tuning = AdaptiveTuning::default();
        // -9600 / -9600 = 1 → -(1000 + 500)
        assert!((tuning.noise_margin(-9600.0) + 1500.0).abs() < 1e-9);
    }

    #[test]
    fn margin_for_typical_mean() {
        let tuning = AdaptiveTuning::default();
        // -9600 / -4800 = 2 → -(2000 + 500)
        assert!((tuning.noise_margin(-4800.0) + 2500.0).abs() < 1e-9);

        let band = tuning.band(-4800.0);
        assert!((band.lower + 7300.0).abs() < 1e-9);
        assert!((band.upper + 2300.0).abs() < 1e-9);
    }

    #[test]
    fn zero_mean_is_guarded() {
        let tuning = AdaptiveTuning::default();
        let margin = tuning.noise_margin(0.0);
        assert!(margin.is_finite());
        assert!(margin < 0.0);
        assert_eq!(margin, tuning.noise_margin(MEAN_CEILING_MB));
    }

    #[test]
    fn alternative_multiplier_is_accepted() {
        let tuning = AdaptiveTuning::new(400.0, 500.0).unwrap();
        assert!((tuning.noise_margin(-9600.0) + 900.0).abs() < 1e-9);
    }

    #[test]
    fn tuning_with_empty_band_is_rejected() {
        assert!(AdaptiveTuning::new(100.0, -200.0).is_err());
        assert!(AdaptiveTuning::new(f64::NAN, 500.0).is_err());
        assert!(AdaptiveTuning::new(-1.0, 500.0).is_err());
    }

    #[test]
    fn running_stats_mean_and_reset() {
        let mut stats = RunningStats::new();
        assert_eq!(stats.mean(), None);

        stats.push(LoudnessReading::new(-4000));
        stats.push(LoudnessReading::new(-6000));
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.sum(), -10_000);
        assert_eq!(stats.mean(), Some(-5000.0));

        stats.reset();
        assert!(stats.is_empty());
        assert_eq!(stats.sum(), 0);
    }
}
