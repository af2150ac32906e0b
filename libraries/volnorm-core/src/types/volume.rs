/// Output volume types
use crate::error::{Result, VolnormError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete output volume index as reported by the volume sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VolumeLevel(pub i32);

impl VolumeLevel {
    /// Get the raw volume index
    pub fn value(&self) -> i32 {
        self.0
    }

    /// One discrete step up
    #[must_use]
    pub fn step_up(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// One discrete step down
    #[must_use]
    pub fn step_down(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Display for VolumeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device-reported volume bounds (`min <= max`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRange {
    min: VolumeLevel,
    max: VolumeLevel,
}

impl VolumeRange {
    /// Create a volume range
    ///
    /// # Errors
    /// Returns `InvalidVolumeRange` if `min > max`
    pub fn new(min: VolumeLevel, max: VolumeLevel) -> Result<Self> {
        if min > max {
            return Err(VolnormError::InvalidVolumeRange {
                min: min.0,
                max: max.0,
            });
        }
        Ok(Self { min, max })
    }

    /// Lowest volume the device accepts
    pub fn min(&self) -> VolumeLevel {
        self.min
    }

    /// Highest volume the device accepts
    pub fn max(&self) -> VolumeLevel {
        self.max
    }

    /// Whether `level` lies within the bounds
    pub fn contains(&self, level: VolumeLevel) -> bool {
        level >= self.min && level <= self.max
    }

    /// Clamp `level` into the bounds
    pub fn clamp(&self, level: VolumeLevel) -> VolumeLevel {
        level.clamp(self.min, self.max)
    }
}
