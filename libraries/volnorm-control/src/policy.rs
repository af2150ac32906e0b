//! Level policies
//!
//! A user-selected level name resolves to a [`Policy`]: either a fixed
//! loudness band or the adaptive (running-mean) band. The mapping lives in a
//! [`LevelTable`], validated when it is built.

use serde::{Deserialize, Serialize};
use std::fmt;
use volnorm_core::{LoudnessReading, Result, VolnormError};

/// Fixed loudness band in millibels (`lower < upper`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BandBounds", into = "BandBounds")]
pub struct Band {
    lower: i32,
    upper: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BandBounds {
    lower: i32,
    upper: i32,
}

impl Band {
    /// Create a band
    ///
    /// # Errors
    /// Returns `InvalidBand` unless `lower < upper`
    pub fn new(lower: i32, upper: i32) -> Result<Self> {
        if lower >= upper {
            return Err(VolnormError::InvalidBand { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Lower bound in millibels
    pub fn lower(&self) -> i32 {
        self.lower
    }

    /// Upper bound in millibels
    pub fn upper(&self) -> i32 {
        self.upper
    }
}

impl TryFrom<BandBounds> for Band {
    type Error = VolnormError;

    fn try_from(bounds: BandBounds) -> Result<Self> {
        Self::new(bounds.lower, bounds.upper)
    }
}

impl From<Band> for BandBounds {
    fn from(band: Band) -> Self {
        Self {
            lower: band.lower,
            upper: band.upper,
        }
    }
}

/// Control policy for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Policy {
    /// Hold the reading inside a static band
    FixedBand(Band),

    /// Derive the band each tick from the running mean of the readings
    Adaptive,
}

impl Policy {
    /// Fixed band policy
    ///
    /// # Errors
    /// Returns `InvalidBand` unless `lower < upper`
    pub fn fixed(lower: i32, upper: i32) -> Result<Self> {
        Band::new(lower, upper).map(Self::FixedBand)
    }

    /// Whether this is the adaptive policy
    pub fn is_adaptive(&self) -> bool {
        matches!(self, Self::Adaptive)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedBand(band) => write!(f, "fixed [{}, {}] mB", band.lower, band.upper),
            Self::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// Band in effect for a single tick
///
/// Fixed policies produce integral bounds; the adaptive policy produces
/// fractional bounds around the running mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveBand {
    /// Readings below this may raise the volume
    pub lower: f64,

    /// Readings above this may lower the volume
    pub upper: f64,
}

impl EffectiveBand {
    /// Whether `reading` lies strictly below the band
    pub fn is_below(&self, reading: LoudnessReading) -> bool {
        f64::from(reading.millibels()) < self.lower
    }

    /// Whether `reading` lies strictly above the band
    pub fn is_above(&self, reading: LoudnessReading) -> bool {
        f64::from(reading.millibels()) > self.upper
    }

    /// Whether `reading` lies inside the band (bounds included)
    pub fn contains(&self, reading: LoudnessReading) -> bool {
        !self.is_below(reading) && !self.is_above(reading)
    }
}

impl From<Band> for EffectiveBand {
    fn from(band: Band) -> Self {
        Self {
            lower: f64::from(band.lower),
            upper: f64::from(band.upper),
        }
    }
}

/// Name of the built-in quiet level
pub const LEVEL_LOW: &str = "Low";
/// Name of the built-in medium level
pub const LEVEL_MEDIUM: &str = "Medium";
/// Name of the built-in loud level
pub const LEVEL_HIGH: &str = "High";
/// Name of the built-in adaptive level
pub const LEVEL_DYNAMIC: &str = "Dynamic";

/// One named level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelEntry {
    /// Display name, matched case-insensitively
    pub name: String,

    /// Policy selected by this name
    pub policy: Policy,
}

/// Static mapping from level names to policies
///
/// Bands may overlap between levels; only `lower < upper` within each band is
/// required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    entries: Vec<LevelEntry>,
}

impl LevelTable {
    /// The built-in table: `Low`, `Medium`, `High` and `Dynamic`
    pub fn builtin() -> Self {
        let fixed = |name: &str, lower, upper| LevelEntry {
            name: name.to_string(),
            policy: Policy::FixedBand(Band { lower, upper }),
        };

        Self {
            entries: vec![
                fixed(LEVEL_LOW, -7500, -5000),
                fixed(LEVEL_MEDIUM, -6000, -3000),
                fixed(LEVEL_HIGH, -4500, -1500),
                LevelEntry {
                    name: LEVEL_DYNAMIC.to_string(),
                    policy: Policy::Adaptive,
                },
            ],
        }
    }

    /// Build a table from explicit entries
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty name or a name defined twice
    pub fn from_entries(entries: impl IntoIterator<Item = LevelEntry>) -> Result<Self> {
        let mut table = Self {
            entries: Vec::new(),
        };
        for entry in entries {
            if entry.name.trim().is_empty() {
                return Err(VolnormError::invalid_input("level name must not be empty"));
            }
            if table.find(&entry.name).is_some() {
                return Err(VolnormError::invalid_input(format!(
                    "level '{}' defined more than once",
                    entry.name
                )));
            }
            table.entries.push(entry);
        }
        Ok(table)
    }

    /// Add a level, or replace the policy of an existing one
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty name
    pub fn upsert(&mut self, name: &str, policy: Policy) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VolnormError::invalid_input("level name must not be empty"));
        }
        match self
            .entries
            .iter_mut()
            .find(|e| e.name.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.policy = policy,
            None => self.entries.push(LevelEntry {
                name: name.to_string(),
                policy,
            }),
        }
        Ok(())
    }

    /// Resolve a level name
    ///
    /// # Errors
    /// Returns `UnknownLevel` for names not in the table; never falls back
    /// to a default
    pub fn resolve(&self, name: &str) -> Result<Policy> {
        self.find(name)
            .map(|e| e.policy)
            .ok_or_else(|| VolnormError::unknown_level(name))
    }

    /// Level names in table order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// All entries in table order
    pub fn entries(&self) -> &[LevelEntry] {
        &self.entries
    }

    fn find(&self, name: &str) -> Option<&LevelEntry> {
        let name = name.trim();
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::builtin()
    }
}
