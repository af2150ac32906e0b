/// Loudness measurement types
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reading reported by the capture subsystem when there is no signal
/// (silence, or the gap between two tracks).
pub const SILENCE_FLOOR_MB: i32 = -9600;

/// Loudest possible reading (full scale).
pub const LOUDNESS_CEILING_MB: i32 = 0;

/// Peak RMS loudness at one sampling instant, in millibels.
///
/// Always within `[SILENCE_FLOOR_MB, LOUDNESS_CEILING_MB]`: construction clamps
/// out-of-domain values, which are treated as hardware idiosyncrasies rather
/// than errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct LoudnessReading(i32);

impl LoudnessReading {
    /// The silence floor reading
    pub const SILENCE: Self = Self(SILENCE_FLOOR_MB);

    /// Create a reading, clamping to the documented domain
    pub fn new(millibels: i32) -> Self {
        Self(millibels.clamp(SILENCE_FLOOR_MB, LOUDNESS_CEILING_MB))
    }

    /// Whether a raw device value lies inside the documented domain
    pub fn in_domain(millibels: i32) -> bool {
        (SILENCE_FLOOR_MB..=LOUDNESS_CEILING_MB).contains(&millibels)
    }

    /// Get the reading in millibels
    pub fn millibels(&self) -> i32 {
        self.0
    }

    /// Get the reading in decibels (1 dB = 100 mB)
    pub fn as_db(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Whether this reading sits on the silence floor
    pub fn is_silence(&self) -> bool {
        self.0 == SILENCE_FLOOR_MB
    }
}

impl From<i32> for LoudnessReading {
    fn from(millibels: i32) -> Self {
        Self::new(millibels)
    }
}

impl From<LoudnessReading> for i32 {
    fn from(reading: LoudnessReading) -> Self {
        reading.0
    }
}

impl fmt::Display for LoudnessReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mB", self.0)
    }
}

/// Raw peak + RMS measurement as reported by the capture subsystem.
///
/// Values are unclamped device output in millibels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakRms {
    /// Peak level
    pub peak: i32,

    /// RMS level (the controller's input)
    pub rms: i32,
}

impl PeakRms {
    /// Create a new measurement
    pub fn new(peak: i32, rms: i32) -> Self {
        Self { peak, rms }
    }

    /// A measurement of pure silence
    pub fn silence() -> Self {
        Self {
            peak: SILENCE_FLOOR_MB,
            rms: SILENCE_FLOOR_MB,
        }
    }

    /// The RMS component as a (clamped) loudness reading
    pub fn reading(&self) -> LoudnessReading {
        LoudnessReading::new(self.rms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_domain_values() {
        assert_eq!(LoudnessReading::new(120).millibels(), 0);
        assert_eq!(LoudnessReading::new(-20_000).millibels(), SILENCE_FLOOR_MB);
        assert_eq!(LoudnessReading::new(-4500).millibels(), -4500);
    }

    #[test]
    fn domain_check_is_inclusive() {
        assert!(LoudnessReading::in_domain(SILENCE_FLOOR_MB));
        assert!(LoudnessReading::in_domain(LOUDNESS_CEILING_MB));
        assert!(!LoudnessReading::in_domain(1));
        assert!(!LoudnessReading::in_domain(-9601));
    }

    #[test]
    fn silence_detection() {
        assert!(LoudnessReading::SILENCE.is_silence());
        assert!(LoudnessReading::new(-12_000).is_silence());
        assert!(!LoudnessReading::new(-9599).is_silence());
    }

    #[test]
    fn decibel_conversion() {
        assert!((LoudnessReading::new(-4550).as_db() + 45.5).abs() < f64::EPSILON);
    }

    #[test]
    fn peak_rms_exposes_rms_as_reading() {
        let m = PeakRms::new(-1200, -4800);
        assert_eq!(m.reading().millibels(), -4800);
        assert!(PeakRms::silence().reading().is_silence());
    }

    #[test]
    fn deserialization_clamps() {
        let reading: LoudnessReading = serde_json::from_str("500").unwrap();
        assert_eq!(reading.millibels(), 0);
        assert_eq!(serde_json::to_string(&LoudnessReading::new(-3000)).unwrap(), "-3000");
    }
}
