/// Core error types for Volnorm
use thiserror::Error;

/// Result type alias using `VolnormError`
pub type Result<T> = std::result::Result<T, VolnormError>;

/// Core error type for Volnorm
#[derive(Error, Debug)]
pub enum VolnormError {
    /// The loudness source could not produce a reading
    /// (hardware unavailable, capture session ended).
    #[error("Capture error: {0}")]
    Capture(String),

    /// A level name that does not resolve in the level policy table
    #[error("Unknown level: {0}")]
    UnknownLevel(String),

    /// A fixed band whose bounds are not strictly ordered
    #[error("Invalid band: lower bound {lower} mB must be below upper bound {upper} mB")]
    InvalidBand {
        /// Lower bound in millibels
        lower: i32,
        /// Upper bound in millibels
        upper: i32,
    },

    /// A volume range whose minimum exceeds its maximum
    #[error("Invalid volume range: min {min} exceeds max {max}")]
    InvalidVolumeRange {
        /// Reported minimum
        min: i32,
        /// Reported maximum
        max: i32,
    },

    /// The volume sink failed to report or change the volume
    #[error("Volume error: {0}")]
    Volume(String),

    /// Operation on a session or controller that was already stopped
    #[error("Session stopped")]
    SessionStopped,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VolnormError {
    /// Create a capture error
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Create an unknown level error
    pub fn unknown_level(name: impl Into<String>) -> Self {
        Self::UnknownLevel(name.into())
    }

    /// Create a volume error
    pub fn volume(msg: impl Into<String>) -> Self {
        Self::Volume(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error is a configuration problem detected at session start
    /// (as opposed to a hardware failure mid-session).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownLevel(_) | Self::InvalidBand { .. } | Self::InvalidInput(_)
        )
    }
}
