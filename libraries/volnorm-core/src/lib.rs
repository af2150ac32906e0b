//! Volnorm Core
//!
//! Platform-agnostic core types, collaborator traits, and error handling for Volnorm.
//!
//! This crate provides the building blocks shared by the controller library and
//! every host that drives it (CLI, background service, tests).
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `LoudnessReading`, `PeakRms`, `VolumeLevel`, `VolumeRange`
//! - **Collaborator Traits**: `LoudnessSource` (audio capture), `VolumeSink` (volume actuation)
//! - **Error Handling**: Unified `VolnormError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use volnorm_core::{LoudnessReading, VolumeLevel, VolumeRange};
//!
//! // Readings outside the device domain are clamped, never rejected
//! let reading = LoudnessReading::new(250);
//! assert_eq!(reading.millibels(), 0);
//! assert!(LoudnessReading::new(-9600).is_silence());
//!
//! let range = VolumeRange::new(VolumeLevel(0), VolumeLevel(15)).unwrap();
//! assert!(range.contains(VolumeLevel(7)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, VolnormError};
pub use traits::{LoudnessSource, VolumeSink};

pub use types::{
    LoudnessReading, PeakRms, VolumeLevel, VolumeRange, LOUDNESS_CEILING_MB, SILENCE_FLOOR_MB,
};
