mod loudness;
mod volume;

pub use loudness::{LoudnessReading, PeakRms, LOUDNESS_CEILING_MB, SILENCE_FLOOR_MB};
pub use volume::{VolumeLevel, VolumeRange};
