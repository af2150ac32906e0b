//! Volnorm host
//!
//! Runs the normalization control loop outside of any particular platform:
//! configuration loading, hosting strategies (one-shot, periodic,
//! long-running), a single-session supervisor, and simulated or replayed
//! audio devices for running off device.
//!
//! This library exposes the host components for the binary and for testing.

pub mod config;
pub mod devices;
pub mod error;
pub mod host;
pub mod supervisor;

// Re-export commonly used types for convenience
pub use config::HostConfig;
pub use devices::{
    DeviceProvider, LoudnessFeed, Passage, ProgramLoudness, ReplayLoudness, SimulatedDevices,
    SimulatedVolume,
};
pub use error::{HostError, Result};
pub use host::{Host, RunSummary, SessionKind, SessionPlan};
pub use supervisor::{SessionStatus, StartOutcome, Supervisor};
