/// Host error types
use thiserror::Error;
use volnorm_core::VolnormError;

pub type Result<T> = std::result::Result<T, HostError>;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Control(#[from] VolnormError),

    #[error("Tick task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for HostError {
    fn from(err: config::ConfigError) -> Self {
        HostError::Config(err.to_string())
    }
}

impl HostError {
    /// Whether the failure came from configuration rather than the devices
    pub fn is_configuration(&self) -> bool {
        match self {
            HostError::Config(_) => true,
            HostError::Control(e) => e.is_configuration(),
            HostError::Join(_) | HostError::Io(_) => false,
        }
    }
}
