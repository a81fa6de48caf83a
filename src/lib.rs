pub mod audio;
pub mod control;
pub mod integration;
pub mod messages;
pub mod speech;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Control decode error: {0}")]
    ControlDecodeError(String),

    #[error("Admission rejected: {0}")]
    AdmissionRejected(String),

    #[error("Synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    #[error("Invalid synthesis response: {0}")]
    InvalidResponse(String),

    #[error("Audio decode error: {0}")]
    DecodeError(String),

    #[error("Audio device error: {0}")]
    DeviceError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::IOError(e.to_string())
    }
}

impl RelayError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors are absorbed where they happen and reduced to a log
    /// line. The rest stop the process before it starts serving.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RelayError::ConfigError(_) => false,
            // Malformed packets are background noise on a shared channel
            RelayError::ControlDecodeError(_) => true,
            RelayError::AdmissionRejected(_) => true,
            RelayError::SynthesisUnavailable(_) => true,
            RelayError::InvalidResponse(_) => true,
            RelayError::DecodeError(_) => true,
            RelayError::DeviceError(_) => true,
            // Socket and runtime setup failures
            RelayError::IOError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
