//! Error types for the rescue runtime
//!
//! Domain failures (lost target, self-damage, dropped packets) are not errors:
//! they degrade to "stop and return to idle" inside the rescue nodes. This type
//! covers the plumbing around them: configuration, codecs, hubs and hardware.

use thiserror::Error;

/// Runtime error
#[derive(Debug, Error)]
pub enum RescueError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A packet could not be decoded into a known message
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    /// Hub creation or topic type mismatch
    #[error("Communication error: {0}")]
    Communication(String),

    /// A collaborator (radio, drive, sensor) reported a failure
    #[error("Hardware error: {0}")]
    Hardware(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the workspace
pub type RescueResult<T> = Result<T, RescueError>;

impl RescueError {
    pub fn config(msg: impl Into<String>) -> Self {
        RescueError::Config(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        RescueError::Decode(msg.into())
    }

    pub fn hardware(msg: impl Into<String>) -> Self {
        RescueError::Hardware(msg.into())
    }
}

impl From<toml::de::Error> for RescueError {
    fn from(err: toml::de::Error) -> Self {
        RescueError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<serde_yaml::Error> for RescueError {
    fn from(err: serde_yaml::Error) -> Self {
        RescueError::Config(format!("Failed to parse YAML: {}", err))
    }
}

impl From<bincode::Error> for RescueError {
    fn from(err: bincode::Error) -> Self {
        RescueError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = RescueError::config("weights must sum to 1");
        assert_eq!(
            err.to_string(),
            "Configuration error: weights must sum to 1"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RescueError = io.into();
        assert!(matches!(err, RescueError::Io(_)));
    }
}
