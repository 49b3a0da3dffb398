//! State layer errors
//!
//! Absence is never an error here: expired and missing entries read as `None`.
//! These variants cover malformed keys, undecodable payloads and backend faults.

use thiserror::Error;

/// State layer result type
pub type StateResult<T> = Result<T, StateError>;

/// Error raised by the state layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Clock error: {0}")]
    Clock(String),
}

impl From<bincode::Error> for StateError {
    fn from(err: bincode::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

impl From<sled::Error> for StateError {
    fn from(err: sled::Error) -> Self {
        StateError::Backend(err.to_string())
    }
}

impl From<lib_types::SymbolError> for StateError {
    fn from(err: lib_types::SymbolError) -> Self {
        StateError::InvalidKey(err.to_string())
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
