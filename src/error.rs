//! # Error Types Module
//!
//! Centralized error handling for the pulse monitor.
//!
//! The signal-processing and alert core never returns errors: "not ready" and
//! "invalid input" are expressed as sentinel values (0 BPM, 0 % SpO2, no-op
//! acknowledge). The types here cover the ambient edges of the program.
//!
//! ## Error Types
//! - `ConfigError`: Configuration file I/O, parsing and validation errors
//! - `SamplerError`: Sampler thread lifecycle failures
//! - `CommandError`: Unparseable operator console input
//!
//! ## Usage Examples
//! ```ignore
//! // Config module uses ConfigError
//! pub fn load() -> Result<Config, ConfigError> { ... }
//! pub fn validate(&self) -> Result<(), ConfigError> { ... }
//!
//! // Sensor module uses SamplerError
//! pub fn spawn(...) -> Result<SamplerHandle, SamplerError> { ... }
//! ```

use std::fmt;

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
    /// Config parsed but describes an unusable setup
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
            ConfigError::Invalid { field, reason } => {
                write!(f, "Invalid config value for {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

/// Errors that can occur while running the sampler thread
#[derive(Debug)]
pub enum SamplerError {
    /// The OS refused to start the sampler thread
    ThreadSpawn(std::io::Error),
    /// The tick loop dropped its end of the sample channel
    Disconnected,
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerError::ThreadSpawn(e) => {
                write!(f, "Failed to start sampler thread: {}", e)
            }
            SamplerError::Disconnected => {
                write!(f, "Sample channel closed by the monitor")
            }
        }
    }
}

impl std::error::Error for SamplerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SamplerError::ThreadSpawn(e) => Some(e),
            SamplerError::Disconnected => None,
        }
    }
}

/// Errors from parsing a line typed at the operator console
#[derive(Debug, PartialEq)]
pub enum CommandError {
    /// The line was empty
    Empty,
    /// First word is not a known command
    Unknown(String),
    /// `ack` without an alert index
    MissingIndex,
    /// `ack` with something that isn't an index
    BadIndex(std::num::ParseIntError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "Empty command"),
            CommandError::Unknown(word) => write!(f, "Unknown command: {}", word),
            CommandError::MissingIndex => write!(f, "ack needs an alert index"),
            CommandError::BadIndex(e) => write!(f, "Invalid alert index: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::BadIndex(e) => Some(e),
            _ => None,
        }
    }
}
