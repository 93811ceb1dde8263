//! Error types for frame replay.
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! is [`ReplayError`]. Errors carry enough context to tell the operator what
//! went wrong and whether retrying makes sense.
//!
//! ## Error Categories
//!
//! - **Load Errors**: the capture file is unreadable or holds no valid frame
//! - **Precondition Errors**: `start()` called without frames or without a link
//! - **Transport Errors**: the serial device could not be opened or configured
//! - **Config Errors**: malformed YAML or out-of-range settings
//!
//! Malformed hex blocks are *not* errors. They are dropped by the parser and
//! only show up in debug logs.
//!
//! ```rust
//! use framepace::ReplayError;
//!
//! let error = ReplayError::not_connected("/dev/ttyUSB0");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for replay operations.
pub type Result<T, E = ReplayError> = std::result::Result<T, E>;

/// Main error type for replay operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReplayError {
    #[error("Capture file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No valid hex frames found in {path}")]
    EmptySource { path: PathBuf },

    #[error("No frames loaded")]
    NotLoaded,

    #[error("Transport not connected: {port}")]
    NotConnected { port: String },

    #[error("A replay loop is already running")]
    AlreadyRunning,

    #[error("Transport error: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl ReplayError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReplayError::NotConnected { .. } => true,
            ReplayError::Transport { .. } => true,
            ReplayError::Timeout { .. } => true,
            ReplayError::AlreadyRunning => true,
            ReplayError::File { .. } => false,
            ReplayError::EmptySource { .. } => false,
            ReplayError::NotLoaded => false,
            ReplayError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ReplayError::File { .. } => vec![
                "Check the capture file exists and is readable",
                "Check file permissions",
            ],
            ReplayError::EmptySource { .. } => vec![
                "Check the file contains blank-line separated hex blocks",
                "Make sure every block has an even number of hex digits",
            ],
            ReplayError::NotLoaded => vec!["Load a capture file before starting the replay"],
            ReplayError::NotConnected { .. } => vec![
                "Check the USB-RS485 adapter is plugged in",
                "Verify the device path (e.g. /dev/ttyUSB0)",
                "Run with --test to replay without hardware",
            ],
            ReplayError::AlreadyRunning => {
                vec!["Stop the running replay before starting a new one"]
            }
            ReplayError::Transport { .. } => vec![
                "Check the device path and permissions (dialout group)",
                "Make sure no other process holds the port",
                "Reconnect the adapter",
            ],
            ReplayError::Config { .. } => vec![
                "Check the YAML syntax of the config file",
                "Verify port name and baud rate values",
            ],
            ReplayError::Timeout { .. } => vec![
                "Increase the write timeout",
                "Check the link is not flow-controlled",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        ReplayError::File { path, source }
    }

    /// Helper constructor for a capture that parsed to zero frames.
    pub fn empty_source(path: impl Into<PathBuf>) -> Self {
        ReplayError::EmptySource { path: path.into() }
    }

    /// Helper constructor for the not-connected precondition.
    pub fn not_connected(port: impl Into<String>) -> Self {
        ReplayError::NotConnected { port: port.into() }
    }

    /// Helper constructor for transport failures.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        ReplayError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport failures with source.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ReplayError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        ReplayError::Config { context: context.into(), details: details.into() }
    }
}

impl From<std::io::Error> for ReplayError {
    fn from(err: std::io::Error) -> Self {
        ReplayError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
