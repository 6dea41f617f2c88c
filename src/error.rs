//! Custom error types for Acer gaming firmware control.
//!
//! This module provides fine-grained error handling for firmware communication,
//! response parsing, argument validation and state persistence.

use thiserror::Error;

use crate::firmware::TransportError;
use crate::protocol::ChannelId;

/// Main error type for firmware control operations.
#[derive(Error, Debug)]
pub enum SenseError {
    /// The firmware RPC failed or the channel is unreachable.
    #[error("Firmware call failed on {channel} channel (method {method}): {source}")]
    Transport {
        channel: ChannelId,
        method: u32,
        #[source]
        source: TransportError,
    },

    /// Response buffer had an unexpected type or length.
    #[error("Invalid response from firmware: {message}")]
    Protocol { message: String },

    /// Firmware returned a non-zero status inside a well-formed response.
    #[error("Firmware rejected {operation} (status {status:#x})")]
    CommandRejected { operation: &'static str, status: u64 },

    /// Caller-supplied value out of range or not valid for the selected mode.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not valid for the current power source or device capabilities.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Persisted state could not be read or written.
    #[error("State storage error for {key}: {source}")]
    Storage {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Platform profile registration gave up after exhausting its retries.
    #[error("Platform profile registration failed after {attempts} attempts: {message}")]
    Registration { attempts: u32, message: String },

    /// Configuration file could not be read, parsed or written.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SenseError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        SenseError::Protocol {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SenseError::InvalidArgument(message.into())
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        SenseError::Unsupported(message.into())
    }
}

/// Result type alias for firmware control operations.
pub type Result<T> = std::result::Result<T, SenseError>;
