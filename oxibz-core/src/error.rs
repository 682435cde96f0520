//! Error types for OxiBz operations.
//!
//! Compression has very few failure modes: the output sink can fail, the
//! caller can ask for an unsupported configuration, or an API can be driven
//! out of order. Everything else is an internal invariant and panics.

use std::io;
use thiserror::Error;

/// The main error type for OxiBz operations.
#[derive(Debug, Error)]
pub enum OxiBzError {
    /// I/O error from the underlying writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A configuration value was outside its accepted range.
    #[error("Invalid {parameter}: {message}")]
    InvalidConfig {
        /// Name of the offending parameter.
        parameter: String,
        /// Description of the accepted range.
        message: String,
    },

    /// A bit-writer call asked for more bits than one call can carry.
    #[error("Invalid bit count: {count} exceeds maximum of {max}")]
    InvalidBitCount {
        /// Requested number of bits.
        count: u8,
        /// Largest count accepted per call.
        max: u8,
    },

    /// Input was supplied after the stream was finished.
    #[error("Stream already finished")]
    StreamFinished,

    /// An earlier error left the stream incomplete; the encoder refuses
    /// further work.
    #[error("Encoder failed earlier; output stream is incomplete")]
    EncoderFailed,
}

/// Result type alias for OxiBz operations.
pub type Result<T> = std::result::Result<T, OxiBzError>;

impl OxiBzError {
    /// Create an invalid configuration error.
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an invalid bit count error.
    pub fn invalid_bit_count(count: u8, max: u8) -> Self {
        Self::InvalidBitCount { count, max }
    }

    /// Create a stream finished error.
    pub fn finished() -> Self {
        Self::StreamFinished
    }

    /// Create an encoder failed error.
    pub fn encoder_failed() -> Self {
        Self::EncoderFailed
    }
}

impl From<OxiBzError> for io::Error {
    fn from(err: OxiBzError) -> Self {
        match err {
            OxiBzError::Io(inner) => inner,
            other => io::Error::other(other),
        }
    }
}
