//! Codec errors

use thiserror::Error;

/// A frame could not be decoded
#[derive(Error, Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum DecodeError {
    #[error("Unknown frame id {0:#x}")]
    UnknownFrame(u32),

    #[error("Payload length mismatch for '{message}': expected {expected} bytes, got {actual}")]
    LengthMismatch {
        message: String,
        expected: usize,
        actual: usize,
    },
}

/// Signal values could not be encoded into a frame
#[derive(Error, Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum EncodeError {
    #[error("Unknown message '{0}'")]
    UnknownMessage(String),

    #[error("Unknown signal '{signal}' in message '{message}'")]
    UnknownSignal { message: String, signal: String },

    #[error("Value {value} out of range [{min}, {max}] for signal '{signal}'")]
    OutOfRange {
        signal: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Value for signal '{signal}' is not a finite number")]
    NotFinite { signal: String },
}

/// The signal database could not be loaded
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum DictionaryError {
    #[error("I/O error reading '{path}': {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Duplicate message name '{0}'")]
    DuplicateMessage(String),

    #[error("Duplicate frame id {0:#x}")]
    DuplicateFrameId(u32),

    #[error("Duplicate signal '{signal}' in message '{message}'")]
    DuplicateSignal { message: String, signal: String },

    #[error("Signal '{signal}' does not fit in message '{message}' ({length} bytes)")]
    SignalOutOfBounds {
        message: String,
        signal: String,
        length: usize,
    },

    #[error("Signal '{signal}' in message '{message}' has a zero or non-finite scale")]
    InvalidScale { message: String, signal: String },
}
