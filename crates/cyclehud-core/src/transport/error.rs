//! Transport errors

use thiserror::Error;

/// Failure of a FIFO transport. Always recovered by reopening.
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum TransportError {
    #[error("Failed to create FIFO '{path}': {source}")]
    CreateFifo {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to open '{path}': {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Read error on '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Write error on '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("'{path}' was closed by the other end")]
    Closed { path: String },

    #[error("Line on '{path}' exceeds {max} bytes and was discarded")]
    LineTooLong { path: String, max: usize },

    #[error("Line on '{path}' is not valid UTF-8 and was discarded")]
    InvalidUtf8 { path: String },
}

impl TransportError {
    /// Whether the connection must be reopened
    pub fn requires_reconnect(&self) -> bool {
        !matches!(
            self,
            TransportError::LineTooLong { .. } | TransportError::InvalidUtf8 { .. }
        )
    }
}
