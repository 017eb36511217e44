//! Bus errors

use thiserror::Error;

/// Errors that can occur while talking to the CAN bus
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum BusError {
    #[error("Transmit timeout: bus did not accept frame {frame_id:#x} in time")]
    TransmitTimeout { frame_id: u32 },

    #[error("Invalid frame {frame_id:#x}: {reason}")]
    InvalidFrame { frame_id: u32, reason: String },

    #[error("Bus unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BusError {
    /// Whether the connection that produced this error should be reopened
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, BusError::Unavailable(_) | BusError::IoError(_))
    }
}
