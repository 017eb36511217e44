//! CAN Bus Access
//!
//! Bus-agnostic frame type and the capabilities the relay needs from a CAN
//! transceiver: receiving frames, transmitting frames with a bounded timeout,
//! and (re)opening the connection.
//!
//! The SocketCAN implementation is only available on Linux.

mod error;
mod notifier;
#[cfg(target_os = "linux")]
pub mod socketcan;

pub use error::BusError;
pub use notifier::{FrameSink, Notifier};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default timeout for a single frame transmission in milliseconds
pub const DEFAULT_TRANSMIT_TIMEOUT_MS: u64 = 200;

/// How long the notifier blocks on a receive before checking for shutdown
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Largest classic CAN payload
pub const MAX_FRAME_DATA: usize = 8;

/// A single bus message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Arbitration identifier
    pub id: u32,
    /// True for 29-bit identifiers
    #[serde(default)]
    pub extended: bool,
    /// Payload bytes
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a standard-id frame
    pub fn new(id: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            extended: false,
            data: data.into(),
        }
    }

    /// Create an extended-id frame
    pub fn extended(id: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            extended: true,
            data: data.into(),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended {
            write!(f, "{:08X}  [{}]", self.id, self.data.len())?;
        } else {
            write!(f, "{:03X}  [{}]", self.id, self.data.len())?;
        }
        for byte in &self.data {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}

/// Receiving half of a bus connection
pub trait BusReceiver: Send {
    /// Wait up to `timeout` for the next data frame.
    ///
    /// Returns `Ok(None)` when nothing arrived in time or the bus delivered a
    /// non-data frame (remote/error frames are not forwarded).
    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, BusError>;
}

/// Transmitting half of a bus connection
pub trait BusTransmitter: Send {
    /// Transmit one frame, failing with [`BusError::TransmitTimeout`] when the
    /// bus does not accept it within `timeout`.
    fn transmit(&mut self, frame: &Frame, timeout: Duration) -> Result<(), BusError>;
}

/// Capability to (re)establish a bus connection
pub trait BusConnector: Send {
    /// Receiver type produced by this connector
    type Receiver: BusReceiver;
    /// Transmitter type produced by this connector
    type Transmitter: BusTransmitter;

    /// Open a receiving connection
    fn open_receiver(&mut self) -> Result<Self::Receiver, BusError>;

    /// Open a transmitting connection
    fn open_transmitter(&mut self) -> Result<Self::Transmitter, BusError>;

    /// Human-readable name for logs
    fn describe(&self) -> String;
}
