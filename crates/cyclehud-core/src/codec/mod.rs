//! Telemetry Codec
//!
//! Translates between raw bus frames and named signal values using a
//! [`MessageDictionary`]. Failures are classified as [`DecodeError`] or
//! [`EncodeError`] so callers can log and drop the offending frame or event.

pub mod dictionary;
mod error;
mod types;

pub use dictionary::{MessageDef, MessageDictionary, SignalDatabase, SignalDef};
pub use error::{DecodeError, DictionaryError, EncodeError};
pub use types::{Endianness, SignalType};

use std::collections::BTreeMap;

use crate::bus::Frame;
use crate::catalog::SignalRef;

/// Signal name to physical value
pub type SignalValues = BTreeMap<String, f64>;

/// Result of decoding one frame
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    /// Name of the message carried by the frame
    pub message: String,
    /// `(signal, value)` pairs in layout order
    pub signals: Vec<(String, f64)>,
}

/// Stateless decode/encode wrapper around a message dictionary
#[derive(Debug, Clone)]
pub struct TelemetryCodec<D> {
    dictionary: D,
}

impl<D: MessageDictionary> TelemetryCodec<D> {
    /// Wrap a dictionary
    pub fn new(dictionary: D) -> Self {
        Self { dictionary }
    }

    /// The wrapped dictionary
    pub fn dictionary(&self) -> &D {
        &self.dictionary
    }

    /// Decode a raw payload received with `frame_id`
    pub fn decode(&self, frame_id: u32, data: &[u8]) -> Result<DecodedFrame, DecodeError> {
        let message = self
            .dictionary
            .message_name(frame_id)
            .ok_or(DecodeError::UnknownFrame(frame_id))?
            .to_string();
        let signals = self.dictionary.decode_message(frame_id, data)?;
        Ok(DecodedFrame { message, signals })
    }

    /// Decode a received frame
    pub fn decode_frame(&self, frame: &Frame) -> Result<DecodedFrame, DecodeError> {
        self.decode(frame.id, &frame.data)
    }

    /// Encode signal values of `message` into a frame
    pub fn encode(&self, message: &str, values: &SignalValues) -> Result<Frame, EncodeError> {
        let (id, extended, data) = self.dictionary.encode_message(message, values)?;
        Ok(Frame { id, extended, data })
    }

    /// Encode a single signal, leaving the rest of the message at raw zero
    pub fn encode_signal(&self, target: &SignalRef, value: f64) -> Result<Frame, EncodeError> {
        let mut values = SignalValues::new();
        values.insert(target.signal.clone(), value);
        self.encode(&target.message, &values)
    }
}
