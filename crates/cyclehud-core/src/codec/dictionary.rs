//! Message dictionary
//!
//! The dictionary maps frame identifiers to named messages and describes how
//! each signal is laid out inside the payload. [`MessageDictionary`] is the
//! capability the codec consumes; [`SignalDatabase`] is the JSON-described
//! implementation used by the relay.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{Endianness, SignalType};
use super::{DecodeError, DictionaryError, EncodeError, SignalValues};

/// Decode/encode capability over a set of CAN messages
pub trait MessageDictionary: Send + Sync {
    /// Name of the message carried by `frame_id`
    fn message_name(&self, frame_id: u32) -> Option<&str>;

    /// Names of the signals of `message`, in layout order
    fn signal_names(&self, message: &str) -> Option<Vec<&str>>;

    /// Decode a payload into `(signal, value)` pairs in layout order
    fn decode_message(&self, frame_id: u32, data: &[u8]) -> Result<Vec<(String, f64)>, DecodeError>;

    /// Encode signal values into `(frame_id, extended, payload)`.
    ///
    /// Signals of the message missing from `values` are encoded as raw zero.
    fn encode_message(
        &self,
        message: &str,
        values: &SignalValues,
    ) -> Result<(u32, bool, Vec<u8>), EncodeError>;
}

fn default_scale() -> f64 {
    1.0
}

/// A signal inside a message payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalDef {
    /// Signal name
    pub name: String,
    /// Byte offset inside the payload
    pub start: usize,
    /// Raw data type
    #[serde(rename = "type")]
    pub data_type: SignalType,
    /// Byte order for multi-byte types
    #[serde(default)]
    pub byte_order: Endianness,
    /// Scale factor (physical = raw * scale + offset)
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Physical offset
    #[serde(default)]
    pub offset: f64,
    /// Minimum physical value accepted for encoding
    #[serde(default)]
    pub min: Option<f64>,
    /// Maximum physical value accepted for encoding
    #[serde(default)]
    pub max: Option<f64>,
    /// Unit of measurement
    #[serde(default)]
    pub unit: String,
}

impl SignalDef {
    /// Create a little-endian signal with unit scale and no offset
    pub fn new(name: impl Into<String>, start: usize, data_type: SignalType) -> Self {
        Self {
            name: name.into(),
            start,
            data_type,
            byte_order: Endianness::Little,
            scale: 1.0,
            offset: 0.0,
            min: None,
            max: None,
            unit: String::new(),
        }
    }

    /// Convert a raw value to its physical value
    pub fn raw_to_physical(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }

    /// Physical range accepted by [`physical_to_raw`](Self::physical_to_raw)
    pub fn physical_bounds(&self) -> (f64, f64) {
        let (raw_min, raw_max) = self.data_type.raw_bounds();
        let a = self.raw_to_physical(raw_min);
        let b = self.raw_to_physical(raw_max);
        let (type_min, type_max) = if a <= b { (a, b) } else { (b, a) };
        (
            self.min.map_or(type_min, |m| m.max(type_min)),
            self.max.map_or(type_max, |m| m.min(type_max)),
        )
    }

    /// Convert a physical value to a raw value, rounding for integer types
    pub fn physical_to_raw(&self, value: f64) -> Result<f64, EncodeError> {
        if !value.is_finite() {
            return Err(EncodeError::NotFinite {
                signal: self.name.clone(),
            });
        }

        let (min, max) = self.physical_bounds();
        if value < min || value > max {
            return Err(EncodeError::OutOfRange {
                signal: self.name.clone(),
                value,
                min,
                max,
            });
        }

        let raw = (value - self.offset) / self.scale;
        if self.data_type.is_float() {
            return Ok(raw);
        }

        // Rounding at the edge of the physical range can still step outside the type
        let (raw_min, raw_max) = self.data_type.raw_bounds();
        Ok(raw.round().clamp(raw_min, raw_max))
    }

    fn end(&self) -> usize {
        self.start + self.data_type.size_bytes()
    }
}

/// A CAN message definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDef {
    /// Message name
    pub name: String,
    /// Arbitration identifier
    pub frame_id: u32,
    /// True for 29-bit identifiers
    #[serde(default)]
    pub extended: bool,
    /// Payload length in bytes
    pub length: usize,
    /// Signals in layout order
    pub signals: Vec<SignalDef>,
}

impl MessageDef {
    /// Look up a signal by name
    pub fn signal(&self, name: &str) -> Option<&SignalDef> {
        self.signals.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DatabaseFile {
    messages: Vec<MessageDef>,
}

/// JSON-described message dictionary
#[derive(Debug, Clone, Default)]
pub struct SignalDatabase {
    messages: Vec<MessageDef>,
    by_id: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
}

impl SignalDatabase {
    /// Build a database from message definitions, validating the layout
    pub fn new(messages: Vec<MessageDef>) -> Result<Self, DictionaryError> {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();

        for (index, message) in messages.iter().enumerate() {
            if by_name.insert(message.name.clone(), index).is_some() {
                return Err(DictionaryError::DuplicateMessage(message.name.clone()));
            }
            if by_id.insert(message.frame_id, index).is_some() {
                return Err(DictionaryError::DuplicateFrameId(message.frame_id));
            }

            let mut seen = HashSet::new();
            for signal in &message.signals {
                if !seen.insert(signal.name.as_str()) {
                    return Err(DictionaryError::DuplicateSignal {
                        message: message.name.clone(),
                        signal: signal.name.clone(),
                    });
                }
                if signal.end() > message.length {
                    return Err(DictionaryError::SignalOutOfBounds {
                        message: message.name.clone(),
                        signal: signal.name.clone(),
                        length: message.length,
                    });
                }
                if signal.scale == 0.0 || !signal.scale.is_finite() {
                    return Err(DictionaryError::InvalidScale {
                        message: message.name.clone(),
                        signal: signal.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            messages,
            by_id,
            by_name,
        })
    }

    /// Parse a database from a JSON string
    pub fn from_json(content: &str) -> Result<Self, DictionaryError> {
        let file: DatabaseFile = serde_json::from_str(content)?;
        Self::new(file.messages)
    }

    /// Load a database from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DictionaryError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Look up a message by frame id
    pub fn message_by_id(&self, frame_id: u32) -> Option<&MessageDef> {
        self.by_id.get(&frame_id).map(|&i| &self.messages[i])
    }

    /// Look up a message by name
    pub fn message(&self, name: &str) -> Option<&MessageDef> {
        self.by_name.get(name).map(|&i| &self.messages[i])
    }

    /// All messages in definition order
    pub fn messages(&self) -> &[MessageDef] {
        &self.messages
    }
}

impl MessageDictionary for SignalDatabase {
    fn message_name(&self, frame_id: u32) -> Option<&str> {
        self.message_by_id(frame_id).map(|m| m.name.as_str())
    }

    fn signal_names(&self, message: &str) -> Option<Vec<&str>> {
        self.message(message)
            .map(|m| m.signals.iter().map(|s| s.name.as_str()).collect())
    }

    fn decode_message(&self, frame_id: u32, data: &[u8]) -> Result<Vec<(String, f64)>, DecodeError> {
        let message = self
            .message_by_id(frame_id)
            .ok_or(DecodeError::UnknownFrame(frame_id))?;

        if data.len() != message.length {
            return Err(DecodeError::LengthMismatch {
                message: message.name.clone(),
                expected: message.length,
                actual: data.len(),
            });
        }

        // Layout was validated on load, so every read is in bounds
        Ok(message
            .signals
            .iter()
            .filter_map(|signal| {
                signal
                    .data_type
                    .read_from_bytes(data, signal.start, signal.byte_order)
                    .map(|raw| (signal.name.clone(), signal.raw_to_physical(raw)))
            })
            .collect())
    }

    fn encode_message(
        &self,
        message: &str,
        values: &SignalValues,
    ) -> Result<(u32, bool, Vec<u8>), EncodeError> {
        let def = self
            .message(message)
            .ok_or_else(|| EncodeError::UnknownMessage(message.to_string()))?;

        let mut raw_values = BTreeMap::new();
        for (name, value) in values {
            let signal = def.signal(name).ok_or_else(|| EncodeError::UnknownSignal {
                message: message.to_string(),
                signal: name.clone(),
            })?;
            raw_values.insert(name.as_str(), signal.physical_to_raw(*value)?);
        }

        let mut data = vec![0u8; def.length];
        for signal in &def.signals {
            if let Some(raw) = raw_values.get(signal.name.as_str()) {
                signal
                    .data_type
                    .write_to_bytes(&mut data, signal.start, *raw, signal.byte_order);
            }
        }

        Ok((def.frame_id, def.extended, data))
    }
}
