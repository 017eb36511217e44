//! Signal data types
//!
//! Byte-aligned raw representations of CAN signals.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Raw encoding of a signal inside a frame payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    /// Unsigned 8-bit integer
    U8,
    /// Signed 8-bit integer
    I8,
    /// Unsigned 16-bit integer
    U16,
    /// Signed 16-bit integer
    I16,
    /// Unsigned 32-bit integer
    U32,
    /// Signed 32-bit integer
    I32,
    /// 32-bit floating point
    F32,
}

/// Byte order of multi-byte signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Intel byte order, the usual CAN convention
    #[default]
    Little,
    /// Motorola byte order
    Big,
}

impl SignalType {
    /// Size in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            SignalType::U8 | SignalType::I8 => 1,
            SignalType::U16 | SignalType::I16 => 2,
            SignalType::U32 | SignalType::I32 | SignalType::F32 => 4,
        }
    }

    /// Whether raw values are floating point (no rounding on encode)
    pub fn is_float(&self) -> bool {
        matches!(self, SignalType::F32)
    }

    /// Inclusive range of representable raw values
    pub fn raw_bounds(&self) -> (f64, f64) {
        match self {
            SignalType::U8 => (u8::MIN as f64, u8::MAX as f64),
            SignalType::I8 => (i8::MIN as f64, i8::MAX as f64),
            SignalType::U16 => (u16::MIN as f64, u16::MAX as f64),
            SignalType::I16 => (i16::MIN as f64, i16::MAX as f64),
            SignalType::U32 => (u32::MIN as f64, u32::MAX as f64),
            SignalType::I32 => (i32::MIN as f64, i32::MAX as f64),
            SignalType::F32 => (f32::MIN as f64, f32::MAX as f64),
        }
    }

    /// Read a raw value from bytes at the given offset
    pub fn read_from_bytes(&self, data: &[u8], offset: usize, endian: Endianness) -> Option<f64> {
        if offset + self.size_bytes() > data.len() {
            return None;
        }

        let bytes = &data[offset..];
        let value = match (self, endian) {
            (SignalType::U8, _) => bytes[0] as f64,
            (SignalType::I8, _) => bytes[0] as i8 as f64,
            (SignalType::U16, Endianness::Little) => LittleEndian::read_u16(bytes) as f64,
            (SignalType::U16, Endianness::Big) => BigEndian::read_u16(bytes) as f64,
            (SignalType::I16, Endianness::Little) => LittleEndian::read_i16(bytes) as f64,
            (SignalType::I16, Endianness::Big) => BigEndian::read_i16(bytes) as f64,
            (SignalType::U32, Endianness::Little) => LittleEndian::read_u32(bytes) as f64,
            (SignalType::U32, Endianness::Big) => BigEndian::read_u32(bytes) as f64,
            (SignalType::I32, Endianness::Little) => LittleEndian::read_i32(bytes) as f64,
            (SignalType::I32, Endianness::Big) => BigEndian::read_i32(bytes) as f64,
            (SignalType::F32, Endianness::Little) => LittleEndian::read_f32(bytes) as f64,
            (SignalType::F32, Endianness::Big) => BigEndian::read_f32(bytes) as f64,
        };
        Some(value)
    }

    /// Write a raw value to bytes at the given offset.
    ///
    /// The caller is responsible for range-checking `raw` against
    /// [`raw_bounds`](Self::raw_bounds); out-of-bounds writes are ignored.
    pub fn write_to_bytes(&self, data: &mut [u8], offset: usize, raw: f64, endian: Endianness) {
        if offset + self.size_bytes() > data.len() {
            return;
        }

        let bytes = &mut data[offset..];
        match (self, endian) {
            (SignalType::U8, _) => bytes[0] = raw as u8,
            (SignalType::I8, _) => bytes[0] = raw as i8 as u8,
            (SignalType::U16, Endianness::Little) => LittleEndian::write_u16(bytes, raw as u16),
            (SignalType::U16, Endianness::Big) => BigEndian::write_u16(bytes, raw as u16),
            (SignalType::I16, Endianness::Little) => LittleEndian::write_i16(bytes, raw as i16),
            (SignalType::I16, Endianness::Big) => BigEndian::write_i16(bytes, raw as i16),
            (SignalType::U32, Endianness::Little) => LittleEndian::write_u32(bytes, raw as u32),
            (SignalType::U32, Endianness::Big) => BigEndian::write_u32(bytes, raw as u32),
            (SignalType::I32, Endianness::Little) => LittleEndian::write_i32(bytes, raw as i32),
            (SignalType::I32, Endianness::Big) => BigEndian::write_i32(bytes, raw as i32),
            (SignalType::F32, Endianness::Little) => LittleEndian::write_f32(bytes, raw as f32),
            (SignalType::F32, Endianness::Big) => BigEndian::write_f32(bytes, raw as f32),
        }
    }
}
