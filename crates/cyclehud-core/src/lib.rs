//! # cyclehud Core Library
//!
//! Core functionality for the cyclehud bicycle computer.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A signal catalog mapping sensor names to CAN (message, signal) pairs
//! - Frame decode/encode against a message dictionary
//! - A bidirectional bus relay between CAN and telemetry text lines
//! - The heads-up-display overlay layout and raster renderer
//! - The telemetry ingest loop feeding the overlay from a FIFO
//!
//! ## Example
//!
//! ```rust,ignore
//! use cyclehud_core::overlay::{FieldId, OverlayConfig, OverlayLayout, OverlayState};
//!
//! let config = OverlayConfig::default();
//! let layout = OverlayLayout::new(config.layout.clone());
//! let mut state = OverlayState::new(&config.fields);
//!
//! state.field_mut(FieldId::Speed).set_value("27.4")?;
//! let frame = layout.render(&state);
//! assert_eq!(frame.width(), 1024);
//! ```

pub mod bus;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod demo;
pub mod ingest;
pub mod overlay;
pub mod reconnect;
pub mod relay;
pub mod telemetry;
pub mod transport;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bus::{BusConnector, BusError, Frame, FrameSink, Notifier};
    pub use crate::catalog::{SignalCatalog, SignalRef};
    pub use crate::codec::{MessageDictionary, SignalDatabase, TelemetryCodec};
    pub use crate::config::{AppConfig, ConfigError};
    pub use crate::ingest::{FrameOutput, IngestLoop};
    pub use crate::overlay::{FieldId, OverlayConfig, OverlayLayout, OverlayState, RgbaRaster};
    pub use crate::reconnect::ReconnectPolicy;
    pub use crate::relay::BusRelay;
    pub use crate::telemetry::TelemetryEvent;
    pub use crate::transport::{LineReader, LineWriter};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
