//! Bus Relay
//!
//! Routes telemetry in two independent directions:
//!
//! - **Inbound** (bus → telemetry): every received frame is decoded and each
//!   catalog-recognised signal is emitted as a [`TelemetryEvent`] on the
//!   outbound telemetry channel.
//! - **Outbound** (telemetry → bus): events from the auxiliary sensor source
//!   are encoded and transmitted with a bounded timeout.
//!
//! The only state shared between the directions is the read-only catalog and
//! codec plus a set of counters.

mod auxiliary;
mod inbound;
mod outbound;

pub use auxiliary::AuxiliarySource;
pub use inbound::InboundRelay;
pub use outbound::{OutboundRelay, RelayError};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::bus::{BusConnector, DEFAULT_TRANSMIT_TIMEOUT_MS};
use crate::catalog::SignalCatalog;
use crate::codec::{MessageDictionary, TelemetryCodec};
use crate::telemetry::TelemetryEvent;

/// Snapshot of relay activity since startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Signals forwarded to the telemetry channel
    pub forwarded: u64,
    /// Decoded signals with no catalog sensor
    pub skipped: u64,
    /// Frames dropped because they could not be decoded
    pub decode_failures: u64,
    /// Frames transmitted onto the bus
    pub transmitted: u64,
    /// Events dropped because the sensor is not in the catalog
    pub unknown_sensors: u64,
    /// Events dropped because they could not be encoded
    pub encode_failures: u64,
    /// Events dropped because the bus rejected or timed out the frame
    pub bus_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct RelayCounters {
    forwarded: AtomicU64,
    skipped: AtomicU64,
    decode_failures: AtomicU64,
    transmitted: AtomicU64,
    unknown_sensors: AtomicU64,
    encode_failures: AtomicU64,
    bus_failures: AtomicU64,
}

impl RelayCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RelayStats {
        RelayStats {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            transmitted: self.transmitted.load(Ordering::Relaxed),
            unknown_sensors: self.unknown_sensors.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            bus_failures: self.bus_failures.load(Ordering::Relaxed),
        }
    }
}

/// Factory for both relay directions over one catalog and codec
pub struct BusRelay<D> {
    codec: Arc<TelemetryCodec<D>>,
    catalog: Arc<SignalCatalog>,
    transmit_timeout: Duration,
    counters: Arc<RelayCounters>,
}

impl<D: MessageDictionary> BusRelay<D> {
    /// Create a relay with the default 200 ms transmit timeout
    pub fn new(codec: TelemetryCodec<D>, catalog: SignalCatalog) -> Self {
        Self {
            codec: Arc::new(codec),
            catalog: Arc::new(catalog),
            transmit_timeout: Duration::from_millis(DEFAULT_TRANSMIT_TIMEOUT_MS),
            counters: Arc::new(RelayCounters::default()),
        }
    }

    /// Override the bus transmit timeout
    pub fn with_transmit_timeout(mut self, timeout: Duration) -> Self {
        self.transmit_timeout = timeout;
        self
    }

    /// Inbound direction, emitting events on `events`
    pub fn inbound(&self, events: UnboundedSender<TelemetryEvent>) -> InboundRelay<D> {
        InboundRelay::new(
            self.codec.clone(),
            self.catalog.clone(),
            events,
            self.counters.clone(),
        )
    }

    /// Outbound direction, transmitting through `connector`
    pub fn outbound<C: BusConnector>(&self, connector: C) -> OutboundRelay<D, C> {
        OutboundRelay::new(
            self.codec.clone(),
            self.catalog.clone(),
            connector,
            self.transmit_timeout,
            self.counters.clone(),
        )
    }

    /// The catalog both directions route with
    pub fn catalog(&self) -> &SignalCatalog {
        &self.catalog
    }

    /// Activity counters
    pub fn stats(&self) -> RelayStats {
        self.counters.snapshot()
    }
}
