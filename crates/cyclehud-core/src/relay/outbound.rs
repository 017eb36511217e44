//! Telemetry → bus direction

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use super::RelayCounters;
use crate::bus::{BusConnector, BusError, BusTransmitter, Frame};
use crate::catalog::SignalCatalog;
use crate::codec::{EncodeError, MessageDictionary, SignalValues, TelemetryCodec};
use crate::telemetry::TelemetryEvent;

/// Why an outbound event was dropped
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum RelayError {
    #[error("Unknown sensor '{0}'")]
    UnknownSensor(String),

    #[error("Encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("Transmit failed: {0}")]
    Bus(#[from] BusError),
}

/// Encodes sensor events and transmits them onto the bus.
///
/// The last value sent for every signal is remembered per message so that
/// updating one signal does not zero its siblings in the same frame.
pub struct OutboundRelay<D, C: BusConnector> {
    codec: Arc<TelemetryCodec<D>>,
    catalog: Arc<SignalCatalog>,
    connector: C,
    transmitter: Option<C::Transmitter>,
    timeout: Duration,
    last_values: HashMap<String, SignalValues>,
    counters: Arc<RelayCounters>,
}

impl<D: MessageDictionary, C: BusConnector> OutboundRelay<D, C> {
    pub(crate) fn new(
        codec: Arc<TelemetryCodec<D>>,
        catalog: Arc<SignalCatalog>,
        connector: C,
        timeout: Duration,
        counters: Arc<RelayCounters>,
    ) -> Self {
        Self {
            codec,
            catalog,
            connector,
            transmitter: None,
            timeout,
            last_values: HashMap::new(),
            counters,
        }
    }

    /// Encode and transmit one event, returning the frame sent
    pub fn handle(&mut self, event: &TelemetryEvent) -> Result<Frame, RelayError> {
        let Some(target) = self.catalog.signal_for(&event.sensor).cloned() else {
            RelayCounters::bump(&self.counters.unknown_sensors);
            return Err(RelayError::UnknownSensor(event.sensor.clone()));
        };

        let mut values = self
            .last_values
            .get(&target.message)
            .cloned()
            .unwrap_or_default();
        values.insert(target.signal.clone(), event.value);

        let frame = match self.codec.encode(&target.message, &values) {
            Ok(frame) => frame,
            Err(e) => {
                RelayCounters::bump(&self.counters.encode_failures);
                return Err(e.into());
            }
        };
        self.last_values.insert(target.message, values);

        if let Err(e) = self.transmit(&frame) {
            RelayCounters::bump(&self.counters.bus_failures);
            return Err(e.into());
        }
        RelayCounters::bump(&self.counters.transmitted);
        Ok(frame)
    }

    fn transmit(&mut self, frame: &Frame) -> Result<(), BusError> {
        if self.transmitter.is_none() {
            let transmitter = self.connector.open_transmitter()?;
            info!(bus = %self.connector.describe(), "Bus transmitter opened");
            self.transmitter = Some(transmitter);
        }
        let Some(transmitter) = self.transmitter.as_mut() else {
            return Err(BusError::Unavailable(self.connector.describe()));
        };

        let result = transmitter.transmit(frame, self.timeout);
        if let Err(e) = &result {
            if e.requires_reconnect() {
                // Reopened lazily on the next event
                self.transmitter = None;
            }
        }
        result
    }

    /// Process events until every sender is dropped. Blocks the calling thread.
    pub fn run(mut self, mut events: UnboundedReceiver<TelemetryEvent>) {
        while let Some(event) = events.blocking_recv() {
            match self.handle(&event) {
                Ok(frame) => debug!(sensor = %event.sensor, frame = %frame, "Event transmitted"),
                Err(e) => warn!(
                    sensor = %event.sensor,
                    value = event.value,
                    error = %e,
                    "Dropping telemetry event"
                ),
            }
        }
        debug!("Outbound relay stopped");
    }
}
