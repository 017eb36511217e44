//! Bus → telemetry direction

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

use super::RelayCounters;
use crate::bus::{Frame, FrameSink};
use crate::catalog::SignalCatalog;
use crate::codec::{DecodeError, MessageDictionary, TelemetryCodec};
use crate::telemetry::TelemetryEvent;

/// Decodes received frames and forwards catalog-recognised signals
pub struct InboundRelay<D> {
    codec: Arc<TelemetryCodec<D>>,
    catalog: Arc<SignalCatalog>,
    events: UnboundedSender<TelemetryEvent>,
    counters: Arc<RelayCounters>,
}

impl<D: MessageDictionary> InboundRelay<D> {
    pub(crate) fn new(
        codec: Arc<TelemetryCodec<D>>,
        catalog: Arc<SignalCatalog>,
        events: UnboundedSender<TelemetryEvent>,
        counters: Arc<RelayCounters>,
    ) -> Self {
        Self {
            codec,
            catalog,
            events,
            counters,
        }
    }

    /// Route one frame, returning how many events were emitted.
    ///
    /// Signals without a catalog sensor are skipped silently.
    pub fn route(&self, frame: &Frame) -> Result<usize, DecodeError> {
        let decoded = match self.codec.decode_frame(frame) {
            Ok(decoded) => decoded,
            Err(e) => {
                RelayCounters::bump(&self.counters.decode_failures);
                return Err(e);
            }
        };

        let mut forwarded = 0;
        for (signal, value) in decoded.signals {
            let Some(sensor) = self.catalog.sensor_for(&decoded.message, &signal) else {
                RelayCounters::bump(&self.counters.skipped);
                continue;
            };

            if self.events.send(TelemetryEvent::new(sensor, value)).is_err() {
                debug!(sensor, "Telemetry channel closed, event dropped");
                continue;
            }
            RelayCounters::bump(&self.counters.forwarded);
            forwarded += 1;
        }
        Ok(forwarded)
    }
}

impl<D: MessageDictionary> FrameSink for InboundRelay<D> {
    fn on_frame(&mut self, frame: &Frame) {
        match self.route(frame) {
            Ok(forwarded) => trace!(frame = %frame, forwarded, "Frame routed"),
            Err(e) => warn!(frame = %frame, error = %e, "Dropping undecodable frame"),
        }
    }
}
