//! Auxiliary sensor source
//!
//! Parses `sensor:value` lines read from the sensor FIFO and feeds them to the
//! outbound relay.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::telemetry::{parse_events, TelemetryEvent};
use crate::transport::{LineHandler, TransportError};

/// Line handler turning auxiliary sensor lines into telemetry events
pub struct AuxiliarySource {
    events: UnboundedSender<TelemetryEvent>,
}

impl AuxiliarySource {
    /// Forward parsed events to `events`
    pub fn new(events: UnboundedSender<TelemetryEvent>) -> Self {
        Self { events }
    }
}

impl LineHandler for AuxiliarySource {
    fn on_line(&mut self, line: &str) {
        for result in parse_events(line) {
            match result {
                Ok(event) => {
                    debug!(sensor = %event.sensor, value = event.value, "Sensor reading");
                    if self.events.send(event).is_err() {
                        warn!("Outbound relay stopped, sensor reading dropped");
                    }
                }
                Err(e) => warn!(line, error = %e, "Malformed sensor reading"),
            }
        }
    }

    fn on_transport_error(&mut self, error: &TransportError) {
        warn!(error = %error, "Sensor FIFO unavailable");
    }
}
