//! Bus relay against the bundled dictionary and catalog fixtures

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cyclehud_core::bus::{BusConnector, BusError, BusReceiver, BusTransmitter, Frame};
use cyclehud_core::catalog::SignalCatalog;
use cyclehud_core::codec::{SignalDatabase, TelemetryCodec};
use cyclehud_core::ingest::{IngestLoop, NullOutput};
use cyclehud_core::overlay::{FieldId, FieldValue, OverlayConfig};
use cyclehud_core::relay::{BusRelay, RelayError};
use cyclehud_core::telemetry::TelemetryEvent;
use tokio::sync::mpsc;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn relay() -> BusRelay<SignalDatabase> {
    let dictionary = SignalDatabase::load(fixture("dictionary.json")).unwrap();
    let catalog = SignalCatalog::load(fixture("catalog.json")).unwrap();
    BusRelay::new(TelemetryCodec::new(dictionary), catalog)
}

struct Silent;

impl BusReceiver for Silent {
    fn receive(&mut self, _timeout: Duration) -> Result<Option<Frame>, BusError> {
        Ok(None)
    }
}

struct Loopback {
    sent: Arc<Mutex<Vec<Frame>>>,
}

impl BusTransmitter for Loopback {
    fn transmit(&mut self, frame: &Frame, _timeout: Duration) -> Result<(), BusError> {
        self.sent.lock().unwrap().push(frame.clone());
        Ok(())
    }
}

#[derive(Default)]
struct LoopbackBus {
    sent: Arc<Mutex<Vec<Frame>>>,
}

impl BusConnector for LoopbackBus {
    type Receiver = Silent;
    type Transmitter = Loopback;

    fn open_receiver(&mut self) -> Result<Silent, BusError> {
        Ok(Silent)
    }

    fn open_transmitter(&mut self) -> Result<Loopback, BusError> {
        Ok(Loopback {
            sent: self.sent.clone(),
        })
    }

    fn describe(&self) -> String {
        "loopback".into()
    }
}

#[test]
fn test_fixture_catalog_resolves_against_dictionary() {
    let dictionary = SignalDatabase::load(fixture("dictionary.json")).unwrap();
    let catalog = SignalCatalog::load(fixture("catalog.json")).unwrap();

    assert!(catalog.unresolved(&dictionary).is_empty());
    assert_eq!(catalog.sensors().len(), 5);
}

#[test]
fn test_every_sensor_survives_a_bus_round_trip() {
    let relay = relay();
    let bus = LoopbackBus::default();
    let sent = bus.sent.clone();
    let mut outbound = relay.outbound(bus);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let inbound = relay.inbound(tx);

    let readings = [
        ("power", 312.0),
        ("cadence", 91.0),
        ("speed", 27.43),
        ("distance", 41.275),
        ("heartrate", 152.0),
    ];

    for (sensor, value) in readings {
        let frame = outbound.handle(&TelemetryEvent::new(sensor, value)).unwrap();
        inbound.route(&frame).unwrap();

        let mut echoed = None;
        while let Ok(event) = rx.try_recv() {
            if event.sensor == sensor {
                echoed = Some(event.value);
            }
        }
        let echoed = echoed.unwrap_or_else(|| panic!("{} was not forwarded", sensor));
        assert!(
            (echoed - value).abs() < 1e-6,
            "{}: sent {} got {}",
            sensor,
            value,
            echoed
        );
    }

    assert_eq!(sent.lock().unwrap().len(), readings.len());
    assert_eq!(relay.stats().transmitted, readings.len() as u64);
}

#[test]
fn test_sibling_signals_keep_last_value() {
    let relay = relay();
    let mut outbound = relay.outbound(LoopbackBus::default());

    outbound.handle(&TelemetryEvent::new("speed", 30.0)).unwrap();
    let frame = outbound
        .handle(&TelemetryEvent::new("distance", 1.5))
        .unwrap();

    // Speed 3000 little endian, distance 1500 big endian
    assert_eq!(frame, Frame::new(0x130, vec![0xB8, 0x0B, 0x00, 0x00, 0x05, 0xDC]));
}

#[test]
fn test_unmapped_signals_are_never_forwarded() {
    let relay = relay();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let inbound = relay.inbound(tx);

    let forwarded = inbound
        .route(&Frame::new(0x120, vec![0x2C, 0x01, 0x5A, 0x31]))
        .unwrap();

    assert_eq!(forwarded, 2);
    let mut sensors = Vec::new();
    while let Ok(event) = rx.try_recv() {
        sensors.push(event.sensor);
    }
    assert_eq!(sensors, vec!["power".to_string(), "cadence".to_string()]);
    assert_eq!(relay.stats().skipped, 1);
}

#[test]
fn test_out_of_range_reading_is_not_transmitted() {
    let relay = relay();
    let bus = LoopbackBus::default();
    let sent = bus.sent.clone();
    let mut outbound = relay.outbound(bus);

    let err = outbound
        .handle(&TelemetryEvent::new("heartrate", 12.0))
        .unwrap_err();

    assert!(matches!(err, RelayError::Encode(_)));
    assert!(sent.lock().unwrap().is_empty());
    assert_eq!(relay.stats().encode_failures, 1);
}

#[test]
fn test_unknown_sensor_is_rejected() {
    let relay = relay();
    let mut outbound = relay.outbound(LoopbackBus::default());

    let err = outbound
        .handle(&TelemetryEvent::new("altitude", 300.0))
        .unwrap_err();

    assert!(matches!(err, RelayError::UnknownSensor(ref s) if s == "altitude"));
}

#[test]
fn test_bus_frame_reaches_the_overlay() {
    let relay = relay();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let inbound = relay.inbound(tx);
    let mut ingest = IngestLoop::new(&OverlayConfig::default(), NullOutput);

    // 27.43 km/h
    inbound
        .route(&Frame::new(0x130, vec![0xB7, 0x0A, 0x00, 0x00, 0x00, 0x00]))
        .unwrap();
    inbound.route(&Frame::new(0x140, vec![148])).unwrap();

    while let Ok(event) = rx.try_recv() {
        let report = ingest.process_line(&event.to_line());
        assert!(report.errors.is_empty(), "{:?}", report.errors);
    }

    let speed = ingest.state().field(FieldId::Speed);
    assert_eq!(speed.value(), &FieldValue::Integer(27));
    assert_eq!(speed.display_text().as_deref(), Some("27km/h"));
    assert_eq!(
        ingest.state().field(FieldId::HeartRate).value(),
        &FieldValue::Integer(148)
    );
    assert_eq!(
        ingest.state().field(FieldId::Distance).value(),
        &FieldValue::Integer(0)
    );
}
