//! Telemetry text protocol
//!
//! Lines of `key:value` segments joined with `-`, e.g.
//! `speed:27.4-distance:12.3-time:754`. The relay writes one segment per
//! line; readers accept any number.
//!
//! Because `-` separates segments, values on the wire are never negative.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between segments of a line
pub const SEGMENT_SEPARATOR: char = '-';

/// Separator between key and value of a segment
pub const KEY_VALUE_SEPARATOR: char = ':';

/// A malformed segment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SegmentError {
    #[error("Segment '{0}' has no ':' separator")]
    MissingSeparator(String),

    #[error("Segment '{0}' has an empty key")]
    EmptyKey(String),
}

/// One `key:value` segment, borrowed from the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Sensor or field name
    pub key: &'a str,
    /// Unparsed value
    pub value: &'a str,
}

/// Split a line into its non-empty, trimmed segments
pub fn split_segments(line: &str) -> impl Iterator<Item = &str> {
    line.split(SEGMENT_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}

/// Split a segment on its first `:`
pub fn parse_segment(segment: &str) -> Result<Segment<'_>, SegmentError> {
    let (key, value) = segment
        .split_once(KEY_VALUE_SEPARATOR)
        .ok_or_else(|| SegmentError::MissingSeparator(segment.to_string()))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(SegmentError::EmptyKey(segment.to_string()));
    }

    Ok(Segment {
        key,
        value: value.trim(),
    })
}

/// A named sensor reading travelling between the relay and its peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Catalog sensor name
    pub sensor: String,
    /// Physical value
    pub value: f64,
}

impl TelemetryEvent {
    /// Create an event
    pub fn new(sensor: impl Into<String>, value: f64) -> Self {
        Self {
            sensor: sensor.into(),
            value,
        }
    }

    /// Wire form without the trailing newline
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.sensor, KEY_VALUE_SEPARATOR, self.value)
    }
}

/// A line segment that could not become a [`TelemetryEvent`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum EventParseError {
    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error("Value '{value}' for '{sensor}' is not a number")]
    InvalidValue { sensor: String, value: String },
}

/// Parse every segment of a line into events, one result per segment
pub fn parse_events(line: &str) -> Vec<Result<TelemetryEvent, EventParseError>> {
    split_segments(line)
        .map(|segment| -> Result<TelemetryEvent, EventParseError> {
            let Segment { key, value } = parse_segment(segment)?;
            let parsed = value
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| EventParseError::InvalidValue {
                    sensor: key.to_string(),
                    value: value.to_string(),
                })?;
            Ok(TelemetryEvent::new(key, parsed))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_segments_skips_empty() {
        let segments: Vec<&str> = split_segments("speed:10--distance:5- ").collect();
        assert_eq!(segments, vec!["speed:10", "distance:5"]);
    }

    #[test]
    fn test_parse_segment_splits_on_first_colon() {
        let segment = parse_segment("time:12:30").unwrap();
        assert_eq!(segment.key, "time");
        assert_eq!(segment.value, "12:30");
    }

    #[test]
    fn test_parse_segment_errors() {
        assert_eq!(
            parse_segment("bogus"),
            Err(SegmentError::MissingSeparator("bogus".into()))
        );
        assert_eq!(parse_segment(":5"), Err(SegmentError::EmptyKey(":5".into())));
    }

    #[test]
    fn test_event_wire_format() {
        assert_eq!(TelemetryEvent::new("power", 250.0).to_line(), "power:250");
        assert_eq!(TelemetryEvent::new("speed", 27.5).to_line(), "speed:27.5");
    }

    #[test]
    fn test_parse_events_per_segment() {
        let events = parse_events("power:250-cadence:abc-hr");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], Ok(TelemetryEvent::new("power", 250.0)));
        assert!(matches!(events[1], Err(EventParseError::InvalidValue { .. })));
        assert!(matches!(
            events[2],
            Err(EventParseError::Segment(SegmentError::MissingSeparator(_)))
        ));
    }

    #[test]
    fn test_parse_events_rejects_non_finite() {
        let events = parse_events("power:inf");
        assert!(events[0].is_err());
    }
}
