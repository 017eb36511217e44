//! Overlay fields and the state they live in

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::color::{Rgb, Rgba};
use super::error::FormatError;

/// Closed set of display slots a telemetry key can update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldId {
    /// Current speed, `speed`
    Speed,
    /// Ride distance, `distance`
    Distance,
    /// Pedal power, `power`
    Power,
    /// Heart rate, `heartrate`
    HeartRate,
    /// Pedal cadence, `cadence`
    Cadence,
    /// Engaged gear, `gear`
    Gear,
    /// Elapsed ride time in seconds, shown as `MM:SS`
    Time,
}

/// How a field interprets incoming values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Rounded to the nearest integer
    Numeric,
    /// Elapsed seconds shown as `MM:SS`
    Clock,
}

impl FieldId {
    /// Every field, in state order
    pub const ALL: [FieldId; 7] = [
        FieldId::Speed,
        FieldId::Distance,
        FieldId::Power,
        FieldId::HeartRate,
        FieldId::Cadence,
        FieldId::Gear,
        FieldId::Time,
    ];

    /// Telemetry key
    pub fn key(self) -> &'static str {
        match self {
            FieldId::Speed => "speed",
            FieldId::Distance => "distance",
            FieldId::Power => "power",
            FieldId::HeartRate => "heartrate",
            FieldId::Cadence => "cadence",
            FieldId::Gear => "gear",
            FieldId::Time => "time",
        }
    }

    /// Look up a field by telemetry key
    pub fn from_key(key: &str) -> Option<FieldId> {
        Self::ALL.into_iter().find(|id| id.key() == key)
    }

    /// Value interpretation
    pub fn kind(self) -> FieldKind {
        match self {
            FieldId::Time => FieldKind::Clock,
            _ => FieldKind::Numeric,
        }
    }

    /// Unit shown after the value unless configured otherwise
    pub fn default_unit(self) -> &'static str {
        match self {
            FieldId::Speed => "km/h",
            FieldId::Distance => "km",
            FieldId::Power => "W",
            FieldId::HeartRate => "bpm",
            FieldId::Cadence => "rpm",
            FieldId::Gear | FieldId::Time => "",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Current content of a field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldValue {
    /// Nothing received yet; the field is not drawn
    #[default]
    Unset,
    /// Rounded numeric reading
    Integer(i64),
    /// Preformatted text such as `02:05`
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unset => Ok(()),
            FieldValue::Integer(value) => write!(f, "{}", value),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

/// Per-field presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldStyle {
    /// Appended directly after the value
    pub unit: String,
    /// Text colour
    pub color: Rgb,
    /// Text alpha, 255 is fully opaque
    pub alpha: u8,
}

impl FieldStyle {
    /// Default style for `id`: white, opaque, with the field's usual unit
    pub fn for_field(id: FieldId) -> Self {
        Self {
            unit: id.default_unit().to_string(),
            ..Self::default()
        }
    }

    /// Colour with alpha applied
    pub fn rgba(&self) -> Rgba {
        self.color.with_alpha(self.alpha)
    }
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            unit: String::new(),
            color: Rgb::WHITE,
            alpha: 255,
        }
    }
}

/// One independently updatable display value
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayField {
    id: FieldId,
    value: FieldValue,
    style: FieldStyle,
}

impl OverlayField {
    /// Create an unset field
    pub fn new(id: FieldId, style: FieldStyle) -> Self {
        Self {
            id,
            value: FieldValue::Unset,
            style,
        }
    }

    /// Field identity
    pub fn id(&self) -> FieldId {
        self.id
    }

    /// Current value
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Presentation
    pub fn style(&self) -> &FieldStyle {
        &self.style
    }

    /// Whether the field is drawn
    pub fn is_set(&self) -> bool {
        self.value != FieldValue::Unset
    }

    /// Parse `raw` and store it rounded to the nearest integer (ties to even)
    pub fn set_value(&mut self, raw: &str) -> Result<(), FormatError> {
        let value = parse_finite(raw)?;
        let rounded = value.round_ties_even();
        // i64::MAX is not representable; anything at or past 2^63 saturates
        if rounded.abs() >= 9.223_372_036_854_775_807e18 {
            return Err(FormatError::OutOfRange(raw.trim().to_string()));
        }
        self.value = FieldValue::Integer(rounded as i64);
        Ok(())
    }

    /// Parse `raw` as elapsed seconds and store it as `MM:SS`
    pub fn set_time(&mut self, raw: &str) -> Result<(), FormatError> {
        let seconds = parse_finite(raw)?;
        check_elapsed(seconds, raw.trim())?;
        self.value = FieldValue::Text(format_elapsed(seconds));
        Ok(())
    }

    /// Store elapsed seconds as `MM:SS`
    pub fn set_elapsed(&mut self, seconds: f64) -> Result<(), FormatError> {
        if !seconds.is_finite() {
            return Err(FormatError::NotFinite(seconds.to_string()));
        }
        check_elapsed(seconds, &seconds.to_string())?;
        self.value = FieldValue::Text(format_elapsed(seconds));
        Ok(())
    }

    /// Forget the value so the field is no longer drawn
    pub fn clear(&mut self) {
        self.value = FieldValue::Unset;
    }

    /// `value + unit`, or `None` while unset
    pub fn display_text(&self) -> Option<String> {
        match self.value {
            FieldValue::Unset => None,
            ref value => Some(format!("{}{}", value, self.style.unit)),
        }
    }
}

fn parse_finite(raw: &str) -> Result<f64, FormatError> {
    let trimmed = raw.trim();
    let value = trimmed
        .parse::<f64>()
        .map_err(|_| FormatError::NotNumeric(trimmed.to_string()))?;
    if !value.is_finite() {
        return Err(FormatError::NotFinite(trimmed.to_string()));
    }
    Ok(value)
}

fn check_elapsed(seconds: f64, shown: &str) -> Result<(), FormatError> {
    if seconds < 0.0 {
        return Err(FormatError::NegativeTime(shown.to_string()));
    }
    // u64::MAX rounds up to 2^64 as f64; anything at or past it saturates
    if seconds >= u64::MAX as f64 {
        return Err(FormatError::OutOfRange(shown.to_string()));
    }
    Ok(())
}

/// `MM:SS`, floor-truncated, minutes unbounded.
///
/// Expects a non-negative `seconds` below `u64::MAX`; larger values saturate.
pub fn format_elapsed(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{:02}:{:02}", minutes, secs)
}

/// Every overlay field, owned by the ingest loop and read by the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState {
    fields: Vec<OverlayField>,
}

impl OverlayState {
    /// Create all fields unset, styled from `styles` where configured
    pub fn new(styles: &BTreeMap<FieldId, FieldStyle>) -> Self {
        let fields = FieldId::ALL
            .into_iter()
            .map(|id| {
                let style = styles
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| FieldStyle::for_field(id));
                OverlayField::new(id, style)
            })
            .collect();
        Self { fields }
    }

    /// Field by identity
    pub fn field(&self, id: FieldId) -> &OverlayField {
        &self.fields[id.index()]
    }

    /// Mutable field by identity
    pub fn field_mut(&mut self, id: FieldId) -> &mut OverlayField {
        &mut self.fields[id.index()]
    }

    /// All fields in [`FieldId::ALL`] order
    pub fn fields(&self) -> impl Iterator<Item = &OverlayField> {
        self.fields.iter()
    }

    /// Unset every field
    pub fn clear(&mut self) {
        self.fields.iter_mut().for_each(OverlayField::clear);
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new(&BTreeMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: FieldId) -> OverlayField {
        OverlayField::new(id, FieldStyle::for_field(id))
    }

    #[test]
    fn test_set_value_rounds() {
        let mut speed = field(FieldId::Speed);
        speed.set_value("12.6").unwrap();
        assert_eq!(speed.value(), &FieldValue::Integer(13));

        speed.set_value("12.4").unwrap();
        assert_eq!(speed.value(), &FieldValue::Integer(12));

        speed.set_value("12.5").unwrap();
        assert_eq!(speed.value(), &FieldValue::Integer(12));

        speed.set_value("13.5").unwrap();
        assert_eq!(speed.value(), &FieldValue::Integer(14));
    }

    #[test]
    fn test_set_value_error_keeps_previous() {
        let mut power = field(FieldId::Power);
        power.set_value("250").unwrap();

        assert_eq!(
            power.set_value("abc"),
            Err(FormatError::NotNumeric("abc".into()))
        );
        assert_eq!(power.value(), &FieldValue::Integer(250));

        assert!(matches!(power.set_value("NaN"), Err(FormatError::NotFinite(_))));
        assert!(matches!(power.set_value("1e300"), Err(FormatError::OutOfRange(_))));
        assert_eq!(power.value(), &FieldValue::Integer(250));
    }

    #[test]
    fn test_set_time_formats() {
        let mut time = field(FieldId::Time);
        for (raw, expected) in [
            ("125", "02:05"),
            ("59", "00:59"),
            ("3661", "61:01"),
            ("0", "00:00"),
            ("59.99", "00:59"),
        ] {
            time.set_time(raw).unwrap();
            assert_eq!(time.value(), &FieldValue::Text(expected.into()), "{}", raw);
        }
    }

    #[test]
    fn test_set_time_rejects_negative() {
        let mut time = field(FieldId::Time);
        time.set_time("10").unwrap();
        assert!(matches!(time.set_time("-1"), Err(FormatError::NegativeTime(_))));
        assert_eq!(time.value(), &FieldValue::Text("00:10".into()));
    }

    #[test]
    fn test_set_time_rejects_huge_values() {
        let mut time = field(FieldId::Time);
        time.set_time("754").unwrap();

        assert!(matches!(time.set_time("1e300"), Err(FormatError::OutOfRange(_))));
        assert!(matches!(time.set_elapsed(1e20), Err(FormatError::OutOfRange(_))));
        assert_eq!(time.value(), &FieldValue::Text("12:34".into()));

        // Still representable: 2^62 seconds
        time.set_elapsed(4.611_686_018_427_388e18).unwrap();
        assert!(time.is_set());
    }

    #[test]
    fn test_display_text_appends_unit() {
        let mut speed = field(FieldId::Speed);
        assert_eq!(speed.display_text(), None);

        speed.set_value("27.4").unwrap();
        assert_eq!(speed.display_text().as_deref(), Some("27km/h"));

        let mut gear = field(FieldId::Gear);
        gear.set_value("7").unwrap();
        assert_eq!(gear.display_text().as_deref(), Some("7"));
    }

    #[test]
    fn test_field_keys() {
        assert_eq!(FieldId::from_key("heartrate"), Some(FieldId::HeartRate));
        assert_eq!(FieldId::from_key("bogus"), None);
        for id in FieldId::ALL {
            assert_eq!(FieldId::from_key(id.key()), Some(id));
        }
    }

    #[test]
    fn test_state_uses_configured_style() {
        let mut styles = BTreeMap::new();
        styles.insert(
            FieldId::Power,
            FieldStyle {
                unit: " watts".into(),
                color: Rgb::RED,
                alpha: 128,
            },
        );
        let state = OverlayState::new(&styles);

        assert_eq!(state.field(FieldId::Power).style().unit, " watts");
        assert_eq!(state.field(FieldId::Power).style().rgba(), Rgba::new(255, 0, 0, 128));
        assert_eq!(state.field(FieldId::Cadence).style().unit, "rpm");
        assert!(state.fields().all(|f| !f.is_set()));
    }
}
