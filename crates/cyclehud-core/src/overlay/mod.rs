//! Overlay Layout Engine
//!
//! Renders the heads-up display shown on top of the camera preview. Field
//! values live in an [`OverlayState`] owned by the ingest loop; an
//! [`OverlayLayout`] turns that state into an [`RgbaRaster`] of the configured
//! screen size, leaving every undrawn pixel fully transparent.
//!
//! Fields are arranged in six slots. Left slots start at a fixed x origin,
//! right slots end at one, and middle slots are centred on the screen. Lines
//! within a slot stack downwards from the top origins and upwards from the
//! bottom origins, `line_offset` pixels apart.

mod color;
mod error;
mod field;
mod layout;
mod raster;
mod text;

pub use color::{ColorParseError, Rgb, Rgba};
pub use error::FormatError;
pub use field::{
    format_elapsed, FieldId, FieldKind, FieldStyle, FieldValue, OverlayField, OverlayState,
};
pub use layout::{Anchor, LayoutConfig, Origin, OverlayLayout, Placement, Slot};
pub use raster::RgbaRaster;
pub use text::HudFont;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Overlay section of the application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Geometry, typography and slot contents
    pub layout: LayoutConfig,
    /// Per-field unit and colour; unlisted fields use their defaults
    pub fields: BTreeMap<FieldId, FieldStyle>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            fields: FieldId::ALL
                .into_iter()
                .map(|id| (id, FieldStyle::for_field(id)))
                .collect(),
        }
    }
}

impl OverlayConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        self.layout.validate()
    }
}
