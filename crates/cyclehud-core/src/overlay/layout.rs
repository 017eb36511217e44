//! Six-slot screen layout

use serde::{Deserialize, Serialize};

use super::color::Rgba;
use super::field::{FieldId, OverlayState};
use super::raster::RgbaRaster;
use super::text::HudFont;

/// A point on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Horizontal position
    pub x: i32,
    /// Vertical position of the text baseline
    pub y: i32,
}

impl Origin {
    /// Create an origin
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Horizontal anchoring of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Text starts at the origin
    Left,
    /// Text is centred on the screen
    Middle,
    /// Text ends at the origin
    Right,
}

/// One of the six screen regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Slot {
    TopLeft,
    TopMiddle,
    TopRight,
    BottomLeft,
    BottomMiddle,
    BottomRight,
}

impl Slot {
    /// Every slot, in drawing order
    pub const ALL: [Slot; 6] = [
        Slot::TopLeft,
        Slot::TopMiddle,
        Slot::TopRight,
        Slot::BottomLeft,
        Slot::BottomMiddle,
        Slot::BottomRight,
    ];

    /// Top slots stack downwards, bottom slots upwards
    pub fn is_top(self) -> bool {
        matches!(self, Slot::TopLeft | Slot::TopMiddle | Slot::TopRight)
    }

    /// Horizontal anchoring
    pub fn anchor(self) -> Anchor {
        match self {
            Slot::TopLeft | Slot::BottomLeft => Anchor::Left,
            Slot::TopMiddle | Slot::BottomMiddle => Anchor::Middle,
            Slot::TopRight | Slot::BottomRight => Anchor::Right,
        }
    }
}

/// Screen geometry, typography and slot contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Raster width in pixels
    pub width: u32,
    /// Raster height in pixels
    pub height: u32,
    /// First baseline of the top-left and top-middle slots
    pub top_left_origin: Origin,
    /// Right edge and first baseline of the top-right slot
    pub top_right_origin: Origin,
    /// First baseline of the bottom-left and bottom-middle slots
    pub bottom_left_origin: Origin,
    /// Right edge and first baseline of the bottom-right slot
    pub bottom_right_origin: Origin,
    /// Integer glyph magnification
    pub font_scale: u32,
    /// Stroke width in pixels, 1 is the plain font
    pub thickness: u32,
    /// Vertical distance between stacked lines
    pub line_offset: i32,
    /// Degrees, counter-clockwise positive
    pub rotation: f64,
    /// Fields stacked in each slot, first line first
    pub top_left: Vec<FieldId>,
    #[allow(missing_docs)]
    pub top_middle: Vec<FieldId>,
    #[allow(missing_docs)]
    pub top_right: Vec<FieldId>,
    #[allow(missing_docs)]
    pub bottom_left: Vec<FieldId>,
    #[allow(missing_docs)]
    pub bottom_middle: Vec<FieldId>,
    #[allow(missing_docs)]
    pub bottom_right: Vec<FieldId>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 600,
            top_left_origin: Origin::new(10, 50),
            top_right_origin: Origin::new(1014, 50),
            bottom_left_origin: Origin::new(10, 570),
            bottom_right_origin: Origin::new(1014, 570),
            font_scale: 2,
            thickness: 2,
            line_offset: 50,
            rotation: 0.0,
            top_left: vec![FieldId::Speed, FieldId::Distance],
            top_middle: vec![FieldId::Time],
            top_right: vec![FieldId::Power, FieldId::HeartRate],
            bottom_left: vec![FieldId::Cadence],
            bottom_middle: Vec::new(),
            bottom_right: vec![FieldId::Gear],
        }
    }
}

impl LayoutConfig {
    /// Ordered fields of `slot`
    pub fn slot(&self, slot: Slot) -> &[FieldId] {
        match slot {
            Slot::TopLeft => &self.top_left,
            Slot::TopMiddle => &self.top_middle,
            Slot::TopRight => &self.top_right,
            Slot::BottomLeft => &self.bottom_left,
            Slot::BottomMiddle => &self.bottom_middle,
            Slot::BottomRight => &self.bottom_right,
        }
    }

    /// Origin of the first line of `slot`.
    ///
    /// Middle slots share the vertical origin of the left slot on the same
    /// row; their horizontal position is computed from the text width.
    pub fn origin(&self, slot: Slot) -> Origin {
        match slot {
            Slot::TopLeft | Slot::TopMiddle => self.top_left_origin,
            Slot::TopRight => self.top_right_origin,
            Slot::BottomLeft | Slot::BottomMiddle => self.bottom_left_origin,
            Slot::BottomRight => self.bottom_right_origin,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "screen size {}x{} must be non-zero",
                self.width, self.height
            ));
        }
        if self.font_scale == 0 || self.thickness == 0 {
            return Err("font_scale and thickness must be at least 1".to_string());
        }
        if !self.rotation.is_finite() {
            return Err(format!("rotation {} is not finite", self.rotation));
        }
        Ok(())
    }
}

/// Where one field's text lands on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Field being drawn
    pub field: FieldId,
    /// Slot the field sits in
    pub slot: Slot,
    /// Value with its unit
    pub text: String,
    /// Left edge of the text
    pub x: i32,
    /// Baseline
    pub y: i32,
    /// Measured text width
    pub width: u32,
    /// Text colour including alpha
    pub color: Rgba,
}

/// Lays out and renders overlay state
#[derive(Debug, Clone)]
pub struct OverlayLayout {
    config: LayoutConfig,
    font: HudFont,
}

impl OverlayLayout {
    /// Create a layout from its configuration
    pub fn new(config: LayoutConfig) -> Self {
        let font = HudFont::new(config.font_scale, config.thickness);
        Self { config, font }
    }

    /// Layout configuration
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Font used for every field
    pub fn font(&self) -> &HudFont {
        &self.font
    }

    /// Placements of every set field. Unset fields keep their line free.
    pub fn placements(&self, state: &OverlayState) -> Vec<Placement> {
        let mut placements = Vec::new();
        for slot in Slot::ALL {
            let origin = self.config.origin(slot);
            for (line, &id) in self.config.slot(slot).iter().enumerate() {
                let field = state.field(id);
                let Some(text) = field.display_text() else {
                    continue;
                };

                let width = self.font.measure(&text);
                let x = match slot.anchor() {
                    Anchor::Left => origin.x,
                    Anchor::Right => origin.x - width as i32,
                    Anchor::Middle => (self.config.width as i32 - width as i32).div_euclid(2),
                };
                let step = line as i32 * self.config.line_offset;
                let y = if slot.is_top() {
                    origin.y + step
                } else {
                    origin.y - step
                };

                placements.push(Placement {
                    field: id,
                    slot,
                    text,
                    x,
                    y,
                    width,
                    color: field.style().rgba(),
                });
            }
        }
        placements
    }

    /// Render the state into a transparent raster of the configured size
    pub fn render(&self, state: &OverlayState) -> RgbaRaster {
        let mut raster = RgbaRaster::new(self.config.width, self.config.height);
        for placement in self.placements(state) {
            self.font.draw(
                &mut raster,
                &placement.text,
                placement.x,
                placement.y,
                placement.color,
            );
        }

        if self.config.rotation != 0.0 {
            raster = raster.rotate(self.config.rotation);
        }
        raster
    }
}
