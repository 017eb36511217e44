//! Bitmap text
//!
//! Glyphs come from the embedded-graphics 10×20 monospaced font. Each glyph
//! pixel is drawn as a square block of `scale + thickness - 1` pixels, so
//! `scale` magnifies the font and `thickness` widens its strokes.

use std::convert::Infallible;

use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use super::color::Rgba;
use super::raster::RgbaRaster;

/// Collects lit glyph pixels relative to the text origin
struct GlyphCanvas {
    lit: Vec<Point>,
}

impl OriginDimensions for GlyphCanvas {
    fn size(&self) -> Size {
        Size::new(u16::MAX as u32, u16::MAX as u32)
    }
}

impl DrawTarget for GlyphCanvas {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.lit.extend(
            pixels
                .into_iter()
                .filter(|Pixel(_, color)| color.is_on())
                .map(|Pixel(point, _)| point),
        );
        Ok(())
    }
}

/// Scaled, thickened monospaced font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HudFont {
    scale: u32,
    thickness: u32,
}

impl HudFont {
    /// Create a font; zero scale or thickness is treated as one
    pub fn new(scale: u32, thickness: u32) -> Self {
        Self {
            scale: scale.max(1),
            thickness: thickness.max(1),
        }
    }

    /// Horizontal advance of one unscaled glyph
    pub fn glyph_advance() -> u32 {
        FONT_10X20.character_size.width + FONT_10X20.character_spacing
    }

    /// Rendered width of `text` in pixels
    pub fn measure(&self, text: &str) -> u32 {
        let glyphs = text.chars().count() as u32;
        if glyphs == 0 {
            return 0;
        }
        glyphs * Self::glyph_advance() * self.scale + (self.thickness - 1)
    }

    /// Height above the baseline in pixels
    pub fn ascent(&self) -> u32 {
        FONT_10X20.baseline * self.scale
    }

    fn block(&self) -> u32 {
        self.scale + self.thickness - 1
    }

    /// Draw `text` with its baseline starting at `(x, y)`
    pub fn draw(&self, raster: &mut RgbaRaster, text: &str, x: i32, y: i32, color: Rgba) {
        let mut canvas = GlyphCanvas { lit: Vec::new() };
        let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        match Text::with_baseline(text, Point::zero(), style, Baseline::Alphabetic)
            .draw(&mut canvas)
        {
            Ok(_) => {}
            Err(never) => match never {},
        }

        let scale = self.scale as i64;
        let block = self.block();
        for point in canvas.lit {
            raster.fill_rect(
                x as i64 + point.x as i64 * scale,
                y as i64 + point.y as i64 * scale,
                block,
                block,
                color,
            );
        }
    }
}
