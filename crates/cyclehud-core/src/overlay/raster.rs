//! RGBA raster buffer

use std::fmt;

use super::color::Rgba;

/// Row-major 8-bit RGBA image, initially fully transparent
#[derive(Clone, PartialEq, Eq)]
pub struct RgbaRaster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbaRaster {
    /// Bytes per pixel
    pub const CHANNELS: usize = 4;

    /// Create a transparent raster
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * Self::CHANNELS],
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * Self::CHANNELS)
    }

    /// Pixel at `(x, y)`, `None` outside the raster
    pub fn get(&self, x: i64, y: i64) -> Option<Rgba> {
        let i = self.offset(x, y)?;
        let p = &self.pixels[i..i + Self::CHANNELS];
        Some(Rgba::new(p[0], p[1], p[2], p[3]))
    }

    /// Overwrite the pixel at `(x, y)`; writes outside the raster are clipped
    pub fn put(&mut self, x: i64, y: i64, color: Rgba) {
        if let Some(i) = self.offset(x, y) {
            self.pixels[i..i + Self::CHANNELS].copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }

    /// Fill the rectangle with top-left `(x, y)`, clipped to the raster
    pub fn fill_rect(&mut self, x: i64, y: i64, width: u32, height: u32, color: Rgba) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width as i64).min(self.width as i64);
        let y1 = (y + height as i64).min(self.height as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                self.put(px, py, color);
            }
        }
    }

    /// Raw RGBA bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume into raw RGBA bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// Whether every pixel has alpha 0
    pub fn is_transparent(&self) -> bool {
        self.pixels
            .chunks_exact(Self::CHANNELS)
            .all(|pixel| pixel[3] == 0)
    }

    /// Number of pixels with non-zero alpha
    pub fn drawn_pixels(&self) -> usize {
        self.pixels
            .chunks_exact(Self::CHANNELS)
            .filter(|pixel| pixel[3] != 0)
            .count()
    }

    /// Rotate about the centre by `degrees`, counter-clockwise positive.
    ///
    /// Output keeps the input dimensions, so corners may be clipped. Each
    /// destination pixel is sampled bilinearly from the inverse-rotated
    /// source position; samples outside the source are transparent.
    pub fn rotate(&self, degrees: f64) -> RgbaRaster {
        let mut out = RgbaRaster::new(self.width, self.height);
        let (sin, cos) = degrees.to_radians().sin_cos();
        let cx = self.width as f64 / 2.0;
        let cy = self.height as f64 / 2.0;

        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                let sx = cos * dx - sin * dy + cx;
                let sy = sin * dx + cos * dy + cy;
                let pixel = self.sample_bilinear(sx, sy);
                if pixel.a != 0 {
                    out.put(x, y, pixel);
                }
            }
        }
        out
    }

    fn sample_bilinear(&self, sx: f64, sy: f64) -> Rgba {
        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = sx - x0;
        let fy = sy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let taps = [
            (x0, y0, (1.0 - fx) * (1.0 - fy)),
            (x0 + 1, y0, fx * (1.0 - fy)),
            (x0, y0 + 1, (1.0 - fx) * fy),
            (x0 + 1, y0 + 1, fx * fy),
        ];

        let mut acc = [0.0f64; 4];
        for (x, y, weight) in taps {
            let Some(p) = self.get(x, y) else { continue };
            acc[0] += p.r as f64 * weight;
            acc[1] += p.g as f64 * weight;
            acc[2] += p.b as f64 * weight;
            acc[3] += p.a as f64 * weight;
        }
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        Rgba::new(channel(acc[0]), channel(acc[1]), channel(acc[2]), channel(acc[3]))
    }
}

impl fmt::Debug for RgbaRaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RgbaRaster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("drawn_pixels", &self.drawn_pixels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    #[test]
    fn test_new_is_transparent() {
        let raster = RgbaRaster::new(8, 4);
        assert_eq!(raster.as_bytes().len(), 8 * 4 * 4);
        assert!(raster.is_transparent());
    }

    #[test]
    fn test_put_clips() {
        let mut raster = RgbaRaster::new(4, 4);
        raster.put(-1, 0, WHITE);
        raster.put(4, 0, WHITE);
        raster.put(0, 4, WHITE);
        assert!(raster.is_transparent());

        raster.put(3, 3, WHITE);
        assert_eq!(raster.get(3, 3), Some(WHITE));
        assert_eq!(raster.drawn_pixels(), 1);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut raster = RgbaRaster::new(4, 4);
        raster.fill_rect(2, 2, 5, 5, WHITE);
        assert_eq!(raster.drawn_pixels(), 4);
    }

    #[test]
    fn test_rotate_half_turn() {
        let mut raster = RgbaRaster::new(4, 4);
        raster.put(3, 3, WHITE);

        let rotated = raster.rotate(180.0);

        assert_eq!(rotated.get(1, 1), Some(WHITE));
        assert_eq!(rotated.drawn_pixels(), 1);
    }

    #[test]
    fn test_rotate_quarter_turn_counter_clockwise() {
        let mut raster = RgbaRaster::new(4, 4);
        // Right of centre, above it
        raster.put(3, 1, WHITE);

        let rotated = raster.rotate(90.0);

        // Moves to the left of centre, still above it
        assert_eq!(rotated.get(1, 1), Some(WHITE));
    }

    #[test]
    fn test_rotate_keeps_dimensions_and_clips() {
        let mut raster = RgbaRaster::new(20, 4);
        raster.put(0, 0, WHITE);

        let rotated = raster.rotate(90.0);

        assert_eq!((rotated.width(), rotated.height()), (20, 4));
        assert!(rotated.is_transparent());
    }
}
