//! Indexed PAL raster with its priority plane, and the palette used to convert it to RGB.
use lazy_static::lazy_static;

use crate::common::constants::LINES_PER_SCREEN_PAL;
use crate::common::constants::PIXELS_PER_LINE;
use crate::common::constants::VIEW_H;
use crate::common::constants::VIEW_W;
use crate::common::constants::VIEW_X;
use crate::common::constants::VIEW_Y;

/// 32-bit RGBA format used on modern machines for interop with image-rs.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rgba32(pub [u8; 4]);

/// Abstract interface for image::RgbaImage (used in tests and the cli).
pub trait Image {
    fn new(width: u32, height: u32) -> Self;
    fn set_pixel(&mut self, index: (u32, u32), value: Rgba32);
}

const HUE_ANGLE: [f64; 16] = [
    0.0, 163.0, 150.0, 109.0, 42.0, 17.0, -3.0, -14.0, -26.0, -53.0, -80.0, -107.0, -134.0,
    -161.0, -188.0, -197.0,
];
const CONTRAST: f64 = 1.0;
const BRIGHTNESS: f64 = 0.9;

fn clamp_channel(value: f64) -> u8 {
    (value * 256.0).clamp(0.0, 255.0) as u8
}

/// 256 RGB triplets, indexed by `hue * 16 + luminance`.
pub fn create_palette() -> [[u8; 3]; 256] {
    let mut palette = [[0_u8; 3]; 256];
    for lum in 0..16 {
        for hue in 0..16 {
            let (saturation, luma) = if hue == 0 {
                (0.0, lum as f64 / 15.0 * CONTRAST)
            } else {
                (0.5, (lum as f64 + BRIGHTNESS) / (15.0 + BRIGHTNESS) * CONTRAST)
            };
            let angle = HUE_ANGLE[hue].to_radians();
            let r = luma + saturation * angle.sin();
            let g = luma
                - (27.0 / 53.0) * saturation * angle.sin()
                - (10.0 / 53.0) * saturation * angle.cos();
            let b = luma + saturation * angle.cos();
            palette[lum + hue * 16] = [clamp_channel(r), clamp_channel(g), clamp_channel(b)];
        }
    }
    palette
}

lazy_static! {
    pub static ref PALETTE: [[u8; 3]; 256] = create_palette();
}

/// One palette index per pixel for the full 456x312 raster, plus a parallel plane of
/// priority bits that the playfield renderer writes and the GTIA compositor reads.
#[derive(Clone)]
pub struct Framebuffer {
    pub pixels: Vec<u8>,
    pub priority: Vec<u8>,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            pixels: vec![0; PIXELS_PER_LINE * LINES_PER_SCREEN_PAL],
            priority: vec![0; PIXELS_PER_LINE * LINES_PER_SCREEN_PAL],
        }
    }
}

impl Framebuffer {
    pub fn line_offset(line: usize) -> usize {
        line * PIXELS_PER_LINE
    }

    pub fn line(&self, line: usize) -> &[u8] {
        let start = Self::line_offset(line);
        &self.pixels[start..start + PIXELS_PER_LINE]
    }

    pub fn clear_priority(&mut self) {
        self.priority.fill(0);
    }

    /// Fills `width` pixels starting at `index` with a color and priority. Pixels past the end of
    /// the raster are dropped.
    pub fn fill(&mut self, index: usize, width: usize, color: u8, priority: u8) {
        let end = (index + width).min(self.pixels.len());
        let start = index.min(end);
        self.pixels[start..end].fill(color);
        self.priority[start..end].fill(priority);
    }

    pub fn rgb(&self, x: usize, y: usize) -> [u8; 3] {
        PALETTE[self.pixels[y * PIXELS_PER_LINE + x] as usize]
    }

    /// Converts the visible 336x240 window into an RGBA image.
    pub fn to_image<ImageT: Image>(&self) -> ImageT {
        let mut image = ImageT::new(VIEW_W as u32, VIEW_H as u32);
        for y in 0..VIEW_H {
            for x in 0..VIEW_W {
                let [r, g, b] = self.rgb(VIEW_X + x, VIEW_Y + y);
                image.set_pixel((x as u32, y as u32), Rgba32([r, g, b, 255]));
            }
        }
        image
    }

    /// The visible window as tightly packed RGBA bytes.
    pub fn visible_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(VIEW_W * VIEW_H * 4);
        for y in 0..VIEW_H {
            for x in 0..VIEW_W {
                let [r, g, b] = self.rgb(VIEW_X + x, VIEW_Y + y);
                rgba.extend_from_slice(&[r, g, b, 255]);
            }
        }
        rgba
    }
}
