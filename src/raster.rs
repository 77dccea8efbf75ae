//! Decoded pixel output shared by every container format.

/// Packs 8-bit channels into a single `0x00RRGGBB` value.
pub fn rgb_to_u32(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Splits a packed `0x00RRGGBB` value into its channels.
pub fn u32_to_rgb(pixel: u32) -> (u8, u8, u8) {
    ((pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8)
}

/// Post-decode effects that can be applied to a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    NoEffect,
    /// Black & white.
    Noir,
}

/// Top-down, left-to-right raster of packed 24-bit RGB pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl RasterImage {
    /// Creates an all-black raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: u32) {
        self.pixels[y as usize * self.width as usize + x as usize] = rgb & 0x00FF_FFFF;
    }

    /// Interleaved `R, G, B` bytes, the layout image writers expect.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for &pixel in &self.pixels {
            let (r, g, b) = u32_to_rgb(pixel);
            out.extend_from_slice(&[r, g, b]);
        }
        out
    }

    pub fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::NoEffect => {}
            Effect::Noir => {
                for pixel in &mut self.pixels {
                    let (r, g, b) = u32_to_rgb(*pixel);
                    let luma = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
                        .round()
                        .clamp(0.0, 255.0) as u8;
                    *pixel = rgb_to_u32(luma, luma, luma);
                }
            }
        }
    }
}
