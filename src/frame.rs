use std::path::Path;

use anyhow::{Context, Result};
use glam::{Vec3, Vec4};

/// Pixel buffer with linear RGBA float channels, row 0 at the top
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec4>,
}

impl Frame {
    /// Fully transparent frame
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Vec4::ZERO)
    }

    pub fn filled(width: u32, height: u32, color: Vec4) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width * height) as usize],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn set(&mut self, x: u32, y: u32, color: Vec4) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.pixels[(y * self.width + x) as usize] = color;
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Converts premultiplied color back to straight alpha
    pub fn unpremultiply(&mut self) {
        for pixel in &mut self.pixels {
            let rgb = if pixel.w > 0.0 {
                pixel.truncate() / pixel.w
            } else {
                Vec3::ZERO
            };
            *pixel = rgb.extend(pixel.w);
        }
    }

    /// Number of pixels with zero alpha
    pub fn transparent_count(&self) -> usize {
        self.pixels.iter().filter(|p| p.w == 0.0).count()
    }

    /// Fraction of fully transparent pixels, 1.0 for an empty frame
    pub fn transparent_ratio(&self) -> f32 {
        if self.pixels.is_empty() {
            return 1.0;
        }
        self.transparent_count() as f32 / self.pixel_count() as f32
    }

    pub fn is_transparent(&self) -> bool {
        self.pixels.iter().all(|p| p.w == 0.0)
    }

    /// 8-bit sRGB encoding of straight-alpha pixels
    pub fn to_rgba8(&self) -> Vec<[u8; 4]> {
        self.pixels
            .iter()
            .map(|p| {
                let c = p.clamp(Vec4::ZERO, Vec4::ONE);
                [
                    to_byte(linear_to_srgb(c.x)),
                    to_byte(linear_to_srgb(c.y)),
                    to_byte(linear_to_srgb(c.z)),
                    to_byte(c.w),
                ]
            })
            .collect()
    }

    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Self {
        let pixels = bytes
            .chunks_exact(4)
            .map(|p| {
                Vec4::new(
                    srgb_to_linear(p[0] as f32 / 255.0),
                    srgb_to_linear(p[1] as f32 / 255.0),
                    srgb_to_linear(p[2] as f32 / 255.0),
                    p[3] as f32 / 255.0,
                )
            })
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {:?}", dir))?;
        }

        let rgba = self.to_rgba8();
        let bytes: &[u8] = bytemuck::cast_slice(&rgba);
        image::save_buffer(path, bytes, self.width, self.height, image::ExtendedColorType::Rgba8)
            .with_context(|| format!("Failed to write PNG {:?}", path))
    }
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round() as u8
}

fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.040_45 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
