use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use sha2::{Digest, Sha256};

use crate::color::Color;
use crate::error::{AnimError, AnimResult};
use crate::request::CanvasSize;

/// One owned RGB raster. Never shares storage with another frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    pub fn filled(canvas: CanvasSize, color: Color) -> Self {
        let mut data = Vec::with_capacity(canvas.pixel_count() * 3);
        for _ in 0..canvas.pixel_count() {
            data.extend_from_slice(&[color.r, color.g, color.b]);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
        }
    }

    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> AnimResult<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(AnimError::render(format!(
                "RGB buffer length mismatch: expected {expected} bytes, got {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn canvas(&self) -> CanvasSize {
        CanvasSize::new(self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * 3;
        Some(Color::rgb(
            self.data[index],
            self.data[index + 1],
            self.data[index + 2],
        ))
    }

    pub fn is_uniform(&self, color: Color) -> bool {
        self.data
            .chunks_exact(3)
            .all(|px| px == [color.r, color.g, color.b])
    }

    pub fn to_image(&self) -> AnimResult<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            AnimError::render(format!(
                "frame buffer does not match {}x{}",
                self.width, self.height
            ))
        })
    }

    /// Returns a resized copy, or a clone when `target` already matches.
    pub fn resized(&self, target: CanvasSize) -> AnimResult<Frame> {
        if target == self.canvas() {
            return Ok(self.clone());
        }
        let image = self.to_image()?;
        let resized = imageops::resize(&image, target.width, target.height, FilterType::Triangle);
        Frame::from_rgb(target.width, target.height, resized.into_raw())
    }

    pub fn save_png(&self, path: &Path) -> AnimResult<()> {
        self.to_image()?.save(path).map_err(|error| {
            AnimError::render(format!("failed to write frame {}: {error}", path.display()))
        })
    }

    /// Hex SHA-256 of the pixel data.
    pub fn digest(&self) -> String {
        let digest = Sha256::digest(&self.data);
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}
