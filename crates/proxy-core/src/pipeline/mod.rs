//! Owned pixel buffers and the pure operations of the image pipeline
//!
//! Every operation takes `&self` and returns a new [`Image`], so the same
//! source can be processed for several outputs concurrently.

mod color_cube;
mod crop;

pub use color_cube::ColorCube;
pub use crop::{ImageParameters, PreparedCard, crop, prepare_card, uncrop};

use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};

use crate::types::{Result, Rotation};
use crate::units::{Density, PixelSize, Size};

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// How pixels outside the source are filled when growing an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BorderFill {
    Black,
    /// Repeat the outermost row or column
    Replicate,
    /// Mirror the pixels next to the edge, edge included
    Reflect,
}

/// An RGBA image. Cloning copies the pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pixels: RgbaImage,
}

impl From<RgbaImage> for Image {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

impl Image {
    pub fn filled(size: PixelSize, rgba: [u8; 4]) -> Self {
        Self::from(RgbaImage::from_pixel(size.width, size.height, Rgba(rgba)))
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from(image::open(path)?.to_rgba8()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from(image::load_from_memory(bytes)?.to_rgba8()))
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.pixels.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// Save in the format implied by the file extension
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match ImageFormat::from_path(path) {
            // JPEG has no alpha channel
            Ok(ImageFormat::Jpeg) => {
                image::DynamicImage::ImageRgba8(self.pixels.clone())
                    .to_rgb8()
                    .save(path)?;
            }
            _ => self.pixels.save(path)?,
        }
        Ok(())
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixel_size(&self) -> PixelSize {
        PixelSize::new(self.width(), self.height())
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.pixel_size().aspect_ratio()
    }

    /// Density this image has when printed at `size`
    pub fn density(&self, size: Size) -> Result<Density> {
        Density::from_image(self.pixel_size(), size)
    }

    pub fn rotate(&self, rotation: Rotation) -> Image {
        let pixels = match rotation {
            Rotation::None => self.pixels.clone(),
            Rotation::Clockwise90 => imageops::rotate90(&self.pixels),
            Rotation::Clockwise180 => imageops::rotate180(&self.pixels),
            Rotation::Clockwise270 => imageops::rotate270(&self.pixels),
        };
        Image::from(pixels)
    }

    pub fn resize(&self, size: PixelSize) -> Image {
        if size == self.pixel_size() {
            return self.clone();
        }
        let width = size.width.max(1);
        let height = size.height.max(1);
        Image::from(imageops::resize(
            &self.pixels,
            width,
            height,
            FilterType::Lanczos3,
        ))
    }

    /// Proportional downscale to `width`; smaller images are left as is
    pub fn thumbnail(&self, width: u32) -> Image {
        if width >= self.width() {
            return self.clone();
        }
        let height = (self.height() as f32 * width as f32 / self.width() as f32).round() as u32;
        Image::from(imageops::thumbnail(&self.pixels, width.max(1), height.max(1)))
    }

    /// Remove the given number of pixels from each edge
    pub fn crop_edges(&self, left: u32, top: u32, right: u32, bottom: u32) -> Image {
        let width = self.width().saturating_sub(left + right).max(1);
        let height = self.height().saturating_sub(top + bottom).max(1);
        let x = left.min(self.width().saturating_sub(1));
        let y = top.min(self.height().saturating_sub(1));
        Image::from(imageops::crop_imm(&self.pixels, x, y, width, height).to_image())
    }

    pub fn add_black_border(&self, left: u32, top: u32, right: u32, bottom: u32) -> Image {
        self.extend(left, top, right, bottom, BorderFill::Black)
    }

    pub fn add_replicated_border(&self, left: u32, top: u32, right: u32, bottom: u32) -> Image {
        self.extend(left, top, right, bottom, BorderFill::Replicate)
    }

    pub fn add_reflected_border(&self, left: u32, top: u32, right: u32, bottom: u32) -> Image {
        self.extend(left, top, right, bottom, BorderFill::Reflect)
    }

    fn extend(&self, left: u32, top: u32, right: u32, bottom: u32, fill: BorderFill) -> Image {
        let (width, height) = (self.width(), self.height());
        let mut out = RgbaImage::new(width + left + right, height + top + bottom);
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let sx = x as i64 - left as i64;
            let sy = y as i64 - top as i64;
            *pixel = match (
                source_index(sx, width, fill),
                source_index(sy, height, fill),
            ) {
                (Some(sx), Some(sy)) => *self.pixels.get_pixel(sx, sy),
                _ => BLACK,
            };
        }
        Image::from(out)
    }

    /// Map every pixel through `f`
    pub fn map_pixels(&self, f: impl Fn([u8; 4]) -> [u8; 4]) -> Image {
        let mut pixels = self.pixels.clone();
        for pixel in pixels.pixels_mut() {
            pixel.0 = f(pixel.0);
        }
        Image::from(pixels)
    }

    /// Order-sensitive digest of the pixel content.
    ///
    /// Only used to detect unchanged sources; a match means "probably equal".
    pub fn hash(&self) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.width().to_le_bytes());
        hasher.update(&self.height().to_le_bytes());
        hasher.update(self.pixels.as_raw());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

fn source_index(index: i64, len: u32, fill: BorderFill) -> Option<u32> {
    let len = len as i64;
    if (0..len).contains(&index) {
        return Some(index as u32);
    }
    let mapped = match fill {
        BorderFill::Black => return None,
        BorderFill::Replicate => index.clamp(0, len - 1),
        BorderFill::Reflect => {
            let reflected = if index < 0 { -index - 1 } else { 2 * len - index - 1 };
            reflected.clamp(0, len - 1)
        }
    };
    Some(mapped as u32)
}
