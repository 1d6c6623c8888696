//! 3D color lookup tables
//!
//! Two file formats are understood: `.cube` text files and Hald CLUT images
//! (a square image of edge `L³` holding a cube of edge `L²`). Both store red
//! as the fastest changing axis.

use std::path::Path;

use crate::types::{CoreError, Result};

use super::Image;

/// Largest number of samples per axis accepted from a file
const MAX_CUBE_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq)]
struct Lut {
    /// Number of samples along each axis
    size: usize,
    /// `size³` normalized RGB samples, red fastest
    samples: Vec<[f32; 3]>,
}

impl Lut {
    fn new(size: usize, samples: Vec<[f32; 3]>) -> Result<Self> {
        if !(2..=MAX_CUBE_SIZE).contains(&size) {
            return Err(CoreError::InvalidColorCube(format!(
                "cube needs between 2 and {MAX_CUBE_SIZE} samples per axis, got {size}"
            )));
        }
        let expected = size * size * size;
        if samples.len() != expected {
            return Err(CoreError::InvalidColorCube(format!(
                "expected {} samples, found {}",
                expected,
                samples.len()
            )));
        }
        Ok(Self { size, samples })
    }

    fn sample(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.samples[r + g * self.size + b * self.size * self.size]
    }

    /// Trilinear interpolation of the eight samples around the input color
    fn map(&self, [r, g, b, a]: [u8; 4]) -> [u8; 4] {
        let max = (self.size - 1) as f32;
        let axis = |value: u8| {
            let position = value as f32 / 255.0 * max;
            let low = (position.floor() as usize).min(self.size - 1);
            let high = (low + 1).min(self.size - 1);
            (low, high, position - low as f32)
        };
        let (r0, r1, dr) = axis(r);
        let (g0, g1, dg) = axis(g);
        let (b0, b1, db) = axis(b);

        let lerp = |a: [f32; 3], b: [f32; 3], t: f32| {
            [
                a[0] + (b[0] - a[0]) * t,
                a[1] + (b[1] - a[1]) * t,
                a[2] + (b[2] - a[2]) * t,
            ]
        };
        let c00 = lerp(self.sample(r0, g0, b0), self.sample(r1, g0, b0), dr);
        let c10 = lerp(self.sample(r0, g1, b0), self.sample(r1, g1, b0), dr);
        let c01 = lerp(self.sample(r0, g0, b1), self.sample(r1, g0, b1), dr);
        let c11 = lerp(self.sample(r0, g1, b1), self.sample(r1, g1, b1), dr);
        let c0 = lerp(c00, c10, dg);
        let c1 = lerp(c01, c11, dg);
        let [r, g, b] = lerp(c0, c1, db);

        let to_u8 = |value: f32| (value * 255.0).round().clamp(0.0, 255.0) as u8;
        [to_u8(r), to_u8(g), to_u8(b), a]
    }
}

/// A color grading transform, loaded once and shared read-only
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorCube {
    lut: Option<Lut>,
}

impl ColorCube {
    pub fn identity() -> Self {
        Self { lut: None }
    }

    pub fn is_identity(&self) -> bool {
        self.lut.is_none()
    }

    /// Load a cube, falling back to the identity on any failure
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(cube) => {
                log::debug!("Loaded color cube {}", path.display());
                cube
            }
            Err(err) => {
                log::warn!(
                    "Failed to load color cube {}, using identity: {}",
                    path.display(),
                    err
                );
                Self::identity()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self> {
        let is_cube_text = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("cube"));
        let lut = if is_cube_text {
            parse_cube_text(&std::fs::read_to_string(path)?)?
        } else {
            parse_hald(&Image::open(path)?)?
        };
        Ok(Self { lut: Some(lut) })
    }

    pub fn from_cube_text(text: &str) -> Result<Self> {
        Ok(Self {
            lut: Some(parse_cube_text(text)?),
        })
    }

    /// Map every pixel through the cube, alpha is untouched
    pub fn apply(&self, image: &Image) -> Image {
        match &self.lut {
            None => image.clone(),
            Some(lut) => image.map_pixels(|pixel| lut.map(pixel)),
        }
    }
}

fn parse_cube_text(text: &str) -> Result<Lut> {
    let mut size = None;
    let mut samples = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(first) = parts.next() else {
            continue;
        };
        match first {
            "LUT_3D_SIZE" => {
                let value = parts
                    .next()
                    .and_then(|value| value.parse::<usize>().ok())
                    .ok_or_else(|| CoreError::InvalidColorCube(format!("bad size line: {line}")))?;
                size = Some(value);
            }
            "LUT_1D_SIZE" => {
                return Err(CoreError::InvalidColorCube(
                    "1D lookup tables are not supported".to_string(),
                ));
            }
            "TITLE" | "DOMAIN_MIN" | "DOMAIN_MAX" => {}
            _ => {
                let values: Vec<f32> = line
                    .split_whitespace()
                    .map(|value| value.parse::<f32>())
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|_| CoreError::InvalidColorCube(format!("bad sample: {line}")))?;
                let &[r, g, b] = values.as_slice() else {
                    return Err(CoreError::InvalidColorCube(format!("bad sample: {line}")));
                };
                samples.push([r, g, b]);
            }
        }
    }
    let size = size.ok_or_else(|| CoreError::InvalidColorCube("missing LUT_3D_SIZE".to_string()))?;
    Lut::new(size, samples)
}

fn parse_hald(image: &Image) -> Result<Lut> {
    let edge = image.width();
    let level = (edge as f64).cbrt().round() as u32;
    if image.height() != edge || level.checked_pow(3) != Some(edge) {
        return Err(CoreError::InvalidColorCube(format!(
            "{}x{} is not a Hald CLUT",
            image.width(),
            image.height()
        )));
    }
    let samples = image
        .as_rgba()
        .pixels()
        .map(|pixel| {
            let [r, g, b, _] = pixel.0;
            [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
        })
        .collect();
    Lut::new((level * level) as usize, samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::PixelSize;

    const IDENTITY_CUBE: &str = "TITLE \"identity\"\nLUT_3D_SIZE 2\n\
        0 0 0\n1 0 0\n0 1 0\n1 1 0\n0 0 1\n1 0 1\n0 1 1\n1 1 1\n";

    #[test]
    fn test_identity_cube_text_keeps_colors() {
        let cube = ColorCube::from_cube_text(IDENTITY_CUBE).unwrap();
        assert!(!cube.is_identity());
        let image = Image::filled(PixelSize::new(2, 2), [12, 200, 99, 128]);
        assert_eq!(cube.apply(&image), image);
    }

    #[test]
    fn test_oversized_cube_is_rejected() {
        let text = "LUT_3D_SIZE 3000000\n0 0 0\n";
        assert!(matches!(
            ColorCube::from_cube_text(text),
            Err(CoreError::InvalidColorCube(_))
        ));
        let text = format!("LUT_3D_SIZE {}\n0 0 0\n", usize::MAX);
        assert!(ColorCube::from_cube_text(&text).is_err());
    }

    #[test]
    fn test_unusable_file_loads_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.cube");
        std::fs::write(&path, "LUT_3D_SIZE 3000000\n0 0 0\n").unwrap();
        assert!(ColorCube::load(&path).is_identity());
        assert!(ColorCube::load(&dir.path().join("missing.cube")).is_identity());
    }

    #[test]
    fn test_inverting_cube() {
        let text = "LUT_3D_SIZE 2\n\
            1 1 1\n0 1 1\n1 0 1\n0 0 1\n1 1 0\n0 1 0\n1 0 0\n0 0 0\n";
        let cube = ColorCube::from_cube_text(text).unwrap();
        let image = Image::filled(PixelSize::new(1, 1), [0, 255, 100, 255]);
        let mapped = cube.apply(&image);
        assert_eq!(mapped.as_rgba().get_pixel(0, 0).0, [255, 0, 155, 255]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_cube_text("0 0 0\n").is_err());
        assert!(parse_cube_text("LUT_3D_SIZE 2\n0 0 0\n").is_err());
        assert!(parse_cube_text("LUT_3D_SIZE 2\nnot a number\n").is_err());
        assert!(parse_cube_text("LUT_1D_SIZE 16\n").is_err());
    }

    #[test]
    fn test_hald_identity() {
        // Level 2: 8x8 image, cube edge 4
        let size = 4u32;
        let pixels = image::RgbaImage::from_fn(8, 8, |x, y| {
            let index = y * 8 + x;
            let channel = |i: u32| (i * 255 / (size - 1)) as u8;
            image::Rgba([
                channel(index % size),
                channel(index / size % size),
                channel(index / (size * size)),
                255,
            ])
        });
        let lut = parse_hald(&Image::from(pixels)).unwrap();
        assert_eq!(lut.size, 4);
        assert_eq!(lut.map([85, 170, 255, 255]), [85, 170, 255, 255]);
        assert!(parse_hald(&Image::filled(PixelSize::new(7, 7), [0; 4])).is_err());
    }
}
