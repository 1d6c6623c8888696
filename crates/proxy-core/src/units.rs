//! Physical lengths, sizes and pixel densities
//!
//! Lengths are stored in millimeters. Conversions to pixels go through a
//! [`Density`], which can only be constructed from a strictly positive value.
//! Pixel counts are always rounded half-up so that converting the same length
//! through the same density is stable.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use crate::constants::{MM_PER_INCH, POINTS_PER_MM};
use crate::types::{CoreError, Result};

/// A physical length, stored in millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Length(f32);

impl Length {
    pub const ZERO: Length = Length(0.0);

    pub const fn from_mm(mm: f32) -> Self {
        Self(mm)
    }

    pub const fn from_inches(inches: f32) -> Self {
        Self(inches * MM_PER_INCH)
    }

    pub const fn from_points(points: f32) -> Self {
        Self(points / POINTS_PER_MM)
    }

    pub fn mm(self) -> f32 {
        self.0
    }

    pub fn inches(self) -> f32 {
        self.0 / MM_PER_INCH
    }

    pub fn points(self) -> f32 {
        self.0 * POINTS_PER_MM
    }

    pub fn max(self, other: Length) -> Length {
        Length(self.0.max(other.0))
    }

    pub fn min(self, other: Length) -> Length {
        Length(self.0.min(other.0))
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0.0
    }
}

impl Add for Length {
    type Output = Length;
    fn add(self, rhs: Length) -> Length {
        Length(self.0 + rhs.0)
    }
}

impl AddAssign for Length {
    fn add_assign(&mut self, rhs: Length) {
        self.0 += rhs.0;
    }
}

impl Sub for Length {
    type Output = Length;
    fn sub(self, rhs: Length) -> Length {
        Length(self.0 - rhs.0)
    }
}

impl Neg for Length {
    type Output = Length;
    fn neg(self) -> Length {
        Length(-self.0)
    }
}

impl Mul<f32> for Length {
    type Output = Length;
    fn mul(self, rhs: f32) -> Length {
        Length(self.0 * rhs)
    }
}

impl Div<f32> for Length {
    type Output = Length;
    fn div(self, rhs: f32) -> Length {
        Length(self.0 / rhs)
    }
}

/// Ratio of two lengths
impl Div for Length {
    type Output = f32;
    fn div(self, rhs: Length) -> f32 {
        self.0 / rhs.0
    }
}

/// Physical width and height
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: Length,
    pub height: Length,
}

impl Size {
    pub const ZERO: Size = Size {
        width: Length::ZERO,
        height: Length::ZERO,
    };

    pub const fn new(width: Length, height: Length) -> Self {
        Self { width, height }
    }

    pub const fn from_mm(width: f32, height: f32) -> Self {
        Self::new(Length::from_mm(width), Length::from_mm(height))
    }

    pub const fn from_inches(width: f32, height: f32) -> Self {
        Self::new(Length::from_inches(width), Length::from_inches(height))
    }

    pub fn aspect_ratio(self) -> f32 {
        self.width / self.height
    }

    /// Width and height swapped
    pub fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Grow by `margin` on every side
    pub fn grow(self, margin: Length) -> Self {
        Self::new(self.width + margin * 2.0, self.height + margin * 2.0)
    }
}

impl Add for Size {
    type Output = Size;
    fn add(self, rhs: Size) -> Size {
        Size::new(self.width + rhs.width, self.height + rhs.height)
    }
}

impl Sub for Size {
    type Output = Size;
    fn sub(self, rhs: Size) -> Size {
        Size::new(self.width - rhs.width, self.height - rhs.height)
    }
}

impl Mul<f32> for Size {
    type Output = Size;
    fn mul(self, rhs: f32) -> Size {
        Size::new(self.width * rhs, self.height * rhs)
    }
}

/// A point on a page, origin at the top-left corner with y growing downwards
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: Length,
    pub y: Length,
}

impl Position {
    pub const ZERO: Position = Position {
        x: Length::ZERO,
        y: Length::ZERO,
    };

    pub const fn new(x: Length, y: Length) -> Self {
        Self { x, y }
    }

    pub const fn from_mm(x: f32, y: f32) -> Self {
        Self::new(Length::from_mm(x), Length::from_mm(y))
    }
}

impl Add for Position {
    type Output = Position;
    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;
    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// An axis-aligned rectangle on a page
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub position: Position,
    pub size: Size,
}

impl Rect {
    pub const fn new(position: Position, size: Size) -> Self {
        Self { position, size }
    }

    pub fn left(&self) -> Length {
        self.position.x
    }

    pub fn top(&self) -> Length {
        self.position.y
    }

    pub fn right(&self) -> Length {
        self.position.x + self.size.width
    }

    pub fn bottom(&self) -> Length {
        self.position.y + self.size.height
    }

    /// Grow each edge outwards by its own amount
    pub fn expand(&self, left: Length, top: Length, right: Length, bottom: Length) -> Rect {
        Rect::new(
            Position::new(self.position.x - left, self.position.y - top),
            Size::new(
                self.size.width + left + right,
                self.size.height + top + bottom,
            ),
        )
    }

    /// Overlapping region of two rectangles, if any
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(
            Position::new(left, top),
            Size::new(right - left, bottom - top),
        ))
    }
}

/// Dimensions of a pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }
}

/// Resolution in pixels per millimeter, always strictly positive
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Density(f32);

impl Density {
    pub fn from_pixels_per_mm(value: f32) -> Result<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(CoreError::InvalidDensity(value))
        }
    }

    pub fn from_dpi(dpi: f32) -> Result<Self> {
        Self::from_pixels_per_mm(dpi / MM_PER_INCH).map_err(|_| CoreError::InvalidDensity(dpi))
    }

    /// Density of `pixels` covering `size`, taking the smaller of both axes
    pub fn from_image(pixels: PixelSize, size: Size) -> Result<Self> {
        let horizontal = pixels.width as f32 / size.width.mm();
        let vertical = pixels.height as f32 / size.height.mm();
        Self::from_pixels_per_mm(horizontal.min(vertical))
    }

    pub fn pixels_per_mm(self) -> f32 {
        self.0
    }

    pub fn dpi(self) -> f32 {
        self.0 * MM_PER_INCH
    }

    /// Pixel count covering `length`, rounded half-up
    pub fn pixels(self, length: Length) -> u32 {
        (length.mm() * self.0).round().max(0.0) as u32
    }

    pub fn pixel_size(self, size: Size) -> PixelSize {
        PixelSize::new(self.pixels(size.width), self.pixels(size.height))
    }

    pub fn length(self, pixels: u32) -> Length {
        Length::from_mm(pixels as f32 / self.0)
    }

    pub fn min(self, other: Density) -> Density {
        if other.0 < self.0 { other } else { self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversions() {
        let inch = Length::from_inches(1.0);
        assert!((inch.mm() - 25.4).abs() < 1e-4);
        assert!((inch.points() - 72.0).abs() < 1e-3);
        assert!((Length::from_points(72.0).inches() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_density_rejects_non_positive() {
        assert!(matches!(
            Density::from_dpi(0.0),
            Err(CoreError::InvalidDensity(_))
        ));
        assert!(Density::from_pixels_per_mm(-1.0).is_err());
        assert!(Density::from_pixels_per_mm(f32::NAN).is_err());
        assert!(Density::from_dpi(300.0).is_ok());
    }

    #[test]
    fn test_pixel_rounding_is_stable() {
        let density = Density::from_dpi(300.0).unwrap();
        let length = Length::from_inches(2.48);
        let pixels = density.pixels(length);
        assert_eq!(pixels, 744);
        assert_eq!(density.pixels(density.length(pixels)), pixels);
    }

    #[test]
    fn test_pixel_rounding_half_up() {
        let density = Density::from_pixels_per_mm(1.0).unwrap();
        assert_eq!(density.pixels(Length::from_mm(2.5)), 3);
        assert_eq!(density.pixels(Length::from_mm(2.49)), 2);
    }

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(Position::from_mm(0.0, 0.0), Size::from_mm(10.0, 10.0));
        let b = Rect::new(Position::from_mm(5.0, 5.0), Size::from_mm(10.0, 10.0));
        let overlap = a.intersect(&b).unwrap();
        assert_eq!(overlap.size, Size::from_mm(5.0, 5.0));

        let c = Rect::new(Position::from_mm(20.0, 0.0), Size::from_mm(1.0, 1.0));
        assert!(a.intersect(&c).is_none());
    }
}
