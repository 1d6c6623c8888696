use thiserror::Error;

use crate::constants::{
    CARD_CORNER_RADIUS_MM, CARD_HEIGHT_IN, CARD_WIDTH_IN, FULL_BLEED_IN,
    OVERSIZED_CARD_CORNER_RADIUS_MM, OVERSIZED_CARD_HEIGHT_IN, OVERSIZED_CARD_WIDTH_IN,
};
use crate::units::{Length, Size};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid density: {0} (must be strictly positive)")]
    InvalidDensity(f32),
    #[error("Negative bleed edge: {0}mm")]
    NegativeBleedEdge(f32),
    #[error("Unknown page size: {0}")]
    UnknownPageSize(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid color cube: {0}")]
    InvalidColorCube(String),
    #[error("Invalid preview cache: {0}")]
    CacheFormat(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Receives human-readable status messages during long operations
pub type PrintFn = std::sync::Arc<dyn Fn(&str) + Send + Sync>;

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Portrait: height > width (default for most paper sizes)
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

impl Orientation {
    /// Apply the orientation to a paper size given in portrait
    pub fn apply(self, size: Size) -> Size {
        let (short, long) = if size.width <= size.height {
            (size.width, size.height)
        } else {
            (size.height, size.width)
        };
        match self {
            Orientation::Portrait => Size::new(short, long),
            Orientation::Landscape => Size::new(long, short),
        }
    }
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    pub const STANDARD: [PaperSize; 6] = [
        PaperSize::Letter,
        PaperSize::Legal,
        PaperSize::Tabloid,
        PaperSize::A3,
        PaperSize::A4,
        PaperSize::A5,
    ];

    /// Get base dimensions (always portrait: width < height for standard sizes)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Tabloid => (279.4, 431.8),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    pub fn size(self) -> Size {
        let (width, height) = self.dimensions_mm();
        Size::from_mm(width, height)
    }

    pub fn name(self) -> &'static str {
        match self {
            PaperSize::A3 => "A3",
            PaperSize::A4 => "A4",
            PaperSize::A5 => "A5",
            PaperSize::Letter => "Letter",
            PaperSize::Legal => "Legal",
            PaperSize::Tabloid => "Tabloid",
            PaperSize::Custom { .. } => "Custom",
        }
    }
}

/// Clockwise rotation in quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }

    fn from_quarter_turns(turns: u16) -> Self {
        match turns % 4 {
            0 => Rotation::None,
            1 => Rotation::Clockwise90,
            2 => Rotation::Clockwise180,
            _ => Rotation::Clockwise270,
        }
    }

    /// This rotation followed by `other`
    pub fn then(self, other: Rotation) -> Rotation {
        Self::from_quarter_turns((self.degrees() + other.degrees()) / 90)
    }

    /// Whether the rotation swaps width and height
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::Clockwise270)
    }
}

/// How the bleed of a source image is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BleedType {
    /// Decide from the image's aspect ratio
    #[default]
    Infer,
    /// The image already includes the full bleed margin
    FullBleed,
    /// The image is trimmed, bleed is synthesized
    NoBleed,
}

/// What to do when an image's aspect ratio doesn't match a card's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BadAspectRatioHandling {
    #[default]
    Ignore,
    /// Pad with black until the ratio matches
    Expand,
    /// Resize non-uniformly to the expected ratio
    Stretch,
}

/// Edge along which duplex sheets are flipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlipOn {
    /// Long-edge binding on portrait sheets, columns mirror on the back
    #[default]
    LeftEdge,
    /// Rows mirror on the back
    TopEdge,
}

/// Physical card footprint class, each laid out on its own page stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizeClass {
    #[default]
    Regular,
    Oversized,
}

impl SizeClass {
    /// Trimmed card size
    pub fn card_size(self) -> Size {
        match self {
            SizeClass::Regular => Size::from_inches(CARD_WIDTH_IN, CARD_HEIGHT_IN),
            SizeClass::Oversized => {
                Size::from_inches(OVERSIZED_CARD_WIDTH_IN, OVERSIZED_CARD_HEIGHT_IN)
            }
        }
    }

    /// Radius of the rounded corners of a trimmed card
    pub fn corner_radius(self) -> Length {
        match self {
            SizeClass::Regular => Length::from_mm(CARD_CORNER_RADIUS_MM),
            SizeClass::Oversized => Length::from_mm(OVERSIZED_CARD_CORNER_RADIUS_MM),
        }
    }

    /// Card size including the full bleed margin on every side
    pub fn card_size_with_full_bleed(self) -> Size {
        self.card_size().grow(full_bleed())
    }

    /// Card size including `bleed_edge` on every side
    pub fn card_size_with_bleed(self, bleed_edge: Length) -> Size {
        self.card_size().grow(bleed_edge)
    }
}

/// Bleed margin of a full-bleed source image
pub fn full_bleed() -> Length {
    Length::from_inches(FULL_BLEED_IN)
}
