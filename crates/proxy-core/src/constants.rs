//! Shared constants for card preparation and layout
//!
//! This module centralizes the physical card dimensions and the magic numbers
//! used by the image pipeline, the layout engine and the preview cache.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Millimeters per inch
pub const MM_PER_INCH: f32 = 25.4;

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / MM_PER_INCH; // ≈ 2.83465

// =============================================================================
// Card Dimensions (inches)
// =============================================================================

/// Trimmed width of a standard card
pub const CARD_WIDTH_IN: f32 = 2.48;

/// Trimmed height of a standard card
pub const CARD_HEIGHT_IN: f32 = 3.46;

/// Trimmed width of an oversized card
pub const OVERSIZED_CARD_WIDTH_IN: f32 = 3.46;

/// Trimmed height of an oversized card
pub const OVERSIZED_CARD_HEIGHT_IN: f32 = 4.96;

/// Corner radius of a standard card
pub const CARD_CORNER_RADIUS_MM: f32 = 2.5;

/// Corner radius of an oversized card
pub const OVERSIZED_CARD_CORNER_RADIUS_MM: f32 = 5.0;

/// Bleed margin carried by a full-bleed source image on each side
pub const FULL_BLEED_IN: f32 = 0.12;

// =============================================================================
// Image Pipeline
// =============================================================================

/// Default resolution cap for cropped images (dots per inch)
pub const DEFAULT_MAX_DPI: f32 = 1200.0;

/// Default width of preview thumbnails in pixels
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 124;

/// Default width of cached card previews in pixels
pub const DEFAULT_PREVIEW_WIDTH: u32 = 496;

/// Default tolerance when comparing an image's aspect ratio to a card's
pub const DEFAULT_ASPECT_TOLERANCE: f32 = 0.05;

/// File name of the default backside image
pub const DEFAULT_BACKSIDE_NAME: &str = "__back.png";

/// Default pattern for automatically assigned backsides, `$` is the card stem
pub const DEFAULT_BACKSIDE_PATTERN: &str = "__back_$";

// =============================================================================
// Guides
// =============================================================================

/// Default thickness of cutting guides (points)
pub const GUIDE_THICKNESS_PT: f32 = 1.0;

/// Default length of corner guide crosses (mm)
pub const GUIDE_CROSS_LENGTH_MM: f32 = 1.5;

/// Offset of extended guides beyond the card corners (mm)
pub const EXTENDED_GUIDE_OFFSET_MM: f32 = 1.0;

// =============================================================================
// Preview Cache
// =============================================================================

/// Format marker written at the start of every preview cache file
pub const PREVIEW_CACHE_MAGIC: [u8; 8] = *b"PXPCv003";

/// Name of the preview cache file inside the crop directory
pub const PREVIEW_CACHE_FILE_NAME: &str = "preview.cache";
