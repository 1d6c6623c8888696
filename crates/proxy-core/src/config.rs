//! Immutable configuration passed into every entry point

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_ASPECT_TOLERANCE, DEFAULT_MAX_DPI, DEFAULT_PREVIEW_WIDTH, DEFAULT_THUMBNAIL_WIDTH,
};
use crate::types::{CoreError, PaperSize, Result};
use crate::units::{Density, Size};

/// Name of the page size that fits the project's custom layout exactly
pub const FIT_PAGE_SIZE: &str = "Fit";

/// Document backend used to render pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderBackend {
    /// Vector PDF built from printpdf operations
    #[default]
    PrintPdf,
    /// Vector PDF with hand-built lopdf content streams
    LoPdf,
    /// One PNG per page
    Png,
}

/// Named paper sizes, always stored in portrait
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PaperSizes {
    sizes: BTreeMap<String, Size>,
}

impl Default for PaperSizes {
    fn default() -> Self {
        let sizes = PaperSize::STANDARD
            .iter()
            .map(|paper| (paper.name().to_string(), paper.size()))
            .collect();
        Self { sizes }
    }
}

impl PaperSizes {
    pub fn empty() -> Self {
        Self {
            sizes: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, size: Size) {
        self.sizes.insert(name.into(), size);
    }

    /// Look up a named size, an unknown name is a caller bug
    pub fn lookup(&self, name: &str) -> Result<Size> {
        self.sizes
            .get(name)
            .copied()
            .ok_or_else(|| CoreError::UnknownPageSize(name.to_string()))
    }
}

/// Configuration shared by the image pipeline, layout and rendering
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Cropped images are never stored above this resolution
    pub max_dpi: f32,
    pub backend: RenderBackend,
    pub paper_sizes: PaperSizes,
    /// Directory searched for color cube files
    pub cube_dir: PathBuf,
    /// Mirror the border when synthesizing bleed instead of replicating it
    pub fancy_uncrop: bool,
    pub thumbnail_width: u32,
    /// Width of the cropped and uncropped previews kept in the preview cache
    pub preview_width: u32,
    /// Allowed difference between an image's and a card's aspect ratio
    pub aspect_tolerance: f32,
    /// Resolution of pages rendered by the raster backend
    pub raster_dpi: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_dpi: DEFAULT_MAX_DPI,
            backend: RenderBackend::PrintPdf,
            paper_sizes: PaperSizes::default(),
            cube_dir: PathBuf::from("res/cubes"),
            fancy_uncrop: true,
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            aspect_tolerance: DEFAULT_ASPECT_TOLERANCE,
            raster_dpi: 300.0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        Density::from_dpi(self.max_dpi)?;
        Density::from_dpi(self.raster_dpi)?;
        if self.thumbnail_width == 0 || self.preview_width == 0 {
            return Err(CoreError::Config(
                "Preview and thumbnail widths must be greater than 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.aspect_tolerance) {
            return Err(CoreError::Config(format!(
                "Aspect ratio tolerance must be within [0, 1), got {}",
                self.aspect_tolerance
            )));
        }
        Ok(())
    }

    pub fn max_density(&self) -> Result<Density> {
        Density::from_dpi(self.max_dpi)
    }

    pub fn raster_density(&self) -> Result<Density> {
        Density::from_dpi(self.raster_dpi)
    }

    /// Path of a named color cube, `.cube` files take precedence over images
    pub fn cube_path(&self, name: &str) -> PathBuf {
        let cube = self.cube_dir.join(format!("{name}.cube"));
        if cube.exists() {
            cube
        } else {
            self.cube_dir.join(format!("{name}.png"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_sizes_lookup() {
        let sizes = PaperSizes::default();
        assert_eq!(sizes.lookup("A4").unwrap(), PaperSize::A4.size());
        assert!(matches!(
            sizes.lookup("Napkin"),
            Err(CoreError::UnknownPageSize(name)) if name == "Napkin"
        ));
    }

    #[test]
    fn test_config_validate() {
        assert!(Config::default().validate().is_ok());
        let config = Config {
            max_dpi: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidDensity(_))));
    }
}
