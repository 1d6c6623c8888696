//! Common surface over the document writers

use std::path::{Path, PathBuf};

use proxy_core::{Config, PageImageTransform, RenderBackend, Size};

use crate::lopdf_backend::LoPdfDocument;
use crate::printpdf_backend::PrintPdfDocument;
use crate::raster_backend::RasterDocument;
use crate::types::{CrossData, GuideStyle, LineData, Result};

/// A multi-page document under construction.
///
/// Coordinates are in millimeters with the origin at the page's top-left
/// corner. Drawing is only valid between `next_page` and `finish_page`.
pub trait DocumentBackend {
    fn next_page(&mut self, size: Size) -> Result<()>;

    fn draw_dashed_line(&mut self, line: &LineData, style: &GuideStyle) -> Result<()>;

    fn draw_dashed_cross(&mut self, cross: &CrossData, style: &GuideStyle) -> Result<()> {
        for line in cross.lines(style.cross_length) {
            self.draw_dashed_line(&line, style)?;
        }
        Ok(())
    }

    /// Place an image file into `transform`'s rectangle, rotated and clipped
    fn draw_image(&mut self, path: &Path, transform: &PageImageTransform) -> Result<()>;

    fn finish_page(&mut self) -> Result<()>;

    /// Number of finished pages
    fn page_count(&self) -> usize;

    /// Write everything out; returns the path that was actually written
    fn write(self: Box<Self>, path: &Path) -> Result<PathBuf>;
}

/// Create an empty document for the configured backend
pub fn create_document(config: &Config, title: &str) -> Result<Box<dyn DocumentBackend>> {
    let document: Box<dyn DocumentBackend> = match config.backend {
        RenderBackend::PrintPdf => Box::new(PrintPdfDocument::new(title)),
        RenderBackend::LoPdf => Box::new(LoPdfDocument::new()),
        RenderBackend::Png => Box::new(RasterDocument::new(config.raster_density()?)),
    };
    Ok(document)
}

/// Output location for a document named `stem` in `dir`
pub fn output_path(dir: &Path, stem: &str, backend: RenderBackend) -> PathBuf {
    match backend {
        RenderBackend::Png => dir.join(stem),
        RenderBackend::PrintPdf | RenderBackend::LoPdf => dir.join(format!("{stem}.pdf")),
    }
}
