//! One PNG per page, rendered at a fixed density

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage, imageops};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as ImageRect;
use proxy_core::pipeline::Image;
use proxy_core::{Color, Density, Length, PageImageTransform, PixelSize, Rect, Rotation, Size};

use crate::backend::DocumentBackend;
use crate::types::{GuideStyle, LineData, RenderError, Result};

pub struct RasterDocument {
    density: Density,
    pages: Vec<RgbaImage>,
    page: Option<RgbaImage>,
    /// Decoded and resized sources, shared by every page
    images: HashMap<(PathBuf, PixelSize, Rotation), Image>,
}

impl RasterDocument {
    pub fn new(density: Density) -> Self {
        Self {
            density,
            pages: Vec::new(),
            page: None,
            images: HashMap::new(),
        }
    }

    /// Finished pages
    pub fn pages(&self) -> &[RgbaImage] {
        &self.pages
    }

    /// Signed pixel offset; layouts may place bleed off the page
    fn offset(&self, length: Length) -> i64 {
        (length.mm() * self.density.pixels_per_mm()).round() as i64
    }

    fn pixel_rect(&self, rect: &Rect) -> (i64, i64, i64, i64) {
        (
            self.offset(rect.left()),
            self.offset(rect.top()),
            self.offset(rect.right()),
            self.offset(rect.bottom()),
        )
    }

    fn prepared(&mut self, path: &Path, size: PixelSize, rotation: Rotation) -> Result<&Image> {
        let image = match self.images.entry((path.to_path_buf(), size, rotation)) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Image::open(path)?.rotate(rotation).resize(size)),
        };
        Ok(image)
    }
}

impl DocumentBackend for RasterDocument {
    fn next_page(&mut self, size: Size) -> Result<()> {
        if self.page.is_some() {
            self.finish_page()?;
        }
        let pixels = self.density.pixel_size(size);
        self.page = Some(RgbaImage::from_pixel(
            pixels.width.max(1),
            pixels.height.max(1),
            Rgba([255, 255, 255, 255]),
        ));
        Ok(())
    }

    /// Dashes alternate between both guide colors, starting with `color_a`
    fn draw_dashed_line(&mut self, line: &LineData, style: &GuideStyle) -> Result<()> {
        let (x1, y1) = (self.offset(line.from.x) as f32, self.offset(line.from.y) as f32);
        let (x2, y2) = (self.offset(line.to.x) as f32, self.offset(line.to.y) as f32);
        let thickness = self.offset(style.thickness).max(1) as u32;
        let dash = self.offset(style.dash).max(1) as f32;
        let page = self.page.as_mut().ok_or(RenderError::NoPage)?;

        let length = (x2 - x1).hypot(y2 - y1);
        let dashes = (length / dash).ceil().max(1.0) as u32;
        let at = |distance: f32| {
            let t = if length > 0.0 { distance / length } else { 0.0 };
            (x1 + (x2 - x1) * t, y1 + (y2 - y1) * t)
        };
        for index in 0..dashes {
            let start = at(index as f32 * dash);
            let end = at(((index + 1) as f32 * dash).min(length));
            let color = if index % 2 == 0 { style.color_a } else { style.color_b };
            stroke(page, start, end, thickness, color);
        }
        Ok(())
    }

    fn draw_image(&mut self, path: &Path, transform: &PageImageTransform) -> Result<()> {
        if self.page.is_none() {
            return Err(RenderError::NoPage);
        }
        let (left, top, right, bottom) = self.pixel_rect(&transform.rect());
        let (mut x0, mut y0, mut x1, mut y1) = (left, top, right, bottom);
        if let Some(clip) = &transform.clip_rect {
            let (cl, ct, cr, cb) = self.pixel_rect(clip);
            x0 = x0.max(cl);
            y0 = y0.max(ct);
            x1 = x1.min(cr);
            y1 = y1.min(cb);
        }
        if right <= left || bottom <= top || x1 <= x0 || y1 <= y0 {
            return Ok(());
        }

        let size = PixelSize::new((right - left) as u32, (bottom - top) as u32);
        let image = self.prepared(path, size, transform.rotation)?;
        let visible = imageops::crop_imm(
            image.as_rgba(),
            (x0 - left) as u32,
            (y0 - top) as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        )
        .to_image();

        let page = self.page.as_mut().ok_or(RenderError::NoPage)?;
        imageops::overlay(page, &visible, x0, y0);
        Ok(())
    }

    fn finish_page(&mut self) -> Result<()> {
        let page = self.page.take().ok_or(RenderError::NoPage)?;
        self.pages.push(page);
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages go to `<path>/<n>.png`, numbered from 1
    fn write(mut self: Box<Self>, path: &Path) -> Result<PathBuf> {
        if self.page.is_some() {
            self.finish_page()?;
        }
        std::fs::create_dir_all(path)?;
        for (index, page) in self.pages.into_iter().enumerate() {
            Image::from(page).save(&path.join(format!("{}.png", index + 1)))?;
        }
        Ok(path.to_path_buf())
    }
}

/// Draw a segment `thickness` pixels wide, centered on the line.
///
/// Guides are axis aligned and become filled rectangles, anything else is
/// stroked with parallel one pixel lines.
fn stroke(page: &mut RgbaImage, from: (f32, f32), to: (f32, f32), thickness: u32, color: Color) {
    let pixel = Rgba([color.r, color.g, color.b, 255]);
    let half = (thickness / 2) as f32;
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    if dx.abs() < f32::EPSILON || dy.abs() < f32::EPSILON {
        let left = from.0.min(to.0);
        let top = from.1.min(to.1);
        let rect = if dy.abs() < f32::EPSILON {
            ImageRect::at(left.round() as i32, (top - half).round() as i32)
                .of_size((dx.abs().round() as u32).max(1), thickness)
        } else {
            ImageRect::at((left - half).round() as i32, top.round() as i32)
                .of_size(thickness, (dy.abs().round() as u32).max(1))
        };
        draw_filled_rect_mut(page, rect, pixel);
        return;
    }
    let length = dx.hypot(dy);
    let (nx, ny) = (-dy / length, dx / length);
    for step in 0..thickness {
        let shift = step as f32 - half;
        draw_line_segment_mut(
            page,
            (from.0 + nx * shift, from.1 + ny * shift),
            (to.0 + nx * shift, to.1 + ny * shift),
            pixel,
        );
    }
}
