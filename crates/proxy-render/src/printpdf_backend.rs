use std::collections::HashMap;
use std::path::{Path, PathBuf};

use printpdf::{
    Color as PdfColor, Line, LineDashPattern, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage,
    PdfSaveOptions, Point, Polygon, PolygonRing, Pt, RawImage, Rgb, WindingOrder, XObjectId,
    XObjectTransform,
};
use proxy_core::pipeline::Image;
use proxy_core::{Color, PageImageTransform, PixelSize, Position, Rect, Rotation, Size};

use crate::backend::DocumentBackend;
use crate::types::{GuideStyle, LineData, RenderError, Result};

/// Vector PDF assembled from printpdf operations
pub struct PrintPdfDocument {
    doc: PdfDocument,
    page: Option<PageOps>,
    /// Each source is embedded once per rotation
    images: HashMap<(PathBuf, Rotation), (XObjectId, PixelSize)>,
}

struct PageOps {
    size: Size,
    ops: Vec<Op>,
}

impl PageOps {
    /// PDF point from a top-left origin position
    fn point(&self, position: Position) -> Point {
        Point {
            x: Pt(position.x.points()),
            y: Pt((self.size.height - position.y).points()),
        }
    }

    fn line_points(&self, line: &LineData) -> Vec<LinePoint> {
        vec![
            LinePoint {
                p: self.point(line.from),
                bezier: false,
            },
            LinePoint {
                p: self.point(line.to),
                bezier: false,
            },
        ]
    }

    fn clip_to(&mut self, rect: &Rect) {
        let corners = [
            Position::new(rect.left(), rect.top()),
            Position::new(rect.right(), rect.top()),
            Position::new(rect.right(), rect.bottom()),
            Position::new(rect.left(), rect.bottom()),
        ];
        let points = corners
            .into_iter()
            .map(|corner| LinePoint {
                p: self.point(corner),
                bezier: false,
            })
            .collect();
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing { points }],
                mode: PaintMode::Clip,
                winding_order: WindingOrder::NonZero,
            },
        });
    }
}

fn pdf_color(color: Color) -> PdfColor {
    PdfColor::Rgb(Rgb::new(
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
        None,
    ))
}

impl PrintPdfDocument {
    pub fn new(title: &str) -> Self {
        Self {
            doc: PdfDocument::new(title),
            page: None,
            images: HashMap::new(),
        }
    }

    fn embed(&mut self, path: &Path, rotation: Rotation) -> Result<(XObjectId, PixelSize)> {
        let key = (path.to_path_buf(), rotation);
        if let Some(embedded) = self.images.get(&key) {
            return Ok(embedded.clone());
        }

        let image = Image::open(path)?.rotate(rotation);
        let bytes = image.encode_png()?;
        let mut warnings = Vec::new();
        let raw = RawImage::decode_from_bytes(&bytes, &mut warnings).map_err(RenderError::Pdf)?;
        let id = self.doc.add_image(&raw);

        log::debug!("Embedded {} ({:?})", path.display(), rotation);
        let embedded = (id, image.pixel_size());
        self.images.insert(key, embedded.clone());
        Ok(embedded)
    }
}

impl DocumentBackend for PrintPdfDocument {
    fn next_page(&mut self, size: Size) -> Result<()> {
        if self.page.is_some() {
            self.finish_page()?;
        }
        self.page = Some(PageOps {
            size,
            ops: Vec::new(),
        });
        Ok(())
    }

    fn draw_dashed_line(&mut self, line: &LineData, style: &GuideStyle) -> Result<()> {
        let page = self.page.as_mut().ok_or(RenderError::NoPage)?;
        let dash = style.dash.points().round().max(1.0) as i64;

        page.ops.push(Op::SaveGraphicsState);
        page.ops.push(Op::SetOutlineThickness {
            pt: Pt(style.thickness.points()),
        });
        page.ops.push(Op::SetOutlineColor {
            col: pdf_color(style.color_a),
        });
        page.ops.push(Op::DrawLine {
            line: Line {
                points: page.line_points(line),
                is_closed: false,
            },
        });
        page.ops.push(Op::SetOutlineColor {
            col: pdf_color(style.color_b),
        });
        page.ops.push(Op::SetLineDashPattern {
            dash: LineDashPattern {
                offset: 0,
                dash_1: Some(dash),
                gap_1: Some(dash),
                ..Default::default()
            },
        });
        page.ops.push(Op::DrawLine {
            line: Line {
                points: page.line_points(line),
                is_closed: false,
            },
        });
        page.ops.push(Op::RestoreGraphicsState);
        Ok(())
    }

    fn draw_image(&mut self, path: &Path, transform: &PageImageTransform) -> Result<()> {
        if self.page.is_none() {
            return Err(RenderError::NoPage);
        }
        let (id, pixels) = self.embed(path, transform.rotation)?;
        let page = self.page.as_mut().ok_or(RenderError::NoPage)?;

        let rect = transform.rect();
        let bottom_left = page.point(Position::new(rect.left(), rect.bottom()));

        page.ops.push(Op::SaveGraphicsState);
        if let Some(clip) = &transform.clip_rect {
            page.clip_to(clip);
        }
        // At 72 dpi one pixel is one point
        page.ops.push(Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(bottom_left.x),
                translate_y: Some(bottom_left.y),
                scale_x: Some(rect.size.width.points() / pixels.width as f32),
                scale_y: Some(rect.size.height.points() / pixels.height as f32),
                dpi: Some(72.0),
                ..Default::default()
            },
        });
        page.ops.push(Op::RestoreGraphicsState);
        Ok(())
    }

    fn finish_page(&mut self) -> Result<()> {
        let page = self.page.take().ok_or(RenderError::NoPage)?;
        self.doc.pages.push(PdfPage::new(
            Mm(page.size.width.mm()),
            Mm(page.size.height.mm()),
            page.ops,
        ));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.doc.pages.len()
    }

    fn write(mut self: Box<Self>, path: &Path) -> Result<PathBuf> {
        if self.page.is_some() {
            self.finish_page()?;
        }
        let mut warnings = Vec::new();
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            log::debug!("{} warnings while saving {}", warnings.len(), path.display());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_core::Length;

    #[test]
    fn test_points_flip_to_bottom_left_origin() {
        let page = PageOps {
            size: Size::from_mm(100.0, 200.0),
            ops: Vec::new(),
        };
        let point = page.point(Position::from_mm(0.0, 50.0));
        let expected = Length::from_mm(150.0).points();
        assert!((point.y.0 - expected).abs() < 1e-3);
    }

    #[test]
    fn test_drawing_requires_a_page() {
        let mut doc = PrintPdfDocument::new("test");
        let line = LineData::new(Position::ZERO, Position::from_mm(1.0, 0.0));
        assert!(matches!(
            doc.draw_dashed_line(&line, &GuideStyle::default()),
            Err(RenderError::NoPage)
        ));
    }
}
