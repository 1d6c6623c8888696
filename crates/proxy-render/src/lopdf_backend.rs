//! PDF output with hand-written content streams
//!
//! Images are embedded as DeviceRGB XObjects composited onto white, so the
//! file needs no soft masks. Guides and clips are plain path operators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use proxy_core::pipeline::Image;
use proxy_core::{Color, PageImageTransform, PixelSize, Position, Rect, Rotation, Size};

use crate::backend::DocumentBackend;
use crate::types::{GuideStyle, LineData, RenderError, Result};

pub struct LoPdfDocument {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    page: Option<PageContent>,
    images: HashMap<(PathBuf, Rotation), (ObjectId, PixelSize)>,
}

struct PageContent {
    size: Size,
    content_ops: Vec<String>,
    xobjects: Dictionary,
}

impl PageContent {
    /// PDF coordinates of a top-left origin position, in points
    fn point(&self, position: Position) -> (f32, f32) {
        (
            position.x.points(),
            (self.size.height - position.y).points(),
        )
    }

    /// `x y w h` of a rectangle in PDF space
    fn rect(&self, rect: &Rect) -> (f32, f32, f32, f32) {
        let (x, y) = self.point(Position::new(rect.left(), rect.bottom()));
        (x, y, rect.size.width.points(), rect.size.height.points())
    }
}

impl LoPdfDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            page: None,
            images: HashMap::new(),
        }
    }

    fn embed(&mut self, path: &Path, rotation: Rotation) -> Result<(ObjectId, PixelSize)> {
        let key = (path.to_path_buf(), rotation);
        if let Some(embedded) = self.images.get(&key) {
            return Ok(*embedded);
        }

        let image = Image::open(path)?.rotate(rotation);
        let pixels = image.pixel_size();
        let stream = image_stream(&image);
        let id = self.doc.add_object(stream);

        log::debug!("Embedded {} ({:?})", path.display(), rotation);
        self.images.insert(key, (id, pixels));
        Ok((id, pixels))
    }
}

impl Default for LoPdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBackend for LoPdfDocument {
    fn next_page(&mut self, size: Size) -> Result<()> {
        if self.page.is_some() {
            self.finish_page()?;
        }
        self.page = Some(PageContent {
            size,
            content_ops: Vec::new(),
            xobjects: Dictionary::new(),
        });
        Ok(())
    }

    fn draw_dashed_line(&mut self, line: &LineData, style: &GuideStyle) -> Result<()> {
        let page = self.page.as_mut().ok_or(RenderError::NoPage)?;
        let (x1, y1) = page.point(line.from);
        let (x2, y2) = page.point(line.to);
        let dash = style.dash.points();

        page.content_ops.push(format!(
            "q {} w {} RG {} {} m {} {} l S {} RG [{} {}] 0 d {} {} m {} {} l S Q\n",
            style.thickness.points(),
            stroke_color(style.color_a),
            x1,
            y1,
            x2,
            y2,
            stroke_color(style.color_b),
            dash,
            dash,
            x1,
            y1,
            x2,
            y2
        ));
        Ok(())
    }

    fn draw_image(&mut self, path: &Path, transform: &PageImageTransform) -> Result<()> {
        if self.page.is_none() {
            return Err(RenderError::NoPage);
        }
        let (image_id, _) = self.embed(path, transform.rotation)?;
        let page = self.page.as_mut().ok_or(RenderError::NoPage)?;

        let name = format!("Im{}", page.xobjects.len());
        page.xobjects
            .set(name.as_bytes(), Object::Reference(image_id));

        let mut ops = String::from("q ");
        if let Some(clip) = &transform.clip_rect {
            let (x, y, w, h) = page.rect(clip);
            ops.push_str(&format!("{} {} {} {} re W n ", x, y, w, h));
        }
        // Image space is the unit square
        let (x, y, w, h) = page.rect(&transform.rect());
        ops.push_str(&format!("{} 0 0 {} {} {} cm /{} Do Q\n", w, h, x, y, name));
        page.content_ops.push(ops);
        Ok(())
    }

    fn finish_page(&mut self) -> Result<()> {
        let page = self.page.take().ok_or(RenderError::NoPage)?;

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.size.width.points()),
                Object::Real(page.size.height.points()),
            ]),
        );

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(page.xobjects));

        let content = page.content_ops.join("");
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));

        let page_id = self.doc.add_object(page_dict);
        self.page_ids.push(page_id);
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn write(mut self: Box<Self>, path: &Path) -> Result<PathBuf> {
        if self.page.is_some() {
            self.finish_page()?;
        }

        let page_refs: Vec<Object> = self
            .page_ids
            .iter()
            .map(|id| Object::Reference(*id))
            .collect();
        let count = page_refs.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(page_refs)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut writer = Vec::new();
        self.doc.save_to(&mut writer)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, writer)?;
        Ok(path.to_path_buf())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn stroke_color(color: Color) -> String {
    format!(
        "{} {} {}",
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0
    )
}

/// DeviceRGB image XObject, transparency flattened onto white
fn image_stream(image: &Image) -> Stream {
    let rgba = image.as_rgba();
    let mut data = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        for channel in [r, g, b] {
            data.push(((channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8);
        }
    }

    let dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(image.width() as i64)),
        ("Height", Object::Integer(image.height() as i64)),
        ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ]);
    Stream::new(dict, data)
}
