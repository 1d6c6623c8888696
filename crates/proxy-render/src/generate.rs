//! Drives a layout through a document backend
//!
//! Front pages and their backsides are rendered in sequence, either into one
//! document or into two. Problems with individual cards only blank their
//! slot. A document that can't be rendered or written produces no path.
//! Exact cut guides are written next to the documents when requested.

use std::path::{Path, PathBuf};

use proxy_core::{Config, Layout, Page, PrintFn, ProjectData, SheetSide, Size, cropped_image_path};

use crate::backend::{DocumentBackend, create_document, output_path};
use crate::guides::{corner_crosses, extended_guide_offset, extended_guides};
use crate::svg::write_cut_guides;
use crate::types::{GuideStyle, RenderError, Result};

/// Paths of the written documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutput {
    pub front: Option<PathBuf>,
    /// Only set when backsides go to their own document
    pub back: Option<PathBuf>,
    /// SVG cut outlines, only set when requested by the project
    pub cut_guides: Option<PathBuf>,
}

/// Render the project into `output_dir`.
///
/// Errors are returned for invalid projects or configuration. Failures while
/// rendering or writing a document are reported through `progress` and leave
/// that document's path unset.
pub fn generate_documents(
    project: &ProjectData,
    config: &Config,
    output_dir: &Path,
    progress: &dyn Fn(&str),
) -> Result<GenerationOutput> {
    config.validate()?;
    let layout = Layout::compute(project, config)?;

    let separate_backsides = project.backside_enabled && project.separate_backsides;
    let mut front = Some(create_document(config, &project.file_name)?);
    let mut back = if separate_backsides {
        Some(create_document(
            config,
            &format!("{}_backside", project.file_name),
        )?)
    } else {
        None
    };

    for (index, page) in layout.front_pages.iter().enumerate() {
        if let Some(doc) = front.as_deref_mut() {
            let rendered = render_page(doc, &layout, page, SheetSide::Front, index, project, progress);
            if let Err(err) = rendered {
                report(progress, "front", &err);
                front = None;
            }
        }

        if !project.backside_enabled {
            continue;
        }
        let Some(back_page) = layout.back_pages.get(index) else {
            continue;
        };
        let target = if separate_backsides {
            &mut back
        } else {
            &mut front
        };
        if let Some(doc) = target.as_deref_mut() {
            let rendered =
                render_page(doc, &layout, back_page, SheetSide::Back, index, project, progress);
            if let Err(err) = rendered {
                report(progress, "backside", &err);
                *target = None;
            }
        }
    }

    let front_path = output_path(output_dir, &project.file_name, config.backend);
    let back_path = output_path(
        output_dir,
        &format!("{}_backside", project.file_name),
        config.backend,
    );
    let cut_guides = if project.export_exact_guides {
        match write_cut_guides(&layout.regular_grid, project, output_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                report(progress, "cut guides", &err);
                None
            }
        }
    } else {
        None
    };
    Ok(GenerationOutput {
        front: front.and_then(|doc| finish(doc, layout.page_size, &front_path, progress)),
        back: back.and_then(|doc| finish(doc, layout.page_size, &back_path, progress)),
        cut_guides,
    })
}

/// Run [`generate_documents`] on the blocking pool
pub async fn generate(
    project: ProjectData,
    config: Config,
    output_dir: PathBuf,
    progress: PrintFn,
) -> Result<GenerationOutput> {
    tokio::task::spawn_blocking(move || {
        generate_documents(&project, &config, &output_dir, &|message: &str| progress(message))
    })
    .await?
}

// =============================================================================
// Helper Functions
// =============================================================================

fn render_page(
    doc: &mut dyn DocumentBackend,
    layout: &Layout,
    page: &Page,
    side: SheetSide,
    page_index: usize,
    project: &ProjectData,
    progress: &dyn Fn(&str),
) -> Result<()> {
    doc.next_page(layout.page_size)?;

    let transforms = layout.transforms(page, side, project);
    let mut cards = Vec::new();
    for (slot, (image, transform)) in page.slots.iter().zip(&transforms).enumerate() {
        let (Some(image), Some(transform)) = (image, transform) else {
            continue;
        };
        cards.push(transform.card);

        progress(&format!(
            "Rendering {}page {}...\nImage number {} - {}",
            if side == SheetSide::Back { "backside for " } else { "" },
            page_index + 1,
            slot + 1,
            image.image.display()
        ));

        let path = cropped_image_path(project, &image.image);
        if !path.exists() {
            log::warn!("Missing cropped image {}", path.display());
            progress(&format!("Missing image {}, leaving slot blank", image.image.display()));
            continue;
        }
        if let Err(err) = doc.draw_image(&path, transform) {
            log::warn!("Failed to draw {}: {}", path.display(), err);
            progress(&format!("Failed to draw {}: {}", image.image.display(), err));
        }
    }

    let guides = &project.guides;
    if guides.enabled && (side == SheetSide::Front || guides.on_backsides) {
        let style = GuideStyle::from_options(guides);
        for card in &cards {
            for cross in corner_crosses(card) {
                doc.draw_dashed_cross(&cross, &style)?;
            }
        }
        if guides.extended {
            let offset = extended_guide_offset(project.bleed_edge, project.envelope_bleed_edge);
            for line in extended_guides(&cards, layout.page_size, offset) {
                doc.draw_dashed_line(&line, &style)?;
            }
        }
    }

    doc.finish_page()
}

/// Write a document, adding a blank page if nothing was rendered
fn finish(
    mut doc: Box<dyn DocumentBackend>,
    page_size: Size,
    path: &Path,
    progress: &dyn Fn(&str),
) -> Option<PathBuf> {
    if doc.page_count() == 0 {
        let blank = doc.next_page(page_size).and_then(|()| doc.finish_page());
        if let Err(err) = blank {
            report(progress, "blank", &err);
            return None;
        }
    }

    match doc.write(path) {
        Ok(written) => {
            log::info!("Wrote {}", written.display());
            progress(&format!("Wrote {}", written.display()));
            Some(written)
        }
        Err(err) => {
            log::error!("Failed to write {}: {}", path.display(), err);
            progress(&format!("Failed to write {}: {}", path.display(), err));
            None
        }
    }
}

fn report(progress: &dyn Fn(&str), document: &str, err: &RenderError) {
    log::error!("Failed to render {} document: {}", document, err);
    progress(&format!("Failed to render {} document: {}", document, err));
}
