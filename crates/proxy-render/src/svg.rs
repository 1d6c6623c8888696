//! Exact cut paths for cutting machines
//!
//! The SVG covers the card grid of one page, measured in millimeters from the
//! grid's top-left corner. Every cell gets the trimmed card outline as a
//! rounded rectangle. With a bleed edge the outline of the whole grid is
//! added, so the sheet can be cut free before the cards.

use std::path::{Path, PathBuf};

use proxy_core::{GridLayout, Length, ProjectData, SizeClass};

use crate::types::Result;

const CUT_COLOR: &str = "#ff0000";
const STROKE_WIDTH_MM: f32 = 0.1;

/// SVG document with the cut outlines of `grid`
pub fn cut_guides_svg(grid: &GridLayout, bleed_edge: Length, corner_radius: Length) -> String {
    let size = grid.grid_size();
    let (width, height) = (size.width.mm(), size.height.mm());
    let card_width = grid.cell_size.width - bleed_edge * 2.0;
    let card_height = grid.cell_size.height - bleed_edge * 2.0;
    let radius = corner_radius.mm();

    let mut lines = vec![
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{width:.3}mm" height="{height:.3}mm" viewBox="0 0 {width:.3} {height:.3}">"#
        ),
        "  <title>Card cutting guides</title>".to_string(),
        format!(r#"  <g fill="none" stroke="{CUT_COLOR}" stroke-width="{STROKE_WIDTH_MM}">"#),
    ];
    if bleed_edge > Length::ZERO {
        lines.push(format!(
            r#"    <rect x="0.000" y="0.000" width="{width:.3}" height="{height:.3}"/>"#
        ));
    }
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let x = (grid.cell_size.width + grid.spacing.width) * col as f32 + bleed_edge;
            let y = (grid.cell_size.height + grid.spacing.height) * row as f32 + bleed_edge;
            lines.push(format!(
                r#"    <rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" rx="{radius:.3}" ry="{radius:.3}"/>"#,
                x.mm(),
                y.mm(),
                card_width.mm(),
                card_height.mm(),
            ));
        }
    }
    lines.push("  </g>".to_string());
    lines.push("</svg>\n".to_string());
    lines.join("\n")
}

/// Write the cut outlines of the regular card grid to `<output_dir>/<file_name>.svg`
pub fn write_cut_guides(grid: &GridLayout, project: &ProjectData, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}.svg", project.file_name));
    let svg = cut_guides_svg(
        grid,
        project.bleed_edge,
        SizeClass::Regular.corner_radius(),
    );
    std::fs::create_dir_all(output_dir)?;
    std::fs::write(&path, svg)?;
    log::info!("Wrote cut guides to {}", path.display());
    Ok(path)
}
