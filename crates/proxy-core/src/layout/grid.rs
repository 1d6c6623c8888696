//! Grid layout calculation
//!
//! This module handles how many cards fit on a page, where each cell lies and
//! how cells are mirrored on the back of a duplex sheet.

use crate::config::{Config, FIT_PAGE_SIZE};
use crate::project::ProjectData;
use crate::types::{FlipOn, Result, SizeClass};
use crate::units::{Length, Position, Rect, Size};

use super::{GridLayout, GridPosition, SheetSide};

/// Slack absorbing float error when a page fits its cards exactly
const FIT_TOLERANCE_MM: f32 = 1e-3;

// =============================================================================
// Grid Creation
// =============================================================================

/// Create the largest grid of `cell_size` cells that fits on the page.
///
/// A cell bigger than the page still yields a 1x1 grid, so a misconfigured
/// card is placed alone rather than rejected.
///
/// # Arguments
/// * `page_size` - Physical page size, orientation applied
/// * `cell_size` - The card's footprint including bleed
/// * `spacing` - Gap between neighboring cells
pub fn create_grid_layout(page_size: Size, cell_size: Size, spacing: Size) -> GridLayout {
    let fit = |page: Length, cell: Length, gap: Length| {
        let count = ((page + gap).mm() + FIT_TOLERANCE_MM) / (cell + gap).mm();
        (count.floor() as usize).max(1)
    };
    let cols = fit(page_size.width, cell_size.width, spacing.width);
    let rows = fit(page_size.height, cell_size.height, spacing.height);

    let mut grid = GridLayout {
        cols,
        rows,
        page_size,
        cell_size,
        spacing,
        origin: Position::ZERO,
    };
    let grid_size = grid.grid_size();
    grid.origin = Position::new(
        (page_size.width - grid_size.width) / 2.0,
        (page_size.height - grid_size.height) / 2.0,
    );
    grid
}

/// Grid for one size class of the project
pub fn grid_for(project: &ProjectData, page_size: Size, size_class: SizeClass) -> GridLayout {
    create_grid_layout(
        page_size,
        size_class.card_size_with_bleed(project.bleed_edge),
        project.spacing,
    )
}

/// Resolve the project's page size through the paper-size table.
///
/// The `Fit` size is exactly as large as the project's custom layout of
/// regular cards.
pub fn resolve_page_size(project: &ProjectData, config: &Config) -> Result<Size> {
    if project.page_size == FIT_PAGE_SIZE {
        let (cols, rows) = project.custom_layout;
        let cell = SizeClass::Regular.card_size_with_bleed(project.bleed_edge);
        return Ok(Size::new(
            cell.width * cols as f32 + project.spacing.width * cols.saturating_sub(1) as f32,
            cell.height * rows as f32 + project.spacing.height * rows.saturating_sub(1) as f32,
        ));
    }
    let size = config.paper_sizes.lookup(&project.page_size)?;
    Ok(project.orientation.apply(size))
}

// =============================================================================
// Cell Calculations
// =============================================================================

/// Grid position of a slot, mirrored on the back side.
///
/// Flipping a sheet on its left edge swaps columns, flipping it on its top
/// edge swaps rows.
pub fn grid_position(grid: &GridLayout, slot: usize, side: SheetSide, flip_on: FlipOn) -> GridPosition {
    let cols = grid.cols.max(1);
    let pos = GridPosition::new(slot / cols, slot % cols);
    match (side, flip_on) {
        (SheetSide::Front, _) => pos,
        (SheetSide::Back, FlipOn::LeftEdge) => GridPosition::new(pos.row, grid.cols - 1 - pos.col),
        (SheetSide::Back, FlipOn::TopEdge) => GridPosition::new(grid.rows - 1 - pos.row, pos.col),
    }
}

/// Calculate the bounds of a cell at the given grid position.
pub fn cell_bounds(grid: &GridLayout, pos: GridPosition) -> Rect {
    let x = grid.origin.x + (grid.cell_size.width + grid.spacing.width) * pos.col as f32;
    let y = grid.origin.y + (grid.cell_size.height + grid.spacing.height) * pos.row as f32;
    Rect::new(Position::new(x, y), grid.cell_size)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaperSize;

    fn card() -> Size {
        SizeClass::Regular.card_size_with_bleed(Length::ZERO)
    }

    #[test]
    fn test_letter_grid() {
        let grid = create_grid_layout(PaperSize::Letter.size(), card(), Size::ZERO);
        assert_eq!(grid.cols, 3);
        assert_eq!(grid.rows, 3);
        assert_eq!(grid.capacity(), 9);
        // Centered
        let size = grid.grid_size();
        let right_margin = grid.page_size.width - grid.origin.x - size.width;
        assert!((right_margin - grid.origin.x).mm().abs() < 1e-3);
    }

    #[test]
    fn test_spacing_reduces_capacity() {
        let page = Size::new(card().width * 3.0, card().height);
        let tight = create_grid_layout(page, card(), Size::ZERO);
        assert_eq!(tight.cols, 3);
        let spaced = create_grid_layout(page, card(), Size::from_mm(1.0, 1.0));
        assert_eq!(spaced.cols, 2);
    }

    #[test]
    fn test_oversized_cell_gets_single_slot() {
        let grid = create_grid_layout(Size::from_mm(50.0, 50.0), card(), Size::ZERO);
        assert_eq!(grid.capacity(), 1);
        assert!(grid.origin.x.is_negative());
    }

    #[test]
    fn test_grid_position_mirroring() {
        let grid = create_grid_layout(PaperSize::Letter.size(), card(), Size::ZERO);
        let front = grid_position(&grid, 1, SheetSide::Front, FlipOn::LeftEdge);
        assert_eq!(front, GridPosition::new(0, 1));
        let back = grid_position(&grid, 0, SheetSide::Back, FlipOn::LeftEdge);
        assert_eq!(back, GridPosition::new(0, 2));
        let back = grid_position(&grid, 0, SheetSide::Back, FlipOn::TopEdge);
        assert_eq!(back, GridPosition::new(2, 0));
    }

    #[test]
    fn test_cell_bounds() {
        let grid = create_grid_layout(PaperSize::Letter.size(), card(), Size::from_mm(2.0, 3.0));
        let first = cell_bounds(&grid, GridPosition::new(0, 0));
        let next = cell_bounds(&grid, GridPosition::new(1, 1));
        assert_eq!(first.position, grid.origin);
        assert!(((next.left() - first.right()).mm() - 2.0).abs() < 1e-4);
        assert!(((next.top() - first.bottom()).mm() - 3.0).abs() < 1e-4);
    }
}
