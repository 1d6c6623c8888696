//! Per-slot placement of card images on a page

use crate::project::ProjectData;
use crate::types::Rotation;
use crate::units::{Length, Position, Rect, Size};

use super::{
    CardTransform, GridLayout, GridPosition, Page, PageImageTransform, SheetSide, cell_bounds,
    grid_position,
};

/// Compute the transform of every occupied slot of `page`.
///
/// The result has one entry per slot, `None` for empty slots. On the back
/// side positions are mirrored according to the project's flip edge and
/// shifted by the backside offset. Short-edge backsides are additionally
/// turned upside down.
pub fn compute_transforms(
    grid: &GridLayout,
    page: &Page,
    side: SheetSide,
    project: &ProjectData,
) -> Vec<Option<PageImageTransform>> {
    page.slots
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let slot = slot.as_ref()?;
            let rotation = match side {
                SheetSide::Front => project.cards.get(slot.card_index)?.rotation,
                SheetSide::Back => {
                    let base = project
                        .card(&slot.image)
                        .map(|card| card.rotation)
                        .unwrap_or_default();
                    if slot.backside_short_edge {
                        base.then(Rotation::Clockwise180)
                    } else {
                        base
                    }
                }
            };
            Some(slot_transform(grid, index, side, rotation, project))
        })
        .collect()
}

/// Transform of a single slot, independent of what occupies it
pub fn slot_transform(
    grid: &GridLayout,
    slot: usize,
    side: SheetSide,
    rotation: Rotation,
    project: &ProjectData,
) -> PageImageTransform {
    let pos = grid_position(grid, slot, side, project.flip_on);
    let cell = cell_bounds(grid, pos);
    let offset = match side {
        SheetSide::Front => Position::ZERO,
        SheetSide::Back => project.backside_offset,
    };

    let envelope = project.envelope_bleed_edge;
    let drawn = cell.expand(envelope, envelope, envelope, envelope);
    let clip_rect = envelope_clip(grid, pos, &cell, envelope);

    let card_size = Size::new(
        cell.size.width - project.bleed_edge * 2.0,
        cell.size.height - project.bleed_edge * 2.0,
    );
    let card = CardTransform {
        position: cell.position + Position::new(project.bleed_edge, project.bleed_edge) + offset,
        size: card_size,
    };

    PageImageTransform {
        position: drawn.position + offset,
        size: drawn.size,
        rotation,
        clip_rect: clip_rect.map(|clip| Rect::new(clip.position + offset, clip.size)),
        card,
    }
}

/// Clip region keeping an envelope bleed out of neighboring cells.
///
/// Toward a neighbor the envelope may grow at most half the spacing, toward
/// the page edge it is unrestricted. Returns `None` when nothing is clipped.
fn envelope_clip(grid: &GridLayout, pos: GridPosition, cell: &Rect, envelope: Length) -> Option<Rect> {
    if envelope <= Length::ZERO {
        return None;
    }
    let limit = |outer: bool, gap: Length| {
        if outer { envelope } else { envelope.min(gap / 2.0) }
    };
    let left = limit(grid.is_outer_left(pos.col), grid.spacing.width);
    let right = limit(grid.is_outer_right(pos.col), grid.spacing.width);
    let top = limit(grid.is_outer_top(pos.row), grid.spacing.height);
    let bottom = limit(grid.is_outer_bottom(pos.row), grid.spacing.height);

    if [left, right, top, bottom].iter().all(|edge| *edge >= envelope) {
        return None;
    }
    Some(cell.expand(left, top, right, bottom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardInfo;
    use crate::layout::{create_grid_layout, distribute_cards};
    use crate::types::{PaperSize, SizeClass};

    fn project_with(cards: Vec<CardInfo>) -> ProjectData {
        ProjectData {
            cards,
            backside_enabled: true,
            ..Default::default()
        }
    }

    fn letter_grid(project: &ProjectData) -> GridLayout {
        create_grid_layout(
            PaperSize::Letter.size(),
            SizeClass::Regular.card_size_with_bleed(project.bleed_edge),
            project.spacing,
        )
    }

    #[test]
    fn test_card_transform_excludes_bleed() {
        let mut project = project_with(vec![CardInfo::new("a.png")]);
        project.bleed_edge = Length::from_mm(2.0);
        let grid = letter_grid(&project);
        let transform = slot_transform(&grid, 0, SheetSide::Front, Rotation::None, &project);

        assert_eq!(transform.position, grid.origin);
        assert_eq!(transform.size, grid.cell_size);
        assert!(transform.clip_rect.is_none());
        let trimmed = SizeClass::Regular.card_size();
        assert!((transform.card.size.width - trimmed.width).mm().abs() < 1e-3);
        assert!(((transform.card.position.x - grid.origin.x).mm() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_envelope_is_clipped_between_neighbors() {
        let mut project = project_with(vec![CardInfo::new("a.png")]);
        project.envelope_bleed_edge = Length::from_mm(2.0);
        project.spacing = Size::from_mm(1.0, 1.0);
        let grid = letter_grid(&project);

        // Top-left cell: outer on the left and top, neighbors right and below
        let transform = slot_transform(&grid, 0, SheetSide::Front, Rotation::None, &project);
        let cell = cell_bounds(&grid, GridPosition::new(0, 0));
        let clip = transform.clip_rect.unwrap();
        assert!(((cell.left() - clip.left()).mm() - 2.0).abs() < 1e-4);
        assert!(((clip.right() - cell.right()).mm() - 0.5).abs() < 1e-4);
        assert!(((clip.bottom() - cell.bottom()).mm() - 0.5).abs() < 1e-4);
        assert!(((transform.size.width - cell.size.width).mm() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_backside_offset_and_rotation() {
        let mut front = CardInfo::new("a.png").with_backside("b.png");
        front.backside_short_edge = true;
        let mut project = project_with(vec![front, CardInfo::new("c.png")]);
        project.backside_offset = Position::from_mm(1.0, -0.5);
        let grid = letter_grid(&project);

        let pages = distribute_cards(&project, grid.capacity(), 1);
        let backs = crate::layout::make_backside_pages(&project, &pages);
        let transforms = compute_transforms(&grid, &backs[0], SheetSide::Back, &project);

        let first = transforms[0].as_ref().unwrap();
        let mirrored = cell_bounds(&grid, GridPosition::new(0, grid.cols - 1));
        assert_eq!(first.rotation, Rotation::Clockwise180);
        assert!(((first.position.x - mirrored.left()).mm() - 1.0).abs() < 1e-4);
        assert!(((first.position.y - mirrored.top()).mm() + 0.5).abs() < 1e-4);
        assert!(transforms[2].is_none());
    }
}
