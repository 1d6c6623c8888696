//! Layout data types
//!
//! These types represent the result of laying out a project: pages of card
//! slots and, per slot, where and how its image is drawn.

use std::path::PathBuf;

use crate::types::{Rotation, SizeClass};
use crate::units::{Position, Rect, Size};

/// Which physical side of the printed sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetSide {
    /// Front of the sheet (printed first in duplex)
    Front,
    /// Back of the sheet (printed second in duplex)
    Back,
}

/// Position within the grid (row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    /// Row index (0 = top row)
    pub row: usize,
    /// Column index (0 = leftmost column)
    pub col: usize,
}

impl GridPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Grid of equally sized card cells, centered on a page
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    /// Number of columns in the card grid
    pub cols: usize,
    /// Number of rows in the card grid
    pub rows: usize,
    pub page_size: Size,
    /// Size of each cell, the card's bled footprint
    pub cell_size: Size,
    /// Gap between neighboring cells
    pub spacing: Size,
    /// Top-left corner of the first cell
    pub origin: Position,
}

impl GridLayout {
    /// Number of cards that fit on one page
    pub fn capacity(&self) -> usize {
        self.cols * self.rows
    }

    /// Total size covered by all cells and the gaps between them
    pub fn grid_size(&self) -> Size {
        Size::new(
            self.cell_size.width * self.cols as f32
                + self.spacing.width * self.cols.saturating_sub(1) as f32,
            self.cell_size.height * self.rows as f32
                + self.spacing.height * self.rows.saturating_sub(1) as f32,
        )
    }

    pub fn is_outer_left(&self, col: usize) -> bool {
        col == 0
    }

    pub fn is_outer_right(&self, col: usize) -> bool {
        col + 1 >= self.cols
    }

    pub fn is_outer_top(&self, row: usize) -> bool {
        row == 0
    }

    pub fn is_outer_bottom(&self, row: usize) -> bool {
        row + 1 >= self.rows
    }
}

/// An image placed into a page slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Image drawn in the slot, the card itself or its backside
    pub image: PathBuf,
    /// Index of the front card in the project's card list
    pub card_index: usize,
    /// Backside flips along the card's short edge
    pub backside_short_edge: bool,
}

/// One sheet side worth of slots, in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub size_class: SizeClass,
    /// Always as long as the grid's capacity, `None` slots stay blank
    pub slots: Vec<Option<PageImage>>,
}

impl Page {
    pub fn empty(size_class: SizeClass, capacity: usize) -> Self {
        Self {
            size_class,
            slots: vec![None; capacity],
        }
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied() == self.slots.len()
    }
}

/// Placement of the trimmed card, independent of any bleed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTransform {
    pub position: Position,
    pub size: Size,
}

impl CardTransform {
    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }
}

/// Everything a backend needs to draw one slot's image
#[derive(Debug, Clone, PartialEq)]
pub struct PageImageTransform {
    /// Top-left corner of the drawn image
    pub position: Position,
    /// Size of the drawn image, after rotation
    pub size: Size,
    /// Rotation applied to the stored image before drawing
    pub rotation: Rotation,
    /// Region the image is limited to, when it would spill into a neighbor
    pub clip_rect: Option<Rect>,
    pub card: CardTransform,
}

impl PageImageTransform {
    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }
}
