//! Page layout engine
//!
//! This module turns a project into pages of card slots:
//! - Grid layout (how many cards fit, where each cell lies)
//! - Distribution (which card goes into which slot, backside matching)
//! - Transforms (where and how each slot's image is drawn)

mod distribute;
mod grid;
mod transform;
mod types;

pub use distribute::*;
pub use grid::*;
pub use transform::*;
pub use types::*;

use crate::config::Config;
use crate::project::ProjectData;
use crate::types::{Result, SizeClass};
use crate::units::Size;

/// Pages of a project, computed fresh for every request
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub page_size: Size,
    pub regular_grid: GridLayout,
    pub oversized_grid: GridLayout,
    pub front_pages: Vec<Page>,
    /// Same length as `front_pages` when backsides are enabled, else empty
    pub back_pages: Vec<Page>,
}

impl Layout {
    pub fn compute(project: &ProjectData, config: &Config) -> Result<Self> {
        project.validate()?;
        let page_size = resolve_page_size(project, config)?;
        let regular_grid = grid_for(project, page_size, SizeClass::Regular);
        let oversized_grid = grid_for(project, page_size, SizeClass::Oversized);

        let front_pages =
            distribute_cards(project, regular_grid.capacity(), oversized_grid.capacity());
        let back_pages = if project.backside_enabled {
            make_backside_pages(project, &front_pages)
        } else {
            Vec::new()
        };

        log::debug!(
            "Layout: {}x{} regular grid, {} front pages, {} back pages",
            regular_grid.cols,
            regular_grid.rows,
            front_pages.len(),
            back_pages.len()
        );

        Ok(Self {
            page_size,
            regular_grid,
            oversized_grid,
            front_pages,
            back_pages,
        })
    }

    pub fn grid(&self, size_class: SizeClass) -> &GridLayout {
        match size_class {
            SizeClass::Regular => &self.regular_grid,
            SizeClass::Oversized => &self.oversized_grid,
        }
    }

    /// Transforms for one page of either side
    pub fn transforms(
        &self,
        page: &Page,
        side: SheetSide,
        project: &ProjectData,
    ) -> Vec<Option<PageImageTransform>> {
        compute_transforms(self.grid(page.size_class), page, side, project)
    }
}
