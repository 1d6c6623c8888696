//! Project data: the ordered card list and global print options

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::card::CardInfo;
use crate::constants::{
    DEFAULT_BACKSIDE_NAME, GUIDE_CROSS_LENGTH_MM, GUIDE_THICKNESS_PT,
};
use crate::types::{CoreError, FlipOn, Orientation, Result, full_bleed};
use crate::units::{Length, Position, Size};

/// An 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Cutting guide options
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuideOptions {
    pub enabled: bool,
    /// Also draw lines from the outermost cards out to the page edges
    pub extended: bool,
    pub on_backsides: bool,
    pub thickness: Length,
    pub cross_length: Length,
    /// Solid base color
    pub color_a: Color,
    /// Dash color drawn over the base
    pub color_b: Color,
}

impl Default for GuideOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            extended: false,
            on_backsides: false,
            thickness: Length::from_points(GUIDE_THICKNESS_PT),
            cross_length: Length::from_mm(GUIDE_CROSS_LENGTH_MM),
            color_a: Color::BLACK,
            color_b: Color::new(190, 190, 190),
        }
    }
}

/// Everything needed to lay out and render a project
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectData {
    /// Cards in output order, unique by name
    pub cards: Vec<CardInfo>,
    /// Directory holding the source images
    pub image_dir: PathBuf,
    /// Directory receiving cropped images and the preview cache
    pub crop_dir: PathBuf,

    pub bleed_edge: Length,
    /// Extra bleed drawn beyond the cell, clipped against neighbors
    pub envelope_bleed_edge: Length,
    /// Gap between neighboring cards
    pub spacing: Size,

    pub backside_enabled: bool,
    /// Write backsides into their own document
    pub separate_backsides: bool,
    pub backside_default: Option<PathBuf>,
    /// Shift applied to every backside image to compensate printer drift
    pub backside_offset: Position,
    pub flip_on: FlipOn,

    pub oversized_enabled: bool,

    /// Name looked up in the paper-size table
    pub page_size: String,
    pub orientation: Orientation,
    /// Columns and rows used by the `Fit` page size
    pub custom_layout: (u32, u32),

    /// Output file name without extension
    pub file_name: String,
    pub guides: GuideOptions,
    /// Also write an SVG of the exact card outlines for cutting machines
    pub export_exact_guides: bool,
    /// Color cube applied to cropped images, identity when `None`
    pub color_cube: Option<String>,
}

impl Default for ProjectData {
    fn default() -> Self {
        Self {
            cards: Vec::new(),
            image_dir: PathBuf::from("images"),
            crop_dir: PathBuf::from("images/crop"),
            bleed_edge: Length::ZERO,
            envelope_bleed_edge: Length::ZERO,
            spacing: Size::ZERO,
            backside_enabled: false,
            separate_backsides: false,
            backside_default: Some(PathBuf::from(DEFAULT_BACKSIDE_NAME)),
            backside_offset: Position::ZERO,
            flip_on: FlipOn::LeftEdge,
            oversized_enabled: false,
            page_size: "Letter".to_string(),
            orientation: Orientation::Portrait,
            custom_layout: (3, 3),
            file_name: "_printme".to_string(),
            guides: GuideOptions::default(),
            export_exact_guides: false,
            color_cube: None,
        }
    }
}

impl ProjectData {
    pub fn card(&self, name: &Path) -> Option<&CardInfo> {
        self.cards.iter().find(|card| card.name == name)
    }

    pub fn card_mut(&mut self, name: &Path) -> Option<&mut CardInfo> {
        self.cards.iter_mut().find(|card| card.name == name)
    }

    /// Bleed carried by cropped images, the envelope drawn past the cell included
    pub fn printed_bleed(&self) -> Length {
        self.bleed_edge + self.envelope_bleed_edge
    }

    /// Validate the project before layout or generation
    pub fn validate(&self) -> Result<()> {
        if self.bleed_edge.is_negative() {
            return Err(CoreError::NegativeBleedEdge(self.bleed_edge.mm()));
        }
        if self.envelope_bleed_edge.is_negative() {
            return Err(CoreError::NegativeBleedEdge(self.envelope_bleed_edge.mm()));
        }
        if self.printed_bleed() > full_bleed() {
            return Err(CoreError::Config(format!(
                "Bleed edge plus envelope ({:.2}mm) exceeds the source bleed of {:.2}mm",
                self.printed_bleed().mm(),
                full_bleed().mm()
            )));
        }
        if self.spacing.width.is_negative() || self.spacing.height.is_negative() {
            return Err(CoreError::Config("Spacing cannot be negative".to_string()));
        }
        if self.custom_layout.0 == 0 || self.custom_layout.1 == 0 {
            return Err(CoreError::Config(
                "Custom layout needs at least one row and column".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for card in &self.cards {
            card.validate()?;
            if !seen.insert(card.name.as_path()) {
                return Err(CoreError::Config(format!(
                    "Card {} appears more than once",
                    card.name.display()
                )));
            }
        }

        for card in &self.cards {
            if let Some(backside) = &card.backside {
                let is_default = self.backside_default.as_deref() == Some(backside.as_path());
                if !is_default && !seen.contains(backside.as_path()) {
                    return Err(CoreError::Config(format!(
                        "Backside {} of card {} is not part of the project",
                        backside.display(),
                        card.name.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Backside image of a card: its own backside, else the project default
    pub fn resolve_backside<'a>(&'a self, card: &'a CardInfo) -> Option<&'a Path> {
        if !self.backside_enabled {
            return None;
        }
        card.backside
            .as_deref()
            .filter(|backside| !backside.as_os_str().is_empty())
            .or(self.backside_default.as_deref())
    }

    /// Every distinct backside image used by visible cards
    pub fn backside_images(&self) -> Vec<&Path> {
        let mut seen = HashSet::new();
        self.cards
            .iter()
            .filter(|card| card.printed_copies() > 0)
            .filter_map(|card| self.resolve_backside(card))
            .filter(|backside| seen.insert(*backside))
            .collect()
    }

    /// Assign backsides by name: with pattern `__back_$` the image
    /// `__back_forest.png` becomes the backside of `forest.png`.
    ///
    /// Previous automatic assignments are replaced, explicit ones are kept.
    /// Returns how many cards received a backside.
    pub fn auto_assign_backsides(&mut self, pattern: &str) -> Result<usize> {
        if pattern.matches('$').count() != 1 {
            return Err(CoreError::Config(
                "Backside pattern must include exactly one $".to_string(),
            ));
        }
        if pattern == "$" {
            return Err(CoreError::Config("Backside pattern can't be only $".to_string()));
        }

        let names: HashSet<PathBuf> = self.cards.iter().map(|card| card.name.clone()).collect();
        let mut assigned = Vec::new();
        for card in &mut self.cards {
            if card.backside_auto_assigned {
                card.backside = None;
                card.backside_auto_assigned = false;
            }
            if card.backside.is_some() {
                continue;
            }
            let Some(candidate) = backside_name_for(&card.name, pattern) else {
                continue;
            };
            if candidate != card.name && names.contains(&candidate) {
                card.backside = Some(candidate.clone());
                card.backside_auto_assigned = true;
                assigned.push(candidate);
            }
        }

        for backside in &assigned {
            if let Some(card) = self.card_mut(backside) {
                card.hidden = true;
            }
        }
        log::debug!("Auto-assigned {} backsides", assigned.len());
        Ok(assigned.len())
    }
}

fn backside_name_for(card: &Path, pattern: &str) -> Option<PathBuf> {
    let stem = card.file_stem()?.to_str()?;
    let mut name = pattern.replace('$', stem);
    if let Some(extension) = card.extension().and_then(|ext| ext.to_str()) {
        name.push('.');
        name.push_str(extension);
    }
    Some(card.with_file_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backside_name_for() {
        assert_eq!(
            backside_name_for(Path::new("forest.png"), "__back_$"),
            Some(PathBuf::from("__back_forest.png"))
        );
        assert_eq!(
            backside_name_for(Path::new("lands/forest.jpg"), "$_b"),
            Some(PathBuf::from("lands/forest_b.jpg"))
        );
    }

    #[test]
    fn test_resolve_backside_priority() {
        let mut project = ProjectData {
            backside_enabled: true,
            backside_default: Some(PathBuf::from("default.png")),
            ..Default::default()
        };
        project.cards.push(CardInfo::new("a.png").with_backside("b.png"));
        project.cards.push(CardInfo::new("c.png"));

        assert_eq!(
            project.resolve_backside(&project.cards[0]),
            Some(Path::new("b.png"))
        );
        assert_eq!(
            project.resolve_backside(&project.cards[1]),
            Some(Path::new("default.png"))
        );

        project.backside_default = None;
        assert_eq!(project.resolve_backside(&project.cards[1]), None);

        project.backside_enabled = false;
        assert_eq!(project.resolve_backside(&project.cards[0]), None);
    }
}
