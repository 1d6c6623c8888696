//! Per-card options

use std::path::PathBuf;
use std::time::SystemTime;

use crate::types::{BadAspectRatioHandling, BleedType, CoreError, Result, Rotation, SizeClass};

/// A card image in the project together with its print options
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardInfo {
    /// Identity of the card: its image path relative to the image directory
    pub name: PathBuf,
    /// Number of copies in the output
    pub num: u32,
    /// Hidden cards are never printed, typically backside images
    pub hidden: bool,
    /// Explicit backside image
    pub backside: Option<PathBuf>,
    /// The backside is flipped along the short edge of the card
    pub backside_short_edge: bool,
    /// The backside was assigned by name pattern rather than by the user
    pub backside_auto_assigned: bool,
    pub rotation: Rotation,
    pub bleed_type: BleedType,
    pub bad_aspect_ratio_handling: BadAspectRatioHandling,
    pub oversized: bool,
    /// Modification time of the source image when it was last seen
    pub last_write_time: Option<SystemTime>,
    /// Not persisted
    #[cfg_attr(feature = "serde", serde(skip))]
    pub transient: bool,
}

impl CardInfo {
    pub fn new(name: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            num: 1,
            hidden: false,
            backside: None,
            backside_short_edge: false,
            backside_auto_assigned: false,
            rotation: Rotation::None,
            bleed_type: BleedType::Infer,
            bad_aspect_ratio_handling: BadAspectRatioHandling::Ignore,
            oversized: false,
            last_write_time: None,
            transient: false,
        }
    }

    pub fn with_num(mut self, num: u32) -> Self {
        self.num = num;
        self
    }

    pub fn with_backside(mut self, backside: impl Into<PathBuf>) -> Self {
        self.backside = Some(backside.into());
        self
    }

    /// Size class the card is laid out with, given the project setting
    pub fn size_class(&self, oversized_enabled: bool) -> SizeClass {
        if oversized_enabled && self.oversized {
            SizeClass::Oversized
        } else {
            SizeClass::Regular
        }
    }

    /// Number of copies that end up on pages
    pub fn printed_copies(&self) -> u32 {
        if self.hidden { 0 } else { self.num }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num == 0 && !self.hidden {
            return Err(CoreError::Config(format!(
                "Card {} must be printed at least once unless hidden",
                self.name.display()
            )));
        }
        Ok(())
    }
}
