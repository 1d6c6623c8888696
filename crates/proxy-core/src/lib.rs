mod cache;
mod card;
mod config;
mod constants;
mod cropper;
pub mod layout;
pub mod pipeline;
mod project;
mod types;
mod units;

pub use cache::*;
pub use card::*;
pub use config::*;
pub use constants::*;
pub use cropper::*;
pub use layout::{
    CardTransform, GridLayout, GridPosition, Layout, Page, PageImage, PageImageTransform,
    SheetSide,
};
pub use pipeline::{ColorCube, Image, ImageParameters, PreparedCard, crop, prepare_card, uncrop};
pub use project::*;
pub use types::*;
pub use units::*;
