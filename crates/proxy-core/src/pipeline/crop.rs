//! Bleed handling: cropping, uncropping and the per-card preparation policy

use crate::card::CardInfo;
use crate::config::Config;
use crate::project::ProjectData;
use crate::types::{BadAspectRatioHandling, BleedType, CoreError, Result, full_bleed};
use crate::units::{Density, Length, PixelSize, Size};

use super::{ColorCube, Image};

/// Everything the pipeline needs to know to prepare one card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageParameters {
    /// Trimmed card size in the orientation of the source image
    pub card_size: Size,
    /// Bleed kept around the card, envelope included
    pub bleed_edge: Length,
    pub max_density: Density,
    pub fancy_uncrop: bool,
    pub aspect_tolerance: f32,
    pub thumbnail_width: u32,
}

impl ImageParameters {
    pub fn for_card(card: &CardInfo, project: &ProjectData, config: &Config) -> Result<Self> {
        if project.bleed_edge.is_negative() {
            return Err(CoreError::NegativeBleedEdge(project.bleed_edge.mm()));
        }
        let card_size = card.size_class(project.oversized_enabled).card_size();
        // Rotated cards are stored sideways and turned upright when drawn
        let card_size = if card.rotation.is_quarter_turn() {
            card_size.transposed()
        } else {
            card_size
        };
        Ok(Self {
            card_size,
            bleed_edge: project.printed_bleed(),
            max_density: config.max_density()?,
            fancy_uncrop: config.fancy_uncrop,
            aspect_tolerance: config.aspect_tolerance,
            thumbnail_width: config.thumbnail_width,
        })
    }

    /// Digest of everything besides the source that shapes `card`'s output
    pub fn fingerprint(&self, card: &CardInfo) -> u64 {
        let mut hasher = blake3::Hasher::new();
        for value in [
            self.card_size.width.mm(),
            self.card_size.height.mm(),
            self.bleed_edge.mm(),
            self.max_density.pixels_per_mm(),
            self.aspect_tolerance,
        ] {
            hasher.update(&value.to_le_bytes());
        }
        hasher.update(&self.thumbnail_width.to_le_bytes());
        hasher.update(&[
            self.fancy_uncrop as u8,
            card.bleed_type as u8,
            card.bad_aspect_ratio_handling as u8,
        ]);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

/// Output of the pipeline for one card
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCard {
    /// Card with the requested bleed edge, color corrected, ready to print
    pub cropped: Image,
    /// Card with the full bleed margin
    pub uncropped: Image,
    /// Small preview of the cropped card
    pub thumbnail: Image,
    /// The source didn't match the expected card aspect ratio
    pub bad_aspect_ratio: bool,
}

/// Synthesize the full bleed margin around a trimmed card image
pub fn uncrop(image: &Image, card_size: Size, fancy: bool) -> Result<Image> {
    let density = image.density(card_size)?;
    let margin = density.pixels(full_bleed());
    Ok(if fancy {
        image.add_reflected_border(margin, margin, margin, margin)
    } else {
        image.add_replicated_border(margin, margin, margin, margin)
    })
}

/// Cut a full-bleed image down to `card_size` plus `bleed_edge` on each side.
///
/// The image is assumed to cover `card_size` plus `full_bleed_margin`. A bleed
/// edge larger than the available margin keeps the whole image. Images denser
/// than `max_density` are downscaled to it, never upscaled.
pub fn crop(
    image: &Image,
    card_size: Size,
    full_bleed_margin: Length,
    bleed_edge: Length,
    max_density: Density,
) -> Result<Image> {
    if bleed_edge.is_negative() {
        return Err(CoreError::NegativeBleedEdge(bleed_edge.mm()));
    }
    let density = image.density(card_size.grow(full_bleed_margin))?;
    let excess = (full_bleed_margin - bleed_edge).max(Length::ZERO);
    let trim = density.pixels(excess);
    let cropped = image.crop_edges(trim, trim, trim, trim);

    if density > max_density {
        let scale = max_density.pixels_per_mm() / density.pixels_per_mm();
        let target = PixelSize::new(
            (cropped.width() as f32 * scale).round() as u32,
            (cropped.height() as f32 * scale).round() as u32,
        );
        log::debug!(
            "Downscaling from {:.0} to {:.0} dpi",
            density.dpi(),
            max_density.dpi()
        );
        Ok(cropped.resize(target))
    } else {
        Ok(cropped)
    }
}

/// Bring `image` to `ratio` according to `handling`
fn fix_aspect_ratio(image: &Image, ratio: f32, handling: BadAspectRatioHandling) -> Image {
    let (width, height) = (image.width(), image.height());
    let too_wide = image.aspect_ratio() > ratio;
    match handling {
        BadAspectRatioHandling::Ignore => image.clone(),
        BadAspectRatioHandling::Expand => {
            if too_wide {
                let pad = ((width as f32 / ratio).round() as u32).saturating_sub(height);
                image.add_black_border(0, pad / 2, 0, pad - pad / 2)
            } else {
                let pad = ((height as f32 * ratio).round() as u32).saturating_sub(width);
                image.add_black_border(pad / 2, 0, pad - pad / 2, 0)
            }
        }
        BadAspectRatioHandling::Stretch => {
            if too_wide {
                image.resize(PixelSize::new(width, (width as f32 / ratio).round() as u32))
            } else {
                image.resize(PixelSize::new((height as f32 * ratio).round() as u32, height))
            }
        }
    }
}

fn ratio_mismatch(actual: f32, expected: f32) -> f32 {
    (actual / expected - 1.0).abs()
}

/// Run the full pipeline for one card source image
pub fn prepare_card(
    source: &Image,
    card: &CardInfo,
    params: &ImageParameters,
    cube: &ColorCube,
) -> Result<PreparedCard> {
    let card_size = params.card_size;
    let bled_ratio = card_size.grow(full_bleed()).aspect_ratio();

    let uncropped = match card.bleed_type {
        BleedType::FullBleed => source.clone(),
        BleedType::NoBleed => uncrop(source, card_size, params.fancy_uncrop)?,
        BleedType::Infer => {
            let ratio = source.aspect_ratio();
            let has_bleed = ratio_mismatch(ratio, bled_ratio)
                < ratio_mismatch(ratio, card_size.aspect_ratio());
            if has_bleed {
                source.clone()
            } else {
                log::debug!("{} has no bleed, synthesizing it", card.name.display());
                uncrop(source, card_size, params.fancy_uncrop)?
            }
        }
    };

    let bad_aspect_ratio =
        ratio_mismatch(uncropped.aspect_ratio(), bled_ratio) > params.aspect_tolerance;
    let uncropped = if bad_aspect_ratio && card.bleed_type == BleedType::Infer {
        log::info!(
            "{} has a bad aspect ratio, handling with {:?}",
            card.name.display(),
            card.bad_aspect_ratio_handling
        );
        fix_aspect_ratio(&uncropped, bled_ratio, card.bad_aspect_ratio_handling)
    } else {
        uncropped
    };

    let cropped = crop(
        &uncropped,
        card_size,
        full_bleed(),
        params.bleed_edge,
        params.max_density,
    )?;
    let cropped = cube.apply(&cropped);
    let thumbnail = cropped.thumbnail(params.thumbnail_width);

    Ok(PreparedCard {
        cropped,
        uncropped,
        thumbnail,
        bad_aspect_ratio,
    })
}
