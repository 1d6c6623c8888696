//! Keeps cropped card images and the preview cache in sync with the sources
//!
//! Cropped images are written to a directory derived from the printed bleed
//! and color cube, so switching between settings never mixes outputs. An
//! existing output is only reused when the cache saw it prepared with the
//! same parameters. Sources
//! that can't be read are reported and skipped; the rest of the run goes on.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::cache::{PreviewCache, PreviewEntry};
use crate::card::CardInfo;
use crate::config::Config;
use crate::pipeline::{ColorCube, Image, ImageParameters, prepare_card};
use crate::project::ProjectData;
use crate::types::{PrintFn, Result};
use crate::units::Length;

/// Directory receiving cropped images for a bleed edge and color cube
pub fn crop_output_dir(crop_dir: &Path, bleed_edge: Length, color_cube: Option<&str>) -> PathBuf {
    let mut dir = crop_dir.to_path_buf();
    if bleed_edge > Length::ZERO {
        dir.push(format!("{:.2}mm", bleed_edge.mm()));
    }
    if let Some(cube) = color_cube {
        dir.push(cube);
    }
    dir
}

/// Location of a card's cropped image for the project's current settings
pub fn cropped_image_path(project: &ProjectData, name: &Path) -> PathBuf {
    crop_output_dir(
        &project.crop_dir,
        project.printed_bleed(),
        project.color_cube.as_deref(),
    )
    .join(name)
}

/// Preview cache file of a project
pub fn preview_cache_path(project: &ProjectData) -> PathBuf {
    project
        .crop_dir
        .join(crate::constants::PREVIEW_CACHE_FILE_NAME)
}

/// Load the project's color cube once for a whole run
pub fn load_color_cube(project: &ProjectData, config: &Config) -> ColorCube {
    match &project.color_cube {
        Some(name) => ColorCube::load(&config.cube_path(name)),
        None => ColorCube::identity(),
    }
}

/// Summary of a cropper run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropReport {
    /// Cards whose images were (re)computed
    pub prepared: Vec<PathBuf>,
    /// Cards whose existing outputs were still valid
    pub reused: Vec<PathBuf>,
    /// Cards whose source couldn't be processed
    pub failed: Vec<PathBuf>,
}

/// Work for a single card, independent of the cache
#[derive(Debug, Clone)]
struct CropJob {
    card: CardInfo,
    source: PathBuf,
    output: PathBuf,
    params: ImageParameters,
    params_hash: u64,
    preview_width: u32,
    cached: Option<CachedState>,
}

/// What the cache remembers about a card's last preparation
#[derive(Debug, Clone, Copy)]
struct CachedState {
    last_write_time: SystemTime,
    source_hash: u64,
    params_hash: u64,
}

enum CropOutcome {
    Reused {
        name: PathBuf,
        last_write_time: SystemTime,
        /// Source and parameter hashes confirming a stale entry
        hashes: Option<(u64, u64)>,
    },
    Prepared {
        name: PathBuf,
        entry: Box<PreviewEntry>,
    },
    Failed {
        name: PathBuf,
        message: String,
    },
}

/// Every image the project prints: visible cards, then their backsides
fn crop_targets(project: &ProjectData) -> Vec<CardInfo> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for card in project.cards.iter().filter(|card| card.printed_copies() > 0) {
        if seen.insert(card.name.clone()) {
            targets.push(card.clone());
        }
    }
    for backside in project.backside_images() {
        if seen.insert(backside.to_path_buf()) {
            let card = project
                .card(backside)
                .cloned()
                .unwrap_or_else(|| CardInfo::new(backside));
            targets.push(card);
        }
    }
    targets
}

fn plan_jobs(project: &ProjectData, config: &Config, cache: &PreviewCache) -> Result<Vec<CropJob>> {
    crop_targets(project)
        .into_iter()
        .map(|card| {
            let params = ImageParameters::for_card(&card, project, config)?;
            let cached = cache.get(&card.name).map(|entry| CachedState {
                last_write_time: entry.last_write_time,
                source_hash: entry.source_hash,
                params_hash: entry.params_hash,
            });
            Ok(CropJob {
                source: project.image_dir.join(&card.name),
                output: cropped_image_path(project, &card.name),
                params_hash: params.fingerprint(&card),
                card,
                params,
                preview_width: config.preview_width,
                cached,
            })
        })
        .collect()
}

fn process_job(job: &CropJob, cube: &ColorCube) -> CropOutcome {
    let name = job.card.name.clone();
    let failed = |message: String| CropOutcome::Failed {
        name: job.card.name.clone(),
        message,
    };

    let last_write_time = match std::fs::metadata(&job.source).and_then(|meta| meta.modified()) {
        Ok(time) => time,
        Err(err) => return failed(format!("can't read {}: {}", job.source.display(), err)),
    };
    // Outputs prepared with other parameters are never reused
    let cached = job
        .cached
        .filter(|cached| cached.params_hash == job.params_hash && job.output.exists());
    if cached.is_some_and(|cached| cached.last_write_time == last_write_time) {
        return CropOutcome::Reused {
            name,
            last_write_time,
            hashes: None,
        };
    }

    let source = match Image::open(&job.source) {
        Ok(source) => source,
        Err(err) => return failed(format!("can't decode {}: {}", job.source.display(), err)),
    };
    let source_hash = source.hash();
    if cached.is_some_and(|cached| cached.source_hash == source_hash) {
        return CropOutcome::Reused {
            name,
            last_write_time,
            hashes: Some((source_hash, job.params_hash)),
        };
    }

    let prepared = match prepare_card(&source, &job.card, &job.params, cube) {
        Ok(prepared) => prepared,
        Err(err) => return failed(err.to_string()),
    };
    if let Err(err) = prepared.cropped.save(&job.output) {
        return failed(format!("can't write {}: {}", job.output.display(), err));
    }
    CropOutcome::Prepared {
        name,
        entry: Box::new(PreviewEntry::from_prepared(
            &prepared,
            last_write_time,
            source_hash,
            job.params_hash,
            job.preview_width,
        )),
    }
}

fn apply_outcome(
    cache: &mut PreviewCache,
    report: &mut CropReport,
    outcome: CropOutcome,
    progress: &dyn Fn(&str),
) {
    match outcome {
        CropOutcome::Reused {
            name,
            last_write_time,
            hashes,
        } => {
            if let Some((source_hash, params_hash)) = hashes {
                cache.revalidate(&name, last_write_time, source_hash, params_hash);
            }
            report.reused.push(name);
        }
        CropOutcome::Prepared { name, entry } => {
            progress(&format!("Cropped {}", name.display()));
            cache.insert(name.clone(), *entry);
            report.prepared.push(name);
        }
        CropOutcome::Failed { name, message } => {
            log::warn!("Skipping {}: {}", name.display(), message);
            progress(&format!("Failed to crop {}: {}", name.display(), message));
            report.failed.push(name);
        }
    }
}

/// Bring cropped images and previews up to date, one card after another.
///
/// Entries of cards that left the project are dropped from the cache.
pub fn run_cropper(
    project: &ProjectData,
    config: &Config,
    cube: &ColorCube,
    cache: &mut PreviewCache,
    progress: &dyn Fn(&str),
) -> Result<CropReport> {
    config.validate()?;
    let jobs = plan_jobs(project, config, cache)?;
    let mut report = CropReport::default();
    for job in &jobs {
        let outcome = process_job(job, cube);
        apply_outcome(cache, &mut report, outcome, progress);
    }
    cache.retain_cards(jobs.iter().map(|job| job.card.name.as_path()));
    Ok(report)
}

/// Like [`run_cropper`], preparing cards concurrently on blocking threads.
///
/// All jobs share the one color cube read-only.
pub async fn refresh_previews(
    project: Arc<ProjectData>,
    config: Arc<Config>,
    cube: Arc<ColorCube>,
    mut cache: PreviewCache,
    progress: PrintFn,
) -> Result<(PreviewCache, CropReport)> {
    config.validate()?;
    let jobs = plan_jobs(&project, &config, &cache)?;

    let handles: Vec<_> = jobs
        .iter()
        .cloned()
        .map(|job| {
            let cube = Arc::clone(&cube);
            tokio::task::spawn_blocking(move || process_job(&job, &cube))
        })
        .collect();

    let mut report = CropReport::default();
    for handle in handles {
        let outcome = handle.await?;
        apply_outcome(&mut cache, &mut report, outcome, progress.as_ref());
    }
    cache.retain_cards(jobs.iter().map(|job| job.card.name.as_path()));
    Ok((cache, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_output_dir() {
        let base = Path::new("crop");
        assert_eq!(crop_output_dir(base, Length::ZERO, None), PathBuf::from("crop"));
        assert_eq!(
            crop_output_dir(base, Length::from_mm(1.5), Some("vivid")),
            PathBuf::from("crop/1.50mm/vivid")
        );
    }

    #[test]
    fn test_crop_targets_include_backsides_once() {
        let mut project = ProjectData {
            backside_enabled: true,
            ..Default::default()
        };
        let mut hidden = CardInfo::new("back.png");
        hidden.hidden = true;
        project.cards.push(CardInfo::new("a.png").with_backside("back.png"));
        project.cards.push(CardInfo::new("b.png").with_backside("back.png"));
        project.cards.push(hidden);

        let names: Vec<_> = crop_targets(&project)
            .into_iter()
            .map(|card| card.name)
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b.png"),
                PathBuf::from("back.png")
            ]
        );
    }
}
