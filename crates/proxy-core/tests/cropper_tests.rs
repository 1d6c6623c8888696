use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use proxy_core::*;

/// Write a full-bleed card at 100 dpi into the project's image directory
fn write_card(project: &ProjectData, name: &str, shade: u8) {
    let size = Density::from_dpi(100.0)
        .unwrap()
        .pixel_size(SizeClass::Regular.card_size_with_full_bleed());
    Image::filled(size, [shade, shade, 255 - shade, 255])
        .save(&project.image_dir.join(name))
        .unwrap();
}

fn setup(dir: &Path) -> ProjectData {
    let mut project = ProjectData {
        image_dir: dir.join("images"),
        crop_dir: dir.join("images/crop"),
        backside_enabled: true,
        backside_default: Some(PathBuf::from("__back.png")),
        ..Default::default()
    };
    project.cards.push(CardInfo::new("a.png"));
    project.cards.push(CardInfo::new("b.png").with_num(2));
    write_card(&project, "a.png", 10);
    write_card(&project, "b.png", 100);
    write_card(&project, "__back.png", 200);
    project
}

#[test]
fn test_cropper_writes_outputs_and_reuses_them() {
    let dir = tempfile::tempdir().unwrap();
    let project = setup(dir.path());
    let config = Config::default();
    let cube = ColorCube::identity();
    let mut cache = PreviewCache::new();

    let report = run_cropper(&project, &config, &cube, &mut cache, &|_| {}).unwrap();
    assert_eq!(report.prepared.len(), 3);
    assert!(report.failed.is_empty());
    for name in ["a.png", "b.png", "__back.png"] {
        assert!(cropped_image_path(&project, Path::new(name)).exists());
        assert!(cache.get(Path::new(name)).is_some());
    }

    let report = run_cropper(&project, &config, &cube, &mut cache, &|_| {}).unwrap();
    assert!(report.prepared.is_empty());
    assert_eq!(report.reused.len(), 3);
}

#[test]
fn test_changed_card_options_are_not_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mut project = setup(dir.path());
    let config = Config::default();
    let cube = ColorCube::identity();
    let mut cache = PreviewCache::new();
    let output = cropped_image_path(&project, Path::new("a.png"));

    run_cropper(&project, &config, &cube, &mut cache, &|_| {}).unwrap();
    let before = Image::open(&output).unwrap().pixel_size();

    project.cards[0].bleed_type = BleedType::NoBleed;
    let report = run_cropper(&project, &config, &cube, &mut cache, &|_| {}).unwrap();
    assert_eq!(report.prepared, vec![PathBuf::from("a.png")]);
    assert_eq!(report.reused.len(), 2);
    let after = Image::open(&output).unwrap().pixel_size();

    let mut fresh_cache = PreviewCache::new();
    let fresh_dir = tempfile::tempdir().unwrap();
    let mut fresh = project.clone();
    fresh.crop_dir = fresh_dir.path().to_path_buf();
    run_cropper(&fresh, &config, &cube, &mut fresh_cache, &|_| {}).unwrap();
    let expected = Image::open(&cropped_image_path(&fresh, Path::new("a.png")))
        .unwrap()
        .pixel_size();

    assert_ne!(before, after);
    assert_eq!(after, expected);
}

#[test]
fn test_envelope_bleed_is_cropped_into_its_own_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut project = setup(dir.path());
    let config = Config::default();
    let cube = ColorCube::identity();
    let mut cache = PreviewCache::new();
    project.bleed_edge = Length::from_mm(1.0);
    run_cropper(&project, &config, &cube, &mut cache, &|_| {}).unwrap();
    let plain = Image::open(&cropped_image_path(&project, Path::new("a.png"))).unwrap();

    project.envelope_bleed_edge = Length::from_mm(2.0);
    let output = cropped_image_path(&project, Path::new("a.png"));
    assert!(output.starts_with(project.crop_dir.join("3.00mm")));
    let report = run_cropper(&project, &config, &cube, &mut cache, &|_| {}).unwrap();
    assert_eq!(report.prepared.len(), 3);

    // 2mm more bleed per side at 100 dpi
    let enveloped = Image::open(&output).unwrap();
    let extra = enveloped.width() - plain.width();
    assert!((15..=17).contains(&extra), "extra {extra}");
}

#[test]
fn test_cropper_reports_missing_images() {
    let dir = tempfile::tempdir().unwrap();
    let mut project = setup(dir.path());
    project.cards.push(CardInfo::new("missing.png"));

    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let progress = move |message: &str| sink.lock().unwrap().push(message.to_string());

    let mut cache = PreviewCache::new();
    let report = run_cropper(
        &project,
        &Config::default(),
        &ColorCube::identity(),
        &mut cache,
        &progress,
    )
    .unwrap();

    assert_eq!(report.failed, vec![PathBuf::from("missing.png")]);
    assert_eq!(report.prepared.len(), 3);
    assert!(messages
        .lock()
        .unwrap()
        .iter()
        .any(|message| message.contains("missing.png")));
}

#[test]
fn test_cropper_drops_removed_cards() {
    let dir = tempfile::tempdir().unwrap();
    let mut project = setup(dir.path());
    let mut cache = PreviewCache::new();
    let cube = ColorCube::identity();
    run_cropper(&project, &Config::default(), &cube, &mut cache, &|_| {}).unwrap();

    project.cards.remove(0);
    run_cropper(&project, &Config::default(), &cube, &mut cache, &|_| {}).unwrap();
    assert!(cache.get(Path::new("a.png")).is_none());
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_refresh_previews_matches_sequential_run() {
    let dir = tempfile::tempdir().unwrap();
    let project = setup(dir.path());

    let (cache, report) = refresh_previews(
        Arc::new(project.clone()),
        Arc::new(Config::default()),
        Arc::new(ColorCube::identity()),
        PreviewCache::new(),
        Arc::new(|_: &str| {}),
    )
    .await
    .unwrap();

    assert_eq!(report.prepared.len(), 3);
    assert_eq!(cache.len(), 3);
    let entry = cache.get(Path::new("a.png")).unwrap();
    assert!(entry.uncropped.width() <= Config::default().preview_width);
}
