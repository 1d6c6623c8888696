use std::path::{Path, PathBuf};
use std::sync::Arc;

use proxy_async_runtime::*;
use proxy_core::{CardInfo, Density, Image, RenderBackend, SizeClass};

fn project_in(dir: &Path) -> ProjectData {
    let mut project = ProjectData {
        image_dir: dir.join("images"),
        crop_dir: dir.join("images/crop"),
        ..Default::default()
    };
    project.cards.push(CardInfo::new("a.png").with_num(2));
    let size = Density::from_dpi(50.0)
        .unwrap()
        .pixel_size(SizeClass::Regular.card_size_with_full_bleed());
    Image::filled(size, [30, 60, 90, 255])
        .save(&project.image_dir.join("a.png"))
        .unwrap();
    project
}

/// Next update that isn't progress
async fn next_result(updates: &mut tokio::sync::mpsc::UnboundedReceiver<ProxyUpdate>) -> ProxyUpdate {
    loop {
        match updates.recv().await.unwrap() {
            ProxyUpdate::Progress { .. } => continue,
            update => return update,
        }
    }
}

#[tokio::test]
async fn test_layout_requests_collapse_to_newest() {
    let (worker, mut updates) = WorkerHandle::spawn();
    let config = Arc::new(Config::default());

    let mut project = ProjectData::default();
    project.cards.push(CardInfo::new("a.png").with_num(4));
    let stale = worker
        .compute_layout(Arc::new(ProjectData::default()), Arc::clone(&config))
        .unwrap();
    let newest = worker
        .compute_layout(Arc::new(project), Arc::clone(&config))
        .unwrap();
    assert_ne!(stale, newest);

    let update = next_result(&mut updates).await;
    assert!(worker.is_current(&update));
    match update {
        ProxyUpdate::LayoutComputed { request, layout } => {
            assert_eq!(request, newest);
            assert_eq!(layout.front_pages.len(), 1);
            assert_eq!(layout.front_pages[0].occupied(), 4);
        }
        other => panic!("unexpected update {other:?}"),
    }
}

#[tokio::test]
async fn test_layout_error_is_reported() {
    let (worker, mut updates) = WorkerHandle::spawn();
    let project = ProjectData {
        page_size: "Napkin".to_string(),
        ..Default::default()
    };
    let request = worker
        .compute_layout(Arc::new(project), Arc::new(Config::default()))
        .unwrap();

    match next_result(&mut updates).await {
        ProxyUpdate::Error { request: id, message } => {
            assert_eq!(id, request);
            assert!(message.contains("Napkin"));
        }
        other => panic!("unexpected update {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_then_generate() {
    let dir = tempfile::tempdir().unwrap();
    let project = Arc::new(project_in(dir.path()));
    let config = Arc::new(Config {
        backend: RenderBackend::Png,
        raster_dpi: 20.0,
        ..Default::default()
    });
    let (worker, mut updates) = WorkerHandle::spawn();

    worker
        .refresh_previews(Arc::clone(&project), Arc::clone(&config))
        .unwrap();
    match next_result(&mut updates).await {
        ProxyUpdate::PreviewsRefreshed { cache, report, .. } => {
            assert_eq!(report.prepared, vec![PathBuf::from("a.png")]);
            assert!(cache.get(Path::new("a.png")).is_some());
        }
        other => panic!("unexpected update {other:?}"),
    }
    assert!(proxy_core::preview_cache_path(&project).exists());

    let out = dir.path().join("out");
    worker
        .generate(Arc::clone(&project), Arc::clone(&config), out.clone())
        .unwrap();
    match next_result(&mut updates).await {
        ProxyUpdate::Generated { output, .. } => {
            assert_eq!(output.front, Some(out.join("_printme")));
            assert!(out.join("_printme/1.png").exists());
        }
        other => panic!("unexpected update {other:?}"),
    }
}
