//! Background worker running crops, layouts and generation off the caller's thread

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proxy_core::{
    ColorCube, Config, Layout, PreviewCache, PrintFn, ProjectData, load_color_cube,
    preview_cache_path, refresh_previews,
};
use tokio::sync::mpsc;

use crate::{ProxyCommand, ProxyUpdate, RequestId, RequestKind, RequestTracker, RuntimeError};

/// Preview cache of the project last refreshed, with the file it belongs to
#[derive(Default)]
struct WorkerState {
    cache: Option<(PathBuf, PreviewCache)>,
}

/// Async worker task that processes commands and sends updates
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<ProxyCommand>,
    update_tx: mpsc::UnboundedSender<ProxyUpdate>,
) {
    let mut state = WorkerState::default();
    let mut deferred = VecDeque::new();
    loop {
        let cmd = match deferred.pop_front() {
            Some(cmd) => cmd,
            None => match command_rx.recv().await {
                Some(cmd) => cmd,
                None => break,
            },
        };
        let cmd = newest_of_kind(cmd, &mut command_rx, &mut deferred);
        process_command(cmd, &mut state, &update_tx).await;
    }
    log::debug!("Command channel closed, worker exiting");
}

/// Drain queued commands, replacing `cmd` with newer ones of the same kind.
///
/// Other commands are deferred, at most one per kind.
fn newest_of_kind(
    mut cmd: ProxyCommand,
    command_rx: &mut mpsc::UnboundedReceiver<ProxyCommand>,
    deferred: &mut VecDeque<ProxyCommand>,
) -> ProxyCommand {
    let kind = cmd.request().kind;
    while let Ok(next_cmd) = command_rx.try_recv() {
        if next_cmd.request().kind == kind {
            log::debug!("Discarding queued {:?} request, using newer request", kind);
            cmd = next_cmd;
        } else if let Some(queued) = deferred
            .iter_mut()
            .find(|queued| queued.request().kind == next_cmd.request().kind)
        {
            log::debug!("Replacing deferred {:?} request", next_cmd.request().kind);
            *queued = next_cmd;
        } else {
            deferred.push_back(next_cmd);
        }
    }
    cmd
}

async fn process_command(
    cmd: ProxyCommand,
    state: &mut WorkerState,
    update_tx: &mpsc::UnboundedSender<ProxyUpdate>,
) {
    match cmd {
        ProxyCommand::RefreshPreviews {
            request,
            project,
            config,
        } => {
            handle_refresh_previews(request, project, config, state, update_tx).await;
        }
        ProxyCommand::ComputeLayout {
            request,
            project,
            config,
        } => {
            handle_compute_layout(request, project, config, update_tx).await;
        }
        ProxyCommand::Generate {
            request,
            project,
            config,
            output_dir,
        } => {
            handle_generate(request, project, config, output_dir, update_tx).await;
        }
    }
}

fn progress_sender(request: RequestId, update_tx: &mpsc::UnboundedSender<ProxyUpdate>) -> PrintFn {
    let update_tx = update_tx.clone();
    Arc::new(move |message: &str| {
        let _ = update_tx.send(ProxyUpdate::Progress {
            request,
            message: message.to_string(),
        });
    })
}

async fn take_cache(state: &mut WorkerState, path: &Path) -> PreviewCache {
    match state.cache.take() {
        Some((cached_path, cache)) if cached_path == path => cache,
        _ => PreviewCache::load_async(path).await.unwrap_or_else(|e| {
            log::warn!("Failed to load preview cache {}: {}", path.display(), e);
            PreviewCache::new()
        }),
    }
}

async fn handle_refresh_previews(
    request: RequestId,
    project: Arc<ProjectData>,
    config: Arc<Config>,
    state: &mut WorkerState,
    update_tx: &mpsc::UnboundedSender<ProxyUpdate>,
) {
    let cache_path = preview_cache_path(&project);
    let cache = take_cache(state, &cache_path).await;

    let cube = {
        let project = Arc::clone(&project);
        let config = Arc::clone(&config);
        tokio::task::spawn_blocking(move || load_color_cube(&project, &config))
            .await
            .unwrap_or_else(|e| {
                log::warn!("Color cube loading panicked: {}", e);
                ColorCube::identity()
            })
    };

    let progress = progress_sender(request, update_tx);
    match refresh_previews(project, config, Arc::new(cube), cache, progress).await {
        Ok((cache, report)) => {
            if let Err(e) = cache.save_async(&cache_path).await {
                log::warn!("Failed to save preview cache {}: {}", cache_path.display(), e);
            }
            let snapshot = Arc::new(cache.clone());
            state.cache = Some((cache_path, cache));
            let _ = update_tx.send(ProxyUpdate::PreviewsRefreshed {
                request,
                cache: snapshot,
                report,
            });
        }
        Err(e) => {
            let _ = update_tx.send(ProxyUpdate::Error {
                request,
                message: format!("Failed to refresh previews: {e}"),
            });
        }
    }
}

async fn handle_compute_layout(
    request: RequestId,
    project: Arc<ProjectData>,
    config: Arc<Config>,
    update_tx: &mpsc::UnboundedSender<ProxyUpdate>,
) {
    let layout = tokio::task::spawn_blocking(move || Layout::compute(&project, &config)).await;
    let update = match layout {
        Ok(Ok(layout)) => ProxyUpdate::LayoutComputed {
            request,
            layout: Arc::new(layout),
        },
        Ok(Err(e)) => ProxyUpdate::Error {
            request,
            message: format!("Failed to compute layout: {e}"),
        },
        Err(e) => ProxyUpdate::Error {
            request,
            message: format!("Layout task failed: {e}"),
        },
    };
    let _ = update_tx.send(update);
}

async fn handle_generate(
    request: RequestId,
    project: Arc<ProjectData>,
    config: Arc<Config>,
    output_dir: PathBuf,
    update_tx: &mpsc::UnboundedSender<ProxyUpdate>,
) {
    let progress = progress_sender(request, update_tx);
    let project = Arc::unwrap_or_clone(project);
    let config = Arc::unwrap_or_clone(config);
    match proxy_render::generate(project, config, output_dir, progress).await {
        Ok(output) => {
            let _ = update_tx.send(ProxyUpdate::Generated { request, output });
        }
        Err(e) => {
            let _ = update_tx.send(ProxyUpdate::Error {
                request,
                message: format!("Failed to generate documents: {e}"),
            });
        }
    }
}

/// Caller side of a spawned worker
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    command_tx: mpsc::UnboundedSender<ProxyCommand>,
    tracker: Arc<RequestTracker>,
}

impl WorkerHandle {
    /// Spawn a worker on the current Tokio runtime
    pub fn spawn() -> (Self, mpsc::UnboundedReceiver<ProxyUpdate>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        tokio::spawn(worker_task(command_rx, update_tx));
        let handle = Self {
            command_tx,
            tracker: Arc::new(RequestTracker::new()),
        };
        (handle, update_rx)
    }

    pub fn refresh_previews(
        &self,
        project: Arc<ProjectData>,
        config: Arc<Config>,
    ) -> Result<RequestId, RuntimeError> {
        let request = self.tracker.issue(RequestKind::RefreshPreviews);
        self.send(ProxyCommand::RefreshPreviews {
            request,
            project,
            config,
        })
    }

    pub fn compute_layout(
        &self,
        project: Arc<ProjectData>,
        config: Arc<Config>,
    ) -> Result<RequestId, RuntimeError> {
        let request = self.tracker.issue(RequestKind::ComputeLayout);
        self.send(ProxyCommand::ComputeLayout {
            request,
            project,
            config,
        })
    }

    pub fn generate(
        &self,
        project: Arc<ProjectData>,
        config: Arc<Config>,
        output_dir: PathBuf,
    ) -> Result<RequestId, RuntimeError> {
        let request = self.tracker.issue(RequestKind::Generate);
        self.send(ProxyCommand::Generate {
            request,
            project,
            config,
            output_dir,
        })
    }

    /// Whether an update still answers the newest request of its kind
    pub fn is_current(&self, update: &ProxyUpdate) -> bool {
        self.tracker.is_current(update.request())
    }

    fn send(&self, command: ProxyCommand) -> Result<RequestId, RuntimeError> {
        let request = command.request();
        self.command_tx
            .send(command)
            .map_err(|_| RuntimeError::WorkerStopped)?;
        Ok(request)
    }
}
