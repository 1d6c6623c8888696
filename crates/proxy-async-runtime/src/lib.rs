use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

mod worker;

// Re-export types from library crates
pub use proxy_core::{Config, CropReport, Layout, PreviewCache, ProjectData};
pub use proxy_render::GenerationOutput;
pub use worker::{WorkerHandle, worker_task};

/// The kinds of background work; a newer request supersedes older ones of the same kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    RefreshPreviews,
    ComputeLayout,
    Generate,
}

impl RequestKind {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            RequestKind::RefreshPreviews => 0,
            RequestKind::ComputeLayout => 1,
            RequestKind::Generate => 2,
        }
    }
}

/// Identifies one request; sequence numbers grow per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId {
    pub kind: RequestKind,
    pub sequence: u64,
}

/// Hands out request ids and remembers the newest one of each kind.
///
/// Results are never preempted; a caller drops any update whose id is no
/// longer current.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: [AtomicU64; RequestKind::COUNT],
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, kind: RequestKind) -> RequestId {
        let sequence = self.latest[kind.index()].fetch_add(1, Ordering::SeqCst) + 1;
        RequestId { kind, sequence }
    }

    pub fn is_current(&self, id: RequestId) -> bool {
        self.latest[id.kind.index()].load(Ordering::SeqCst) == id.sequence
    }
}

/// Commands sent to the worker, each carrying an immutable project snapshot
#[derive(Debug)]
pub enum ProxyCommand {
    RefreshPreviews {
        request: RequestId,
        project: Arc<ProjectData>,
        config: Arc<Config>,
    },
    ComputeLayout {
        request: RequestId,
        project: Arc<ProjectData>,
        config: Arc<Config>,
    },
    Generate {
        request: RequestId,
        project: Arc<ProjectData>,
        config: Arc<Config>,
        output_dir: PathBuf,
    },
}

impl ProxyCommand {
    pub fn request(&self) -> RequestId {
        match self {
            ProxyCommand::RefreshPreviews { request, .. }
            | ProxyCommand::ComputeLayout { request, .. }
            | ProxyCommand::Generate { request, .. } => *request,
        }
    }
}

/// Updates sent from the worker
#[derive(Debug, Clone)]
pub enum ProxyUpdate {
    Progress {
        request: RequestId,
        message: String,
    },
    PreviewsRefreshed {
        request: RequestId,
        cache: Arc<PreviewCache>,
        report: CropReport,
    },
    LayoutComputed {
        request: RequestId,
        layout: Arc<Layout>,
    },
    Generated {
        request: RequestId,
        output: GenerationOutput,
    },
    Error {
        request: RequestId,
        message: String,
    },
}

impl ProxyUpdate {
    pub fn request(&self) -> RequestId {
        match self {
            ProxyUpdate::Progress { request, .. }
            | ProxyUpdate::PreviewsRefreshed { request, .. }
            | ProxyUpdate::LayoutComputed { request, .. }
            | ProxyUpdate::Generated { request, .. }
            | ProxyUpdate::Error { request, .. } => *request,
        }
    }
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Worker is no longer running")]
    WorkerStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_request_supersedes_older() {
        let tracker = RequestTracker::new();
        let first = tracker.issue(RequestKind::ComputeLayout);
        assert!(tracker.is_current(first));

        let second = tracker.issue(RequestKind::ComputeLayout);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn test_kinds_are_tracked_separately() {
        let tracker = RequestTracker::new();
        let layout = tracker.issue(RequestKind::ComputeLayout);
        let previews = tracker.issue(RequestKind::RefreshPreviews);
        assert!(tracker.is_current(layout));
        assert!(tracker.is_current(previews));
    }
}
