use common::{RequestStatus, TrackedRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// In-flight region requests keyed by request id.
///
/// Holds at most one entry per region: admitting a region drops whatever was
/// tracked for it before. Dropping an entry does not stop the outbound call
/// it belonged to; that call's result is simply never looked up again.
#[derive(Debug, Default)]
pub struct RequestTracker {
    requests: Mutex<HashMap<Uuid, TrackedRequest>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new `processing` request for `region`, superseding older ones.
    pub async fn admit(&self, region: &str) -> Uuid {
        let mut requests = self.requests.lock().await;
        let before = requests.len();
        requests.retain(|_, r| r.region != region);
        let superseded = before - requests.len();
        if superseded > 0 {
            debug!("Superseded {} tracked request(s) for region {}", superseded, region);
        }

        let entry = TrackedRequest::processing(region);
        let id = entry.id;
        requests.insert(id, entry);
        id
    }

    /// Move `id` to a terminal status. Returns false if the entry is gone or
    /// already finished.
    pub async fn finish(&self, id: &Uuid, status: RequestStatus) -> bool {
        let mut requests = self.requests.lock().await;
        match requests.get_mut(id) {
            Some(entry) if entry.status.can_transition_to(status) => {
                entry.status = status;
                true
            }
            _ => false,
        }
    }

    /// Drop every completed or errored entry.
    pub async fn sweep(&self) -> usize {
        let mut requests = self.requests.lock().await;
        let before = requests.len();
        requests.retain(|_, r| !r.status.is_terminal());
        before - requests.len()
    }

    pub async fn get(&self, id: &Uuid) -> Option<TrackedRequest> {
        self.requests.lock().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.requests.lock().await.is_empty()
    }
}

/// Untracks a request whose handler was dropped before it could finish.
pub struct TrackingGuard {
    tracker: Arc<RequestTracker>,
    id: Uuid,
    finished: bool,
}

impl TrackingGuard {
    pub fn new(tracker: Arc<RequestTracker>, id: Uuid) -> Self {
        Self {
            tracker,
            id,
            finished: false,
        }
    }

    pub fn disarm(mut self) {
        self.finished = true;
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let tracker = self.tracker.clone();
        let id = self.id;
        tokio::spawn(async move {
            tracker.finish(&id, RequestStatus::Error).await;
            tracker.sweep().await;
        });
    }
}
