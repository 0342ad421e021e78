//! Frame scheduling seam for the playback clock.
//!
//! A scheduler issues one-shot [`FrameRequest`]s. When a request fires, the
//! host hands `(request, timestamp)` to [`crate::EditorStore::on_frame`].
//! Timestamps are monotonic seconds from an arbitrary origin.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Opaque handle for one pending frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRequest(u64);

impl FrameRequest {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Registers "next frame" callbacks and cancels them before they fire.
pub trait FrameScheduler: Send {
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
}

// =============================================================================
// Manual scheduler
// =============================================================================

/// Cancelled requests kept for inspection; older entries are dropped.
const CANCELLED_HISTORY: usize = 64;

#[derive(Debug, Default)]
struct ManualState {
    next_id: u64,
    pending: Vec<FrameRequest>,
    cancelled: VecDeque<FrameRequest>,
}

/// Deterministic scheduler driven by the caller.
///
/// Clones share state, so a host (or test) can keep one clone to inspect
/// pending requests while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that have been issued and neither fired nor cancelled.
    pub fn pending(&self) -> Vec<FrameRequest> {
        self.lock().pending.clone()
    }

    /// The most recent cancellations, oldest first.
    pub fn cancelled(&self) -> Vec<FrameRequest> {
        self.lock().cancelled.iter().copied().collect()
    }

    /// Take the oldest pending request, marking it as fired.
    pub fn fire_next(&self) -> Option<FrameRequest> {
        let mut state = self.lock();
        if state.pending.is_empty() {
            None
        } else {
            Some(state.pending.remove(0))
        }
    }

    /// A panic while holding the lock leaves the bookkeeping intact, so keep using it.
    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Manual scheduler lock poisoned, recovering state");
            poisoned.into_inner()
        })
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        let mut state = self.lock();
        state.next_id += 1;
        let request = FrameRequest(state.next_id);
        state.pending.push(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        let mut state = self.lock();
        state.pending.retain(|pending| *pending != request);
        if state.cancelled.len() == CANCELLED_HISTORY {
            state.cancelled.pop_front();
        }
        state.cancelled.push_back(request);
    }
}

// =============================================================================
// Tokio scheduler
// =============================================================================

/// A fired frame callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    pub request: FrameRequest,
    /// Seconds since the scheduler was created.
    pub timestamp: f64,
}

/// Real-time scheduler: each request is a tokio task that sleeps one frame
/// interval and then posts a [`FrameTick`] to the receiver returned by
/// [`TokioFrameScheduler::new`]. Must be used from within a tokio runtime.
pub struct TokioFrameScheduler {
    interval: Duration,
    origin: Instant,
    next_id: u64,
    pending: HashMap<FrameRequest, JoinHandle<()>>,
    sender: mpsc::UnboundedSender<FrameTick>,
}

impl TokioFrameScheduler {
    pub fn new(interval: Duration) -> (Self, mpsc::UnboundedReceiver<FrameTick>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            interval,
            origin: Instant::now(),
            next_id: 0,
            pending: HashMap::new(),
            sender,
        };
        (scheduler, receiver)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.values().filter(|task| !task.is_finished()).count()
    }
}

impl FrameScheduler for TokioFrameScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        self.pending.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let request = FrameRequest(self.next_id);
        let interval = self.interval;
        let origin = self.origin;
        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let timestamp = origin.elapsed().as_secs_f64();
            let _ = sender.send(FrameTick { request, timestamp });
        });
        self.pending.insert(request, task);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if let Some(task) = self.pending.remove(&request) {
            task.abort();
        }
    }
}

impl Drop for TokioFrameScheduler {
    fn drop(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }
    }
}
