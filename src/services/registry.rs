//! Registry of in-flight captures, owned by a single engine instance.
//!
//! `release` is the only way a handle leaves the registry. Whoever releases
//! a recording's handle is the one allowed to finalize it, so every
//! recording is cleared and transitioned exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::capture::CaptureProgress;

/// Handle to a running capture
#[derive(Debug)]
pub struct ActiveCapture {
    pub channel_id: String,
    pub channel_name: String,
    /// Cancelled on explicit stop or delete
    pub cancel: CancellationToken,
    pub progress: CaptureProgress,
    /// Resolves once the capture task has flushed its file and exited
    pub finished: oneshot::Receiver<()>,
}

#[derive(Clone, Default)]
pub struct ActiveRecordings {
    inner: Arc<Mutex<HashMap<String, ActiveCapture>>>,
}

impl ActiveRecordings {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ActiveCapture>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a capture. Returns false (and drops nothing) if the id is taken.
    pub fn register(&self, recording_id: &str, capture: ActiveCapture) -> bool {
        let mut map = self.lock();
        if map.contains_key(recording_id) {
            return false;
        }
        map.insert(recording_id.to_string(), capture);
        true
    }

    pub fn is_active(&self, recording_id: &str) -> bool {
        self.lock().contains_key(recording_id)
    }

    /// Bytes captured so far for an active recording
    pub fn bytes_written(&self, recording_id: &str) -> Option<u64> {
        self.lock()
            .get(recording_id)
            .map(|c| c.progress.bytes_written())
    }

    pub fn is_channel_active(&self, channel_id: &str) -> bool {
        self.lock().values().any(|c| c.channel_id == channel_id)
    }

    /// Remove and return a capture handle
    pub fn release(&self, recording_id: &str) -> Option<ActiveCapture> {
        self.lock().remove(recording_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
