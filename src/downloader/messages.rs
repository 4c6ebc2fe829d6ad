//! Per-collection message ring buffer.
//!
//! Spec §3 Collection attaches "a ring-buffer of messages keyed by monotonic
//! id, and a per-collection message mutex" to every collection, alongside
//! §5's note that "per-collection message ring buffers have their own
//! mutex." This mirrors that: each download owns a small ring of recent
//! status/warning/error messages, guarded by its own lock, independent of
//! the `tracing` output that already goes to the process log. The Log RPC
//! (`handlers::handle_log`) and the PostQueue snapshot read from here.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::Mutex;

use crate::types::DownloadId;

/// Messages retained per collection before the oldest is evicted.
const RING_CAPACITY: usize = 500;

/// Severity of a captured collection message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageKind {
    Info,
    Warning,
    Error,
    Detail,
}

/// One entry in a collection's message ring.
#[derive(Debug, Clone)]
pub(crate) struct LogMessage {
    pub(crate) id: i64,
    pub(crate) download_id: DownloadId,
    pub(crate) kind: MessageKind,
    pub(crate) text: String,
    pub(crate) timestamp: i64,
}

/// One collection's ring buffer plus its own mutex (spec §3/§5).
struct MessageRing {
    messages: Mutex<VecDeque<LogMessage>>,
}

impl MessageRing {
    fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
        }
    }

    async fn push(&self, msg: LogMessage) {
        let mut guard = self.messages.lock().await;
        if guard.len() >= RING_CAPACITY {
            guard.pop_front();
        }
        guard.push_back(msg);
    }

    async fn snapshot(&self) -> Vec<LogMessage> {
        self.messages.lock().await.iter().cloned().collect()
    }
}

/// Registry of per-collection message rings, plus the monotonic id generator
/// shared across every collection's messages (spec invariant 5: ids are
/// monotonic per entity class, assigned under one generator).
pub(crate) struct MessageLog {
    next_id: AtomicI64,
    rings: Mutex<HashMap<DownloadId, Arc<MessageRing>>>,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLog {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            rings: Mutex::new(HashMap::new()),
        }
    }

    async fn ring_for(&self, download_id: DownloadId) -> Arc<MessageRing> {
        let mut rings = self.rings.lock().await;
        rings
            .entry(download_id)
            .or_insert_with(|| Arc::new(MessageRing::new()))
            .clone()
    }

    /// Record one message against a collection's ring.
    pub(crate) async fn push(
        &self,
        download_id: DownloadId,
        kind: MessageKind,
        text: impl Into<String>,
    ) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let ring = self.ring_for(download_id).await;
        ring.push(LogMessage {
            id,
            download_id,
            kind,
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp(),
        })
        .await;
    }

    /// Drop a collection's ring once the collection itself is gone (matches
    /// the collection lifecycle in spec §3: it dies when its last handle is
    /// released, and nothing references an already-deleted download's log).
    pub(crate) async fn remove(&self, download_id: DownloadId) {
        self.rings.lock().await.remove(&download_id);
    }

    /// Snapshot the most recent messages across every collection, ordered by
    /// id, truncated to the last `limit` entries (`0` = unbounded). This is
    /// the view the Log RPC serializes.
    pub(crate) async fn recent(&self, limit: usize) -> Vec<LogMessage> {
        let rings = self.rings.lock().await;
        let mut all = Vec::new();
        for ring in rings.values() {
            all.extend(ring.snapshot().await);
        }
        all.sort_by_key(|m| m.id);
        if limit > 0 && all.len() > limit {
            let start = all.len() - limit;
            all.drain(..start);
        }
        all
    }

    /// Snapshot one collection's messages only, most recent last.
    #[cfg(test)]
    pub(crate) async fn for_download(&self, download_id: DownloadId) -> Vec<LogMessage> {
        match self.rings.lock().await.get(&download_id) {
            Some(ring) => ring.snapshot().await,
            None => Vec::new(),
        }
    }
}
