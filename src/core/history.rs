//! Rolling log of observed dynamic requests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::store::ExpiringStore;

/// One observed request to a dynamic endpoint together with the response
/// the resolver produced for it. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestEvent {
    pub endpoint: String,
    pub body: String,
    pub headers: HashMap<String, Vec<String>>,
    pub response_status: u16,
    pub response_body: Option<Value>,
}

/// Append-only log of [`RequestEvent`]s with a short TTL: a rolling debug
/// window, not an audit log.
pub struct HistoryLog {
    store: ExpiringStore<RequestEvent>,
    seq: AtomicU64,
}

impl HistoryLog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: ExpiringStore::new(ttl),
            seq: AtomicU64::new(0),
        }
    }

    /// Record one event under a fresh monotonically-increasing key.
    pub async fn append(&self, event: RequestEvent) {
        self.store.put(self.next_key(), event).await;
    }

    /// Every live event, ascending by creation order. The backing store
    /// iterates in unspecified order, so events are re-sorted by key.
    pub async fn all(&self) -> Vec<RequestEvent> {
        let mut entries = self.store.snapshot().await;
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries.into_iter().map(|(_, event)| event).collect()
    }

    /// Drop every recorded event immediately.
    pub async fn flush(&self) {
        self.store.flush().await;
    }

    /// Physically remove aged-out events.
    pub async fn evict_expired(&self) {
        self.store.evict_expired().await;
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Timestamp-derived key; the sequence counter orders events created
    /// within the same nanosecond tick.
    fn next_key(&self) -> String {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        format!("{nanos:020}-{seq:012}")
    }
}
