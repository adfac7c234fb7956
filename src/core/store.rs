//! Expiring key-value store backing the endpoint registry and the
//! request-history log.
//!
//! Entries are replaced wholesale under `scc`'s per-entry lock and age out
//! after a fixed time-to-live. An expired entry behaves as absent the moment
//! its deadline passes; physical removal happens on the periodic sweep the
//! composition root drives via [`ExpiringStore::evict_expired`].

use std::time::{Duration, Instant};

use scc::{HashMap, hash_map::Entry as MapEntry};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent map from string key to `V` with per-entry time-to-live.
pub struct ExpiringStore<V> {
    entries: HashMap<String, Entry<V>>,
    ttl: Duration,
}

impl<V: Clone> ExpiringStore<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Insert or overwrite `key`, stamping a fresh TTL.
    pub async fn put(&self, key: String, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        match self.entries.entry_async(key).await {
            MapEntry::Occupied(mut occupied) => {
                *occupied.get_mut() = entry;
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert_entry(entry);
            }
        }
    }

    /// Clone the live value under `key`. Expired entries are absent.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .read_async(key, |_, entry| {
                (entry.expires_at > now).then(|| entry.value.clone())
            })
            .await
            .flatten()
    }

    /// Run `f` on the live value under `key` while holding the entry lock,
    /// then stamp a fresh TTL. Returns `None` without calling `f` when the
    /// entry is missing or expired.
    ///
    /// The entry lock makes a compound read-modify-write (such as popping
    /// the head of a queue and persisting the remainder) atomic with respect
    /// to concurrent callers.
    pub async fn update<R>(&self, key: &str, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let now = Instant::now();
        let ttl = self.ttl;
        self.entries
            .update_async(key, |_, entry| {
                if entry.expires_at <= now {
                    return None;
                }
                let out = f(&mut entry.value);
                entry.expires_at = now + ttl;
                Some(out)
            })
            .await
            .flatten()
    }

    /// Snapshot every live `(key, value)` pair. Iteration order is
    /// unspecified; callers needing an order must sort.
    pub async fn snapshot(&self) -> Vec<(String, V)> {
        let now = Instant::now();
        let mut out = Vec::new();
        self.entries
            .any_async(|key, entry| {
                if entry.expires_at > now {
                    out.push((key.clone(), entry.value.clone()));
                }
                false
            })
            .await;
        out
    }

    /// Drop every entry immediately.
    pub async fn flush(&self) {
        self.entries.clear_async().await;
    }

    /// Physically remove entries whose deadline has passed.
    pub async fn evict_expired(&self) {
        let now = Instant::now();
        self.entries
            .retain_async(|_, entry| entry.expires_at > now)
            .await;
    }

    /// Stored entry count, including expired entries not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
