//! Dynamic endpoint registry: maps (path, method) to a response policy.

use std::time::Duration;

use crate::core::{
    policy::{EndpointKey, EndpointPolicy, ResponseSpec},
    store::ExpiringStore,
};

/// Holds at most one [`EndpointPolicy`] per [`EndpointKey`], each entry
/// aging out after the registry TTL.
///
/// Owned by the composition root and shared by handle, never ambient, so
/// independent server instances can coexist in one process.
pub struct EndpointRegistry {
    store: ExpiringStore<EndpointPolicy>,
}

impl EndpointRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: ExpiringStore::new(ttl),
        }
    }

    /// Store `policy` under the normalized key, unconditionally replacing
    /// any prior entry.
    pub async fn register(&self, key: &EndpointKey, policy: EndpointPolicy) {
        self.store.put(key.cache_key(), policy).await;
    }

    /// Pure read. May return a `Sequence` whose queue is already empty; the
    /// resolver treats that the same as absent.
    pub async fn lookup(&self, key: &EndpointKey) -> Option<EndpointPolicy> {
        self.store.get(&key.cache_key()).await
    }

    /// Pop the head of a `Sequence` policy and persist the shorter queue,
    /// refreshing the entry TTL. Pop and write-back happen under the entry
    /// lock, so concurrent requests drain the queue in strict FIFO order
    /// with no response skipped or duplicated.
    ///
    /// Returns `None` when the entry is missing, expired, no longer a
    /// sequence, or already drained.
    pub async fn consume_next(&self, key: &EndpointKey) -> Option<ResponseSpec> {
        self.store
            .update(&key.cache_key(), |policy| match policy {
                EndpointPolicy::Sequence(queue) => queue.pop_front(),
                _ => None,
            })
            .await
            .flatten()
    }

    /// Remove every registration immediately.
    pub async fn flush(&self) {
        self.store.flush().await;
    }

    /// Physically remove aged-out registrations.
    pub async fn evict_expired(&self) {
        self.store.evict_expired().await;
    }

    /// Registered entry count, including expired entries not yet swept.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use serde_json::json;

    use super::*;

    fn spec(code: i32, n: u64) -> ResponseSpec {
        let payload = match json!({"n": n}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        ResponseSpec { code, payload }
    }

    #[tokio::test]
    async fn register_then_lookup_round_trips() {
        let registry = EndpointRegistry::new(Duration::from_secs(60));
        let key = EndpointKey::new("/api/test", "POST");

        registry
            .register(&key, EndpointPolicy::Fixed(spec(201, 1)))
            .await;

        assert_eq!(
            registry.lookup(&key).await,
            Some(EndpointPolicy::Fixed(spec(201, 1)))
        );
        assert_eq!(registry.lookup(&EndpointKey::new("/api/test", "GET")).await, None);
    }

    #[tokio::test]
    async fn re_registration_replaces_the_whole_policy() {
        let registry = EndpointRegistry::new(Duration::from_secs(60));
        let key = EndpointKey::new("/api/test", "GET");

        registry
            .register(
                &key,
                EndpointPolicy::Sequence(VecDeque::from([spec(200, 1), spec(200, 2)])),
            )
            .await;
        registry
            .register(&key, EndpointPolicy::Fixed(spec(200, 9)))
            .await;

        assert_eq!(
            registry.lookup(&key).await,
            Some(EndpointPolicy::Fixed(spec(200, 9)))
        );
        // no residual queue items survive the replacement
        assert_eq!(registry.consume_next(&key).await, None);
    }

    #[tokio::test]
    async fn consume_next_drains_head_first_and_shrinks_the_stored_queue() {
        let registry = EndpointRegistry::new(Duration::from_secs(60));
        let key = EndpointKey::new("/api/test", "GET");

        registry
            .register(
                &key,
                EndpointPolicy::Sequence(VecDeque::from([spec(200, 1), spec(200, 2)])),
            )
            .await;

        assert_eq!(registry.consume_next(&key).await, Some(spec(200, 1)));
        match registry.lookup(&key).await {
            Some(EndpointPolicy::Sequence(queue)) => assert_eq!(queue.len(), 1),
            other => panic!("expected a sequence policy, got {other:?}"),
        }

        assert_eq!(registry.consume_next(&key).await, Some(spec(200, 2)));
        assert_eq!(registry.consume_next(&key).await, None);
    }

    #[tokio::test]
    async fn consume_next_ignores_non_sequence_policies() {
        let registry = EndpointRegistry::new(Duration::from_secs(60));
        let key = EndpointKey::new("/api/test", "GET");

        registry
            .register(&key, EndpointPolicy::Fixed(spec(200, 1)))
            .await;

        assert_eq!(registry.consume_next(&key).await, None);
        // the fixed policy is untouched
        assert_eq!(
            registry.lookup(&key).await,
            Some(EndpointPolicy::Fixed(spec(200, 1)))
        );
    }

    #[tokio::test]
    async fn flush_removes_everything() {
        let registry = EndpointRegistry::new(Duration::from_secs(60));
        let key = EndpointKey::new("/api/test", "GET");

        registry
            .register(&key, EndpointPolicy::Fixed(spec(200, 1)))
            .await;
        registry.flush().await;

        assert!(registry.is_empty());
        assert_eq!(registry.lookup(&key).await, None);
    }
}
