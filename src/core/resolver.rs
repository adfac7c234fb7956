//! Response resolution: decides the status and payload for a dynamic
//! request, advances stateful policies and records the observation.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use rand::Rng;
use serde_json::Value;

use crate::core::{
    history::{HistoryLog, RequestEvent},
    policy::{EndpointKey, EndpointPolicy, ResponseSpec},
    registry::EndpointRegistry,
};

/// What a dynamic request resolves to: the status to emit and, for hits,
/// the canned JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub status: u16,
    pub payload: Option<Value>,
}

impl Resolution {
    fn hit(spec: ResponseSpec) -> Self {
        Self {
            status: spec.status(),
            payload: Some(Value::Object(spec.payload)),
        }
    }
}

/// Decision core shared by every dynamic-request handler.
///
/// Every resolution appends a [`RequestEvent`] before the caller gets the
/// outcome, so the history window reflects misses and I/O failures as well
/// as hits.
pub struct ResponseResolver {
    registry: Arc<EndpointRegistry>,
    history: Arc<HistoryLog>,
}

impl ResponseResolver {
    pub fn new(registry: Arc<EndpointRegistry>, history: Arc<HistoryLog>) -> Self {
        Self { registry, history }
    }

    /// Resolve one dynamic request and record it.
    pub async fn resolve(
        &self,
        key: &EndpointKey,
        body: &str,
        headers: &HashMap<String, Vec<String>>,
    ) -> Resolution {
        let resolution = match self.registry.lookup(key).await {
            None => self.miss(key),
            Some(EndpointPolicy::Fixed(spec)) => Resolution::hit(spec),
            Some(EndpointPolicy::Sequence(_)) => match self.registry.consume_next(key).await {
                Some(spec) => Resolution::hit(spec),
                // drained (or replaced concurrently): behaves as unregistered
                None => self.miss(key),
            },
            Some(EndpointPolicy::ProbabilisticStatus { payload, weights }) => Resolution {
                status: draw_status(&weights, key.method()),
                payload: Some(Value::Object(payload)),
            },
        };

        self.record(key, body.to_string(), headers.clone(), &resolution)
            .await;
        resolution
    }

    /// The inbound body could not be read: resolve to 500 and record the
    /// failure with an empty body so it stays visible in history.
    pub async fn resolve_read_failure(
        &self,
        key: &EndpointKey,
        headers: &HashMap<String, Vec<String>>,
    ) -> Resolution {
        let resolution = Resolution {
            status: 500,
            payload: None,
        };
        self.record(key, String::new(), headers.clone(), &resolution)
            .await;
        resolution
    }

    fn miss(&self, key: &EndpointKey) -> Resolution {
        tracing::debug!("{} has no {} endpoint", key.path(), key.method());
        Resolution {
            status: 404,
            payload: None,
        }
    }

    async fn record(
        &self,
        key: &EndpointKey,
        body: String,
        headers: HashMap<String, Vec<String>>,
        resolution: &Resolution,
    ) {
        self.history
            .append(RequestEvent {
                endpoint: key.path().to_string(),
                body,
                headers,
                response_status: resolution.status,
                response_body: resolution.payload.clone(),
            })
            .await;
    }
}

/// Draw a status code from a weighted percentage distribution: a uniform
/// draw in [0, 100) walks the weights in ascending status-code order until
/// the cumulative sum exceeds the draw. The remainder maps to 201 for POST
/// and 200 otherwise.
fn draw_status(weights: &BTreeMap<u16, u32>, method: &str) -> u16 {
    let draw = rand::rng().random_range(0..100u32);
    let mut cumulative = 0u32;
    for (status, weight) in weights {
        cumulative = cumulative.saturating_add(*weight);
        if cumulative > draw {
            return *status;
        }
    }
    if method == "POST" { 201 } else { 200 }
}
