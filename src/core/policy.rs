//! Endpoint identity and response policy types.
//!
//! A registration binds an [`EndpointKey`] (exact path plus normalized HTTP
//! method) to an [`EndpointPolicy`] describing how requests to that endpoint
//! are answered. [`RegistrationRequest`] is the wire shape accepted on
//! `POST /_register` and emitted by the client library.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// HTTP methods a registration may name.
pub const ALLOWED_METHODS: [&str; 6] = ["OPTIONS", "GET", "POST", "PUT", "DELETE", "HEAD"];

/// Errors produced while turning a registration request into a stored policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistrationError {
    /// The registration names an HTTP method outside [`ALLOWED_METHODS`].
    #[error("HTTP method is not allowed")]
    MethodNotAllowed,

    /// The registration body does not describe a usable policy.
    #[error("invalid registration payload: {0}")]
    InvalidPayload(String),
}

/// Identity of a registration: exact path plus normalized HTTP method.
///
/// Two keys are equal iff path and normalized method match exactly. There is
/// no pattern matching and no trailing-slash normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    path: String,
    method: String,
}

impl EndpointKey {
    /// Build a key from a raw path and method. The method is upper-cased and
    /// an empty method defaults to GET.
    pub fn new(path: impl Into<String>, method: &str) -> Self {
        Self {
            path: path.into(),
            method: normalize_method(method),
        }
    }

    /// Like [`EndpointKey::new`], but rejects methods outside
    /// [`ALLOWED_METHODS`].
    pub fn for_registration(
        path: impl Into<String>,
        method: &str,
    ) -> Result<Self, RegistrationError> {
        let method = allowed_method(method)?;
        Ok(Self {
            path: path.into(),
            method,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Key under which the policy is stored in the expiring store.
    pub(crate) fn cache_key(&self) -> String {
        format!("{}-{}-e", self.path, self.method)
    }
}

fn normalize_method(method: &str) -> String {
    if method.is_empty() {
        "GET".to_string()
    } else {
        method.to_ascii_uppercase()
    }
}

fn allowed_method(method: &str) -> Result<String, RegistrationError> {
    let method = normalize_method(method);
    if ALLOWED_METHODS.contains(&method.as_str()) {
        Ok(method)
    } else {
        Err(RegistrationError::MethodNotAllowed)
    }
}

/// `code <= 0` is "unspecified" and resolves to 200 at emission time; codes
/// that do not fit a status line resolve the same way.
pub fn normalize_code(code: i32) -> u16 {
    u16::try_from(code).ok().filter(|c| *c > 0).unwrap_or(200)
}

/// One canned response: a status code plus a JSON object payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseSpec {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl ResponseSpec {
    /// Status code to emit, normalized per [`normalize_code`].
    pub fn status(&self) -> u16 {
        normalize_code(self.code)
    }
}

/// How requests to a registered endpoint are answered.
///
/// Exactly one variant is attached per endpoint; re-registering the same key
/// replaces the whole policy, never merges.
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointPolicy {
    /// Every matching request yields the same response, indefinitely.
    Fixed(ResponseSpec),

    /// Matching requests consume the queue head-first, one response per
    /// request; an exhausted queue answers as if unregistered.
    Sequence(VecDeque<ResponseSpec>),

    /// Fixed payload, status code drawn from a weighted percentage
    /// distribution over explicit codes. The remainder probability maps to
    /// 201 for POST and 200 for other methods.
    ProbabilisticStatus {
        payload: Map<String, Value>,
        /// status code -> percentage weight; weights need not sum to 100
        weights: BTreeMap<u16, u32>,
    },
}

/// Wire shape accepted by `POST /_register`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub endpoint: String,
    #[serde(default)]
    pub http_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<ResponseSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exactly: Option<Vec<ResponseSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code_probabilities: Option<BTreeMap<u16, u32>>,
}

impl RegistrationRequest {
    /// Split into the normalized key and the policy to store.
    ///
    /// A non-empty `response_code_probabilities` wins and borrows
    /// `any.payload` as the shared payload when present; otherwise `any`,
    /// then `exactly`. A registration carrying none of the three fields
    /// cannot answer anything and is rejected.
    pub fn into_parts(self) -> Result<(EndpointKey, EndpointPolicy), RegistrationError> {
        let key = EndpointKey::for_registration(self.endpoint, &self.http_method)?;

        let policy = match (self.any, self.exactly, self.response_code_probabilities) {
            (any, _, Some(weights)) if !weights.is_empty() => EndpointPolicy::ProbabilisticStatus {
                payload: any.map(|spec| spec.payload).unwrap_or_default(),
                weights,
            },
            (Some(spec), _, _) => EndpointPolicy::Fixed(spec),
            (None, Some(responses), _) => EndpointPolicy::Sequence(responses.into()),
            (None, None, _) => {
                return Err(RegistrationError::InvalidPayload(
                    "registration needs one of `any`, `exactly` or `response_code_probabilities`"
                        .to_string(),
                ));
            }
        };

        Ok((key, policy))
    }
}
