//! Decoy - a stub HTTP API server for integration testing.
//!
//! Decoy answers real HTTP requests with canned responses. Test code (or a
//! human with curl) registers a fake endpoint - a path plus method - together
//! with a response policy, and every subsequent request to that endpoint is
//! answered from the policy while being recorded in a short-lived history
//! window for inspection.
//!
//! # Features
//! - Fixed responses: one status/payload, served indefinitely
//! - Scripted sequences: one response per request, head first, 404 when drained
//! - Probability-weighted status codes over a shared payload
//! - Rolling request history with a deliberately short TTL
//! - Control surface on `/_`, `/_register`, `/_history`, `/_reset`
//! - Registrations age out automatically; `/_reset` flushes everything at once
//! - Structured tracing via `tracing` & graceful shutdown
//!
//! # Quick Example
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use decoy::{
//!     adapters::{StubHandler, build_router},
//!     core::{EndpointRegistry, HistoryLog},
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let registry = Arc::new(EndpointRegistry::new(Duration::from_secs(300)));
//! let history = Arc::new(HistoryLog::new(Duration::from_secs(10)));
//! let app = build_router(Arc::new(StubHandler::new(registry, history)));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! Business logic lives in `core` (registry, resolver, history, expiring
//! store, route classification); `adapters` holds the axum handler and the
//! reqwest-based test client. Registry and history are owned by the
//! composition root and passed by handle - never ambient globals - so
//! multiple independent server instances can coexist in tests.
//!
//! # Error Handling
//! Fallible APIs return `eyre::Result<T>` or a domain specific error type
//! (`RegistrationError`, `ClientError`, `ValidationError`).
//!
//! # Concurrency & Data Structures
//! Shared state sits in `scc::HashMap` based expiring stores. The only
//! compound read-modify-write - popping the head of a scripted sequence and
//! persisting the remainder - happens under the store's per-entry lock, so
//! concurrent requests drain sequences in strict FIFO order.
// Re-export public modules with explicit visibility controls
pub mod adapters;
pub mod config;
pub mod core;
pub mod tracing_setup;
pub mod utils;

// Re-export the specific types needed by the binary crate and test code
pub use crate::{
    adapters::{DecoyClient, StubHandler, build_router},
    core::{
        EndpointKey, EndpointPolicy, EndpointRegistry, HistoryLog, RegistrationRequest,
        RequestEvent, ResponseResolver, ResponseSpec,
    },
    utils::GracefulShutdown,
};
