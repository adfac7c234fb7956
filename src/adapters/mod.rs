pub mod client;
pub mod http_handler;

/// Re-export commonly used types from adapters
pub use client::{ClientError, ClientResult, DecoyClient};
pub use http_handler::{StubHandler, build_router};
