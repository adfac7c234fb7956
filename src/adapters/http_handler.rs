//! Axum-facing request handler: classifies control routes, registers
//! policies, serves canned responses and exposes the history window.

use std::{collections::HashMap, convert::Infallible, sync::Arc};

use axum::{
    Router,
    body::Body as AxumBody,
    http::{HeaderMap, StatusCode, header},
    routing::any,
};
use eyre::{Result, WrapErr};
use http_body_util::BodyExt;
use hyper::{Request, Response};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::core::{
    EndpointKey, EndpointRegistry, HistoryLog, RegistrationError, RegistrationRequest,
    ResponseResolver,
    router::{self, RouteKind},
};

/// HTTP handler for the Decoy stub server.
///
/// One instance owns the registry, history log and resolver; route closures
/// receive it behind an `Arc`. Nothing here is process-global, so
/// independent server instances can coexist in one process.
pub struct StubHandler {
    registry: Arc<EndpointRegistry>,
    history: Arc<HistoryLog>,
    resolver: ResponseResolver,
}

impl StubHandler {
    pub fn new(registry: Arc<EndpointRegistry>, history: Arc<HistoryLog>) -> Self {
        let resolver = ResponseResolver::new(registry.clone(), history.clone());
        Self {
            registry,
            history,
            resolver,
        }
    }

    /// Main request handler: dispatch to a control handler or the dynamic
    /// fallback.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Result<Response<AxumBody>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        tracing::debug!(%method, %path, "handling request");

        match router::classify(&path) {
            RouteKind::Home => self.handle_home(),
            RouteKind::Register => self.handle_register(req).await,
            RouteKind::History => self.handle_history().await,
            RouteKind::Reset => self.handle_reset().await,
            RouteKind::Dynamic => self.handle_dynamic(req).await,
        }
    }

    /// Static service descriptor.
    fn handle_home(&self) -> Result<Response<AxumBody>> {
        render_json(
            200,
            Some(json!({
                "app_name": "decoy",
                "version": env!("CARGO_PKG_VERSION"),
                "details": "Fake JSON API response",
            })),
        )
    }

    async fn handle_register(&self, req: Request<AxumBody>) -> Result<Response<AxumBody>> {
        let bytes = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read registration body");
                return render_json(400, None);
            }
        };

        let registration: RegistrationRequest = match serde_json::from_slice(&bytes) {
            Ok(registration) => registration,
            Err(e) => {
                let error = RegistrationError::InvalidPayload(e.to_string());
                tracing::warn!(%error, "rejecting registration");
                return render_json(400, None);
            }
        };

        match registration.into_parts() {
            Ok((key, policy)) => {
                self.registry.register(&key, policy).await;
                tracing::info!(
                    path = key.path(),
                    method = key.method(),
                    "registered endpoint"
                );
                render_json(200, Some(json!({"text": "cool"})))
            }
            Err(error) => {
                tracing::warn!(%error, "rejecting registration");
                render_json(400, None)
            }
        }
    }

    async fn handle_history(&self) -> Result<Response<AxumBody>> {
        let events = self.history.all().await;
        let payload = serde_json::to_value(events).wrap_err("Failed to encode history")?;
        render_json(200, Some(payload))
    }

    async fn handle_reset(&self) -> Result<Response<AxumBody>> {
        self.history.flush().await;
        self.registry.flush().await;
        tracing::info!("registry and history flushed");
        render_json(200, None)
    }

    async fn handle_dynamic(&self, req: Request<AxumBody>) -> Result<Response<AxumBody>> {
        let (parts, body) = req.into_parts();
        let key = EndpointKey::new(parts.uri.path(), parts.method.as_str());
        let headers = header_map(&parts.headers);

        let resolution = match body.collect().await {
            Ok(collected) => {
                let body = String::from_utf8_lossy(&collected.to_bytes()).into_owned();
                self.resolver.resolve(&key, &body, &headers).await
            }
            Err(e) => {
                tracing::warn!(error = %e, path = key.path(), "failed to read request body");
                self.resolver.resolve_read_failure(&key, &headers).await
            }
        };

        render_json(resolution.status, resolution.payload)
    }
}

/// Build the axum router: every path funnels through
/// [`StubHandler::handle_request`]; route classification happens inside.
pub fn build_router(handler: Arc<StubHandler>) -> Router {
    let make_request_route = |handler: Arc<StubHandler>| {
        any(move |req: Request<AxumBody>| {
            let handler = handler.clone();
            async move {
                match handler.handle_request(req).await {
                    Ok(response) => Ok::<Response<AxumBody>, Infallible>(response),
                    Err(e) => {
                        tracing::error!("Request handling error: {:?}", e);
                        let error_response = Response::builder()
                            .status(500)
                            .body(AxumBody::from("Internal Server Error"))
                            .unwrap_or_else(|_| {
                                Response::new(AxumBody::from("Internal Server Error"))
                            });
                        Ok(error_response)
                    }
                }
            }
        })
    };

    Router::new()
        .route("/", make_request_route(handler.clone()))
        .route("/{*path}", make_request_route(handler))
        .layer(TraceLayer::new_for_http())
}

fn header_map(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        out.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}

/// Build the HTTP response for `status` and an optional JSON payload,
/// applying the envelope rule: any status >= 400, or 204, is emitted as a
/// plain empty response with no JSON body.
fn render_json(status: u16, payload: Option<Value>) -> Result<Response<AxumBody>> {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.as_u16() >= 400 || status == StatusCode::NO_CONTENT {
        return Response::builder()
            .status(status)
            .body(AxumBody::empty())
            .wrap_err("Failed to build error response");
    }

    let Some(payload) = payload else {
        return Response::builder()
            .status(status)
            .body(AxumBody::empty())
            .wrap_err("Failed to build empty response");
    };

    let body = serde_json::to_vec(&payload).wrap_err("Failed to encode response payload")?;
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(AxumBody::from(body))
        .wrap_err("Failed to build JSON response")
}
