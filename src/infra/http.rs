//! Public HTTP surface.
//!
//! One fallback route renders storefront pages for whatever host the request
//! arrived on; the rest is plumbing (health, cache webhooks, and the
//! development reload stream).

use std::{collections::HashMap, convert::Infallible, sync::Arc, time::Instant};

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{
        HeaderMap, Request, StatusCode, Uri,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, HOST, IF_NONE_MATCH},
    },
    middleware::{self, Next},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use metrics::counter;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::application::error::AppError;
use crate::application::pipeline::{RenderPipeline, RenderRequest};
use crate::application::reload::ReloadHub;
use crate::cache::{ChangeEvent, Invalidator};

#[derive(Clone)]
pub struct HttpState {
    pub pipeline: Arc<RenderPipeline>,
    pub invalidator: Arc<Invalidator>,
    pub reload: Arc<ReloadHub>,
    pub development: bool,
    /// Browser cache lifetime for rendered pages, in seconds.
    pub page_max_age_secs: u64,
}

pub fn build_router(state: HttpState) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(health))
        .route("/webhooks/cache", post(cache_webhook));

    if state.development {
        router = router.route("/dev/reload", get(dev_reload));
    }

    router
        .fallback(render_storefront)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
}

async fn health() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Inbound change notifications from the platform's write paths.
async fn cache_webhook(
    State(state): State<HttpState>,
    Json(event): Json<ChangeEvent>,
) -> Response {
    state.invalidator.apply(&event);
    if event.change_type.affects_templates() {
        state.reload.trigger(&event.store_id);
    }
    (
        StatusCode::ACCEPTED,
        Json(json!({ "accepted": true, "eventId": event.id })),
    )
        .into_response()
}

/// SSE stream of per-tenant reload notifications, development only.
async fn dev_reload(State(state): State<HttpState>) -> Response {
    let mut receiver = state.reload.subscribe();
    let stream = async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let data = serde_json::to_string(&event).unwrap_or_default();
                    yield Ok::<_, Infallible>(Event::default().event("reload").data(data));
                }
                // Missing a burst is fine, the browser reloads once either way.
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

async fn render_storefront(
    State(state): State<HttpState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    counter!("vetrina_render_total").increment(1);

    let Some(domain) = request_domain(&headers) else {
        let error = AppError::validation("request carries no Host header");
        return error_response(&error, state.development);
    };

    let request = RenderRequest {
        domain,
        path: uri.path().to_string(),
        query,
    };

    match state.pipeline.render(&request).await {
        Ok(page) => {
            if if_none_match(&headers) == Some(page.etag.as_str()) {
                return not_modified(&page.etag);
            }
            let cache_control = if state.development {
                "no-store".to_string()
            } else {
                format!("public, max-age={}", state.page_max_age_secs)
            };
            (
                StatusCode::OK,
                [
                    (CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
                    (ETAG, page.etag),
                    (CACHE_CONTROL, cache_control),
                ],
                page.html,
            )
                .into_response()
        }
        Err(error) => {
            counter!("vetrina_render_error_total").increment(1);
            match &error {
                AppError::NotFound(detail) => {
                    info!(domain = %request.domain, path = %request.path, detail, "render miss")
                }
                other => {
                    error!(domain = %request.domain, path = %request.path, error = %other, "render failed")
                }
            }
            error_response(&error, state.development)
        }
    }
}

fn request_domain(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(HOST)?.to_str().ok()?;
    let bare = host.rsplit_once(':').map(|(name, _)| name).unwrap_or(host);
    (!bare.is_empty()).then(|| bare.to_string())
}

fn if_none_match(headers: &HeaderMap) -> Option<&str> {
    headers.get(IF_NONE_MATCH)?.to_str().ok()
}

fn not_modified(etag: &str) -> Response {
    (StatusCode::NOT_MODIFIED, [(ETAG, etag.to_string())]).into_response()
}

/// Minimal HTML error document. Internal detail stays server-side outside
/// development.
fn error_response(error: &AppError, development: bool) -> Response {
    let code = error.code();
    let detail = if development {
        error.to_string()
    } else {
        error.public_message().to_string()
    };
    let status = error.status();
    let html = format!(
        "<!doctype html>\n<html>\n<head><title>{status}</title></head>\n<body>\n\
         <h1>{status}</h1>\n<p data-error-code=\"{}\">{}</p>\n</body>\n</html>\n",
        code.as_str(),
        escape_text(&detail),
    );
    (
        status,
        [(CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}

fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if status.is_server_error() {
        error!(
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            elapsed_ms,
            "request failed"
        );
    } else if status.is_client_error() {
        warn!(
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            elapsed_ms,
            "request rejected"
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_header_port_is_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, "shop.example.com:3000".parse().unwrap());
        assert_eq!(request_domain(&headers).as_deref(), Some("shop.example.com"));
    }

    #[test]
    fn missing_host_yields_none() {
        assert_eq!(request_domain(&HeaderMap::new()), None);
    }

    #[test]
    fn production_error_page_hides_detail() {
        let error = AppError::data("connection refused to upstream");
        let response = error_response(&error, false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
