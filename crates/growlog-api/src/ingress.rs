//! Ingress pipeline applied to every request before routing.
//!
//! Outermost first: permissive CORS, the access log, then JSON body
//! validation. [`crate::routes::create_router`] stacks them in that order.

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

use crate::error::ApiError;

/// Global request body limit (1 MiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Allow any origin, method and header.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}

/// One INFO line per request with method, path, status and latency in ms.
pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}

/// Reject malformed JSON bodies with 400 before any route sees them.
///
/// Only requests whose content type is `application/json` and whose body is
/// non-empty are inspected. The top-level value must be an object or an
/// array. The buffered body is handed on unchanged.
pub async fn json_body(req: Request, next: Next) -> Result<Response, ApiError> {
    if !is_json_content_type(req.headers()) {
        return Ok(next.run(req).await);
    }

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES).await.map_err(|_| {
        ApiError::PayloadTooLarge(format!(
            "Request body exceeds the {} byte limit",
            MAX_BODY_BYTES
        ))
    })?;

    if !bytes.is_empty() {
        check_json(&bytes)?;
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

fn check_json(bytes: &[u8]) -> Result<(), ApiError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| ApiError::BadRequest(format!("Malformed JSON body: {}", e)))?;
    if !(value.is_object() || value.is_array()) {
        return Err(ApiError::BadRequest(
            "JSON body must be an object or an array".to_string(),
        ));
    }
    Ok(())
}
