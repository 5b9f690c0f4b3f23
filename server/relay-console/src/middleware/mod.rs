//! Middleware and extractors for request processing

pub mod auth_context;
pub mod request_context;

pub use auth_context::AuthContext;
pub use request_context::{RequestContext, RequestId};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const API_TOKEN_HEADER: &str = "api_access_token";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Request id of the request being handled, if called inside
/// [`request_id_middleware`]
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

/// Adopt the caller's `x-request-id` (or mint one), expose it to handlers and
/// echo it on the response
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= 128)
        .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string);

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = REQUEST_ID.scope(request_id.clone(), next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Request timing middleware
pub async fn request_timing_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri.path(),
        duration_ms = elapsed.as_millis(),
        status = response.status().as_u16(),
        "Request processed"
    );

    response
}

/// CORS for the admin console and the operator widget
///
/// An empty origin list allows any origin.
pub fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(API_TOKEN_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([
            HeaderName::from_static(REQUEST_ID_HEADER),
            axum::http::header::CONTENT_DISPOSITION,
        ]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
