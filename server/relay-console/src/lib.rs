//! Relay Console server - admin API for a multi-tenant support desk
//!
//! Serves account administration, per-tenant inboxes, agents, teams and
//! labels, and the admin audit log endpoints. Every change made through the
//! API is appended to the hash-chained audit trail from `audit-engine`.

pub mod auth;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use error::*;
pub use server::ConsoleServer;

use axum::{middleware::from_fn, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Create the application router with all routes and middleware
pub fn create_app(server: ConsoleServer) -> Router {
    let timeout = Duration::from_secs(server.settings.server.request_timeout_secs);
    let cors = middleware::create_cors_layer(&server.settings.server.cors_allowed_origins);

    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(middleware::request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout))
                .layer(cors)
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
