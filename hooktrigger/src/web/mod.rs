//! Web server module for receiving GitHub webhooks.
//!
//! - `POST /` receives webhooks, verifies them and runs the trigger rules
//! - `GET /health` answers liveness probes

pub mod handlers;
pub mod signature;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{github_webhook, health, AppState, HealthResponse, WebhookResponse};
pub use signature::verify_signature;

/// Build the application router.
///
/// Webhook bodies are read whole, with no size cap.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(github_webhook))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
