//! Webhook endpoint handlers.
//!
//! The GitHub handler runs the whole pipeline inline, one request per task:
//! 1. Verify the signature (when a secret is configured)
//! 2. Acknowledge `ping`
//! 3. Extract the event and run every trigger rule
//! 4. Forward the raw payload

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::deliver::{forward_payload, DeliveryEngine, JenkinsClient};
use crate::error::TriggerError;
use crate::event::{extract_event, types::EVENT_HEADER, EventKind};
use crate::trigger::TriggerOrchestrator;
use crate::web::signature::{verify_signature, SIGNATURE_256_HEADER, SIGNATURE_HEADER};

const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
    pub engine: DeliveryEngine,
}

impl AppState {
    pub fn new(config: Config, client: reqwest::Client) -> Self {
        let engine = DeliveryEngine::new(JenkinsClient::new(client.clone(), &config.jenkins));
        Self {
            config: Arc::new(config),
            client,
            engine,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// GitHub Webhook
// =============================================================================

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<bool>,
}

impl WebhookResponse {
    fn status(status: &'static str) -> Self {
        Self {
            status,
            triggered: None,
            failed: None,
            halted: None,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Map request-fatal errors onto the status the caller sees.
pub fn error_status(err: &TriggerError) -> StatusCode {
    match err {
        TriggerError::SignatureMismatch => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: TriggerError) -> (StatusCode, Json<WebhookResponse>) {
    let status = match err {
        TriggerError::SignatureMismatch => "unauthorized",
        _ => "error",
    };
    (error_status(&err), Json(WebhookResponse::status(status)))
}

/// GitHub webhook endpoint.
pub async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event_name = header_str(&headers, EVENT_HEADER);
    let kind = EventKind::from_header(event_name);

    info!(
        event = %event_name,
        delivery = %header_str(&headers, DELIVERY_HEADER),
        body_length = body.len(),
        "github_webhook_received"
    );

    if let Some(secret) = state.config.secret.as_deref() {
        let signature = match header_str(&headers, SIGNATURE_HEADER) {
            "" => header_str(&headers, SIGNATURE_256_HEADER),
            sha1 => sha1,
        };
        if !verify_signature(secret.as_bytes(), signature, &body) {
            warn!(event = %event_name, "github_signature_invalid");
            return reject(TriggerError::SignatureMismatch);
        }
    } else {
        debug!("github_signature_unverified");
    }

    if kind == EventKind::Ping {
        info!("github_ping_acknowledged");
        return (StatusCode::OK, Json(WebhookResponse::status("pong")));
    }

    let event = match extract_event(&body, kind) {
        Ok(event) => event,
        Err(e) => {
            error!(event = %event_name, error = %e, "github_payload_rejected");
            return reject(e);
        }
    };

    let report = TriggerOrchestrator::new(&state.config, &state.engine)
        .process(&event, &state.config.rules)
        .await;

    if let Err(e) = forward_payload(&state.client, &state.config.forward, &body, &headers).await {
        error!(error = %e, "github_forward_failed");
        return reject(e);
    }

    (
        StatusCode::OK,
        Json(WebhookResponse {
            status: "processed",
            triggered: Some(report.triggered()),
            failed: Some(report.failed()),
            halted: Some(report.halted),
        }),
    )
}
