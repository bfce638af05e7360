//! HTTP server for GitHub webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::board::BoardCreator;
use crate::config::Config;
use crate::error::SyncError;
use crate::handlers::{
    handle_issue_event, handle_ping_event, handle_pull_request_event, handle_push_event,
    handle_repository_event,
};
use crate::webhooks::{verify_request, WebhookEvent};

/// Shared application state.
///
/// Constructed once per process and injected into the router; the Wekan
/// context is the only shared mutable machinery (its credential lives
/// behind the auth manager's mutex).
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
    /// Board provisioning context; `None` runs the receiver standalone.
    pub wekan: Option<BoardCreator>,
}

/// Build the HTTP router for the webhook receiver.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/github-webhook", post(github_webhook_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let mut body = json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "wekan_connected": state.wekan.is_some(),
    });
    if state.wekan.is_none() {
        body["mode"] = json!("standalone");
    }
    Json(body)
}

/// Handle incoming GitHub webhooks.
///
/// This handler:
/// 1. Verifies the `X-Hub-Signature-256` header against the shared secret
/// 2. Decodes the payload for the `X-GitHub-Event` type
/// 3. Routes to the matching event handler
pub async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok());

    if !verify_request(
        &body,
        signature,
        &state.config.webhook_secret,
        state.config.signature_policy,
    ) {
        warn!("Invalid webhook signature");
        return SyncError::SignatureInvalid.into_response();
    }

    let event_type = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info!(event_type = %event_type, "Received GitHub webhook event");

    let event = match WebhookEvent::decode(event_type, &body) {
        Ok(event) => event,
        Err(e) => {
            error!(event_type = %event_type, error = ?e, "Failed to decode webhook payload");
            return e.into_response();
        }
    };

    let wekan = state.wekan.as_ref();
    match event {
        WebhookEvent::Issues(event) => handle_issue_event(wekan, &event).await,
        WebhookEvent::PullRequest(event) => handle_pull_request_event(wekan, &event).await,
        WebhookEvent::Push(event) => handle_push_event(wekan, &event).await,
        WebhookEvent::Repository(event) => handle_repository_event(wekan, &event).await,
        WebhookEvent::Ping(event) => handle_ping_event(&event),
        WebhookEvent::Unhandled { event } => {
            info!(event = %event, "Unhandled event type");
            (
                StatusCode::OK,
                Json(json!({ "status": "Event not handled", "event": event })),
            )
                .into_response()
        }
    }
}
