use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::{extract::State, routing::post, Router};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use uuid::Uuid;

use bento_agent::ConversationRuntime;
use bento_line::signature;
use bento_line::WebhookBody;

const SIGNATURE_HEADER: &str = "x-line-signature";

#[derive(Clone)]
pub struct WebhookState {
    pub runtime: Arc<ConversationRuntime>,
    pub channel_secret: SecretString,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/webhook", post(handle_webhook)).with_state(state)
}

/// Verifies the platform signature, parses the batch, and runs every event
/// to completion. A failing event answers its own user with an apology
/// inside `ConversationRuntime::process`, so the batch always finishes.
async fn handle_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !signature::verify(state.channel_secret.expose_secret(), &body, provided) {
        warn!(
            event_name = "ingress.webhook.signature_rejected",
            "webhook signature verification failed"
        );
        return StatusCode::UNAUTHORIZED;
    }

    let parsed = match WebhookBody::parse(&body) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(
                event_name = "ingress.webhook.body_rejected",
                error = %error,
                "webhook body was not decodable"
            );
            return StatusCode::BAD_REQUEST;
        }
    };

    for event in parsed.into_inbound_events() {
        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "ingress.webhook.event_received",
            correlation_id = %correlation_id,
            event_kind = event.kind(),
            "received webhook event"
        );
        state.runtime.process(event, &correlation_id).await;
    }

    StatusCode::OK
}
