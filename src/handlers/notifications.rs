//! # Notification Webhook Handler
//!
//! Receives marketplace push notifications and runs the answering pipeline.
//! The endpoint acknowledges with HTTP 200 in every defined case; the body
//! carries the pipeline's terminal status so operators can see why a
//! notification produced no answer without the provider re-delivering it.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::pipeline::NotificationEvent;
use crate::server::AppState;
use crate::telemetry::{self, TraceContext};

/// Acknowledgement returned for every notification
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    /// `ok`, `ignored` or `error`
    pub status: String,
    /// Machine-readable reason when the pipeline skipped or failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Notification webhook endpoint
#[utoipa::path(
    post,
    path = "/notifications",
    request_body = NotificationEvent,
    responses(
        (status = 200, description = "Notification acknowledged", body = NotificationResponse)
    ),
    tag = "notifications"
)]
pub async fn receive(
    State(state): State<AppState>,
    Json(event): Json<NotificationEvent>,
) -> Json<NotificationResponse> {
    let context = TraceContext::generate();
    let trace_id = context.trace_id.clone();

    let outcome = telemetry::with_trace_context(context, async {
        info!(
            trace_id = %trace_id,
            topic = %event.topic,
            user_id = event.user_id,
            resource = %event.resource,
            "notification received"
        );
        state.orchestrator.handle(&event).await
    })
    .await;

    Json(NotificationResponse {
        status: outcome.status().to_string(),
        reason: outcome.reason().map(str::to_owned),
    })
}
