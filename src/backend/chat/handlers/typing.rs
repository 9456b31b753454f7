/**
 * Typing Indicator Handler
 *
 * # Event Flow
 *
 * 1. Client posts a typing event (started/stopped typing)
 * 2. Server publishes it on the `typing` topic
 * 3. Every live channel receives it; the peer's client shows or hides
 *    the indicator
 *
 * Typing events are transient and never persisted.
 */

use axum::{extract::State, response::Json};

use crate::backend::error::BackendError;
use crate::realtime::SyncHub;
use crate::shared::api::PublishResponse;
use crate::shared::{SyncEvent, TypingEvent};

/// Handle typing indicator event (POST /api/typing)
///
/// ```http
/// POST /api/typing HTTP/1.1
/// Content-Type: application/json
///
/// {"participantId":"user1","isTyping":true}
/// ```
pub async fn handle_typing_event(
    State(hub): State<SyncHub>,
    Json(event): Json<TypingEvent>,
) -> Result<Json<PublishResponse>, BackendError> {
    tracing::debug!("[Typing] {} typing={}", event.participant_id, event.is_typing);
    let delivered = hub.publish(SyncEvent::Typing(event))?;
    Ok(Json(PublishResponse { delivered }))
}
