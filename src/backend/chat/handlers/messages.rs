/**
 * Message Handlers
 *
 * `GET /api/messages` returns the full history in ascending timestamp
 * order. `POST /api/messages` persists a new message, runs the
 * notification gate and broadcasts it; the response is the canonical
 * record with its server-assigned id and timestamp.
 *
 * # Example Request
 *
 * ```http
 * POST /api/messages HTTP/1.1
 * Content-Type: application/json
 *
 * {"sender":"user2","content":"hello","contentType":"text"}
 * ```
 */

use axum::{extract::State, http::StatusCode, response::Json};

use crate::backend::error::BackendError;
use crate::realtime::SyncHub;
use crate::shared::{Message, NewMessage};

pub async fn list_messages(State(hub): State<SyncHub>) -> Result<Json<Vec<Message>>, BackendError> {
    let messages = hub.history().await?;
    tracing::debug!("[Messages] Returning {} messages", messages.len());
    Ok(Json(messages))
}

pub async fn send_message(
    State(hub): State<SyncHub>,
    Json(draft): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), BackendError> {
    tracing::info!("[Messages] New {} message from {}", draft.content_kind.as_str(), draft.sender);
    let message = hub.send_message(draft).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
