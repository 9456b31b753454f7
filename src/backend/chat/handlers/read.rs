use axum::{extract::State, response::Json};

use crate::backend::error::BackendError;
use crate::realtime::SyncHub;
use crate::shared::api::{MarkReadRequest, MarkReadResponse};

/// Set the durable read flag (`POST /api/messages/read`)
///
/// Ids that match no stored message are ignored; `updated` counts the
/// records the store confirmed.
pub async fn mark_read(
    State(hub): State<SyncHub>,
    Json(request): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, BackendError> {
    let messages = hub.mark_read(&request.message_ids).await?;
    Ok(Json(MarkReadResponse {
        success: true,
        updated: messages.len(),
        messages,
    }))
}
