use axum::{extract::State, response::Json};

use crate::backend::error::BackendError;
use crate::realtime::SyncHub;
use crate::shared::api::PublishResponse;
use crate::shared::{ReadReceipt, SyncEvent};

/// Broadcast a read receipt (`POST /api/read-receipts`)
///
/// Only fans the receipt out to live channels; the durable flag is set
/// through `POST /api/messages/read`.
pub async fn handle_read_receipt(
    State(hub): State<SyncHub>,
    Json(receipt): Json<ReadReceipt>,
) -> Result<Json<PublishResponse>, BackendError> {
    tracing::debug!(
        "[Receipts] {} read {} messages",
        receipt.participant_id,
        receipt.message_ids.len()
    );
    let delivered = hub.publish(SyncEvent::ReadReceipt(receipt))?;
    Ok(Json(PublishResponse { delivered }))
}
