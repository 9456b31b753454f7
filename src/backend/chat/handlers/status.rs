/**
 * Participant Status Handlers
 *
 * `GET /api/user-status?userId=user1` reports the stored record overlaid
 * with the live presence state. `POST /api/user-status` records an
 * explicit change such as the window becoming hidden or a logout.
 */

use axum::{
    extract::{Query, State},
    response::Json,
};
use std::collections::HashMap;

use crate::backend::chat::handlers::participant_param;
use crate::backend::error::BackendError;
use crate::realtime::SyncHub;
use crate::shared::api::{StatusResponse, StatusUpdate};

pub async fn get_status(
    State(hub): State<SyncHub>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<StatusResponse>, BackendError> {
    let participant = participant_param(&query, "userId")?;
    let record = hub.participant_status(participant).await?;
    Ok(Json(record.into()))
}

pub async fn update_status(
    State(hub): State<SyncHub>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<StatusResponse>, BackendError> {
    tracing::info!("[Status] {} is now {:?}", update.user_id, update.status);
    if hub.update_status(update.user_id, update.status).await?.is_none() {
        tracing::debug!("[Status] {} has no stored record yet", update.user_id);
    }
    let record = hub.participant_status(update.user_id).await?;
    Ok(Json(record.into()))
}
