/**
 * Login Handler
 *
 * Implements `POST /api/auth`. Both participants share one secret
 * (`CHAT_PASSWORD`); a successful login upserts the participant record
 * as online.
 *
 * # Security
 *
 * - A wrong secret returns 401 with no further detail
 * - An unconfigured secret returns 500 and every login is refused
 * - The secret is never logged
 */
use axum::{extract::State, response::Json};

use crate::backend::error::BackendError;
use crate::realtime::SyncHub;
use crate::shared::api::{AuthRequest, AuthResponse};

/// Login handler
///
/// # Example Request
///
/// ```http
/// POST /api/auth HTTP/1.1
/// Content-Type: application/json
///
/// {"password":"shared-secret","userId":"user1"}
/// ```
///
/// # Example Response
///
/// ```json
/// {"success":true,"user":{"userId":"user1","name":"Alice","email":"alice@example.com","isAdmin":true,"online":true,"lastSeen":"..."}}
/// ```
pub async fn login(
    State(hub): State<SyncHub>,
    Json(request): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, BackendError> {
    tracing::info!("Login request for: {}", request.user_id);
    let user = hub.authenticate(request.user_id, &request.password).await?;
    Ok(Json(AuthResponse { success: true, user }))
}
