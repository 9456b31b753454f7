/**
 * Chat Handlers
 *
 * - **`messages`** - `GET`/`POST /api/messages`
 * - **`read`** - `POST /api/messages/read`
 * - **`status`** - `GET`/`POST /api/user-status`
 * - **`typing`** - `POST /api/typing`
 * - **`receipts`** - `POST /api/read-receipts`
 */

use std::collections::HashMap;
use std::str::FromStr;

use crate::backend::error::BackendError;
use crate::shared::ParticipantId;

pub mod messages;
pub mod read;
pub mod receipts;
pub mod status;
pub mod typing;

pub use messages::{list_messages, send_message};
pub use read::mark_read;
pub use receipts::handle_read_receipt;
pub use status::{get_status, update_status};
pub use typing::handle_typing_event;

/// Required participant query parameter
pub(crate) fn participant_param(query: &HashMap<String, String>, key: &'static str) -> Result<ParticipantId, BackendError> {
    let raw = query
        .get(key)
        .ok_or_else(|| BackendError::handler(axum::http::StatusCode::BAD_REQUEST, format!("missing '{}' parameter", key)))?;
    Ok(ParticipantId::from_str(raw)?)
}
