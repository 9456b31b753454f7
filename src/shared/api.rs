//! Request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::message::{Message, MessageId};
use crate::shared::participant::{Participant, ParticipantId, PresenceStatus};

/// `POST /api/auth`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub password: String,
    pub user_id: ParticipantId,
}

/// `POST /api/auth` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: Participant,
}

/// `POST /api/messages/read`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub message_ids: Vec<MessageId>,
}

/// `POST /api/messages/read` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub success: bool,
    /// Number of records the store confirmed
    pub updated: usize,
    pub messages: Vec<Message>,
}

/// `POST /api/user-status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub user_id: ParticipantId,
    pub status: PresenceStatus,
}

/// `GET` and `POST /api/user-status` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub user_id: ParticipantId,
    pub name: String,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<Participant> for StatusResponse {
    fn from(participant: Participant) -> Self {
        Self {
            user_id: participant.id,
            name: participant.name,
            online: participant.online,
            last_seen: participant.last_seen,
        }
    }
}

/// `POST /api/typing` and `POST /api/read-receipts` response
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Live subscribers the event was queued for
    pub delivered: usize,
}

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}
