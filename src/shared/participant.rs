//! Participant identity and presence records.
//!
//! Exactly two participants exist. On the wire they are `user1` and
//! `user2`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::error::SyncError;

/// One of the two fixed chat identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParticipantId {
    #[serde(rename = "user1")]
    A,
    #[serde(rename = "user2")]
    B,
}

impl ParticipantId {
    pub const ALL: [ParticipantId; 2] = [ParticipantId::A, ParticipantId::B];

    /// The other participant of the pair
    pub fn peer(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Wire identifier (`user1` / `user2`)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "user1",
            Self::B => "user2",
        }
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user1" | "A" | "a" => Ok(Self::A),
            "user2" | "B" | "b" => Ok(Self::B),
            other => Err(SyncError::validation(
                "participantId",
                format!("unknown participant '{}'", other),
            )),
        }
    }
}

/// Online/offline status as carried by presence events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Durable participant record owned by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(rename = "userId")]
    pub id: ParticipantId,
    pub name: String,
    /// Address used for out-of-band notifications
    pub email: String,
    pub is_admin: bool,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Participant {
    /// Create an offline participant record
    pub fn new(id: ParticipantId, name: impl Into<String>, email: impl Into<String>, is_admin: bool) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            is_admin,
            online: false,
            last_seen: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_is_involutive() {
        for id in ParticipantId::ALL {
            assert_ne!(id, id.peer());
            assert_eq!(id, id.peer().peer());
        }
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&ParticipantId::A).unwrap(), "\"user1\"");
        let parsed: ParticipantId = serde_json::from_str("\"user2\"").unwrap();
        assert_eq!(parsed, ParticipantId::B);
    }

    #[test]
    fn test_from_str_rejects_third_party() {
        assert_eq!("user1".parse::<ParticipantId>().unwrap(), ParticipantId::A);
        assert!("user3".parse::<ParticipantId>().unwrap_err().is_validation());
    }

    #[test]
    fn test_participant_serialization_uses_user_id() {
        let participant = Participant::new(ParticipantId::A, "Alice", "alice@example.com", true);
        let json = serde_json::to_value(&participant).unwrap();
        assert_eq!(json["userId"], "user1");
        assert_eq!(json["isAdmin"], true);
        assert_eq!(json["online"], false);
    }
}
