/**
 * Real-time Event System
 *
 * This module defines the events carried by the event bus and by the live
 * channel between the hub and a client session. Every event belongs to
 * exactly one topic:
 *
 * - `message` - a full persisted `Message`
 * - `presence` - `{participantId, status}`
 * - `typing` - `{participantId, isTyping}`
 * - `read-receipt` - `{participantId, messageIds}`
 *
 * On the wire an event is serialized as `{"topic": ..., "payload": ...}`.
 */
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::error::SyncError;
use crate::shared::message::{Message, MessageId};
use crate::shared::participant::{ParticipantId, PresenceStatus};

/// Topic of a real-time event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    /// Chat message event
    Message,
    /// Online/offline transition
    Presence,
    /// Typing indicator event
    Typing,
    /// Read receipt event
    ReadReceipt,
}

impl Topic {
    pub const ALL: [Topic; 4] = [Topic::Message, Topic::Presence, Topic::Typing, Topic::ReadReceipt];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Presence => "presence",
            Self::Typing => "typing",
            Self::ReadReceipt => "read-receipt",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presence transition of one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    pub participant_id: ParticipantId,
    pub status: PresenceStatus,
}

/// Typing indicator of one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub participant_id: ParticipantId,
    pub is_typing: bool,
}

/// Read receipt emitted by the participant who read the messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub participant_id: ParticipantId,
    pub message_ids: Vec<MessageId>,
}

impl ReadReceipt {
    /// Reject receipts that name no message
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.message_ids.is_empty() {
            return Err(SyncError::validation("messageIds", "at least one message id is required"));
        }
        Ok(())
    }
}

/// Live-channel event name marking a server-initiated close
pub const CLOSE_EVENT: &str = "close";

/// Real-time event that can be broadcast to all subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload", rename_all = "kebab-case")]
pub enum SyncEvent {
    Message(Message),
    Presence(PresenceEvent),
    Typing(TypingEvent),
    ReadReceipt(ReadReceipt),
}

impl SyncEvent {
    /// Create a presence event
    pub fn presence(participant_id: ParticipantId, status: PresenceStatus) -> Self {
        Self::Presence(PresenceEvent { participant_id, status })
    }

    /// Create a typing event
    pub fn typing(participant_id: ParticipantId, is_typing: bool) -> Self {
        Self::Typing(TypingEvent { participant_id, is_typing })
    }

    /// Create a read-receipt event
    pub fn read_receipt(participant_id: ParticipantId, message_ids: Vec<MessageId>) -> Self {
        Self::ReadReceipt(ReadReceipt { participant_id, message_ids })
    }

    pub fn topic(&self) -> Topic {
        match self {
            Self::Message(_) => Topic::Message,
            Self::Presence(_) => Topic::Presence,
            Self::Typing(_) => Topic::Typing,
            Self::ReadReceipt(_) => Topic::ReadReceipt,
        }
    }

    /// Participant who caused the event
    pub fn origin(&self) -> ParticipantId {
        match self {
            Self::Message(message) => message.sender,
            Self::Presence(event) => event.participant_id,
            Self::Typing(event) => event.participant_id,
            Self::ReadReceipt(event) => event.participant_id,
        }
    }
}
