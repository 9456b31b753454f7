/**
 * Message Data Structure
 *
 * This module defines the chat message records exchanged between the
 * store, the hub and the client sessions.
 *
 * A message starts life as a `NewMessage`, the provisional shape a client
 * builds before anything is persisted. Once the store assigns an id and a
 * timestamp it becomes a canonical `Message`. After that the only mutation
 * is the read flag moving from `false` to `true`.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::error::SyncError;
use crate::shared::participant::ParticipantId;

/// Longest accepted text content, in bytes
pub const MAX_CONTENT_LENGTH: usize = 10_000;

/// Store-assigned message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Coarse content classification of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Text,
    Image,
    Video,
    Document,
    Gif,
    Sticker,
}

impl ContentKind {
    /// Classify an uploaded file by its MIME type
    ///
    /// `image/gif` maps to `Gif`, other `image/*` to `Image`, `video/*` to
    /// `Video` and everything else to `Document`.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime == "image/gif" {
            Self::Gif
        } else if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else {
            Self::Document
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
            Self::Gif => "gif",
            Self::Sticker => "sticker",
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, Self::Text)
    }
}

impl FromStr for ContentKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "document" => Ok(Self::Document),
            "gif" => Ok(Self::Gif),
            "sticker" => Ok(Self::Sticker),
            other => Err(SyncError::validation(
                "contentType",
                format!("unknown content type '{}'", other),
            )),
        }
    }
}

/// Reference to an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub url: String,
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

/// A persisted chat message
///
/// # Fields
/// * `id` - Store-assigned identifier
/// * `sender` - Participant who sent the message
/// * `content` - Text content (or caption for files)
/// * `content_kind` - Content classification, serialized as `contentType`
/// * `file` - File reference, present iff `content_kind` is not `Text`
/// * `timestamp` - Store-assigned creation time
/// * `read` - Whether the peer has read it; never reverts to `false`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender: ParticipantId,
    pub content: String,
    #[serde(rename = "contentType", default)]
    pub content_kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Canonicalize a draft with the id and timestamp assigned by a store
    pub fn from_draft(draft: NewMessage, id: MessageId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            sender: draft.sender,
            content: draft.content,
            content_kind: draft.content_kind,
            file: draft.file,
            timestamp,
            read: false,
        }
    }

    /// Short human-readable preview, used in notifications
    pub fn summary(&self) -> String {
        if self.content_kind.is_text() {
            return self.content.clone();
        }
        let mut preview = format!("Sent a {}", self.content_kind.as_str());
        if let Some(file) = &self.file {
            preview.push_str(": ");
            preview.push_str(&file.name);
        }
        preview
    }
}

/// A message as composed by a client, before the store has seen it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub sender: ParticipantId,
    pub content: String,
    #[serde(rename = "contentType", default)]
    pub content_kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
}

impl NewMessage {
    /// Create a plain text draft
    pub fn text(sender: ParticipantId, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            content_kind: ContentKind::Text,
            file: None,
        }
    }

    /// Create a file draft; the kind is derived from the MIME type
    pub fn file(sender: ParticipantId, caption: impl Into<String>, mime: &str, file: FileRef) -> Self {
        Self {
            sender,
            content: caption.into(),
            content_kind: ContentKind::from_mime(mime),
            file: Some(file),
        }
    }

    /// Create a sticker draft
    pub fn sticker(sender: ParticipantId, file: FileRef) -> Self {
        Self {
            sender,
            content: String::new(),
            content_kind: ContentKind::Sticker,
            file: Some(file),
        }
    }

    /// Check the draft against the message invariants
    ///
    /// The file reference must be present exactly when the content kind is
    /// not `Text`, text messages must carry content, and files must not be
    /// larger than `file_size_limit` bytes.
    pub fn validate(&self, file_size_limit: u64) -> Result<(), SyncError> {
        if self.content.len() > MAX_CONTENT_LENGTH {
            return Err(SyncError::validation(
                "content",
                format!("content exceeds {} bytes", MAX_CONTENT_LENGTH),
            ));
        }

        match (&self.file, self.content_kind.is_text()) {
            (None, true) => {
                if self.content.trim().is_empty() {
                    return Err(SyncError::validation("content", "text message cannot be empty"));
                }
            }
            (Some(_), true) => {
                return Err(SyncError::validation("file", "text message cannot carry a file"));
            }
            (None, false) => {
                return Err(SyncError::validation(
                    "file",
                    format!("{} message requires a file reference", self.content_kind.as_str()),
                ));
            }
            (Some(file), false) => {
                if file.url.trim().is_empty() {
                    return Err(SyncError::validation("file.url", "file url cannot be empty"));
                }
                if file.name.trim().is_empty() {
                    return Err(SyncError::validation("file.name", "file name cannot be empty"));
                }
                if file.size > file_size_limit {
                    return Err(SyncError::validation(
                        "file.size",
                        format!("file is {} bytes, limit is {}", file.size, file_size_limit),
                    ));
                }
            }
        }

        Ok(())
    }
}
