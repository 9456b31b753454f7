//! Chat configuration module
//!
//! Provides the explicit configuration structure handed to the hub and to
//! every client session at construction time. It can be assembled with
//! [`ChatConfig::builder`] or parsed from a TOML document.
//!
//! ```toml
//! admin = "user1"
//! file_size_limit_bytes = 10485760
//!
//! [participant_names]
//! user1 = "Alice"
//! user2 = "Bob"
//!
//! [participant_contacts]
//! user1 = "alice@example.com"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::shared::participant::{Participant, ParticipantId};

/// Default upload limit: 10 MiB
pub const DEFAULT_FILE_SIZE_LIMIT_BYTES: u64 = 10 * 1024 * 1024;

/// Placeholder contact address for participants without one
const PLACEHOLDER_CONTACT: &str = "user@example.com";

/// Chat configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Participant that receives out-of-band notifications
    pub admin: ParticipantId,
    /// Display name per participant
    pub participant_names: BTreeMap<ParticipantId, String>,
    /// Notification address per participant
    pub participant_contacts: BTreeMap<ParticipantId, String>,
    /// Largest accepted file attachment
    pub file_size_limit_bytes: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let participant_names = ParticipantId::ALL
            .iter()
            .map(|id| (*id, default_name(*id)))
            .collect();
        Self {
            admin: ParticipantId::A,
            participant_names,
            participant_contacts: BTreeMap::new(),
            file_size_limit_bytes: DEFAULT_FILE_SIZE_LIMIT_BYTES,
        }
    }
}

fn default_name(id: ParticipantId) -> String {
    match id {
        ParticipantId::A => "User 1".to_string(),
        ParticipantId::B => "User 2".to_string(),
    }
}

impl ChatConfig {
    /// Create a new ChatConfigBuilder
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawChatConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut builder = ChatConfig::builder();
        if let Some(admin) = raw.admin {
            builder = builder.admin(parse_participant("admin", &admin)?);
        }
        for (key, name) in raw.participant_names {
            builder = builder.participant_name(parse_participant("participant_names", &key)?, name);
        }
        for (key, contact) in raw.participant_contacts {
            builder = builder.participant_contact(parse_participant("participant_contacts", &key)?, contact);
        }
        if let Some(limit) = raw.file_size_limit_bytes {
            builder = builder.file_size_limit_bytes(limit);
        }
        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_size_limit_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "file_size_limit_bytes",
                message: "must be greater than zero".to_string(),
            });
        }
        for (id, name) in &self.participant_names {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "participant_names",
                    message: format!("name of {} is empty", id),
                });
            }
        }
        Ok(())
    }

    /// Display name of a participant
    pub fn display_name(&self, id: ParticipantId) -> String {
        self.participant_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| default_name(id))
    }

    /// Notification address of a participant
    pub fn contact(&self, id: ParticipantId) -> String {
        self.participant_contacts
            .get(&id)
            .cloned()
            .unwrap_or_else(|| PLACEHOLDER_CONTACT.to_string())
    }

    pub fn is_admin(&self, id: ParticipantId) -> bool {
        self.admin == id
    }

    /// Participant record as configured, offline until presence says otherwise
    pub fn participant(&self, id: ParticipantId) -> Participant {
        Participant::new(id, self.display_name(id), self.contact(id), self.is_admin(id))
    }
}

/// TOML shape of [`ChatConfig`], keyed by wire participant ids
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChatConfig {
    admin: Option<String>,
    participant_names: BTreeMap<String, String>,
    participant_contacts: BTreeMap<String, String>,
    file_size_limit_bytes: Option<u64>,
}

fn parse_participant(key: &'static str, value: &str) -> Result<ParticipantId, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        message: format!("unknown participant '{}'", value),
    })
}

/// Builder for ChatConfig
#[derive(Debug, Default)]
pub struct ChatConfigBuilder {
    admin: Option<ParticipantId>,
    names: BTreeMap<ParticipantId, String>,
    contacts: BTreeMap<ParticipantId, String>,
    file_size_limit_bytes: Option<u64>,
}

impl ChatConfigBuilder {
    /// Set the admin participant
    pub fn admin(mut self, admin: ParticipantId) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Set a participant's display name
    pub fn participant_name(mut self, id: ParticipantId, name: impl Into<String>) -> Self {
        self.names.insert(id, name.into());
        self
    }

    /// Set a participant's notification address
    pub fn participant_contact(mut self, id: ParticipantId, contact: impl Into<String>) -> Self {
        self.contacts.insert(id, contact.into());
        self
    }

    /// Set the file size limit
    pub fn file_size_limit_bytes(mut self, limit: u64) -> Self {
        self.file_size_limit_bytes = Some(limit);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ChatConfig, ConfigError> {
        let mut config = ChatConfig::default();
        if let Some(admin) = self.admin {
            config.admin = admin;
        }
        config.participant_names.extend(self.names);
        config.participant_contacts.extend(self.contacts);
        if let Some(limit) = self.file_size_limit_bytes {
            config.file_size_limit_bytes = limit;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
