/**
 * Server Configuration
 *
 * Configuration is read from environment variables (a `.env` file is
 * loaded first by the binary). Chat settings may additionally come from a
 * TOML file named by `PAIRCHAT_CONFIG`; individual variables override it.
 *
 * # Degradation
 *
 * Missing optional services do not prevent startup. Without
 * `DATABASE_URL` messages live in memory; without `SMTP_HOST`
 * notifications are only logged.
 */

use std::sync::Arc;

use crate::backend::chat::db::SqlStore;
use crate::backend::email::{EmailNotifier, SmtpConfig};
use crate::notify::{LogNotifier, Notifier};
use crate::shared::{ChatConfig, ConfigError, ParticipantId};
use crate::store::memory::MemoryStore;
use crate::store::ChatStore;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    /// Shared login secret; login is refused while unset
    pub chat_password: Option<String>,
    pub chat: ChatConfig,
    pub smtp: Option<SmtpConfig>,
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match var("SERVER_PORT") {
            Some(raw) => parse_number("SERVER_PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let mut chat = match var("PAIRCHAT_CONFIG") {
            Some(path) => {
                let source = std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::Parse(format!("{}: {}", path, e)))?;
                ChatConfig::from_toml_str(&source)?
            }
            None => ChatConfig::default(),
        };
        if let Some(name) = var("USER1_NAME") {
            chat.participant_names.insert(ParticipantId::A, name);
        }
        if let Some(name) = var("USER2_NAME") {
            chat.participant_names.insert(ParticipantId::B, name);
        }
        if let Some(email) = var("ADMIN_EMAIL") {
            chat.participant_contacts.insert(chat.admin, email);
        }
        if let Some(raw) = var("FILE_SIZE_LIMIT_BYTES") {
            chat.file_size_limit_bytes = parse_number("FILE_SIZE_LIMIT_BYTES", &raw)?;
        }
        chat.validate()?;

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: match var("SMTP_PORT") {
                    Some(raw) => parse_number("SMTP_PORT", &raw)?,
                    None => DEFAULT_SMTP_PORT,
                },
                username: var("SMTP_USERNAME"),
                password: var("SMTP_PASSWORD"),
                from: var("SMTP_FROM").ok_or(ConfigError::MissingValue("SMTP_FROM"))?,
            }),
            None => None,
        };

        Ok(Self {
            port,
            database_url: var("DATABASE_URL"),
            chat_password: var("CHAT_PASSWORD"),
            chat,
            smtp,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        message: e.to_string(),
    })
}

/// Open the configured store, falling back to memory
pub async fn load_store(database_url: Option<&str>) -> Arc<dyn ChatStore> {
    let Some(url) = database_url else {
        tracing::warn!("DATABASE_URL not set. Messages will be kept in memory only.");
        return Arc::new(MemoryStore::new());
    };

    tracing::info!("Connecting to database...");
    match SqlStore::connect(url).await {
        Ok(store) => {
            tracing::info!("Database connection pool created successfully");
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            tracing::warn!("Messages will be kept in memory only.");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Build the configured notifier, falling back to logging
pub fn load_notifier(smtp: Option<&SmtpConfig>) -> Arc<dyn Notifier> {
    let Some(smtp) = smtp else {
        tracing::warn!("SMTP_HOST not set. Notifications will only be logged.");
        return Arc::new(LogNotifier);
    };

    match EmailNotifier::new(smtp) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            tracing::error!("Failed to configure SMTP transport: {}", e);
            tracing::warn!("Notifications will only be logged.");
            Arc::new(LogNotifier)
        }
    }
}
