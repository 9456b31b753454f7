/**
 * SQLite Store
 *
 * Durable implementation of [`ChatStore`] on top of sqlx.
 *
 * # Schema
 *
 * Tables are created on startup if they do not exist. Timestamps are
 * stored as microseconds since the Unix epoch; `seq` breaks ties between
 * equal timestamps in insertion order.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::str::FromStr;
use tokio::sync::Mutex;

use crate::shared::{ContentKind, FileRef, Message, MessageId, NewMessage, Participant, ParticipantId, SyncError};
use crate::store::ChatStore;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        sender TEXT NOT NULL,
        content TEXT NOT NULL,
        content_type TEXT NOT NULL,
        file_url TEXT,
        file_name TEXT,
        file_size INTEGER,
        created_at INTEGER NOT NULL,
        read INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS messages_created_at ON messages (created_at, seq)",
    r#"
    CREATE TABLE IF NOT EXISTS participants (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        is_admin INTEGER NOT NULL,
        online INTEGER NOT NULL,
        last_seen INTEGER
    )
    "#,
];

const MESSAGE_COLUMNS: &str =
    "SELECT id, sender, content, content_type, file_url, file_name, file_size, created_at, read FROM messages";

fn db_error(e: sqlx::Error) -> SyncError {
    SyncError::persistence(format!("database error: {}", e))
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>, SyncError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| SyncError::persistence(format!("invalid stored timestamp {}", micros)))
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    sender: String,
    content: String,
    content_type: String,
    file_url: Option<String>,
    file_name: Option<String>,
    file_size: Option<i64>,
    created_at: i64,
    read: bool,
}

impl MessageRow {
    fn into_message(self) -> Result<Message, SyncError> {
        let file = match (self.file_url, self.file_name, self.file_size) {
            (Some(url), Some(name), Some(size)) => Some(FileRef {
                url,
                name,
                size: u64::try_from(size).unwrap_or_default(),
            }),
            _ => None,
        };
        Ok(Message {
            id: MessageId(self.id),
            sender: ParticipantId::from_str(&self.sender)?,
            content: self.content,
            content_kind: ContentKind::from_str(&self.content_type)?,
            file,
            timestamp: from_micros(self.created_at)?,
            read: self.read,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    id: String,
    name: String,
    email: String,
    is_admin: bool,
    online: bool,
    last_seen: Option<i64>,
}

impl ParticipantRow {
    fn into_participant(self) -> Result<Participant, SyncError> {
        Ok(Participant {
            id: ParticipantId::from_str(&self.id)?,
            name: self.name,
            email: self.email,
            is_admin: self.is_admin,
            online: self.online,
            last_seen: self.last_seen.map(from_micros).transpose()?,
        })
    }
}

pub struct SqlStore {
    pool: SqlitePool,
    // Serializes inserts so timestamps never go backwards.
    insert_lock: Mutex<()>,
}

impl SqlStore {
    /// Open (creating if missing) the database at `url` and apply the schema
    pub async fn connect(url: &str) -> Result<Self, SyncError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error)?;
        Self::from_pool(pool).await
    }

    /// Use an existing pool and apply the schema
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, SyncError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await.map_err(db_error)?;
        }
        tracing::info!("[Server] Database schema ready");
        Ok(Self {
            pool,
            insert_lock: Mutex::new(()),
        })
    }

    async fn messages_by_ids(&self, ids: &[MessageId]) -> Result<Vec<Message>, SyncError> {
        let mut query = QueryBuilder::<Sqlite>::new(MESSAGE_COLUMNS);
        query.push(" WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(") ORDER BY created_at ASC, seq ASC");

        query
            .build_query_as::<MessageRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(MessageRow::into_message)
            .collect()
    }
}

#[async_trait]
impl ChatStore for SqlStore {
    async fn messages(&self) -> Result<Vec<Message>, SyncError> {
        sqlx::query_as::<_, MessageRow>(&format!("{} ORDER BY created_at ASC, seq ASC", MESSAGE_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(MessageRow::into_message)
            .collect()
    }

    async fn insert_message(&self, draft: NewMessage) -> Result<Message, SyncError> {
        let _guard = self.insert_lock.lock().await;

        let latest: Option<i64> = sqlx::query_scalar("SELECT MAX(created_at) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        let now = Utc::now().timestamp_micros();
        let created_at = latest.map_or(now, |latest| latest.max(now));

        let message = Message::from_draft(draft, MessageId::generate(), from_micros(created_at)?);
        let file = message.file.as_ref();
        sqlx::query(
            r#"
            INSERT INTO messages (id, sender, content, content_type, file_url, file_name, file_size, created_at, read)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(message.id.as_str())
        .bind(message.sender.as_str())
        .bind(&message.content)
        .bind(message.content_kind.as_str())
        .bind(file.map(|f| f.url.clone()))
        .bind(file.map(|f| f.name.clone()))
        .bind(file.map(|f| i64::try_from(f.size).unwrap_or(i64::MAX)))
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(message)
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<Vec<Message>, SyncError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut update = QueryBuilder::<Sqlite>::new("UPDATE messages SET read = 1 WHERE id IN (");
        let mut separated = update.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");
        update.build().execute(&self.pool).await.map_err(db_error)?;

        self.messages_by_ids(ids).await
    }

    async fn upsert_participant(&self, participant: Participant) -> Result<Participant, SyncError> {
        sqlx::query(
            r#"
            INSERT INTO participants (id, name, email, is_admin, online, last_seen)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                is_admin = excluded.is_admin,
                online = excluded.online,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(participant.id.as_str())
        .bind(&participant.name)
        .bind(&participant.email)
        .bind(participant.is_admin)
        .bind(participant.online)
        .bind(participant.last_seen.map(|at| at.timestamp_micros()))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(participant)
    }

    async fn find_participant(&self, id: ParticipantId) -> Result<Option<Participant>, SyncError> {
        sqlx::query_as::<_, ParticipantRow>(
            "SELECT id, name, email, is_admin, online, last_seen FROM participants WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(ParticipantRow::into_participant)
        .transpose()
    }

    async fn update_presence(
        &self,
        id: ParticipantId,
        online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) -> Result<Option<Participant>, SyncError> {
        let result = sqlx::query("UPDATE participants SET online = ?, last_seen = COALESCE(?, last_seen) WHERE id = ?")
            .bind(online)
            .bind(last_seen.map(|at| at.timestamp_micros()))
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_participant(id).await
    }
}
