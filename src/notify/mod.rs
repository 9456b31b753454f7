//! Out-of-band Notification Module
//!
//! When the admin participant is unreachable over the live channel, new
//! messages from the other participant are forwarded through a
//! [`Notifier`]. Delivery is best-effort: the caller logs a failure and
//! moves on, nothing is retried.
//!
//! # Implementations
//!
//! - [`LogNotifier`] - writes the notification to the log; used when no
//!   mail transport is configured
//! - `backend::email::EmailNotifier` - SMTP delivery through lettre
//!   (requires the `ssr` feature)

use async_trait::async_trait;

use crate::shared::{Message, Participant, SyncError};

/// External sender of out-of-band notifications
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Tell `recipient` that `sender` sent `message`
    async fn notify(&self, message: &Message, sender: &Participant, recipient: &Participant) -> Result<(), SyncError>;
}

/// Rendered notification content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Render the notification for a message
    pub fn compose(message: &Message, sender: &Participant, recipient: &Participant) -> Self {
        let body = format!(
            "Hello {recipient},\n\n\
             {sender} sent you a message while you were offline.\n\n\
             {sender}: {preview}\n\
             {sent_at}\n\n\
             Log in to view the full message.\n",
            recipient = recipient.name,
            sender = sender.name,
            preview = message.summary(),
            sent_at = message.timestamp.format("%Y-%m-%d %H:%M UTC"),
        );
        Self {
            to: recipient.email.clone(),
            subject: format!("New message from {}", sender.name),
            body,
        }
    }
}

/// Notifier that only logs what it would have sent
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &Message, sender: &Participant, recipient: &Participant) -> Result<(), SyncError> {
        let notification = Notification::compose(message, sender, recipient);
        tracing::info!(
            "[Notify] Would notify {} <{}>: {}",
            recipient.name,
            notification.to,
            notification.subject
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{MessageId, NewMessage, ParticipantId};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_compose() {
        let sender = Participant::new(ParticipantId::B, "Bob", "bob@example.com", false);
        let recipient = Participant::new(ParticipantId::A, "Alice", "alice@example.com", true);
        let message = Message::from_draft(
            NewMessage::text(ParticipantId::B, "hi"),
            MessageId::from("m1"),
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        );

        let notification = Notification::compose(&message, &sender, &recipient);
        assert_eq!(notification.to, "alice@example.com");
        assert_eq!(notification.subject, "New message from Bob");
        assert!(notification.body.contains("Hello Alice"));
        assert!(notification.body.contains("Bob: hi"));
        assert!(notification.body.contains("2024-03-01 09:30 UTC"));
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        let sender = Participant::new(ParticipantId::B, "Bob", "bob@example.com", false);
        let recipient = Participant::new(ParticipantId::A, "Alice", "alice@example.com", true);
        let message = Message::from_draft(
            NewMessage::text(ParticipantId::B, "hi"),
            MessageId::from("m1"),
            Utc::now(),
        );
        assert!(LogNotifier.notify(&message, &sender, &recipient).await.is_ok());
    }
}
