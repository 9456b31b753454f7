//! SMTP delivery of offline notifications.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::notify::{Notification, Notifier};
use crate::shared::{Message, Participant, SyncError};

/// SMTP relay settings (`SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`,
/// `SMTP_PASSWORD`, `SMTP_FROM`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, SyncError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| SyncError::notification(format!("invalid sender address '{}': {}", config.from, e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| SyncError::notification(format!("invalid SMTP relay '{}': {}", config.host, e)))?
            .port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        tracing::info!("[Notify] SMTP relay {}:{} configured", config.host, config.port);
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_email(&self, notification: Notification) -> Result<lettre::Message, SyncError> {
        let to: Mailbox = notification
            .to
            .parse()
            .map_err(|e| SyncError::notification(format!("invalid recipient address '{}': {}", notification.to, e)))?;

        lettre::Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body)
            .map_err(|e| SyncError::notification(format!("failed to build email: {}", e)))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, message: &Message, sender: &Participant, recipient: &Participant) -> Result<(), SyncError> {
        let email = self.build_email(Notification::compose(message, sender, recipient))?;
        self.transport
            .send(email)
            .await
            .map_err(|e| SyncError::notification(format!("SMTP delivery failed: {}", e)))?;

        tracing::info!("[Notify] Emailed {} about message {}", recipient.email, message.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 2525,
            username: None,
            password: None,
            from: "Pair Chat <chat@example.com>".to_string(),
        }
    }

    #[test]
    fn test_rejects_bad_sender() {
        let mut config = config();
        config.from = "not an address".to_string();
        let err = EmailNotifier::new(&config).err().unwrap();
        assert!(err.to_string().contains("invalid sender address"));
    }

    #[tokio::test]
    async fn test_build_email_validates_recipient() {
        let notifier = EmailNotifier::new(&config()).unwrap();
        let notification = Notification {
            to: "bob".to_string(),
            subject: "New message from Alice".to_string(),
            body: "hi".to_string(),
        };
        assert!(notifier.build_email(notification).is_err());

        let notification = Notification {
            to: "bob@example.com".to_string(),
            subject: "New message from Alice".to_string(),
            body: "hi".to_string(),
        };
        let email = notifier.build_email(notification).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Subject: New message from Alice"));
    }
}
