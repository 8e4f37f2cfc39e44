use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::Mutex;
use tracing::info;

use crate::types::{EmailConfig, NotificationError};

/// Trait for email service implementations.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Send a plain-text message, returning a transport-specific id.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, NotificationError>;
}

/// SMTP email service, the production sink.
///
/// Submits over STARTTLS with LOGIN credentials. Delivery failures are
/// returned to the caller untouched; the tracker treats a failed alert as a
/// process-level error.
#[derive(Debug)]
pub struct SmtpEmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailService {
    /// Build a transport from the `[email-config]` settings.
    pub fn new(config: &EmailConfig) -> Result<Self, NotificationError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .map_err(|e| NotificationError::Smtp(format!("Failed to configure relay: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.address.clone(),
                config.password.clone(),
            ))
            .build();

        let from = config
            .address
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::InvalidAddress(format!("{}: {}", config.address, e)))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, NotificationError> {
        info!("Sending email to {} with subject: {}", to, subject);

        let to_mailbox = to
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::InvalidAddress(format!("{}: {}", to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| NotificationError::Message(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Smtp(e.to_string()))?;

        Ok(response.code().to_string())
    }
}

/// Mock email service for tests; records every message instead of sending.
#[derive(Default)]
pub struct MockEmailService {
    /// Messages captured as `(to, subject, body)`.
    pub sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, NotificationError> {
        info!("[MOCK EMAIL] To: {}", to);
        info!("[MOCK EMAIL] Subject: {}", subject);

        let mut sent = self.sent.lock().await;
        sent.push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(format!("mock-email-{}", sent.len()))
    }
}

/// A configured sink: an email service plus the address alerts go to.
#[derive(Clone)]
pub struct Mailer {
    service: Arc<dyn EmailService>,
    to: String,
}

impl Mailer {
    /// Bind a service to a recipient address.
    pub fn new(service: Arc<dyn EmailService>, to: impl Into<String>) -> Self {
        Self {
            service,
            to: to.into(),
        }
    }

    /// Send one alert to the configured recipient.
    pub async fn send(&self, subject: &str, body: &str) -> Result<String, NotificationError> {
        self.service.send_email(&self.to, subject, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            address: "alerts@example.com".to_string(),
            password: "hunter2".to_string(),
            server: "smtp.example.com".to_string(),
            port: 587,
        }
    }

    #[test]
    fn test_smtp_service_builds_from_config() {
        assert!(SmtpEmailService::new(&config()).is_ok());
    }

    #[test]
    fn test_smtp_service_rejects_bad_address() {
        let bad = EmailConfig {
            address: "not-an-address".to_string(),
            ..config()
        };
        let err = SmtpEmailService::new(&bad).unwrap_err();
        assert!(matches!(err, NotificationError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_mock_service_records_messages() {
        let service = MockEmailService::default();

        let id = service
            .send_email("me@example.com", "subject", "body")
            .await
            .unwrap();

        assert_eq!(id, "mock-email-1");
        let sent = service.sent.lock().await;
        assert_eq!(
            sent[0],
            (
                "me@example.com".to_string(),
                "subject".to_string(),
                "body".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_mailer_routes_to_configured_recipient() {
        let service = Arc::new(MockEmailService::default());
        let mailer = Mailer::new(service.clone(), "me@example.com");

        mailer.send("subject", "body").await.unwrap();

        let sent = service.sent.lock().await;
        assert_eq!(sent[0].0, "me@example.com");
    }
}
