/// Errors for email notifications.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// SMTP transport failure.
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// Malformed sender or recipient address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message could not be assembled.
    #[error("Failed to build message: {0}")]
    Message(String),
}

/// SMTP submission settings, read from the `[email-config]` section of the
/// configuration file.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Address used both as sender and recipient of alerts.
    pub address: String,
    /// Password or app token for SMTP LOGIN.
    pub password: String,
    /// Submission server hostname.
    pub server: String,
    /// Submission port (STARTTLS).
    pub port: u16,
}
