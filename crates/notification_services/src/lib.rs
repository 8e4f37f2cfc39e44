//! # Notification Services
//!
//! Email alert delivery for the tracker. Provides the [`EmailService`] trait,
//! an SMTP implementation (STARTTLS + LOGIN) and a recording mock for tests.

/// Service definitions for email delivery.
pub mod service;
/// Types and configuration for notifications.
pub mod types;

pub use service::{EmailService, Mailer, MockEmailService, SmtpEmailService};
pub use types::{EmailConfig, NotificationError};
