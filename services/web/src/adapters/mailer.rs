//! services/web/src/adapters/mailer.rs
//!
//! This module contains the adapter for outbound SMTP mail.
//! It implements the `FeedbackNotifier` port from the `core` crate.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use show_tell_core::email::FeedbackEmail;
use show_tell_core::ports::{FeedbackNotifier, PortError, PortResult};

use crate::config::{ConfigError, SmtpSettings};
use crate::error::AppError;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `FeedbackNotifier` port over implicit-TLS SMTP.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Creates a new `SmtpMailer`. No connection is opened until the first send.
    pub fn new(settings: &SmtpSettings) -> Result<Self, AppError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|e| ConfigError::InvalidValue("SMTP_FROM".to_string(), e.to_string()))?;
        Ok(Self { transport, from })
    }
}

/// Turns a composed email into a plain-text `lettre` message.
fn build_message(from: &Mailbox, email: &FeedbackEmail) -> PortResult<Message> {
    let to = email
        .recipient
        .parse::<Mailbox>()
        .map_err(|e| PortError::Rejected(format!("Invalid recipient '{}': {}", email.recipient, e)))?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .map_err(|e| PortError::Rejected(e.to_string()))
}

//=========================================================================================
// `FeedbackNotifier` Trait Implementation
//=========================================================================================

#[async_trait]
impl FeedbackNotifier for SmtpMailer {
    async fn send(&self, email: &FeedbackEmail) -> PortResult<()> {
        let message = build_message(&self.from, email)?;
        self.transport.send(message).await.map_err(|e| {
            if e.is_permanent() {
                PortError::Rejected(e.to_string())
            } else {
                PortError::Unavailable(e.to_string())
            }
        })?;
        Ok(())
    }
}
