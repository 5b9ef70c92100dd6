//! Outbound mail.
//!
//! Handlers talk to a [`MailTransport`] rather than to lettre directly so the
//! SMTP transport can be replaced by lettre's stub transport in tests.

use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::stub::AsyncStubTransport;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("could not render message: {0}")]
    Render(#[from] askama::Error),
    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<(), MailError>;
}

#[async_trait]
impl MailTransport for AsyncSmtpTransport<Tokio1Executor> {
    async fn deliver(&self, message: Message) -> Result<(), MailError> {
        self.send(message)
            .await
            .map(|_| ())
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for AsyncStubTransport {
    async fn deliver(&self, message: Message) -> Result<(), MailError> {
        self.send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

/// Build the SMTP relay transport from configuration.
pub fn smtp_transport(smtp: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());
    let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.server)
        .map_err(|e| MailError::Transport(e.to_string()))?
        .port(smtp.port)
        .credentials(creds)
        .build();
    Ok(transport)
}

/// Build and send a plain text message.
#[tracing::instrument(skip(mailer, body))]
pub async fn send_text(
    mailer: &dyn MailTransport,
    from: &str,
    to: &str,
    subject: &str,
    body: String,
) -> Result<(), MailError> {
    let message = Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(lettre::message::header::ContentType::TEXT_PLAIN)
        .body(body)?;

    mailer.deliver(message).await
}
