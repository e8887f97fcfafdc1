//! Outbound mail seam.
//!
//! Delivery transport is an external collaborator; the default
//! implementation records the message through tracing so the reset flow
//! (including its rollback on send failure) stays exercisable end to end.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), MailError>;
}

/// Logs outbound mail instead of delivering it.
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "outbound mail");
        tracing::debug!(body = %mail.body, "mail body");
        Ok(())
    }
}

/// Always fails; used to exercise the forgot-password rollback path.
pub struct FailingMailer;

#[async_trait::async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _mail: Mail) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".to_string()))
    }
}
