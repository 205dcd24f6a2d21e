//! Outgoing mail.
//!
//! The application only sends notifications, so a mailer takes a complete
//! [`Message`]. Production deployments post messages to an HTTP relay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail relay answered {0}")]
    Rejected(reqwest::StatusCode),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), MailError>;
}

/// Writes messages to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        tracing::info!(
            to = ?message.to,
            subject = %message.subject,
            "Mail not sent (log mailer): {}",
            message.body
        );
        Ok(())
    }
}

/// Posts messages as JSON to an HTTP mail relay
#[derive(Debug, Clone)]
pub struct RelayMailer {
    client: reqwest::Client,
    url: String,
}

impl RelayMailer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(Duration::from_secs(10))
            .json(&message)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status()));
        }
        Ok(())
    }
}

/// Keeps sent messages for inspection
#[derive(Debug, Default, Clone)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<Message>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn outbox(&self) -> Vec<Message> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        self.outbox.lock().await.push(message);
        Ok(())
    }
}

/// Relay mailer when a relay is configured, log mailer otherwise
pub fn from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match &config.relay_url {
        Some(url) if !url.is_empty() => Arc::new(RelayMailer::new(url.clone())),
        _ => Arc::new(LogMailer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message {
            from: "no-reply@example.com".into(),
            to: vec!["owner@example.com".into()],
            subject: "Hi".into(),
            body: "Body".into(),
        }
    }

    #[tokio::test]
    async fn memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        mailer.send(message()).await.unwrap();
        assert_eq!(mailer.outbox().await, vec![message()]);
    }

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        assert!(LogMailer.send(message()).await.is_ok());
    }
}
