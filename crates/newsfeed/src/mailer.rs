//! Outgoing email seam.
//!
//! Services hand finished messages to a [`Mailer`]. The default transport
//! writes them to the log; [`MemoryMailer`] keeps them for inspection.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::NewsfeedResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: OutgoingEmail) -> NewsfeedResult<()>;
}

/// Emits every message as a structured log event.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: OutgoingEmail) -> NewsfeedResult<()> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "email dispatched"
        );
        Ok(())
    }
}

/// Records messages in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    messages: Arc<RwLock<Vec<OutgoingEmail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<OutgoingEmail> {
        self.messages.read().await.clone()
    }

    pub async fn messages_to(&self, recipient: &str) -> Vec<OutgoingEmail> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.to == recipient)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.messages.write().await.clear();
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: OutgoingEmail) -> NewsfeedResult<()> {
        self.messages.write().await.push(message);
        Ok(())
    }
}

/// Link a reader follows to confirm a subscription.
pub fn confirmation_link(site_url: &str, token: &str) -> String {
    format!("{}/api/subscribe/confirm/{token}", site_url.trim_end_matches('/'))
}

pub fn unsubscribe_link(site_url: &str) -> String {
    format!("{}/api/unsubscribe", site_url.trim_end_matches('/'))
}
