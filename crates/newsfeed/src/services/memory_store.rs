//! In-memory subscriber store for exercising the subscriber lifecycle.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use newsdesk_database::{
    CreateSubscriberRequest, DatabaseError, DatabaseResult, Subscriber, SubscriberFilter,
};
use tokio::sync::RwLock;

use super::subscriber_service::SubscriberStore;

#[derive(Clone, Default)]
pub struct MemorySubscriberStore {
    subscribers: Arc<RwLock<BTreeMap<i64, Subscriber>>>,
    reserved_tokens: Arc<RwLock<HashSet<String>>>,
}

impl MemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a token as taken without a backing subscriber.
    pub async fn insert_token(&self, token: &str) {
        self.reserved_tokens.write().await.insert(token.to_string());
    }

    /// Move the last verification send `by` into the past.
    pub async fn backdate_verification(&self, id: i64, by: Duration) {
        if let Some(subscriber) = self.subscribers.write().await.get_mut(&id) {
            subscriber.verification_sent_date = subscriber.verification_sent_date.map(|d| d - by);
        }
    }

    async fn modify<F>(&self, id: i64, change: F) -> DatabaseResult<Subscriber>
    where
        F: FnOnce(&mut Subscriber),
    {
        let mut subscribers = self.subscribers.write().await;
        let subscriber = subscribers
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("subscriber {id}")))?;
        change(subscriber);
        subscriber.updated_at = Utc::now();
        Ok(subscriber.clone())
    }
}

impl SubscriberStore for MemorySubscriberStore {
    async fn find_by_email(&self, email_address: &str) -> DatabaseResult<Option<Subscriber>> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers
            .values()
            .find(|s| s.email_address == email_address)
            .cloned())
    }

    async fn find_pending_by_token(&self, token: &str) -> DatabaseResult<Option<Subscriber>> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers
            .values()
            .find(|s| s.token == token && !s.subscribed)
            .cloned())
    }

    async fn create(&self, request: &CreateSubscriberRequest) -> DatabaseResult<Subscriber> {
        let mut subscribers = self.subscribers.write().await;
        if subscribers
            .values()
            .any(|s| s.email_address == request.email_address || s.token == request.token)
        {
            return Err(DatabaseError::Duplicate(request.email_address.clone()));
        }

        let id = subscribers.keys().next_back().copied().unwrap_or(0) + 1;
        let now = Utc::now();
        let subscriber = Subscriber {
            id,
            email_address: request.email_address.clone(),
            token: request.token.clone(),
            verified: false,
            subscribed: false,
            verification_sent_date: None,
            created_at: now,
            updated_at: now,
        };
        subscribers.insert(id, subscriber.clone());
        Ok(subscriber)
    }

    async fn token_exists(&self, token: &str) -> DatabaseResult<bool> {
        if self.reserved_tokens.read().await.contains(token) {
            return Ok(true);
        }
        let subscribers = self.subscribers.read().await;
        Ok(subscribers.values().any(|s| s.token == token))
    }

    async fn update_token(&self, id: i64, token: &str) -> DatabaseResult<()> {
        self.modify(id, |s| s.token = token.to_string()).await?;
        Ok(())
    }

    async fn mark_verification_sent(&self, id: i64, sent_at: DateTime<Utc>) -> DatabaseResult<()> {
        self.modify(id, |s| s.verification_sent_date = Some(sent_at))
            .await?;
        Ok(())
    }

    async fn set_status(
        &self,
        id: i64,
        verified: bool,
        subscribed: bool,
    ) -> DatabaseResult<Subscriber> {
        self.modify(id, |s| {
            s.verified = verified;
            s.subscribed = subscribed;
        })
        .await
    }

    async fn list(&self, filter: &SubscriberFilter) -> DatabaseResult<Vec<Subscriber>> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers
            .values()
            .rev()
            .filter(|s| filter.subscribed.map_or(true, |v| s.subscribed == v))
            .filter(|s| filter.verified.map_or(true, |v| s.verified == v))
            .filter(|s| {
                filter
                    .search
                    .as_deref()
                    .map_or(true, |q| s.email_address.contains(&q.to_lowercase()))
            })
            .cloned()
            .collect())
    }

    async fn list_active_after(
        &self,
        after_id: i64,
        limit: i64,
    ) -> DatabaseResult<Vec<Subscriber>> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers
            .range(after_id + 1..)
            .map(|(_, s)| s)
            .filter(|s| s.is_active())
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
