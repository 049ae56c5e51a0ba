//! Subscriber lifecycle: double opt-in, token rotation and unsubscribe.

use std::sync::Arc;

use chrono::Utc;
use newsdesk_config::NewsletterConfig;
use newsdesk_database::{
    CreateSubscriberRequest, DatabaseResult, Subscriber, SubscriberFilter, SubscriberRepository,
    SubscriberState,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{NewsfeedError, NewsfeedResult};
use crate::mailer::{confirmation_link, Mailer, OutgoingEmail};
use crate::validation::normalize_email;

/// Upper bound on fresh tokens tried before giving up.
pub const MAX_TOKEN_ATTEMPTS: u32 = 10;

/// Storage operations the subscriber lifecycle needs.
#[allow(async_fn_in_trait)]
pub trait SubscriberStore {
    async fn find_by_email(&self, email_address: &str) -> DatabaseResult<Option<Subscriber>>;
    async fn find_pending_by_token(&self, token: &str) -> DatabaseResult<Option<Subscriber>>;
    async fn create(&self, request: &CreateSubscriberRequest) -> DatabaseResult<Subscriber>;
    async fn token_exists(&self, token: &str) -> DatabaseResult<bool>;
    async fn update_token(&self, id: i64, token: &str) -> DatabaseResult<()>;
    async fn mark_verification_sent(
        &self,
        id: i64,
        sent_at: chrono::DateTime<Utc>,
    ) -> DatabaseResult<()>;
    async fn set_status(&self, id: i64, verified: bool, subscribed: bool)
        -> DatabaseResult<Subscriber>;
    async fn list(&self, filter: &SubscriberFilter) -> DatabaseResult<Vec<Subscriber>>;
    async fn list_active_after(&self, after_id: i64, limit: i64)
        -> DatabaseResult<Vec<Subscriber>>;
}

impl SubscriberStore for SubscriberRepository {
    async fn find_by_email(&self, email_address: &str) -> DatabaseResult<Option<Subscriber>> {
        self.find_by_email(email_address).await
    }

    async fn find_pending_by_token(&self, token: &str) -> DatabaseResult<Option<Subscriber>> {
        self.find_pending_by_token(token).await
    }

    async fn create(&self, request: &CreateSubscriberRequest) -> DatabaseResult<Subscriber> {
        self.create(request).await
    }

    async fn token_exists(&self, token: &str) -> DatabaseResult<bool> {
        self.token_exists(token).await
    }

    async fn update_token(&self, id: i64, token: &str) -> DatabaseResult<()> {
        self.update_token(id, token).await
    }

    async fn mark_verification_sent(
        &self,
        id: i64,
        sent_at: chrono::DateTime<Utc>,
    ) -> DatabaseResult<()> {
        self.mark_verification_sent(id, sent_at).await
    }

    async fn set_status(
        &self,
        id: i64,
        verified: bool,
        subscribed: bool,
    ) -> DatabaseResult<Subscriber> {
        self.set_status(id, verified, subscribed).await
    }

    async fn list(&self, filter: &SubscriberFilter) -> DatabaseResult<Vec<Subscriber>> {
        self.list(filter).await
    }

    async fn list_active_after(
        &self,
        after_id: i64,
        limit: i64,
    ) -> DatabaseResult<Vec<Subscriber>> {
        self.list_active_after(after_id, limit).await
    }
}

/// Outcome of a subscription request.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRequest {
    pub subscriber: Subscriber,
    /// True when the address was not known before.
    pub created: bool,
}

/// Admin view of a subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberSummary {
    #[serde(flatten)]
    pub subscriber: Subscriber,
    pub state: SubscriberState,
    pub token_expired: bool,
}

pub struct SubscriberService<S = SubscriberRepository> {
    store: S,
    mailer: Arc<dyn Mailer>,
    settings: NewsletterConfig,
    token_source: fn() -> String,
}

fn random_token() -> String {
    Uuid::new_v4().to_string()
}

impl<S> SubscriberService<S>
where
    S: SubscriberStore,
{
    pub fn new(store: S, mailer: Arc<dyn Mailer>, settings: NewsletterConfig) -> Self {
        Self {
            store,
            mailer,
            settings,
            token_source: random_token,
        }
    }

    /// Replace the token generator.
    pub fn with_token_source(mut self, token_source: fn() -> String) -> Self {
        self.token_source = token_source;
        self
    }

    pub fn settings(&self) -> &NewsletterConfig {
        &self.settings
    }

    /// Start (or restart) the double opt-in for an address.
    pub async fn request_subscription(&self, email: &str) -> NewsfeedResult<SubscriptionRequest> {
        let email_address = normalize_email(email)?;

        match self.store.find_by_email(&email_address).await? {
            Some(existing) if existing.subscribed => {
                Err(NewsfeedError::AlreadySubscribed(email_address))
            }
            Some(existing) => {
                let subscriber = self.send_verification(&existing, false).await?;
                Ok(SubscriptionRequest {
                    subscriber,
                    created: false,
                })
            }
            None => {
                let token = self.generate_unique_token().await?;
                let created = self
                    .store
                    .create(&CreateSubscriberRequest {
                        email_address,
                        token,
                    })
                    .await?;
                let subscriber = self.send_verification(&created, true).await?;
                Ok(SubscriptionRequest {
                    subscriber,
                    created: true,
                })
            }
        }
    }

    /// Send the verification email unless one went out within the cooldown.
    ///
    /// A freshly created subscriber keeps the token it was created with;
    /// otherwise the token is rotated so older links stop working. Nothing
    /// is stored until the mailer has accepted the message, so a failed send
    /// can be retried straight away.
    pub async fn send_verification(
        &self,
        subscriber: &Subscriber,
        created: bool,
    ) -> NewsfeedResult<Subscriber> {
        let now = Utc::now();
        let cooldown_minutes = self.settings.resend_cooldown_minutes;
        if subscriber.verification_recently_sent(now, cooldown_minutes) {
            warn!(subscriber_id = subscriber.id, "verification resend throttled");
            return Err(NewsfeedError::Throttled { cooldown_minutes });
        }

        let token = if created {
            subscriber.token.clone()
        } else {
            self.generate_unique_token().await?
        };

        self.mailer
            .send(OutgoingEmail {
                from: self.settings.from_address.clone(),
                to: subscriber.email_address.clone(),
                subject: "Confirm your newsletter subscription".to_string(),
                body: format!(
                    "Please confirm your subscription by opening the link below.\n\n{}\n\n\
                     The link expires in {} days. If you did not ask for this, ignore this email.\n",
                    confirmation_link(&self.settings.site_url, &token),
                    self.settings.confirmation_expire_days,
                ),
            })
            .await?;

        if !created {
            self.store.update_token(subscriber.id, &token).await?;
        }
        self.store.mark_verification_sent(subscriber.id, now).await?;

        info!(subscriber_id = subscriber.id, created, "verification email sent");

        Ok(Subscriber {
            token,
            verification_sent_date: Some(now),
            updated_at: now,
            ..subscriber.clone()
        })
    }

    /// Give the subscriber a new token that no other row uses.
    pub async fn reset_token(&self, subscriber: &Subscriber) -> NewsfeedResult<String> {
        let token = self.generate_unique_token().await?;
        self.store.update_token(subscriber.id, &token).await?;
        Ok(token)
    }

    async fn generate_unique_token(&self) -> NewsfeedResult<String> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let candidate = (self.token_source)();
            if !self.store.token_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        warn!(attempts = MAX_TOKEN_ATTEMPTS, "token generation exhausted");
        Err(NewsfeedError::TokenGenerationExhausted(MAX_TOKEN_ATTEMPTS))
    }

    /// Complete the double opt-in for the holder of `token`.
    pub async fn confirm_subscription(&self, token: &str) -> NewsfeedResult<Subscriber> {
        let token = token.trim();
        let subscriber = self
            .store
            .find_pending_by_token(token)
            .await?
            .ok_or_else(|| NewsfeedError::not_found("subscription token"))?;

        if subscriber.token_expired(Utc::now(), self.settings.confirmation_expire_days) {
            warn!(subscriber_id = subscriber.id, "expired verification token used");
            return Err(NewsfeedError::TokenExpired);
        }

        // Confirmation links are single use.
        self.reset_token(&subscriber).await?;
        let confirmed = self.store.set_status(subscriber.id, true, true).await?;

        info!(subscriber_id = confirmed.id, "subscription confirmed");
        Ok(confirmed)
    }

    pub async fn unsubscribe(&self, email: &str) -> NewsfeedResult<Subscriber> {
        let email_address = normalize_email(email)?;
        let subscriber = self
            .store
            .find_by_email(&email_address)
            .await?
            .filter(|s| s.subscribed)
            .ok_or_else(|| NewsfeedError::NotSubscribed(email_address.clone()))?;

        let updated = self
            .store
            .set_status(subscriber.id, subscriber.verified, false)
            .await?;

        info!(subscriber_id = updated.id, "subscriber unsubscribed");

        let notice = self
            .mailer
            .send(OutgoingEmail {
                from: self.settings.from_address.clone(),
                to: email_address,
                subject: "You have been unsubscribed".to_string(),
                body: "You will no longer receive the newsletter. \
                       You can subscribe again at any time.\n"
                    .to_string(),
            })
            .await;
        if let Err(err) = notice {
            warn!(subscriber_id = updated.id, error = %err, "unsubscribe notice not delivered");
        }

        Ok(updated)
    }

    pub async fn list(&self, filter: &SubscriberFilter) -> NewsfeedResult<Vec<SubscriberSummary>> {
        let now = Utc::now();
        let expire_days = self.settings.confirmation_expire_days;
        let subscribers = self.store.list(filter).await?;

        Ok(subscribers
            .into_iter()
            .map(|subscriber| SubscriberSummary {
                state: subscriber.state(),
                token_expired: subscriber.token_expired(now, expire_days),
                subscriber,
            })
            .collect())
    }

    /// Every verified and subscribed entry, in id order.
    pub async fn active_subscribers(&self) -> NewsfeedResult<Vec<Subscriber>> {
        let mut active = Vec::new();
        let mut after_id = 0;
        loop {
            let page = self
                .store
                .list_active_after(after_id, self.page_size())
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            after_id = last.id;
            active.extend(page);
        }
        Ok(active)
    }

    fn page_size(&self) -> i64 {
        self.settings.batch_size.max(1) as i64
    }
}
