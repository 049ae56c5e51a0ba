//! Subscriber entity definitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A mailing-list entry confirmed through a tokenised verification email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub email_address: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub verified: bool,
    pub subscribed: bool,
    pub verification_sent_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    /// A token is expired when no verification was ever sent, or when
    /// `expire_days` have elapsed since the last send. A window that runs
    /// past the representable range never expires.
    pub fn token_expired(&self, now: DateTime<Utc>, expire_days: i64) -> bool {
        let Some(sent) = self.verification_sent_date else {
            return true;
        };
        Duration::try_days(expire_days)
            .and_then(|window| sent.checked_add_signed(window))
            .is_some_and(|deadline| deadline <= now)
    }

    /// Whether a verification email went out less than `cooldown_minutes` ago.
    pub fn verification_recently_sent(&self, now: DateTime<Utc>, cooldown_minutes: i64) -> bool {
        let Some(sent) = self.verification_sent_date else {
            return false;
        };
        match Duration::try_minutes(cooldown_minutes)
            .and_then(|window| now.checked_sub_signed(window))
        {
            Some(threshold) => sent >= threshold,
            None => true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.verified && self.subscribed
    }

    /// `verified` records that the address was proven at least once, so an
    /// unsubscribed entry keeps it while losing `subscribed`.
    pub fn state(&self) -> SubscriberState {
        match (self.verified, self.subscribed) {
            (true, true) => SubscriberState::Subscribed,
            (true, false) => SubscriberState::Unsubscribed,
            (false, _) if self.verification_sent_date.is_some() => {
                SubscriberState::VerificationPending
            }
            (false, _) => SubscriberState::Unverified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberState {
    Unverified,
    VerificationPending,
    Subscribed,
    Unsubscribed,
}

impl SubscriberState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberState::Unverified => "unverified",
            SubscriberState::VerificationPending => "verification_pending",
            SubscriberState::Subscribed => "subscribed",
            SubscriberState::Unsubscribed => "unsubscribed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriberRequest {
    pub email_address: String,
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriberFilter {
    pub subscribed: Option<bool>,
    pub verified: Option<bool>,
    /// Substring match on the email address.
    pub search: Option<String>,
}
