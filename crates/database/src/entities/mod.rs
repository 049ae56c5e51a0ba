//! Domain entities for the database layer

pub mod issue;
pub mod newsletter;
pub mod post;
pub mod subscriber;

/// Serde support for `Option<Option<T>>` fields, where an explicit `null`
/// clears a value and a missing field leaves it alone.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

pub use issue::{CreateIssueRequest, Issue, IssueFilter, IssueType, UpdateIssueRequest};
pub use newsletter::{CreateNewsletterRequest, Newsletter};
pub use post::{
    CategorizedPost, CreateCategoryRequest, CreatePostRequest, Post, PostCategory, PostFilter,
    UpdateCategoryRequest, UpdatePostRequest,
};
pub use subscriber::{CreateSubscriberRequest, Subscriber, SubscriberFilter, SubscriberState};
