//! Database repository implementations

pub mod issue_repository;
pub mod newsletter_repository;
pub mod post_repository;
pub mod subscriber_repository;

pub use issue_repository::*;
pub use newsletter_repository::*;
pub use post_repository::*;
pub use subscriber_repository::*;
