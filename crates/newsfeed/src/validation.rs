//! Input validation shared by the services.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::{NewsfeedError, NewsfeedResult};

pub const MAX_ISSUE_TITLE: usize = 128;
pub const MAX_SUBJECT: usize = 128;
pub const MAX_POST_TITLE: usize = 255;
pub const MAX_CATEGORY_NAME: usize = 255;
pub const MAX_EMAIL: usize = 254;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$")
            .expect("email pattern is valid")
    })
}

/// Trim and lower-case an address, rejecting anything that does not look
/// like `local@domain.tld`.
pub fn normalize_email(raw: &str) -> NewsfeedResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(NewsfeedError::validation("email address is required"));
    }
    if email.len() > MAX_EMAIL {
        return Err(NewsfeedError::validation(format!(
            "email address is longer than {MAX_EMAIL} characters"
        )));
    }
    if !email_pattern().is_match(&email) {
        return Err(NewsfeedError::validation(format!(
            "{email:?} is not a valid email address"
        )));
    }
    Ok(email)
}

/// Required, non-blank text of at most `max` characters. Returns the trimmed value.
pub fn require_text(field: &str, value: &str, max: usize) -> NewsfeedResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NewsfeedError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(NewsfeedError::validation(format!(
            "{field} is longer than {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Absolute `http`/`https` URL with a host. Returns the trimmed value.
///
/// The URL parser silently drops tabs and newlines, so any whitespace left
/// after trimming is rejected up front.
pub fn require_url(field: &str, value: &str) -> NewsfeedResult<String> {
    let trimmed = value.trim();
    let invalid = || NewsfeedError::validation(format!("{field} must be an absolute http(s) URL"));

    if trimmed.contains(char::is_whitespace) {
        return Err(invalid());
    }
    let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https")
        || parsed.host_str().map_or(true, str::is_empty)
    {
        return Err(invalid());
    }
    Ok(trimmed.to_string())
}
