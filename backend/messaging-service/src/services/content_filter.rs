//! Contact-information filter for outgoing messages.
//!
//! Advisory only: messages are never rejected or truncated. When a message
//! looks like it carries an e-mail address or phone number, a fixed safety
//! notice is appended to the stored content.

use regex::Regex;
use std::sync::LazyLock;

pub const SAFETY_NOTICE: &str =
    "[System: Please keep communication on the platform for your security]";

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("Invalid email regex")
});

/// Optional country code and area code, then a 3-4 digit exchange and a
/// 4 digit line (7+ digits in total), separated by spaces, dots or dashes.
static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.\-]?)?(?:\(?\d{2,4}\)?[\s.\-]?)?\d{3,4}[\s.\-]?\d{4}\b")
        .expect("Invalid phone regex")
});

pub fn contains_contact_info(text: &str) -> bool {
    EMAIL_REGEX.is_match(text) || PHONE_REGEX.is_match(text)
}

/// Return the content to store for `text`.
pub fn filter(text: &str) -> String {
    if !contains_contact_info(text) || text.trim_end().ends_with(SAFETY_NOTICE) {
        return text.to_string();
    }

    tracing::debug!("contact information detected in message, appending safety notice");
    format!("{text}\n\n{SAFETY_NOTICE}")
}
