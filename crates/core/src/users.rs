//! Username rules.
//!
//! Usernames appear as a path segment both in URLs and in the media layout,
//! so the allowed alphabet is deliberately narrow.

use crate::error::CoreError;

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 150;

/// Validate a username: 1 to [`MAX_USERNAME_LEN`] characters from
/// `[A-Za-z0-9_.@+-]`, not starting with `.`.
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    if username.is_empty() {
        return Err(CoreError::Validation("Username must not be empty".into()));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(CoreError::Validation(format!(
            "Username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if username.starts_with('.') {
        return Err(CoreError::Validation(
            "Username must not start with '.'".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
    {
        return Err(CoreError::Validation(
            "Username may only contain letters, digits and _ . @ + -".into(),
        ));
    }
    Ok(())
}
