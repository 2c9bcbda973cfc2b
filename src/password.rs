//! Credential handling and the form rules applied before store calls.
//!
//! Passwords are kept and compared in plaintext. All storage and comparison
//! goes through [`stored_form`] and [`verify`] so switching to salted hashes
//! only touches this file.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub const MIN_PASSWORD_LEN: usize = 8;

/// Value written to a user record for a chosen password
pub fn stored_form(password: &str) -> String {
    password.to_string()
}

/// Does `candidate` match the stored credential
pub fn verify(stored: &str, candidate: &str) -> bool {
    stored == candidate
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Checks run on the login form before an attempt is made
pub fn validate_login_form(user_id: &str, password: &str) -> Result<()> {
    if user_id.is_empty() {
        return Err(Error::validation("User ID is required"));
    }
    if user_id.chars().count() < 3 {
        return Err(Error::validation("User ID must be at least 3 characters"));
    }
    if password.is_empty() {
        return Err(Error::validation("Password is required"));
    }
    if password.chars().count() < 6 {
        return Err(Error::validation("Password must be at least 6 characters"));
    }
    Ok(())
}

/// Fields the admin add/edit user form insists on
pub fn validate_user_form(email: &str, password: &str) -> Result<()> {
    if !is_valid_email(email) {
        return Err(Error::validation("Please enter a valid email address"));
    }
    if password.is_empty() {
        return Err(Error::validation("Password is required"));
    }
    Ok(())
}

/// Password policy for a change: reports the first rule broken
pub fn validate_new_password(current: &str, new: &str, confirm: &str) -> Result<()> {
    if current.is_empty() {
        return Err(Error::validation("Current password is required"));
    }
    if new.is_empty() {
        return Err(Error::validation("New password is required"));
    }
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !new.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(Error::validation(
            "Password must contain at least one uppercase letter",
        ));
    }
    if !new.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(Error::validation(
            "Password must contain at least one lowercase letter",
        ));
    }
    if !new.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::validation("Password must contain at least one number"));
    }
    if current == new {
        return Err(Error::validation(
            "New password must be different from current password",
        ));
    }
    if confirm.is_empty() {
        return Err(Error::validation("Please confirm your new password"));
    }
    if new != confirm {
        return Err(Error::validation("Passwords do not match"));
    }
    Ok(())
}

/// Strength meter in percent: length up to 40, then 15 per character class
pub fn strength(password: &str) -> u32 {
    let length = (password.chars().count() as u32).saturating_mul(5).min(40);
    let classes = [
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    let complexity = classes.iter().filter(|&&hit| hit).count() as u32 * 15;
    (length + complexity).min(100)
}
