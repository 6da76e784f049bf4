//! Password policy (spec §4.1): checked once, at creation time.

use thiserror::Error;

/// Minimum password length.
pub const MIN_LENGTH: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("password must be at least {MIN_LENGTH} characters")]
    TooShort,
    #[error("password must contain a lowercase letter, an uppercase letter, a digit, and a symbol")]
    MissingCharacterClass,
}

/// Validate a candidate password against the creation-time policy: at
/// least 12 characters, with a lowercase letter, an uppercase letter, a
/// digit, and a non-alphanumeric symbol. Never re-checked on unlock — a
/// password that weakened after a policy change must still unlock the
/// vault it was set up with.
pub fn validate(password: &str) -> Result<(), PolicyError> {
    if password.chars().count() < MIN_LENGTH {
        return Err(PolicyError::TooShort);
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_alphanumeric());

    if has_lower && has_upper && has_digit && has_symbol {
        Ok(())
    } else {
        Err(PolicyError::MissingCharacterClass)
    }
}
