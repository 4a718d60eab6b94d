//! Client-side pre-checks run before any network call. They only catch obvious
//! mistakes; the backend stays the authority on every constraint.

use super::errors::{AuthError, FieldErrors};
use secrecy::{ExposeSecret, SecretString};

/// Minimum password length the backend accepts for new accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Checks the login form.
///
/// # Errors
/// Returns `AuthError::Validation` with per-field messages.
pub fn validate_login(username: &str, password: &SecretString) -> Result<(), AuthError> {
    let mut errors = FieldErrors::new();

    if username.trim().is_empty() {
        errors.insert("username", "Username is required");
    }
    if password.expose_secret().is_empty() {
        errors.insert("password", "Password is required");
    }

    errors.into_result()
}

/// Checks the registration form.
///
/// # Errors
/// Returns `AuthError::Validation` with per-field messages.
pub fn validate_registration(
    email: &str,
    password: &SecretString,
    username: &str,
) -> Result<(), AuthError> {
    let mut errors = FieldErrors::new();

    let email = email.trim();
    if email.is_empty() {
        errors.insert("email", "Email is required");
    } else if !is_plausible_email(email) {
        errors.insert("email", "Email address is invalid");
    }

    if username.trim().is_empty() {
        errors.insert("username", "Username is required");
    }

    let password = password.expose_secret();
    if password.is_empty() {
        errors.insert("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.insert(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }

    errors.into_result()
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
