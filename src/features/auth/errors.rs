use crate::app_lib::AppError;
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

/// Per-field messages produced by the client-side pre-checks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// `Ok(())` when no field failed.
    ///
    /// # Errors
    /// Returns `AuthError::Validation` carrying every collected message.
    pub fn into_result(self) -> Result<(), AuthError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                formatter.write_str("; ")?;
            }
            write!(formatter, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Failure of a session transition, as surfaced to callers and in `last_error`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Client-side pre-check failed; nothing was sent and the status is unchanged.
    #[error("{0}")]
    Validation(FieldErrors),
    /// The backend declined the credentials.
    #[error("{0}")]
    Rejected(String),
    /// No session exists (or it could not be confirmed).
    #[error("Your session could not be established. Please sign in again.")]
    SessionAbsent,
    /// Transport-level failure, including a twice-rejected anti-forgery token.
    #[error("{0}")]
    Network(String),
    /// A federated login was attempted without an identity-provider credential.
    #[error("An identity provider credential is required.")]
    MissingCredential,
    /// A newer transition replaced this attempt before it completed.
    #[error("Superseded by a newer authentication attempt.")]
    Superseded,
}

impl AuthError {
    /// Classifies a gateway failure of a login-type call.
    ///
    /// Backend refusals keep the backend's own message and fall back to
    /// `fallback`; transport failures keep the gateway's message.
    pub(crate) fn from_gateway(error: &AppError, fallback: &str) -> Self {
        match error {
            AppError::Http { .. } | AppError::Unauthorized { .. } if error.is_client_error() => {
                Self::Rejected(
                    error
                        .backend_detail()
                        .map_or_else(|| fallback.to_string(), str::to_string),
                )
            }
            AppError::Http { .. } => Self::Network(
                error
                    .backend_detail()
                    .map_or_else(|| fallback.to_string(), str::to_string),
            ),
            _ => Self::Network(error.to_string()),
        }
    }

    /// True for failures that were never sent to the backend.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::MissingCredential)
    }
}
