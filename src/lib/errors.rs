use serde_json::Value;
use thiserror::Error;

/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;

/// Keys the backend uses for a human-readable failure message, in lookup order.
const MESSAGE_KEYS: [&str; 4] = ["error", "message", "detail", "non_field_errors"];

/// Normalized failure of a gateway call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http {
        status: u16,
        message: String,
        /// Message the backend put in its JSON error payload, if any.
        detail: Option<String>,
    },
    #[error("Not authenticated")]
    Unauthorized { detail: Option<String> },
    #[error("Security token was rejected. Please try again.")]
    TokenRejected,
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Builds the error for a non-success response from its status and raw body.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let detail = backend_message(body);
        if status == 401 {
            return Self::Unauthorized { detail };
        }
        Self::Http {
            status,
            message: sanitize_body(body),
            detail,
        }
    }

    /// Message the backend supplied for this failure, when it supplied one.
    #[must_use]
    pub fn backend_detail(&self) -> Option<&str> {
        match self {
            Self::Http { detail, .. } | Self::Unauthorized { detail } => detail.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of the failure, if the backend answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            Self::TokenRejected => Some(403),
            _ => None,
        }
    }

    /// True when the backend answered and declined the request (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499)) && !matches!(self, Self::TokenRejected)
    }
}

/// Extracts a human-readable message from a JSON error payload.
///
/// Looks at `error`, `message`, `detail` and `non_field_errors` first, then at the
/// first field-level error (`{"username": ["already taken"]}`).
pub(crate) fn backend_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    MESSAGE_KEYS
        .iter()
        .filter_map(|key| object.get(*key))
        .chain(object.values())
        .find_map(message_text)
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => normalize_message(text),
        Value::Array(items) => items.iter().find_map(message_text),
        _ => None,
    }
}

fn normalize_message(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_ERROR_CHARS).collect())
    }
}

/// Sanitizes HTTP error bodies for user-facing messages by trimming and truncating.
pub(crate) fn sanitize_body(body: &str) -> String {
    normalize_message(body).unwrap_or_else(|| "Request failed.".to_string())
}
