//! Request and response types for auth-related API calls. Request payloads carry
//! passwords and identity-provider credentials, so they must never be logged;
//! their `Debug` output redacts the secrets.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    /// The backend re-checks the confirmation; the client sends the same value.
    #[serde(serialize_with = "expose")]
    pub password_confirm: SecretString,
}

#[derive(Clone, Debug, Serialize)]
pub struct FederatedLoginRequest {
    #[serde(serialize_with = "expose")]
    pub credential: SecretString,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Authenticated principal as returned by the API.
/// This mirrors the cookie-backed session and contains no secrets.
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub date_joined: Option<String>,
}

impl User {
    /// Full name when the profile has one, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    #[must_use]
    pub fn created_at(&self) -> Option<&str> {
        self.date_joined.as_deref()
    }
}

/// Body of a successful login, registration or federated login.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(default)]
    pub message: Option<String>,
}

/// The profile endpoint answers with the bare user; older deployments wrap it.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ProfileResponse {
    Wrapped { user: User },
    Bare(User),
}

impl ProfileResponse {
    #[must_use]
    pub fn into_user(self) -> User {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user,
        }
    }
}
