//! Client configuration for the API endpoint, request timeout and session
//! persistence. Defaults target a local backend; the CLI fills the values from
//! its flags and their environment variables.
//! Configuration values are public; do not store secrets here.

use std::{path::PathBuf, time::Duration};

/// Default backend used when nothing is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
/// Default request timeout (milliseconds) applied to every gateway call.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Where the route guard sends anonymous users.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Client configuration shared by the gateway, the route guard and the shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub login_path: String,
    /// File backing the ambient session credential; `None` keeps it in memory.
    pub session_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            session_file: None,
        }
    }
}

impl AppConfig {
    /// Returns a copy pointing at another backend, keeping the other settings.
    #[must_use]
    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    /// Returns a copy with another request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_backend() {
        let config = AppConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.session_file, None);
    }

    #[test]
    fn builders_replace_one_setting() {
        let config = AppConfig::default()
            .with_api_base_url("https://api.rebates.example")
            .with_request_timeout(Duration::from_millis(2500));
        assert_eq!(config.api_base_url, "https://api.rebates.example");
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
    }
}
