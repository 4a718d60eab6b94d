//! Anti-forgery token cache. The token is fetched lazily before the first
//! mutating request and shared by every caller until it is invalidated.

use super::errors::AppError;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::debug;

/// Header the backend reads the anti-forgery token from.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Process-wide holder of the current anti-forgery token.
///
/// The async mutex is held across the fetch, so callers arriving while a fetch is
/// in flight wait for it and then reuse its result instead of fetching again.
#[derive(Debug, Default)]
pub struct CsrfTokenCache {
    token: Mutex<Option<String>>,
}

impl CsrfTokenCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token, running `fetch` exactly once when the cache is empty.
    ///
    /// # Errors
    /// Propagates the fetch error; the cache stays empty so the next call retries.
    pub async fn get<F, Fut>(&self, fetch: F) -> Result<String, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, AppError>>,
    {
        let mut token = self.token.lock().await;
        if let Some(value) = token.as_ref() {
            return Ok(value.clone());
        }

        debug!("fetching anti-forgery token");
        let value = fetch().await?;
        if value.trim().is_empty() {
            return Err(AppError::Parse(
                "Backend returned an empty anti-forgery token.".to_string(),
            ));
        }
        *token = Some(value.clone());
        Ok(value)
    }

    /// Returns the cached token without fetching.
    pub async fn peek(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    /// Drops the cached token so the next `get` refetches it.
    pub async fn invalidate(&self) {
        if self.token.lock().await.take().is_some() {
            debug!("anti-forgery token invalidated");
        }
    }
}
