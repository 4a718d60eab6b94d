//! Request gateway for the rebate API. Every call goes through `Gateway`, which
//! replays the ambient session cookie, attaches the anti-forgery token to
//! mutating requests, bounds each exchange with the configured timeout and maps
//! failures into `AppError`. A `401` on a regular request expires the session and
//! emits one `SessionEvent::LoginRequired`. Bodies, cookies and tokens are never
//! logged.

use super::{
    config::AppConfig,
    credentials::CredentialStore,
    csrf::{CSRF_HEADER, CsrfTokenCache},
    errors::AppError,
    events::{SessionEvent, SessionExpiry},
    transport::{HttpRequest, HttpResponse, Transport},
};
use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::{Instrument, debug, debug_span, info, warn};
use uuid::Uuid;

/// Endpoint issuing anti-forgery tokens.
pub const CSRF_PATH: &str = "/api/v1/auth/csrf/";
/// Correlation header attached to every request.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

const COOKIE_HEADER: &str = "Cookie";
const EVENT_CAPACITY: usize = 16;

#[derive(Deserialize)]
struct CsrfResponse {
    #[serde(rename = "csrfToken")]
    csrf_token: String,
}

/// Describes one backend call before the gateway decorates it.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Whether a `401` on this request means the session expired mid-use.
    pub signals_expiry: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            signals_expiry: true,
        }
    }

    /// Builds a JSON `POST`.
    ///
    /// # Errors
    /// Returns `AppError::Serialization` if the body cannot be encoded.
    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, AppError> {
        let body = serde_json::to_value(body)
            .map_err(|err| AppError::Serialization(format!("Failed to encode request: {err}")))?;
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
            signals_expiry: true,
        })
    }

    /// Builds a `POST` without a body.
    #[must_use]
    pub fn post_empty(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: None,
            signals_expiry: true,
        }
    }

    /// Marks a request whose `401` is an expected answer (credential checks,
    /// session lookups) rather than a sign of mid-session expiry.
    #[must_use]
    pub fn without_expiry_signal(mut self) -> Self {
        self.signals_expiry = false;
        self
    }

    /// Non-safe methods must carry the anti-forgery token.
    #[must_use]
    pub fn requires_csrf(&self) -> bool {
        !matches!(
            self.method,
            Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
        )
    }
}

/// Single entry point for backend calls.
pub struct Gateway {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    csrf: CsrfTokenCache,
    expiry: Arc<dyn SessionExpiry>,
    events: broadcast::Sender<SessionEvent>,
    login_path: String,
    timeout: Duration,
}

impl Gateway {
    #[must_use]
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        expiry: Arc<dyn SessionExpiry>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            credentials,
            csrf: CsrfTokenCache::new(),
            expiry,
            events,
            login_path: config.login_path.clone(),
            timeout: config.request_timeout,
        }
    }

    /// Subscribes to gateway events (login redirects).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn csrf(&self) -> &CsrfTokenCache {
        &self.csrf
    }

    /// Sends a request and returns the successful response.
    ///
    /// # Errors
    /// Returns the normalized failure; `AppError::Unauthorized` additionally expires
    /// the session when the request signals expiry.
    pub async fn send(&self, request: &ApiRequest) -> Result<HttpResponse, AppError> {
        let response = self.dispatch(request).await?;

        let response = if request.requires_csrf() && is_token_rejection(&response) {
            warn!(path = %request.path, "anti-forgery token rejected, retrying once");
            self.csrf.invalidate().await;
            let retried = self.dispatch(request).await?;
            if is_token_rejection(&retried) {
                return Err(AppError::TokenRejected);
            }
            retried
        } else {
            response
        };

        self.finish(request, response)
    }

    /// Sends a request and decodes its JSON body.
    ///
    /// # Errors
    /// Same as [`Gateway::send`], plus `AppError::Parse` for undecodable bodies.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, AppError> {
        let response = self.send(request).await?;
        parse_json(&response.body)
    }

    /// Decodes JSON and treats `204` or `401` as "nothing there".
    ///
    /// # Errors
    /// Same as [`Gateway::send_json`] for every other failure.
    pub async fn send_optional_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<Option<T>, AppError> {
        match self.send(request).await {
            Ok(response) if response.status == 204 => Ok(None),
            Ok(response) => parse_json(&response.body).map(Some),
            Err(AppError::Unauthorized { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Fetches JSON from a regular (expiry-signaling) endpoint.
    ///
    /// # Errors
    /// Same as [`Gateway::send_json`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        self.send_json(&ApiRequest::get(path)).await
    }

    /// Fetches JSON, returning `None` for `204` or a missing session.
    ///
    /// # Errors
    /// Same as [`Gateway::send_optional_json`].
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, AppError> {
        self.send_optional_json(&ApiRequest::get(path)).await
    }

    /// Posts a JSON body and decodes the JSON answer.
    ///
    /// # Errors
    /// Same as [`Gateway::send_json`], plus `AppError::Serialization`.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        self.send_json(&ApiRequest::post(path, body)?).await
    }

    /// Posts without a body, ignoring the response payload.
    ///
    /// # Errors
    /// Same as [`Gateway::send`].
    pub async fn post_empty(&self, path: &str) -> Result<(), AppError> {
        self.send(&ApiRequest::post_empty(path)).await.map(|_| ())
    }

    /// Forgets the ambient credential and the anti-forgery token.
    pub async fn reset(&self) {
        self.csrf.invalidate().await;
        self.credentials.clear();
    }

    fn finish(&self, request: &ApiRequest, response: HttpResponse) -> Result<HttpResponse, AppError> {
        if response.is_success() {
            return Ok(response);
        }

        let error = AppError::from_response(response.status, &response.body);
        if matches!(error, AppError::Unauthorized { .. }) && request.signals_expiry {
            self.signal_expiry();
        }
        Err(error)
    }

    fn signal_expiry(&self) {
        if self.expiry.expire() {
            info!(redirect_to = %self.login_path, "session expired, login required");
            // Nobody listening is fine; the state change already happened.
            let _ = self.events.send(SessionEvent::LoginRequired {
                redirect_to: self.login_path.clone(),
            });
        } else {
            debug!("session already expired, suppressing redirect");
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<HttpResponse, AppError> {
        let mut headers = Vec::new();
        if request.requires_csrf() {
            let token = self.csrf.get(|| self.fetch_csrf_token()).await?;
            headers.push((CSRF_HEADER.to_string(), token));
        }

        self.exchange(HttpRequest {
            method: request.method.clone(),
            path: request.path.clone(),
            headers,
            body: request.body.clone(),
        })
        .await
    }

    async fn fetch_csrf_token(&self) -> Result<String, AppError> {
        let response = self
            .exchange(HttpRequest {
                method: Method::GET,
                path: CSRF_PATH.to_string(),
                headers: Vec::new(),
                body: None,
            })
            .await?;

        if !response.is_success() {
            return Err(AppError::from_response(response.status, &response.body));
        }
        let token: CsrfResponse = parse_json(&response.body)?;
        Ok(token.csrf_token)
    }

    /// Decorates a request with the ambient credential and a request id, sends it
    /// under the timeout and records any cookies the backend sets.
    async fn exchange(&self, mut request: HttpRequest) -> Result<HttpResponse, AppError> {
        let request_id = Uuid::new_v4().to_string();
        request
            .headers
            .push((REQUEST_ID_HEADER.to_string(), request_id.clone()));
        if let Some(cookie) = self.credentials.read() {
            request.headers.push((COOKIE_HEADER.to_string(), cookie));
        }

        let method = request.method.clone();
        let path = request.path.clone();
        let span = debug_span!(
            "gateway.request",
            http.method = %method,
            path = %path,
            request_id = %request_id
        );

        let response = tokio::time::timeout(self.timeout, self.transport.send(request))
            .instrument(span)
            .await
            .map_err(|_| AppError::Timeout("Request timed out. Please try again.".to_string()))??;

        if !response.set_cookies.is_empty() {
            self.credentials.store(&response.set_cookies);
        }
        debug!(
            http.method = %method,
            path = %path,
            status = response.status,
            request_id = %request_id,
            "gateway response"
        );

        Ok(response)
    }
}

/// The backend answers a stale or missing anti-forgery token with a `403` that
/// names the CSRF check.
fn is_token_rejection(response: &HttpResponse) -> bool {
    response.status == 403 && response.body.to_ascii_lowercase().contains("csrf")
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, AppError> {
    serde_json::from_str(body)
        .map_err(|err| AppError::Parse(format!("Failed to decode response: {err}")))
}
