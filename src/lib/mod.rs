//! Shared client plumbing: the request gateway, transport seam, ambient session
//! credential, anti-forgery token cache, configuration and errors.
//!
//! ## Request Lifecycle
//!
//! 1. **Decorate:** the gateway attaches the stored session cookie and an
//!    `X-Request-Id`; non-safe methods also get `X-CSRFToken`, fetched from
//!    `/api/v1/auth/csrf/` the first time one is needed.
//! 2. **Send:** the transport performs the exchange under the configured timeout.
//! 3. **Record:** `Set-Cookie` headers are written back to the credential store.
//! 4. **Normalize:** non-success responses become `AppError`. A `403` naming the
//!    CSRF check invalidates the token and retries once; a `401` on a regular
//!    request expires the session and emits `SessionEvent::LoginRequired`.
//!
//! Centralizing these helpers keeps network behavior consistent and avoids
//! duplicated logic in the auth feature. Callers must still avoid logging
//! sensitive data.

pub mod api;
pub mod config;
pub mod credentials;
pub mod csrf;
pub mod errors;
pub mod events;
pub mod transport;

pub use api::{ApiRequest, Gateway};
pub use config::AppConfig;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use csrf::CsrfTokenCache;
pub use errors::AppError;
pub use events::{SessionEvent, SessionExpiry};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
