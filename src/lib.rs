//! # Rebate Client (session-authenticated portal client)
//!
//! `rebate_client` is the client side of the crypto rebate portal. It owns the
//! session authentication state machine: it knows whether the current context is
//! authenticated and as whom, drives password, federated and registration flows,
//! re-validates a persisted session at startup, attaches anti-forgery tokens to
//! mutating requests and reacts when the backend reports that the session is gone.
//!
//! ## Session Model
//!
//! The backend uses cookie sessions plus an anti-forgery token:
//!
//! 1. **Bootstrap:** [`App::bootstrap`] asks `GET /api/v1/profile/` who the ambient
//!    cookie belongs to. `Unknown` resolves to `Authenticated` or `Anonymous`
//!    before any protected route is allowed to render.
//! 2. **Login:** password, federated (`/api/v1/auth/google/`) and registration
//!    flows establish the cookie, then reconcile against the profile endpoint.
//! 3. **Mutations:** every non-safe request carries `X-CSRFToken`, fetched lazily
//!    from `/api/v1/auth/csrf/` and refetched once when the backend rejects it.
//! 4. **Expiry:** a `401` on a regular request forces the session to `Anonymous`
//!    and emits a single [`SessionEvent::LoginRequired`] for the host shell.
//!
//! ## Ownership
//!
//! There are no process-wide globals. [`App`] is the context object that owns the
//! state machine, the gateway, the token cache and the credential store; clone
//! handles out of it instead of reaching for statics.

#[path = "lib/mod.rs"]
pub mod app_lib;
pub mod app;
pub mod cli;
pub mod features;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

pub use app::App;
pub use app_lib::{AppConfig, AppError, SessionEvent};
pub use features::auth::{
    AuthError, AuthState, FieldErrors, RouteDecision, SessionManager, SessionStatus, User,
};
