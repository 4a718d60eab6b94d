//! Auth feature module covering password, federated and registration sign-in,
//! startup revalidation and route gating. It keeps authentication logic out of
//! the host shell and must stay aligned with the backend's session contract.
//! This module touches security boundaries and must avoid logging secrets.
//!
//! Flow Overview: every sign-in flow enters `Authenticating`, establishes the
//! session cookie and reconciles against the profile endpoint. Bootstrap runs a
//! single revalidation that resolves `Unknown`. Logout is local first and
//! best-effort towards the backend.

pub mod bootstrap;
pub mod client;
pub mod errors;
pub mod guards;
pub mod session;
pub mod state;
pub mod types;
pub mod validation;

pub use bootstrap::Bootstrapper;
pub use errors::{AuthError, FieldErrors};
pub use guards::RouteDecision;
pub use session::SessionManager;
pub use state::{AuthContext, AuthState, PendingTransition, SessionStatus, Trigger};
pub use types::User;
pub use validation::MIN_PASSWORD_LENGTH;
