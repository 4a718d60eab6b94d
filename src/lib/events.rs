use serde::Serialize;

/// Events the gateway emits for the hosting shell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The backend reported the session as gone; navigate to the login entry point.
    LoginRequired { redirect_to: String },
}

/// Receiver of server-signaled authentication loss.
pub trait SessionExpiry: Send + Sync {
    /// Forces the session into `Anonymous`.
    ///
    /// Returns `true` only for the call that actually expired the session, so the
    /// caller emits one redirect even when several requests fail at once.
    fn expire(&self) -> bool;
}
