//! Auth session state and the transition bookkeeping behind it. `AuthContext` is
//! the single owner of `status`, `principal` and `last_error`; every change is
//! published on a watch channel so guards and the host shell re-render from it.
//! Only non-sensitive metadata is held here; the session cookie lives in the
//! credential store.
//!
//! Ordering: each attempt is tagged with the trigger that started it. A
//! completion is applied only while its trigger is still the most recently
//! issued one, so among attempts of the same kind the last to complete wins and
//! a slow attempt of another kind (a stale revalidation racing a login) is
//! dropped.

use super::{errors::AuthError, types::User};
use crate::app_lib::SessionExpiry;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Initial value; resolved by the bootstrap revalidation.
    Unknown,
    Authenticating,
    Authenticated,
    Anonymous,
}

/// What started a transition attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Login,
    FederatedLogin,
    Registration,
    Revalidate,
    Logout,
}

/// Handle of one in-flight attempt, returned by [`AuthContext::begin`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTransition {
    trigger: Trigger,
    attempt: u64,
}

impl PendingTransition {
    #[must_use]
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    #[must_use]
    pub fn attempt(&self) -> u64 {
        self.attempt
    }
}

/// Snapshot of the session. `principal` is present exactly when the status is
/// `Authenticated`; the constructors are the only way to build one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    status: SessionStatus,
    principal: Option<User>,
    last_error: Option<AuthError>,
}

impl AuthState {
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            status: SessionStatus::Unknown,
            principal: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn authenticating() -> Self {
        Self {
            status: SessionStatus::Authenticating,
            principal: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn authenticated(user: User) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            principal: Some(user),
            last_error: None,
        }
    }

    #[must_use]
    pub fn anonymous(error: Option<AuthError>) -> Self {
        Self {
            status: SessionStatus::Anonymous,
            principal: None,
            last_error: error,
        }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn principal(&self) -> Option<&User> {
        self.principal.as_ref()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&AuthError> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    fn without_error(&self) -> Self {
        Self {
            last_error: None,
            ..self.clone()
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::unknown()
    }
}

struct Machine {
    issued: Option<Trigger>,
    attempts: u64,
    /// Attempt whose outcome is on display; `None` while nothing current wrote it.
    applied: Option<u64>,
    /// Set once a 401 expired the session; reset when a session is established.
    expired: bool,
}

struct Inner {
    machine: Mutex<Machine>,
    state: watch::Sender<AuthState>,
}

/// Shared handle to the session state machine.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<Inner>,
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthContext {
    /// Builds a context in the `Unknown` state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(AuthState::unknown());
        Self {
            inner: Arc::new(Inner {
                machine: Mutex::new(Machine {
                    issued: None,
                    attempts: 0,
                    applied: None,
                    expired: false,
                }),
                state,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// Receiver that observes every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Starts an attempt and makes its trigger the most recently issued one.
    ///
    /// Login-type triggers enter `Authenticating`. A revalidation enters
    /// `Authenticating` unless a principal is already shown, which stays visible
    /// until the check completes. Logout is local and lands on `Anonymous`
    /// immediately. Every trigger clears `last_error`.
    pub fn begin(&self, trigger: Trigger) -> PendingTransition {
        let mut machine = self.machine();
        machine.attempts += 1;
        machine.issued = Some(trigger);
        let pending = PendingTransition {
            trigger,
            attempt: machine.attempts,
        };

        let current = self.state();
        let next = match trigger {
            Trigger::Logout => {
                machine.applied = Some(pending.attempt);
                AuthState::anonymous(None)
            }
            Trigger::Revalidate if current.is_authenticated() => current.without_error(),
            Trigger::Login
            | Trigger::FederatedLogin
            | Trigger::Registration
            | Trigger::Revalidate => {
                machine.applied = None;
                AuthState::authenticating()
            }
        };
        self.inner.state.send_replace(next);

        debug!(?trigger, attempt = pending.attempt, "transition started");
        pending
    }

    /// Applies the outcome of an attempt unless a different trigger was issued
    /// since it began. Returns whether the outcome was applied.
    pub fn complete(&self, pending: &PendingTransition, next: AuthState) -> bool {
        let mut machine = self.machine();
        if machine.issued != Some(pending.trigger) {
            debug!(
                trigger = ?pending.trigger,
                attempt = pending.attempt,
                latest = ?machine.issued,
                "discarding stale transition"
            );
            return false;
        }

        if next.is_authenticated() {
            machine.expired = false;
        }
        machine.applied = Some(pending.attempt);
        debug!(
            trigger = ?pending.trigger,
            attempt = pending.attempt,
            status = ?next.status,
            "transition applied"
        );
        self.inner.state.send_replace(next);
        true
    }

    /// Whether the published state is still the outcome of `pending`: its
    /// completion (or, for a logout, its start) was the last one applied and no
    /// later attempt has replaced the state since.
    #[must_use]
    pub fn is_current(&self, pending: &PendingTransition) -> bool {
        self.machine().applied == Some(pending.attempt)
    }

    /// Clears `last_error`, keeping status and principal.
    pub fn clear_error(&self) {
        let _machine = self.machine();
        self.inner.state.send_if_modified(|state| state.last_error.take().is_some());
    }

    fn machine(&self) -> MutexGuard<'_, Machine> {
        self.inner
            .machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionExpiry for AuthContext {
    fn expire(&self) -> bool {
        let mut machine = self.machine();
        if machine.expired {
            return false;
        }
        machine.expired = true;
        machine.applied = None;
        info!("session expired, forcing anonymous");
        self.inner.state.send_replace(AuthState::anonymous(None));
        true
    }
}
