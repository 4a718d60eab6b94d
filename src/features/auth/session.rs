//! Session flows: password, federated and registration sign-in, startup
//! revalidation and logout. Each flow opens a transition on [`AuthContext`],
//! talks to the backend through the gateway and reports its outcome back to
//! the context, which decides whether the outcome is still current.

use super::{
    client,
    errors::AuthError,
    state::{AuthContext, AuthState, PendingTransition, SessionStatus, Trigger},
    types::{AuthResponse, FederatedLoginRequest, LoginRequest, RegisterRequest, User},
    validation::{validate_login, validate_registration},
};
use crate::app_lib::{AppError, Gateway};
use secrecy::{ExposeSecret, SecretString};
use std::{future::Future, sync::Arc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

const LOGIN_FALLBACK: &str = "Login failed";
const FEDERATED_FALLBACK: &str = "Federated login failed";
const REGISTRATION_FALLBACK: &str = "Registration failed";

/// Drives the session state machine. Cheap to clone.
#[derive(Clone)]
pub struct SessionManager {
    auth: AuthContext,
    gateway: Arc<Gateway>,
}

impl SessionManager {
    /// `gateway` must report expiry to the same `auth` context.
    #[must_use]
    pub fn new(auth: AuthContext, gateway: Arc<Gateway>) -> Self {
        Self { auth, gateway }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.auth.state()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.auth.status()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.auth.subscribe()
    }

    pub fn clear_error(&self) {
        self.auth.clear_error();
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Signs in with username and password.
    ///
    /// # Errors
    /// `Validation` before any request when a field is empty; otherwise the
    /// failure that left the session `Anonymous`, or `Superseded` when a newer
    /// transition replaced this one.
    pub async fn login_with_credentials(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<User, AuthError> {
        validate_login(username, password)?;
        let request = LoginRequest {
            username: username.trim().to_string(),
            password: password.clone(),
        };
        self.establish(Trigger::Login, LOGIN_FALLBACK, || {
            client::login(&self.gateway, &request)
        })
        .await
    }

    /// Signs in with a credential issued by the identity provider.
    ///
    /// # Errors
    /// `MissingCredential` before any request when the credential is blank;
    /// otherwise as [`SessionManager::login_with_credentials`].
    pub async fn login_with_federated_credential(
        &self,
        credential: &SecretString,
    ) -> Result<User, AuthError> {
        if credential.expose_secret().trim().is_empty() {
            return Err(AuthError::MissingCredential);
        }
        let request = FederatedLoginRequest {
            credential: credential.clone(),
        };
        self.establish(Trigger::FederatedLogin, FEDERATED_FALLBACK, || {
            client::federated_login(&self.gateway, &request)
        })
        .await
    }

    /// Creates an account and signs it in from the registration response.
    ///
    /// # Errors
    /// `Validation` before any request; otherwise as
    /// [`SessionManager::login_with_credentials`].
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
        username: &str,
    ) -> Result<User, AuthError> {
        validate_registration(email, password, username)?;
        let request = RegisterRequest {
            email: email.trim().to_string(),
            username: username.trim().to_string(),
            password: password.clone(),
            password_confirm: password.clone(),
        };
        self.establish(Trigger::Registration, REGISTRATION_FALLBACK, || {
            client::register(&self.gateway, &request)
        })
        .await
    }

    /// Asks the backend who the ambient credential belongs to. Failures only
    /// show up as `Anonymous`; `last_error` stays empty.
    pub async fn revalidate(&self) -> SessionStatus {
        let pending = self.auth.begin(Trigger::Revalidate);

        let next = match client::fetch_profile(&self.gateway).await {
            Ok(Some(user)) => AuthState::authenticated(user),
            Ok(None) => {
                debug!("no active session");
                AuthState::anonymous(None)
            }
            Err(err) => {
                warn!("Failed to revalidate session: {err}");
                AuthState::anonymous(None)
            }
        };
        self.auth.complete(&pending, next);

        self.auth.status()
    }

    /// Signs out locally: the session is `Anonymous` when this returns and
    /// in-flight sign-ins are discarded. Pass the returned transition to
    /// [`SessionManager::notify_logout`] to end the backend session.
    #[must_use]
    pub fn sign_out_local(&self) -> PendingTransition {
        let pending = self.auth.begin(Trigger::Logout);
        info!(attempt = pending.attempt(), "signed out");
        pending
    }

    /// Tells the backend about a local sign-out, then forgets the ambient
    /// credential and anti-forgery token unless a newer transition took over
    /// while the backend was answering.
    pub async fn notify_logout(&self, pending: PendingTransition) {
        if let Err(err) = client::logout(&self.gateway).await {
            warn!("Failed to notify backend of logout: {err}");
        }

        if self.auth.is_current(&pending) {
            self.gateway.reset().await;
        } else {
            debug!(
                attempt = pending.attempt(),
                "newer transition after logout, keeping its credential"
            );
        }
    }

    /// [`SessionManager::sign_out_local`] followed by
    /// [`SessionManager::notify_logout`].
    pub async fn logout(&self) {
        let pending = self.sign_out_local();
        self.notify_logout(pending).await;
    }

    async fn establish<F, Fut>(
        &self,
        trigger: Trigger,
        fallback: &str,
        call: F,
    ) -> Result<User, AuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AuthResponse, AppError>>,
    {
        let pending = self.auth.begin(trigger);

        let response = match call().await {
            Ok(response) => response,
            Err(err) => {
                let error = AuthError::from_gateway(&err, fallback);
                warn!(?trigger, attempt = pending.attempt(), "sign-in failed: {err}");
                self.auth
                    .complete(&pending, AuthState::anonymous(Some(error.clone())));
                return Err(error);
            }
        };

        let signed_in = response.user;
        if !self
            .auth
            .complete(&pending, AuthState::authenticated(signed_in.clone()))
        {
            return Err(AuthError::Superseded);
        }

        self.reconcile(&pending, signed_in).await
    }

    /// Confirms the freshly established session against the profile endpoint
    /// under the same transition. When the profile cannot be fetched the
    /// principal from the sign-in response stands, as long as this attempt
    /// still owns the published state.
    async fn reconcile(
        &self,
        pending: &PendingTransition,
        signed_in: User,
    ) -> Result<User, AuthError> {
        let next = match client::fetch_profile(&self.gateway).await {
            Ok(Some(user)) => AuthState::authenticated(user),
            Ok(None) => AuthState::anonymous(Some(AuthError::SessionAbsent)),
            Err(err) if self.auth.is_current(pending) => {
                warn!("Failed to reconcile session, keeping sign-in principal: {err}");
                return Ok(signed_in);
            }
            Err(err) => {
                debug!(
                    attempt = pending.attempt(),
                    "reconcile failed after a newer transition: {err}"
                );
                return Err(AuthError::Superseded);
            }
        };

        let applied = self.auth.complete(pending, next.clone());
        match (applied, next.principal()) {
            (false, _) => Err(AuthError::Superseded),
            (true, Some(user)) => {
                info!(
                    trigger = ?pending.trigger(),
                    attempt = pending.attempt(),
                    user_id = user.id,
                    "session established"
                );
                Ok(user.clone())
            }
            (true, None) => Err(AuthError::SessionAbsent),
        }
    }
}
