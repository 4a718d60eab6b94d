use crate::{
    APP_USER_AGENT,
    app_lib::{
        AppConfig, AppError, CredentialStore, FileCredentialStore, Gateway, MemoryCredentialStore,
        ReqwestTransport, SessionEvent, Transport,
    },
    features::auth::{AuthContext, AuthState, Bootstrapper, RouteDecision, SessionManager, SessionStatus},
    routes,
};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Application context owning the session state machine and everything that
/// talks to the backend. Build one per process (or per test) and pass it
/// around; nothing here is global.
pub struct App {
    config: AppConfig,
    auth: AuthContext,
    gateway: Arc<Gateway>,
    session: SessionManager,
    bootstrapper: Bootstrapper,
}

impl App {
    /// Wires the context over an explicit transport and credential store.
    #[must_use]
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let auth = AuthContext::new();
        let gateway = Arc::new(Gateway::new(
            &config,
            transport,
            credentials,
            Arc::new(auth.clone()),
        ));
        let session = SessionManager::new(auth.clone(), gateway.clone());
        let bootstrapper = Bootstrapper::new(session.clone());

        Self {
            config,
            auth,
            gateway,
            session,
            bootstrapper,
        }
    }

    /// Builds the context with the HTTP transport and, when a session file is
    /// configured, a file-backed credential store.
    ///
    /// # Errors
    /// Returns `AppError::Config` for an unusable base URL or session file.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let transport = ReqwestTransport::new(
            &config.api_base_url,
            APP_USER_AGENT,
            config.request_timeout,
        )?;

        let credentials: Arc<dyn CredentialStore> = match &config.session_file {
            Some(path) => {
                debug!(path = %path.display(), "using file-backed session credential");
                Arc::new(FileCredentialStore::open(path).map_err(|err| {
                    AppError::Config(format!(
                        "Failed to open session file {}: {err}",
                        path.display()
                    ))
                })?)
            }
            None => Arc::new(MemoryCredentialStore::new()),
        };

        Ok(Self::new(config, Arc::new(transport), credentials))
    }

    /// Resolves the initial status; runs the revalidation at most once.
    pub async fn bootstrap(&self) -> SessionStatus {
        self.bootstrapper.run().await
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.bootstrapper.is_ready()
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.auth.state()
    }

    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<AuthState> {
        self.auth.subscribe()
    }

    /// Login redirects emitted when the backend reports the session as gone.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.gateway.subscribe()
    }

    /// Route decision for `path` under the current status.
    #[must_use]
    pub fn route(&self, path: &str) -> RouteDecision {
        routes::resolve(path, self.auth.status(), &self.config.login_path)
    }
}
