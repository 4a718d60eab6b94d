use super::{session::SessionManager, state::SessionStatus};
use tokio::sync::OnceCell;
use tracing::info;

/// Resolves the initial `Unknown` status once per application context.
pub struct Bootstrapper {
    session: SessionManager,
    resolved: OnceCell<SessionStatus>,
}

impl Bootstrapper {
    #[must_use]
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            resolved: OnceCell::new(),
        }
    }

    /// Revalidates the ambient session on the first call; later and concurrent
    /// callers get the same result without another request.
    pub async fn run(&self) -> SessionStatus {
        *self
            .resolved
            .get_or_init(|| async {
                let status = self.session.revalidate().await;
                info!(?status, "session bootstrap resolved");
                status
            })
            .await
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.resolved.initialized()
    }
}
