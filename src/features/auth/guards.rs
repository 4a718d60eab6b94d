use super::state::SessionStatus;
use serde::Serialize;

/// What a protected route should show for the current session status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum RouteDecision {
    /// Status not resolved yet; show the placeholder.
    Loading,
    Render,
    Redirect(String),
}

impl RouteDecision {
    /// UX-only guard; real access control must live on the API.
    #[must_use]
    pub fn for_status(status: SessionStatus, login_path: &str) -> Self {
        match status {
            SessionStatus::Unknown | SessionStatus::Authenticating => Self::Loading,
            SessionStatus::Authenticated => Self::Render,
            SessionStatus::Anonymous => Self::Redirect(login_path.to_string()),
        }
    }
}
