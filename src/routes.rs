//! Route table of the portal shell and the guard applied to it.

use crate::features::auth::{RouteDecision, SessionStatus};

pub mod paths {
    pub const HOME: &str = "/";
    pub const LOGIN: &str = "/login";
    pub const REGISTER: &str = "/register";
    pub const DASHBOARD: &str = "/dashboard";
    pub const EXCHANGES: &str = "/exchanges";
    pub const REBATES: &str = "/rebates";
    pub const PROFILE: &str = "/profile";
}

const PUBLIC: [&str; 3] = [paths::HOME, paths::LOGIN, paths::REGISTER];
const PROTECTED: [&str; 4] = [
    paths::DASHBOARD,
    paths::EXCHANGES,
    paths::REBATES,
    paths::PROFILE,
];

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" => paths::HOME,
        trimmed => trimmed,
    }
}

#[must_use]
pub fn is_protected(path: &str) -> bool {
    PROTECTED.contains(&normalize(path))
}

/// Decides what to show for `path` given the session status.
///
/// Protected pages go through the route guard. Signed-in users are sent from
/// the sign-in pages to the dashboard, and unknown paths fall back to home.
#[must_use]
pub fn resolve(path: &str, status: SessionStatus, login_path: &str) -> RouteDecision {
    let path = normalize(path);

    if PROTECTED.contains(&path) {
        return RouteDecision::for_status(status, login_path);
    }
    if !PUBLIC.contains(&path) {
        return RouteDecision::Redirect(paths::HOME.to_string());
    }
    if status == SessionStatus::Authenticated && (path == paths::LOGIN || path == paths::REGISTER)
    {
        return RouteDecision::Redirect(paths::DASHBOARD.to_string());
    }
    RouteDecision::Render
}
