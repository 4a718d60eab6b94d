//! Client wrappers for the rebate auth API endpoints. Credential checks and the
//! profile lookup opt out of expiry signaling: a `401` there is an answer, not a
//! sign that a live session just died.

use crate::{
    app_lib::{ApiRequest, AppError, Gateway},
    features::auth::types::{
        AuthResponse, FederatedLoginRequest, LoginRequest, ProfileResponse, RegisterRequest, User,
    },
};

pub const LOGIN_PATH: &str = "/api/v1/auth/login/";
pub const REGISTER_PATH: &str = "/api/v1/auth/register/";
pub const FEDERATED_LOGIN_PATH: &str = "/api/v1/auth/google/";
pub const LOGOUT_PATH: &str = "/api/v1/auth/logout/";
pub const PROFILE_PATH: &str = "/api/v1/profile/";

/// Submits username and password; the backend sets the session cookie.
/// Must never log the request.
pub async fn login(gateway: &Gateway, request: &LoginRequest) -> Result<AuthResponse, AppError> {
    let request = ApiRequest::post(LOGIN_PATH, request)?.without_expiry_signal();
    gateway.send_json(&request).await
}

/// Creates an account; a successful registration is also signed in.
pub async fn register(
    gateway: &Gateway,
    request: &RegisterRequest,
) -> Result<AuthResponse, AppError> {
    let request = ApiRequest::post(REGISTER_PATH, request)?.without_expiry_signal();
    gateway.send_json(&request).await
}

/// Exchanges an identity-provider credential for a session.
pub async fn federated_login(
    gateway: &Gateway,
    request: &FederatedLoginRequest,
) -> Result<AuthResponse, AppError> {
    let request = ApiRequest::post(FEDERATED_LOGIN_PATH, request)?.without_expiry_signal();
    gateway.send_json(&request).await
}

/// Fetches the principal behind the ambient cookie.
/// Returns `None` when there is no session.
pub async fn fetch_profile(gateway: &Gateway) -> Result<Option<User>, AppError> {
    let request = ApiRequest::get(PROFILE_PATH).without_expiry_signal();
    let profile: Option<ProfileResponse> = gateway.send_optional_json(&request).await?;
    Ok(profile.map(ProfileResponse::into_user))
}

/// Ends the server-side session.
pub async fn logout(gateway: &Gateway) -> Result<(), AppError> {
    let request = ApiRequest::post_empty(LOGOUT_PATH).without_expiry_signal();
    gateway.send(&request).await.map(|_| ())
}
