//! Session commands. Results go to stdout as JSON; logs go to stderr.

use crate::{
    App,
    app_lib::{AppConfig, AppError, SessionEvent},
    features::auth::{AuthError, AuthState, RouteDecision, SessionStatus, User},
    routes::paths,
};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Serialize)]
struct Report<'a> {
    status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    dashboard: RouteDecision,
}

impl<'a> Report<'a> {
    fn new(app: &App, state: &'a AuthState) -> Self {
        Self {
            status: state.status(),
            user: state.principal(),
            error: state.last_error().map(ToString::to_string),
            dashboard: app.route(paths::DASHBOARD),
        }
    }
}

/// Input refused before anything was sent, with the message per field.
#[derive(Debug, Serialize)]
struct Refusal<'a> {
    error: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    fields: BTreeMap<&'static str, &'a str>,
}

impl<'a> Refusal<'a> {
    fn new(err: &'a AuthError) -> Self {
        let fields = match err {
            AuthError::Validation(errors) => errors.iter().collect(),
            _ => BTreeMap::new(),
        };
        Self {
            error: err.to_string(),
            fields,
        }
    }
}

/// Prints the refused fields of a caller error, then hands the error on.
fn signed_in(result: Result<User, AuthError>, context: &'static str) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(err) => {
            if err.is_caller_error() {
                print_json(&Refusal::new(&err))?;
            }
            Err(anyhow!(err)).context(context)
        }
    }
}

fn open(config: AppConfig) -> Result<App> {
    debug!(api_base_url = %config.api_base_url, "opening session");
    App::from_config(config).context("Failed to initialize client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_state(app: &App) -> Result<()> {
    let state = app.state();
    print_json(&Report::new(app, &state))
}

/// # Errors
/// Returns an error if the client cannot be initialized.
pub async fn status(config: AppConfig) -> Result<()> {
    let app = open(config)?;
    app.bootstrap().await;
    print_state(&app)
}

/// # Errors
/// Returns an error if the sign-in fails.
pub async fn login(config: AppConfig, username: &str, password: &SecretString) -> Result<()> {
    let app = open(config)?;
    signed_in(
        app.session().login_with_credentials(username, password).await,
        "Login failed",
    )?;
    print_state(&app)
}

/// # Errors
/// Returns an error if the sign-in fails.
pub async fn federated(config: AppConfig, credential: &SecretString) -> Result<()> {
    let app = open(config)?;
    signed_in(
        app.session().login_with_federated_credential(credential).await,
        "Federated login failed",
    )?;
    print_state(&app)
}

/// # Errors
/// Returns an error if the registration fails.
pub async fn register(
    config: AppConfig,
    email: &str,
    username: &str,
    password: &SecretString,
) -> Result<()> {
    let app = open(config)?;
    signed_in(
        app.session().register(email, password, username).await,
        "Registration failed",
    )?;
    print_state(&app)
}

/// # Errors
/// Returns an error if the client cannot be initialized.
pub async fn logout(config: AppConfig) -> Result<()> {
    let app = open(config)?;
    app.session().logout().await;
    print_state(&app)
}

/// Fetches `path` with the stored session. An expired session prints the
/// login redirect and fails.
///
/// # Errors
/// Returns an error if the request fails.
pub async fn get(config: AppConfig, path: &str) -> Result<()> {
    let app = open(config)?;
    let mut events = app.events();

    match app.gateway().get_json::<Value>(path).await {
        Ok(value) => print_json(&value),
        Err(err @ AppError::Unauthorized { .. }) => match events.try_recv() {
            Ok(event @ SessionEvent::LoginRequired { .. }) => {
                print_json(&event)?;
                Err(anyhow!(err)).context("Session expired, sign in again")
            }
            Err(_) => Err(anyhow!(err)).context(format!("GET {path} failed")),
        },
        Err(err) => Err(anyhow!(err)).context(format!("GET {path} failed")),
    }
}
