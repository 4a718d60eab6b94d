//! Maps validated CLI matches to an [`Action`] with its resolved configuration.

use crate::app_lib::AppConfig;
use crate::cli::actions::Action;
use crate::cli::commands::{
    ARG_API_URL, ARG_LOGIN_PATH, ARG_SESSION_FILE, ARG_TIMEOUT_MS,
    session::{
        ARG_CREDENTIAL, ARG_EMAIL, ARG_PASSWORD, ARG_PATH, ARG_USERNAME, CMD_FEDERATED, CMD_GET,
        CMD_LOGIN, CMD_LOGOUT, CMD_REGISTER, CMD_STATUS,
    },
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::{env, path::PathBuf, time::Duration};

const SESSION_DIR: &str = ".rebate-client";
const SESSION_FILE: &str = "session.json";

/// # Errors
/// Returns an error if required arguments are missing or the command is unknown.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let config = config(matches)?;

    match matches.subcommand() {
        Some((CMD_STATUS, _)) => Ok(Action::Status { config }),
        Some((CMD_LOGIN, sub)) => Ok(Action::Login {
            config,
            username: read_required(sub, ARG_USERNAME)?,
            password: read_secret(sub, ARG_PASSWORD)?,
        }),
        Some((CMD_FEDERATED, sub)) => Ok(Action::Federated {
            config,
            credential: read_secret(sub, ARG_CREDENTIAL)?,
        }),
        Some((CMD_REGISTER, sub)) => Ok(Action::Register {
            config,
            email: read_required(sub, ARG_EMAIL)?,
            username: read_required(sub, ARG_USERNAME)?,
            password: read_secret(sub, ARG_PASSWORD)?,
        }),
        Some((CMD_LOGOUT, _)) => Ok(Action::Logout { config }),
        Some((CMD_GET, sub)) => Ok(Action::Get {
            config,
            path: read_required(sub, ARG_PATH)?,
        }),
        Some((name, _)) => Err(anyhow!("unknown command: {name}")),
        None => Err(anyhow!("missing command")),
    }
}

fn config(matches: &ArgMatches) -> Result<AppConfig> {
    let defaults = AppConfig::default();

    let api_base_url = matches
        .get_one::<String>(ARG_API_URL)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or(defaults.api_base_url);
    let request_timeout = matches
        .get_one::<u64>(ARG_TIMEOUT_MS)
        .copied()
        .map_or(defaults.request_timeout, Duration::from_millis);
    let login_path = matches
        .get_one::<String>(ARG_LOGIN_PATH)
        .cloned()
        .unwrap_or(defaults.login_path);
    if !login_path.starts_with('/') {
        return Err(anyhow!("--{ARG_LOGIN_PATH} must start with '/'"));
    }

    let session_file = match matches.get_one::<String>(ARG_SESSION_FILE) {
        Some(path) if !path.trim().is_empty() => Some(PathBuf::from(path.trim())),
        _ => default_session_file(),
    };

    Ok(AppConfig {
        api_base_url,
        request_timeout,
        login_path,
        session_file,
    })
}

/// `~/.rebate-client/session.json`, or in-memory only when there is no home.
fn default_session_file() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(SESSION_DIR).join(SESSION_FILE))
}

fn read_required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .with_context(|| format!("missing required argument: --{id}"))
}

fn read_secret(matches: &ArgMatches, id: &str) -> Result<SecretString> {
    matches
        .get_one::<String>(id)
        .map(|value| SecretString::from(value.clone()))
        .with_context(|| format!("missing required argument: --{id}"))
}
