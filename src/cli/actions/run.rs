use crate::cli::actions::{Action, session};
use anyhow::Result;

/// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Status { config } => session::status(config).await,
        Action::Login {
            config,
            username,
            password,
        } => session::login(config, &username, &password).await,
        Action::Federated { config, credential } => session::federated(config, &credential).await,
        Action::Register {
            config,
            email,
            username,
            password,
        } => session::register(config, &email, &username, &password).await,
        Action::Logout { config } => session::logout(config).await,
        Action::Get { config, path } => session::get(config, &path).await,
    }
}
