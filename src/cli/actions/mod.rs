pub mod session;

mod run;

use crate::app_lib::AppConfig;
use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Status {
        config: AppConfig,
    },
    Login {
        config: AppConfig,
        username: String,
        password: SecretString,
    },
    Federated {
        config: AppConfig,
        credential: SecretString,
    },
    Register {
        config: AppConfig,
        email: String,
        username: String,
        password: SecretString,
    },
    Logout {
        config: AppConfig,
    },
    Get {
        config: AppConfig,
        path: String,
    },
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
