use clap::{Arg, Command};

pub const CMD_STATUS: &str = "status";
pub const CMD_LOGIN: &str = "login";
pub const CMD_FEDERATED: &str = "federated";
pub const CMD_REGISTER: &str = "register";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_GET: &str = "get";

pub const ARG_USERNAME: &str = "username";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_EMAIL: &str = "email";
pub const ARG_CREDENTIAL: &str = "credential";
pub const ARG_PATH: &str = "path";

fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .long("password")
        .help("Account password")
        .env("REBATE_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand_required(true)
        .subcommand(
            Command::new(CMD_STATUS)
                .about("Revalidate the stored session and print its status"),
        )
        .subcommand(
            Command::new(CMD_LOGIN)
                .about("Sign in with username and password")
                .arg(
                    Arg::new(ARG_USERNAME)
                        .short('u')
                        .long("username")
                        .help("Account username")
                        .required(true),
                )
                .arg(password_arg()),
        )
        .subcommand(
            Command::new(CMD_FEDERATED)
                .about("Sign in with an identity provider credential")
                .arg(
                    Arg::new(ARG_CREDENTIAL)
                        .long("credential")
                        .help("Credential issued by the identity provider")
                        .env("REBATE_FEDERATED_CREDENTIAL")
                        .hide_env_values(true)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(CMD_REGISTER)
                .about("Create an account and sign it in")
                .arg(
                    Arg::new(ARG_EMAIL)
                        .short('e')
                        .long("email")
                        .help("Account email address")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_USERNAME)
                        .short('u')
                        .long("username")
                        .help("Account username")
                        .required(true),
                )
                .arg(password_arg()),
        )
        .subcommand(Command::new(CMD_LOGOUT).about("Sign out and forget the stored session"))
        .subcommand(
            Command::new(CMD_GET)
                .about("Fetch a protected JSON resource with the stored session")
                .arg(
                    Arg::new(ARG_PATH)
                        .help("API path, example: /api/v1/rebates/")
                        .required(true),
                ),
        )
}
