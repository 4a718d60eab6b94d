pub mod logging;
pub mod session;

use crate::app_lib::config::{DEFAULT_API_BASE_URL, DEFAULT_LOGIN_PATH};
use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_TIMEOUT_MS: &str = "timeout-ms";
pub const ARG_LOGIN_PATH: &str = "login-path";
pub const ARG_SESSION_FILE: &str = "session-file";

const DEFAULT_TIMEOUT_MS_ARG: &str = "10000";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("rebate-client")
        .about("Session client for the crypto rebate portal")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_API_URL)
                .long("api-url")
                .help("Backend base URL")
                .env("REBATE_API_BASE_URL")
                .global(true)
                .default_value(DEFAULT_API_BASE_URL),
        )
        .arg(
            Arg::new(ARG_TIMEOUT_MS)
                .long("timeout-ms")
                .help("Per-request timeout in milliseconds")
                .env("REBATE_REQUEST_TIMEOUT_MS")
                .global(true)
                .default_value(DEFAULT_TIMEOUT_MS_ARG)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOGIN_PATH)
                .long("login-path")
                .help("Where expired sessions are sent to sign in again")
                .env("REBATE_LOGIN_PATH")
                .global(true)
                .default_value(DEFAULT_LOGIN_PATH),
        )
        .arg(
            Arg::new(ARG_SESSION_FILE)
                .long("session-file")
                .help("File keeping the session cookie between runs (default: ~/.rebate-client/session.json)")
                .env("REBATE_SESSION_FILE")
                .global(true),
        );

    let command = logging::with_args(command);
    session::with_subcommands(command)
}
