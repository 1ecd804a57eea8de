//! `roster` -- command-line front-end for the roster backend.
//!
//! Signs in, keeps the session in a local credentials file, and exposes the
//! profile and diagnostics operations of the client library.
//!
//! # Environment variables
//!
//! | Variable                      | Default                           | Description                     |
//! |-------------------------------|-----------------------------------|---------------------------------|
//! | `ROSTER_API_URL`              | `http://localhost:8080/api`       | Backend base URL                |
//! | `ROSTER_ORIGIN`               | --                                | Front-end origin; a non-local origin serves the API under `/api` |
//! | `ROSTER_LOGIN_PATH`           | `/login`                          | Login location for redirects    |
//! | `ROSTER_CREDENTIALS_PATH`     | `~/.roster/credentials.json`      | Credentials file                |
//! | `ROSTER_REQUEST_TIMEOUT_SECS` | `30`                              | HTTP timeout                    |
//! | `ROSTER_PASSWORD`             | --                                | Password for `login`/`register` |

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use roster_client::config::{self, ClientConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line client for the roster administration backend.
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Backend base URL, e.g. `https://verband.de/api`
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Credentials file (also: ROSTER_CREDENTIALS_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    credentials: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(long, env = "ROSTER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, env = "ROSTER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Restore the stored session and show who is signed in
    Whoami,
    /// List the units open for registration
    Units,
    /// Show or change the signed-in user's profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Sign in through an OAuth provider
    Oauth {
        #[command(subcommand)]
        action: OAuthCommand,
    },
    /// Check the credentials file for consistency
    Doctor,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Fetch the profile from the backend
    Show,
    /// Change profile fields; omitted fields keep their value
    Update {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Change the password
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// Delete the account and the stored session
    Delete {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum OAuthCommand {
    /// Print the URL that starts the GitHub sign-in
    Url,
    /// Finish sign-in from the redirect URL or its query string
    Callback { query: String },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_cli=info,roster_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = &cli.api_url {
        config.base_url = config::resolve_base_url(None, Some(url));
    }
    if let Some(path) = &cli.credentials {
        config.credentials_path = path.clone();
    }

    tracing::debug!(
        base_url = %config.base_url,
        credentials = %config.credentials_path.display(),
        "Configuration loaded",
    );

    if let Err(e) = commands::run(cli.command, &config, cli.json).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
