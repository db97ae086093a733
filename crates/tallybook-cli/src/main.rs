//! tallybook - sign in to the tallybook service from the terminal.
//!
//! A thin front end over `tallybook-core`: it builds the session manager
//! once, restores any previous session, and runs one command against it.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tallybook_core::auth::open_store;
use tallybook_core::{AuthClient, AuthHandle, Config, SessionManager, StorageBackend};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable consulted before prompting for a password
const PASSWORD_ENV: &str = "TALLYBOOK_PASSWORD";

/// Prefix of the rolling log files in the cache directory
const LOG_FILE_PREFIX: &str = "tallybook.log";

#[derive(Parser, Debug)]
#[command(name = "tallybook", version, about = "Manage your tallybook session")]
struct Cli {
    /// Auth service base URL (overrides config and TALLYBOOK_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Where to keep the session token: file, keyring or memory
    #[arg(long)]
    storage: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account (does not sign in)
    Register { email: String },
    /// Sign in and remember the session
    Login { email: Option<String> },
    /// Forget the current session
    Logout,
    /// Print the signed-in user
    Whoami,
    /// Print the full session state as JSON
    Status,
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, filtered by RUST_LOG (default `warn`), and to a daily
/// file in the cache directory when it can be created.
fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = if std::fs::create_dir_all(log_dir).is_ok() {
        let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("Failed to load config")?;
    if let Some(ref url) = cli.api_url {
        config.api_url = Some(url.clone());
    }
    if let Some(ref storage) = cli.storage {
        config.storage = storage.parse::<StorageBackend>()?;
    }
    Ok(config)
}

fn prompt_password(prompt: &str) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        debug!("Using password from environment");
        return Ok(password);
    }
    let password = rpassword::prompt_password(prompt)?;
    Ok(password)
}

fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{} required", what);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let cache_dir = Config::cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    let _log_guard = init_tracing(&cache_dir);

    let config = load_config(&cli)?;
    info!(api_url = config.api_url(), storage = ?config.storage, "tallybook starting");

    let client = AuthClient::new(config.api_url(), config.request_timeout())?;
    let store = open_store(config.storage, &cache_dir);
    let handle = AuthHandle::new(SessionManager::new(client, store));
    handle.restore();

    handle.scope(run(cli.command, config)).await
}

async fn run(command: Command, mut config: Config) -> Result<()> {
    let auth = AuthHandle::current();

    match command {
        Command::Register { email } => {
            require_non_empty(&email, "Email")?;
            let password = prompt_password("Password: ")?;
            require_non_empty(&password, "Password")?;

            auth.register(&email, &password)
                .await
                .map_err(|e| anyhow::anyhow!("Registration failed: {}", e))?;
            println!("Account created for {}. Run `tallybook login` to sign in.", email);
        }
        Command::Login { email } => {
            let email = email
                .or_else(|| config.last_email.clone())
                .context("Email required")?;
            require_non_empty(&email, "Email")?;
            let password = prompt_password(&format!("Password for {}: ", email))?;
            require_non_empty(&password, "Password")?;

            auth.sign_in(&email, &password)
                .await
                .map_err(|e| anyhow::anyhow!("Login failed: {}", e))?;

            config.last_email = Some(email);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            if let Some(session) = auth.session() {
                println!("Signed in as {}", session.email);
            }
        }
        Command::Logout => {
            auth.sign_out().await;
            println!("Signed out");
        }
        Command::Whoami => match auth.session() {
            Some(session) => println!("{} ({})", session.email, session.user_id),
            None => println!("Not signed in"),
        },
        Command::Status => {
            let snapshot = auth.snapshot();
            let rendered = serde_json::to_string_pretty(&snapshot)
                .context("Failed to render session state")?;
            println!("{}", rendered);
            if let Some(claims) = auth.token_claims() {
                match claims.minutes_until_expiry() {
                    Some(0) => println!("Token expired (unverified)"),
                    Some(minutes) => println!("Token expires in {}m (unverified)", minutes),
                    None => println!("Token has no expiry"),
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_storage_env_is_an_error() {
        std::env::set_var(tallybook_core::config::STORAGE_ENV, "floppy");
        let cli = Cli::parse_from(["tallybook", "whoami"]);
        let result = load_config(&cli);
        std::env::remove_var(tallybook_core::config::STORAGE_ENV);

        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_storage_flag_is_an_error() {
        let cli = Cli::parse_from(["tallybook", "--storage", "floppy", "whoami"]);
        assert!(load_config(&cli).is_err());
    }
}
