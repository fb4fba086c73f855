//! foto-pool: keeps a local photo directory mirrored from iCloud.
//!
//! Configuration is resolved in layers (settings file, environment, OS
//! keyring), a single authenticated session talks to the photo service, and
//! the sync engine runs once or on an interval with scheduled maintenance of
//! the deletion tracker database.

#![warn(clippy::all)]

mod config;
mod credentials;
mod notify;
mod remote;
mod retry;
mod runner;
mod shutdown;
mod sync;
mod tracker;

use std::io::IsTerminal;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use config::{Config, SettingsSource};
use credentials::{CredentialPair, CredentialStore, KeyringStore, NOTIFY_SERVICE, PHOTO_SERVICE};
use remote::{HttpRemoteClient, RemoteClient};
use tracker::{DeletionTracker, SqliteTracker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let store = KeyringStore::new();
    tokio::task::block_in_place(|| bootstrap_credentials(&store))?;
    let config = Config::resolve(&store);

    // The resolved log level steers the subscriber, so install it before
    // reporting configuration errors. RUST_LOG still wins when set.
    let filter = match &config {
        Ok(config) => config.log_level.as_filter(),
        Err(_) => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = match config {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Starting foto-pool in {} mode with settings from {}",
        config.execution_mode.as_str(),
        config.settings_path.display()
    );
    tracing::debug!(?config, "Resolved configuration");

    let db_path = config.database_path()?;
    let tracker: Arc<dyn DeletionTracker> = Arc::new(SqliteTracker::open(&db_path).await?);
    let client: Arc<dyn RemoteClient> = Arc::new(HttpRemoteClient::new(&config)?);

    let shutdown = shutdown::shutdown_token();
    let clean = runner::run_execution_mode(config, client, tracker, shutdown).await;
    if !clean {
        std::process::exit(1);
    }
    Ok(())
}

/// First-run setup: on an interactive terminal, prompts for any credential
/// pair the keyring is missing and stores it before resolution runs. Without
/// a terminal, or when the user enters nothing, the resolver's aggregate
/// error remains the single report of what is absent.
fn bootstrap_credentials(store: &dyn CredentialStore) -> anyhow::Result<()> {
    if !std::io::stdin().is_terminal() {
        return Ok(());
    }
    // A missing settings file is the resolver's error to report.
    let Ok(source) = SettingsSource::discover() else {
        return Ok(());
    };
    bootstrap_pair(
        store,
        &PHOTO_SERVICE,
        "iCloud credentials not found in the keyring.",
        || read_input("Enter your iCloud username (email): "),
        || read_password("Enter your iCloud app-specific password: "),
    )?;
    if config::resolver::parse_bool(&source.get_or("ENABLE_PUSHOVER", "true")) {
        bootstrap_pair(
            store,
            &NOTIFY_SERVICE,
            "Pushover credentials not found in the keyring.",
            || read_input("Enter your Pushover user key: "),
            || read_password("Enter your Pushover API token: "),
        )?;
    }
    Ok(())
}

/// Prompts for and stores one credential pair, skipping pairs the keyring
/// already holds. Empty input declines the prompt and writes nothing.
/// Returns whether the pair was stored.
fn bootstrap_pair(
    store: &dyn CredentialStore,
    pair: &CredentialPair,
    missing: &str,
    read_identity: impl FnOnce() -> std::io::Result<String>,
    read_secret: impl FnOnce() -> std::io::Result<String>,
) -> anyhow::Result<bool> {
    if pair.exists(store)? {
        return Ok(false);
    }
    println!("{missing}");
    let identity = read_identity()?;
    if identity.is_empty() {
        println!("Nothing entered; leaving the keyring unchanged.");
        return Ok(false);
    }
    let secret = read_secret()?;
    if secret.is_empty() {
        println!("Nothing entered; leaving the keyring unchanged.");
        return Ok(false);
    }
    pair.store(store, &identity, &secret)?;
    println!("Credentials stored in the keyring.");
    Ok(true)
}

fn read_input(prompt: &str) -> std::io::Result<String> {
    use std::io::Write;
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn read_password(prompt: &str) -> std::io::Result<String> {
    Ok(rpassword::prompt_password(prompt)?.trim().to_string())
}
