//! VaultCore CLI - a command-line client for the VaultCore banking demo.
//!
//! Each command is a thin caller of the core API client: it signs in, lists
//! accounts and transactions, or opens an account. Tokens persist between
//! runs according to the configured storage backend.

mod commands;
mod format;

use std::io;

use anyhow::Result;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vaultcore_core::{ApiClient, Config, Session, SessionEvent};

use commands::{parse_args, run};

/// Directory for an additional log file, when set
const ENV_LOG_DIR: &str = "VAULTCORE_LOG_DIR";

/// Log file name inside `VAULTCORE_LOG_DIR`
const LOG_FILE: &str = "vaultcore.log";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(ENV_LOG_DIR) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::never(dir.trim(), LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Tell the user when the session could not be kept alive.
fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(SessionEvent::SignInRequired) => {
                eprintln!("Your session has expired. Run `vaultcore login` to sign in again.");
                return;
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let invocation = parse_args(std::env::args().skip(1))?;

    let mut config = Config::load()?;
    let session = Session::open(&config)?;
    let mut events = session.subscribe();
    let api = ApiClient::new(&config, session)?;
    info!(base_url = api.base_url(), "VaultCore CLI starting");

    let result = run(invocation, &api, &mut config).await;
    report_session_events(&mut events);

    if let Err(ref e) = result {
        warn!(error = %e, "Command failed");
    }
    result
}
