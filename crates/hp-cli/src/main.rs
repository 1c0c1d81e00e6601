//! Hashpass popup driver
//!
//! Opens one popup session in the terminal. Commands are read from stdin,
//! one per line; type `help` for the list.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hp_core::config::{self, PopupConfig};
use hp_core::error::ConfigError;
use hp_core::traits::SmartCardPlatform;
use hp_popup::{Collaborators, PopupController};
use hp_smartcard::mock::MockSmartCard;

use hashpass::console::{ConsoleAutofill, ConsoleClipboard, ConsoleWindow, NoSmartCard};
use hashpass::derive::HashpassDeriver;
use hashpass::driver;

#[derive(Parser)]
#[command(name = "hashpass")]
#[command(about = "Hashpass popup driver - derive per-domain passwords from the terminal")]
#[command(version)]
struct Args {
    /// Domain of the page the popup was opened on
    #[arg(short, long)]
    domain: Option<String>,

    /// The page has a focused password field that can be filled in
    #[arg(long)]
    password_field_active: bool,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Debounce window in milliseconds (overrides the config file)
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Simulate a smart card holding this secret
    #[arg(long, requires = "card_pin", env = "HASHPASS_CARD_SECRET")]
    card_secret: Option<String>,

    /// PIN the simulated smart card accepts
    #[arg(long, requires = "card_secret")]
    card_pin: Option<String>,
}

/// How long exit waits for the stdin reader thread
const STDIN_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Stdin is read on a blocking thread that may still be parked in a
    // read after the popup closes; don't wait on it at exit.
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let result = runtime.block_on(run(args));
    runtime.shutdown_timeout(STDIN_SHUTDOWN_GRACE);
    result
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_popup_config(args.config.clone());
    if let Some(ms) = args.debounce_ms {
        config = config.with_debounce(Duration::from_millis(ms));
    }

    let smart_card: Arc<dyn SmartCardPlatform> = match (args.card_secret, args.card_pin) {
        (Some(secret), Some(pin)) => {
            tracing::info!("using simulated smart card");
            Arc::new(MockSmartCard::with_secret(secret, pin))
        }
        _ => Arc::new(NoSmartCard),
    };

    let closed = CancellationToken::new();
    let popup = PopupController::new(
        config,
        Collaborators {
            deriver: Arc::new(HashpassDeriver),
            autofill: Arc::new(ConsoleAutofill::new(args.password_field_active)),
            clipboard: Arc::new(ConsoleClipboard::new()),
            window: Arc::new(ConsoleWindow::new(closed.clone())),
            smart_card,
        },
        args.domain,
        args.password_field_active,
    );

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = driver::run(&popup, stdin, closed) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, closing popup");
            popup.shutdown();
        }
    }

    Ok(())
}

fn load_popup_config(path: Option<PathBuf>) -> PopupConfig {
    let explicit = path.is_some();
    let path = path.unwrap_or_else(config::default_config_path);

    match config::load_config(&path) {
        Ok(config) => config,
        Err(ConfigError::NotFound(_)) if !explicit => PopupConfig::default(),
        Err(e) => {
            tracing::warn!("Failed to load config from {:?}: {}", path, e);
            PopupConfig::default()
        }
    }
}
