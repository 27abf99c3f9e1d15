//! # Jogpad
//!
//! Jog a 3D printer with a gamepad.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, or `config/default.toml`)
//!    - Set up logging, optionally to a daily log file
//!    - Open the printer serial port and connect to the backend; either may be
//!      missing, the session runs with whatever is reachable
//!
//! 2. **Running**
//!    - The session task samples the controller every frame and polls for
//!      controller presence once per poll interval
//!    - Backend pushes are read on their own task and forwarded to the session
//!    - Operator commands are read from stdin
//!
//! 3. **Shutdown** on Ctrl+C
//!    - Cancel the session and detach the push and console tasks
//!
//! # Examples
//!
//! ```bash
//! RUST_LOG=jogpad=debug cargo run --release -- config/default.toml
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use jogpad::backend::{spawn_push_listener, BackendLink};
use jogpad::config::{BackendConfig, Config, LoggingConfig};
use jogpad::console::spawn_console;
use jogpad::controller::gamepad::EvdevSource;
use jogpad::emitter::{CommandEmitter, Router};
use jogpad::prefs::TomlPreferenceStore;
use jogpad::printer::PrinterSerial;
use jogpad::session::runner::spawn_session;
use jogpad::session::{Session, SessionSettings};
use jogpad::settings::TomlSettingsStore;

/// Configuration file used when none is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Buffered backend pushes awaiting the session
const PUSH_QUEUE: usize = 64;

/// File name prefix of the rolling log
const LOG_FILE_PREFIX: &str = "jogpad.log";

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_source) = load_config(std::env::args().nth(1))?;
    let _log_guard = init_logging(&config.logging);

    info!("Jogpad v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config_source);

    let printer: Option<Box<dyn CommandEmitter>> = match PrinterSerial::open(&config.serial) {
        Ok(printer) => {
            info!("Printer serial port opened at: {}", printer.device_path());
            Some(Box::new(printer))
        }
        Err(e) => {
            warn!("{}; jog, extrude and home commands will be dropped", e);
            None
        }
    };

    let backend = connect_backend(&config.backend).await;

    let session = Session::new(
        Box::new(EvdevSource::new(&config.controller.device_path)),
        SessionSettings::from_config(&config),
        Box::new(TomlSettingsStore::new(&config.storage.settings_path)),
        Box::new(TomlPreferenceStore::new(&config.storage.prefs_path)),
    );

    let (push_tx, push_rx) = mpsc::channel(PUSH_QUEUE);
    let (backend, push_reader) = match backend {
        Some((link, reader)) => (Some(Box::new(link) as Box<dyn CommandEmitter>), Some(reader)),
        None => (None, None),
    };
    let mut handle = spawn_session(session, Box::new(Router::new(printer, backend)), push_rx);
    if let Some(reader) = push_reader {
        handle.attach_listener(spawn_push_listener(
            reader,
            config.backend.plugin_id.clone(),
            push_tx,
        ));
    }
    handle.attach_listener(spawn_console(tokio::io::stdin(), handle.actions(), handle.view()));

    info!("Commands: test on|off|toggle, scale <xy|z|e> <value>, status");
    info!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, shutting down...");

    handle.shutdown().await;
    Ok(())
}

/// Connects to the backend. Failure is logged and leaves the backend out.
async fn connect_backend(config: &BackendConfig) -> Option<(BackendLink<OwnedWriteHalf>, OwnedReadHalf)> {
    let write_timeout = Duration::from_millis(config.write_timeout_ms);
    match BackendLink::connect(&config.address, write_timeout).await {
        Ok(link) => Some(link),
        Err(e) => {
            warn!("{}; running without backend, status and settings will not be reported", e);
            None
        }
    }
}

/// Loads the configuration named on the command line, or the default file.
///
/// Without an argument a missing default file means built-in defaults.
fn load_config(arg: Option<String>) -> Result<(Config, String)> {
    match arg {
        Some(path) => {
            let config = Config::load(&path)
                .with_context(|| format!("Failed to load configuration from {}", path))?;
            Ok((config, path))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            let config = Config::load(DEFAULT_CONFIG_PATH)
                .with_context(|| format!("Failed to load configuration from {}", DEFAULT_CONFIG_PATH))?;
            Ok((config, DEFAULT_CONFIG_PATH.to_string()))
        }
        None => Ok((Config::default(), "built-in defaults".to_string())),
    }
}

/// Installs the global subscriber. The returned guard flushes the log file on drop.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    if logging.log_dir.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&logging.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Some(guard)
}
