use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uci_engine::config::LoggingSection;
use uci_engine::{EngineConfig, EngineControl, UciSession};

/// Logs go to stderr; stdout carries the protocol.
fn init_logging(logging: &LoggingSection) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EngineConfig::load_or_default(config_path.as_deref())
        .context("loading engine configuration")?;
    init_logging(&config.logging);
    info!(?config, "engine starting");

    let control = EngineControl::with_options(io::stdout(), config.engine.into());
    let mut session = UciSession::new(control);

    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        if session.handle_command(&line) {
            break;
        }
    }
    info!("engine exiting");
    Ok(())
}
