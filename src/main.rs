//! `nvagent` - single-shot agent runner for editor orchestrators
//!
//! One process invocation handles one protocol turn: read a JSON request
//! from stdin to EOF, decide, write one JSON envelope to stdout. The
//! process exits 0 even when the turn fails; the protocol's failure
//! channel is the `error` envelope, not the exit status.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::Cli;
use crate::policy::DemoPolicy;

mod cli;
mod policy;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("Failed to read request from stdin")?;

    let response = nvagent_core::run_turn(&raw, &DemoPolicy);

    // Exactly one JSON object, no trailing newline, flushed before exit.
    let mut stdout = std::io::stdout();
    stdout
        .write_all(response.as_bytes())
        .context("Failed to write response to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Diagnostics go to stderr only; stdout belongs to the protocol.
fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    // A second invocation in the same process would fail; ignore it.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
