//! CLI argument parsing using clap 4.x derive macros

use clap::Parser;

/// Single-shot agent runner for editor-integrated orchestrators
///
/// Reads one JSON request from stdin, runs the bundled decision policy,
/// and writes exactly one JSON response envelope to stdout. Logs go to
/// stderr so the response stream stays clean.
#[derive(Parser, Debug)]
#[command(name = "nvagent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level for stderr diagnostics (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}
