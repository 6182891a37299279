//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// Leadsync - lead export and Bitrix24 sync
#[derive(Parser, Debug)]
#[command(name = "leadsync")]
#[command(version, about, long_about = None)]
#[command(author = "Leadsync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "leadsync.toml", env = "LEADSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "LEADSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an export job and run it in the foreground, or continue one
    Export(commands::export::ExportArgs),

    /// Pause or resume an export job
    Job(commands::job::JobArgs),

    /// Show export jobs
    Status(commands::status::StatusArgs),

    /// Run the webhook and job control HTTP server
    Serve(commands::serve::ServeArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
