//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use bar_configure::output::OutputConfig;

use crate::commands;

/// bar-configure - Configure and analyze broker archives
#[derive(Parser, Debug)]
#[command(name = "bar-configure")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write configured copies of broker archives with overrides applied
    Configure(commands::configure::ConfigureArgs),

    /// Compare the properties archives declare with the configured overrides
    Analyze(commands::analyze::AnalyzeArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .format_timestamp(None)
            .try_init()
            .ok();

        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Configure(args) => commands::configure::execute(args),
            Commands::Analyze(args) => commands::analyze::execute(args, &output),
        }
    }
}
