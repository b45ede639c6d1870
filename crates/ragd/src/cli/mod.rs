mod config;
mod run;

pub use config::ConfigCommand;
pub use run::RunCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};

use ragd_core::error::RagdError;

/// Exit code for configuration and usage errors.
pub const EXIT_USAGE: i32 = 2;
/// Exit code for fatal startup failures.
pub const EXIT_FATAL: i32 = 1;

/// ragd - document server with a cluster-wide progress task
#[derive(Parser)]
#[command(name = "ragd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the ragd server.
    Run(RunCommand),

    /// Validate and print the resolved configuration.
    Config(ConfigCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run(cmd) => cmd.execute().await,
            Commands::Config(cmd) => cmd.execute(),
        }
    }
}

/// Map a command error to the process exit code.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<RagdError>() {
        Some(RagdError::Config(_)) => EXIT_USAGE,
        _ => EXIT_FATAL,
    }
}
