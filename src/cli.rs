//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::AppContext;
use crate::commands;

/// Provision and manage a Hysteria 2 proxy endpoint on this host
#[derive(Parser)]
#[command(name = "hy2ctl", version, propagate_version = true)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Skip interactive prompts and use defaults
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install the proxy endpoint
    Install,

    /// Remove the proxy endpoint and all its state
    Uninstall,

    /// Show the current deployment
    Status,
}

impl Cli {
    /// Execute the CLI command. Without a subcommand, an interactive menu
    /// is shown.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let app = AppContext::new(self.no_color, self.quiet, self.yes);
        match self.command {
            Some(Command::Install) => commands::install::run(&app).await,
            Some(Command::Uninstall) => commands::uninstall::run(&app).await,
            Some(Command::Status) => commands::status::run(&app).await,
            None => commands::menu::run(&app).await,
        }
    }
}
