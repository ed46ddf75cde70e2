//! Shared state CLI commands.

use clap::{Args, Subcommand};

use hookbus_core::config::AppConfig;
use hookbus_core::result::HookResult;

use crate::bootstrap;
use crate::output;

/// Arguments for state commands
#[derive(Debug, Args)]
pub struct StateArgs {
    /// State subcommand
    #[command(subcommand)]
    pub command: StateCommand,
}

/// State subcommands
#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Remove every persisted state record of shared hooks
    Flush,
}

/// Execute state commands
pub async fn execute(args: &StateArgs, config: &AppConfig) -> HookResult<()> {
    let engine = bootstrap::build(config).await?;

    match &args.command {
        StateCommand::Flush => {
            engine.manager.flush_state().await?;
            output::print_success(&format!(
                "Shared state flushed (driver: {})",
                config.state.driver
            ));
        }
    }

    engine.shutdown().await;
    Ok(())
}
