//! CLI command definitions and dispatch.

pub mod config;
pub mod hooks;
pub mod state;

use clap::{Parser, Subcommand};

use hookbus_core::config::AppConfig;
use hookbus_core::result::HookResult;

use crate::output::OutputFormat;

/// hookbus: action/filter hook registry and dispatch engine
#[derive(Debug, Parser)]
#[command(name = "hookbus", version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file. Without it, `config/default` and the
    /// environment overlay are merged.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Environment overlay to load (`config/{env}.toml`). Defaults to
    /// `HOOKBUS_ENV`, then `development`.
    #[arg(short, long)]
    pub env: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect, edit, and fire hooks
    Hooks(hooks::HooksArgs),
    /// Shared state management
    State(state::StateArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Load configuration according to `--config` / `--env`.
    pub fn load_config(&self) -> HookResult<AppConfig> {
        match &self.config {
            Some(path) => AppConfig::load_file(path),
            None => AppConfig::load(&self.environment()),
        }
    }

    /// Selected environment name.
    pub fn environment(&self) -> String {
        self.env
            .clone()
            .or_else(|| std::env::var("HOOKBUS_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> HookResult<()> {
        match &self.command {
            Commands::Hooks(args) => hooks::execute(args, &config, self.format).await,
            Commands::State(args) => state::execute(args, &config).await,
            Commands::Config(args) => config::execute(args, &config, self.format),
        }
    }
}
