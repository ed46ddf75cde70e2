//! Configuration CLI commands.

use clap::{Args, Subcommand};

use hookbus_core::config::AppConfig;
use hookbus_core::error::HookError;
use hookbus_core::result::HookResult;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the merged configuration
    Show,
    /// Check that every backend name is known
    Validate,
}

const REGISTRY_BACKENDS: &[&str] = &["memory", "shared", "cache", "file"];
const STATE_DRIVERS: &[&str] = &["memory", "shared", "cache"];
const DISPATCH_MODES: &[&str] = &["sync", "queue"];
const CACHE_PROVIDERS: &[&str] = &["memory", "redis"];

/// Execute config commands
pub fn execute(args: &ConfigArgs, config: &AppConfig, format: OutputFormat) -> HookResult<()> {
    match &args.command {
        ConfigCommand::Show => output::print_value(config, format),
        ConfigCommand::Validate => {
            validate(config)?;
            output::print_success("Configuration is valid");
            output::print_kv("Registry", &config.registry.backend);
            output::print_kv("State driver", &config.state.driver);
            output::print_kv("Dispatcher", &config.dispatcher.mode);
            output::print_kv("Cache", &config.cache.provider);
            output::print_kv("Lock timeout", &format!("{} ms", config.state.lock_timeout_ms));
        }
    }
    Ok(())
}

/// Rejects unknown backend names and zero-sized tables.
pub fn validate(config: &AppConfig) -> HookResult<()> {
    check("registry.backend", &config.registry.backend, REGISTRY_BACKENDS)?;
    check("state.driver", &config.state.driver, STATE_DRIVERS)?;
    check("dispatcher.mode", &config.dispatcher.mode, DISPATCH_MODES)?;
    check("cache.provider", &config.cache.provider, CACHE_PROVIDERS)?;

    for (field, value) in [
        ("registry.shared.capacity", config.registry.shared.capacity),
        ("state.shared.capacity", config.state.shared.capacity),
        ("state.shared.data_width", config.state.shared.data_width),
        ("dispatcher.queue_capacity", config.dispatcher.queue_capacity),
        ("dispatcher.concurrency", config.dispatcher.concurrency),
    ] {
        if value == 0 {
            return Err(HookError::configuration(format!("{field} must be greater than 0")));
        }
    }
    Ok(())
}

fn check(field: &str, value: &str, allowed: &[&str]) -> HookResult<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(HookError::configuration(format!(
        "{field} = '{value}' is not one of: {}",
        allowed.join(", ")
    )))
}
