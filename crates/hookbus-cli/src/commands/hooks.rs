//! Hook registration CLI commands.
//!
//! Registrations only outlive the command with a `file` or `cache`
//! registry; callbacks are resolved against the built-in functions.

use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use hookbus_core::config::AppConfig;
use hookbus_core::error::{ErrorKind, HookError};
use hookbus_core::result::HookResult;
use hookbus_core::types::hook::{HookKind, StateKind};
use hookbus_engine::codec::{self, Callback, Invocation};
use hookbus_engine::DEFAULT_PRIORITY;

use crate::bootstrap;
use crate::output::{self, OutputFormat};

/// Arguments for hook commands
#[derive(Debug, Args)]
pub struct HooksArgs {
    /// Hooks subcommand
    #[command(subcommand)]
    pub command: HooksCommand,
}

/// Hooks subcommands
#[derive(Debug, Subcommand)]
pub enum HooksCommand {
    /// List the registrations of a hook in execution order
    List {
        /// `action` or `filter`
        kind: HookKind,
        /// Hook name
        hook: String,
    },
    /// Register a callback (`Type@method` or a function name)
    Add {
        /// `action` or `filter`
        kind: HookKind,
        /// Hook name
        hook: String,
        /// Callback to register
        callback: String,
        /// Lower runs first
        #[arg(short, long, default_value_t = DEFAULT_PRIORITY, allow_negative_numbers = true)]
        priority: i32,
        /// `volatile`, `scoped`, or `shared`
        #[arg(short, long, default_value = "volatile")]
        state: StateKind,
    },
    /// Remove one callback at one priority
    Remove {
        /// `action` or `filter`
        kind: HookKind,
        /// Hook name
        hook: String,
        /// Callback to remove
        callback: String,
        /// Priority it was registered at
        #[arg(short, long, default_value_t = DEFAULT_PRIORITY, allow_negative_numbers = true)]
        priority: i32,
    },
    /// Remove every callback of a hook, or those at one priority
    Clear {
        /// `action` or `filter`
        kind: HookKind,
        /// Hook name
        hook: String,
        /// Only clear this priority
        #[arg(short, long, allow_negative_numbers = true)]
        priority: Option<i32>,
    },
    /// Show what a descriptor would invoke, without invoking it
    Decode {
        /// Encoded descriptor
        descriptor: String,
    },
    /// Run a value through the filters of a hook
    Apply {
        /// Hook name
        hook: String,
        /// JSON value to filter
        value: String,
        /// Extra arguments as a JSON array
        #[arg(short, long, default_value = "[]")]
        args: String,
    },
    /// Fire the actions of a hook
    Do {
        /// Hook name
        hook: String,
        /// Arguments as a JSON array
        #[arg(short, long, default_value = "[]")]
        args: String,
    },
}

/// One row of `hooks list`.
#[derive(Debug, Serialize, Tabled)]
struct HookRow {
    #[tabled(rename = "Priority")]
    priority: i32,
    #[tabled(rename = "State")]
    state_kind: StateKind,
    #[tabled(rename = "Shape")]
    shape: String,
    #[tabled(rename = "Descriptor")]
    descriptor: String,
}

/// Output of `hooks decode`.
#[derive(Debug, Serialize)]
struct DecodedDescriptor {
    shape: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    state_key: String,
}

/// Execute hook commands
pub async fn execute(args: &HooksArgs, config: &AppConfig, format: OutputFormat) -> HookResult<()> {
    if let HooksCommand::Decode { descriptor } = &args.command {
        output::print_value(&describe(descriptor)?, format);
        return Ok(());
    }

    let engine = bootstrap::build(config).await?;
    let manager = &engine.manager;

    match &args.command {
        HooksCommand::List { kind, hook } => {
            let rows: Vec<HookRow> = manager
                .registry()
                .get(*kind, hook)
                .await?
                .into_iter()
                .map(|r| HookRow {
                    priority: r.priority,
                    state_kind: r.state_kind,
                    shape: codec::decode(&r.descriptor)
                        .map(|i| i.shape().to_string())
                        .unwrap_or_else(|_| "malformed".to_string()),
                    descriptor: match format {
                        OutputFormat::Table => output::abbreviate(&r.descriptor, 60),
                        OutputFormat::Json => r.descriptor,
                    },
                })
                .collect();
            output::print_list(&rows, format);
        }
        HooksCommand::Add {
            kind,
            hook,
            callback,
            priority,
            state,
        } => {
            let callback = parse_callback(callback);
            match kind {
                HookKind::Filter => manager.add_filter(hook, &callback, *priority, *state).await?,
                HookKind::Action => manager.add_action(hook, &callback, *priority, *state).await?,
            }
            output::print_success(&format!("Added {kind} '{hook}' at priority {priority}"));
        }
        HooksCommand::Remove {
            kind,
            hook,
            callback,
            priority,
        } => {
            let callback = parse_callback(callback);
            match kind {
                HookKind::Filter => manager.remove_filter(hook, &callback, *priority).await?,
                HookKind::Action => manager.remove_action(hook, &callback, *priority).await?,
            }
            output::print_success(&format!("Removed {kind} '{hook}' at priority {priority}"));
        }
        HooksCommand::Clear {
            kind,
            hook,
            priority,
        } => {
            match kind {
                HookKind::Filter => manager.remove_all_filters(hook, *priority).await?,
                HookKind::Action => manager.remove_all_actions(hook, *priority).await?,
            }
            output::print_success(&format!("Cleared {kind} '{hook}'"));
        }
        HooksCommand::Apply { hook, value, args } => {
            let value = parse_json("value", value)?;
            let args = parse_args(args)?;
            let result = manager.apply_filters(hook, value, &args).await?;
            output::print_value(&result, format);
        }
        HooksCommand::Do { hook, args } => {
            let args = parse_args(args)?;
            manager.do_action(hook, &args).await?;
            output::print_success(&format!("Fired action '{hook}'"));
        }
        HooksCommand::Decode { .. } => {}
    }

    manager.flush_cache();
    engine.shutdown().await;
    Ok(())
}

/// `Type@method` becomes a method callback, anything else a function name.
fn parse_callback(raw: &str) -> Callback {
    match raw.split_once('@') {
        Some((type_name, method)) => Callback::method(type_name, method),
        None => Callback::function(raw),
    }
}

fn describe(descriptor: &str) -> HookResult<DecodedDescriptor> {
    let invocation = codec::decode(descriptor)?;
    let shape = invocation.shape();
    let (target, method, payload) = match invocation {
        Invocation::Direct(closure) => (Some(closure.name), None, Some(closure.env)),
        Invocation::BoundMethod { receiver, method } => {
            (Some(receiver.type_name), Some(method), Some(receiver.state))
        }
        Invocation::UnresolvedMethod { type_name, method } => (Some(type_name), Some(method), None),
        Invocation::Named(name) => (Some(name), None, None),
    };

    Ok(DecodedDescriptor {
        shape,
        target,
        method,
        payload,
        state_key: codec::state_key(descriptor),
    })
}

fn parse_json(what: &str, raw: &str) -> HookResult<Value> {
    serde_json::from_str(raw).map_err(|e| {
        HookError::with_source(ErrorKind::Serialization, format!("Invalid JSON for {what}: {e}"), e)
    })
}

fn parse_args(raw: &str) -> HookResult<Vec<Value>> {
    match parse_json("--args", raw)? {
        Value::Array(items) => Ok(items),
        other => Err(HookError::new(
            ErrorKind::Serialization,
            format!("--args must be a JSON array, got {other}"),
        )),
    }
}
