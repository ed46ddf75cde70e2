//! Wires registry, state driver, dispatcher, and resolver from configuration.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use hookbus_cache::CacheManager;
use hookbus_core::config::AppConfig;
use hookbus_core::error::HookError;
use hookbus_core::result::HookResult;
use hookbus_engine::dispatch::{ActionDispatcher, SyncDispatcher};
use hookbus_engine::{Container, HookManager, HookRunner, InstancePool, StateBridge, registry, state};
use hookbus_worker::{ActionWorker, TaskQueueDispatcher, WorkerHandle};

/// A running engine plus its background worker, if any.
pub struct Engine {
    pub manager: Arc<HookManager>,
    worker: Option<WorkerHandle>,
}

impl Engine {
    /// Waits for queued actions to finish.
    pub async fn shutdown(self) {
        if let Some(worker) = self.worker {
            worker.shutdown().await;
        }
    }
}

/// Builds the engine described by `config`.
pub async fn build(config: &AppConfig) -> HookResult<Engine> {
    let cache = if config.registry.backend == "cache" || config.state.driver == "cache" {
        Some(Arc::new(CacheManager::new(&config.cache).await?))
    } else {
        None
    };

    let registry = registry::from_config(&config.registry, cache.clone()).await?;
    let driver = state::from_config(&config.state, cache)?;

    let runner = HookRunner::new(
        Arc::new(builtins()),
        Arc::new(StateBridge::new(driver)),
        Arc::new(InstancePool::new()),
    );

    let (dispatcher, worker) = match config.dispatcher.mode.as_str() {
        "sync" => (
            Arc::new(SyncDispatcher::new(runner.clone())) as Arc<dyn ActionDispatcher>,
            None,
        ),
        "queue" => {
            let (dispatcher, receiver) =
                TaskQueueDispatcher::channel(config.dispatcher.queue_capacity, runner.clone());
            let worker = ActionWorker::new(
                receiver,
                runner.clone(),
                config.dispatcher.concurrency,
                format!("cli-{}", std::process::id()),
            )
            .spawn();
            (Arc::new(dispatcher) as Arc<dyn ActionDispatcher>, Some(worker))
        }
        other => {
            return Err(HookError::configuration(format!(
                "Unknown dispatcher mode: '{other}'. Supported: sync, queue"
            )));
        }
    };

    let manager = Arc::new(HookManager::new(registry, dispatcher, runner));
    Ok(Engine { manager, worker })
}

/// Functions available to hooks registered from the command line.
pub fn builtins() -> Container {
    let mut container = Container::new();
    container
        .function("identity", |args| Ok(first(args)))
        .function("trace_args", |args| {
            info!(args = %serde_json::Value::Array(args.to_vec()), "trace_args hook fired");
            Ok(first(args))
        })
        .function("uppercase", |args| {
            Ok(match first(args) {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other,
            })
        })
        .function("concat", |args| {
            Ok(Value::String(
                args.iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ))
        });
    container
}

fn first(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbus_engine::resolver::Resolver;
    use serde_json::json;

    #[test]
    fn test_builtins() {
        let container = builtins();
        let upper = Resolver::function(&container, "uppercase").unwrap();
        assert_eq!(upper(&[json!("abc")]).unwrap(), json!("ABC"));
        assert_eq!(upper(&[json!(1)]).unwrap(), json!(1));

        let concat = Resolver::function(&container, "concat").unwrap();
        assert_eq!(concat(&[json!("a"), json!(1), json!("b")]).unwrap(), json!("a1b"));

        let identity = Resolver::function(&container, "identity").unwrap();
        assert_eq!(identity(&[]).unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_build_rejects_unknown_dispatcher() {
        let mut config = AppConfig::default();
        config.dispatcher.mode = "threads".to_string();
        let err = build(&config).await.err().unwrap();
        assert!(err.is(hookbus_core::error::ErrorKind::Configuration));
    }

    #[tokio::test]
    async fn test_file_backend_survives_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.registry.backend = "file".to_string();
        config.registry.file.path = dir.path().join("hooks.json").to_string_lossy().into_owned();

        let engine = build(&config).await.unwrap();
        engine
            .manager
            .add_filter(
                "title",
                &hookbus_engine::Callback::function("uppercase"),
                10,
                hookbus_core::types::hook::StateKind::Volatile,
            )
            .await
            .unwrap();
        engine.shutdown().await;

        let engine = build(&config).await.unwrap();
        let out = engine
            .manager
            .apply_filters("title", json!("hello"), &[])
            .await
            .unwrap();
        assert_eq!(out, json!("HELLO"));
    }
}
