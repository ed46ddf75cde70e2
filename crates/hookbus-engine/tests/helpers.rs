//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use hookbus_core::error::HookError;
use hookbus_core::result::HookResult;
use hookbus_core::traits::state::StateDriver;
use hookbus_core::types::hook::StateData;
use hookbus_engine::registry::MemoryRegistry;
use hookbus_engine::state::{MemoryStateDriver, StateBridge};
use hookbus_engine::{
    Container, HookManager, HookRunner, HookTarget, Hookable, InstancePool, Stateful,
    SyncDispatcher,
};

/// Stateful receiver: `bump` increments and returns the count; `slow_bump`
/// yields to the scheduler before writing its increment.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Counter {
    pub count: i64,
}

#[async_trait]
impl Hookable for Counter {
    async fn call(&mut self, method: &str, args: &[Value]) -> HookResult<Value> {
        match method {
            "bump" => {
                self.count += 1;
                Ok(json!(self.count))
            }
            "slow_bump" => {
                let seen = self.count;
                tokio::task::yield_now().await;
                self.count = seen + 1;
                Ok(json!(self.count))
            }
            "add_count" => {
                let value = args.first().and_then(Value::as_i64).unwrap_or_default();
                Ok(json!(value + self.count))
            }
            "fail" => {
                self.count += 1;
                Err(HookError::callback("counter refused"))
            }
            "explode" => panic!("counter exploded"),
            other => Err(HookError::unresolved(format!("Counter has no method '{other}'"))),
        }
    }

    fn stateful(&mut self) -> Option<&mut dyn Stateful> {
        Some(self)
    }
}

impl Stateful for Counter {
    fn hydrate(&mut self, state: StateData) {
        if let Some(count) = state.get("count").and_then(Value::as_i64) {
            self.count = count;
        }
    }

    fn extract(&self) -> StateData {
        let mut state = StateData::new();
        state.insert("count".to_string(), json!(self.count));
        state
    }
}

impl HookTarget for Counter {
    const TYPE_NAME: &'static str = "counter";
}

/// Plain receiver: `hit` counts calls on this instance only.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Tally {
    pub hits: i64,
}

#[async_trait]
impl Hookable for Tally {
    async fn call(&mut self, method: &str, _args: &[Value]) -> HookResult<Value> {
        match method {
            "hit" => {
                self.hits += 1;
                Ok(json!(self.hits))
            }
            other => Err(HookError::unresolved(format!("Tally has no method '{other}'"))),
        }
    }
}

impl HookTarget for Tally {
    const TYPE_NAME: &'static str = "tally";
}

/// A wired engine plus the side-effect log its `record` closure writes to.
pub struct TestEngine {
    pub manager: HookManager,
    pub driver: Arc<dyn StateDriver>,
    pub log: Arc<Mutex<Vec<Value>>>,
}

impl TestEngine {
    /// Everything `record` has seen, in call order.
    pub fn recorded(&self) -> Vec<Value> {
        self.log.lock().unwrap().clone()
    }
}

/// Container with the test types and these bodies:
///
/// - closure `add` / `mul`: `args[0] + env.n` / `args[0] * env.n`
/// - closure `append`: `args[0] + env.s` (strings)
/// - closure `record`: pushes `[env.tag, ...args]` to the log
/// - closure `fail`: always errors
/// - function `join`: concatenates every string argument
pub fn container(log: Arc<Mutex<Vec<Value>>>) -> Container {
    let mut container = Container::new();
    container
        .register::<Counter>()
        .register::<Tally>()
        .closure("add", |env, args| {
            Ok(json!(int(args, 0) + env["n"].as_i64().unwrap_or_default()))
        })
        .closure("mul", |env, args| {
            Ok(json!(int(args, 0) * env["n"].as_i64().unwrap_or_default()))
        })
        .closure("append", |env, args| {
            let head = args.first().and_then(Value::as_str).unwrap_or_default();
            Ok(json!(format!("{head}{}", env["s"].as_str().unwrap_or_default())))
        })
        .closure("record", move |env, args| {
            let mut entry = vec![env["tag"].clone()];
            entry.extend_from_slice(args);
            log.lock().unwrap().push(Value::Array(entry));
            Ok(Value::Null)
        })
        .closure("fail", |_, _| Err(HookError::callback("closure refused")))
        .function("join", |args| {
            Ok(json!(
                args.iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("")
            ))
        });
    container
}

fn int(args: &[Value], index: usize) -> i64 {
    args.get(index).and_then(Value::as_i64).unwrap_or_default()
}

/// Engine on memory registry, memory state, inline dispatch.
pub fn engine() -> TestEngine {
    engine_with(Arc::new(MemoryStateDriver::new()))
}

/// Engine on memory registry and inline dispatch over `driver`.
pub fn engine_with(driver: Arc<dyn StateDriver>) -> TestEngine {
    let log = Arc::new(Mutex::new(Vec::new()));
    let runner = HookRunner::new(
        Arc::new(container(log.clone())),
        Arc::new(StateBridge::new(driver.clone())),
        Arc::new(InstancePool::new()),
    );
    let manager = HookManager::new(
        Arc::new(MemoryRegistry::new()),
        Arc::new(SyncDispatcher::new(runner.clone())),
        runner,
    );
    TestEngine {
        manager,
        driver,
        log,
    }
}
