//! Integration tests for background action dispatch.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio::sync::mpsc;

use hookbus_core::error::{ErrorKind, HookError};
use hookbus_core::types::hook::StateKind;
use hookbus_engine::registry::MemoryRegistry;
use hookbus_engine::state::{MemoryStateDriver, StateBridge};
use hookbus_engine::{ActionDispatcher, Callback, Container, HookManager, HookRunner, InstancePool};
use hookbus_worker::{ActionJob, ActionWorker, TaskQueueDispatcher};

struct Harness {
    manager: HookManager,
    runner: HookRunner,
    receiver: Option<mpsc::Receiver<ActionJob>>,
    log: Arc<Mutex<Vec<Value>>>,
}

impl Harness {
    fn new(capacity: usize) -> Self {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();

        let mut container = Container::new();
        container
            .closure("record", move |env, args| {
                let mut entry = vec![env["tag"].clone()];
                entry.extend_from_slice(args);
                sink.lock().unwrap().push(Value::Array(entry));
                Ok(Value::Null)
            })
            .closure("fail", |_, _| Err(HookError::callback("refused")));

        let runner = HookRunner::new(
            Arc::new(container),
            Arc::new(StateBridge::new(Arc::new(MemoryStateDriver::new()))),
            Arc::new(InstancePool::new()),
        );
        let (dispatcher, receiver) = TaskQueueDispatcher::channel(capacity, runner.clone());
        let manager = HookManager::new(
            Arc::new(MemoryRegistry::new()),
            Arc::new(dispatcher),
            runner.clone(),
        );

        Self {
            manager,
            runner,
            receiver: Some(receiver),
            log,
        }
    }

    fn worker(&mut self) -> ActionWorker {
        let receiver = self.receiver.take().unwrap();
        ActionWorker::new(receiver, self.runner.clone(), 2, "test-worker")
    }

    fn recorded(&self) -> Vec<Value> {
        self.log.lock().unwrap().clone()
    }

    async fn add(&self, hook: &str, closure: &str, tag: &str, priority: i32) {
        let callback = Callback::closure(closure, json!({"tag": tag})).unwrap();
        self.manager
            .add_action(hook, &callback, priority, StateKind::Volatile)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_queued_actions_run_in_background() {
    let mut harness = Harness::new(16);
    harness.add("init", "record", "a", 10).await;
    harness.add("init", "record", "b", 20).await;
    assert_eq!(harness.manager.dispatcher().mode(), "queue");

    harness.manager.do_action("init", &[json!(1)]).await.unwrap();
    // Nothing runs until a worker picks the jobs up.
    assert!(harness.recorded().is_empty());

    harness.worker().spawn().shutdown().await;

    let mut seen = harness.recorded();
    seen.sort_by_key(|v| v.to_string());
    assert_eq!(seen, vec![json!(["a", 1]), json!(["b", 1])]);
}

#[tokio::test]
async fn test_full_queue_runs_inline() {
    let harness = Harness::new(1);
    harness.add("init", "record", "a", 10).await;

    harness.manager.do_action("init", &[]).await.unwrap();
    assert!(harness.recorded().is_empty());

    harness.manager.do_action("init", &[]).await.unwrap();
    assert_eq!(harness.recorded(), vec![json!(["a"])]);
}

#[tokio::test]
async fn test_closed_queue_runs_inline_and_propagates() {
    let mut harness = Harness::new(4);
    harness.add("init", "record", "a", 10).await;
    harness.add("init", "fail", "b", 20).await;
    drop(harness.receiver.take());

    let err = harness.manager.do_action("init", &[]).await.unwrap_err();
    assert!(err.is(ErrorKind::Callback));
    assert_eq!(harness.recorded(), vec![json!(["a"])]);
}

#[tokio::test]
async fn test_queued_failure_does_not_reach_caller() {
    let mut harness = Harness::new(4);
    harness.add("init", "fail", "x", 10).await;
    harness.add("init", "record", "after", 20).await;

    harness.manager.do_action("init", &[]).await.unwrap();
    harness.worker().spawn().shutdown().await;

    assert_eq!(harness.recorded(), vec![json!(["after"])]);
}

#[tokio::test]
async fn test_shutdown_drains_buffered_jobs() {
    let mut harness = Harness::new(8);
    harness.add("tick", "record", "t", 10).await;
    for i in 0..5 {
        harness.manager.do_action("tick", &[json!(i)]).await.unwrap();
    }

    let worker = harness.worker();
    let (cancel, cancel_rx) = tokio::sync::watch::channel(false);
    cancel.send(true).unwrap();
    worker.run(cancel_rx).await;

    assert_eq!(harness.recorded().len(), 5);
}
