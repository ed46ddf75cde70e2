//! Filter pipeline: threads one value through an ordered list of stages.

use async_trait::async_trait;
use serde_json::Value;

use hookbus_core::result::HookResult;
use hookbus_core::types::hook::HookRegistration;

use crate::runner::HookRunner;

/// One step of a filter pipeline.
#[async_trait]
pub trait FilterStage: Send + Sync {
    /// Transforms `value`. `args` are the extra arguments shared by every stage.
    async fn handle(&self, value: Value, args: &[Value]) -> HookResult<Value>;
}

#[async_trait]
impl<F> FilterStage for F
where
    F: Fn(Value, &[Value]) -> HookResult<Value> + Send + Sync,
{
    async fn handle(&self, value: Value, args: &[Value]) -> HookResult<Value> {
        self(value, args)
    }
}

/// Stage that runs a filter registration through the runner.
///
/// The callback receives the current value followed by the extra arguments.
#[derive(Debug, Clone)]
pub struct RunnerStage {
    runner: HookRunner,
    registration: HookRegistration,
}

impl RunnerStage {
    /// Wraps a registration.
    pub fn new(runner: HookRunner, registration: HookRegistration) -> Self {
        Self {
            runner,
            registration,
        }
    }
}

#[async_trait]
impl FilterStage for RunnerStage {
    async fn handle(&self, value: Value, args: &[Value]) -> HookResult<Value> {
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(value);
        call_args.extend_from_slice(args);
        self.runner.run_registration(&self.registration, &call_args).await
    }
}

/// Builder for one pipeline run.
///
/// ```ignore
/// let out = Pipeline::send(json!(3))
///     .with(vec![])
///     .through(stages)
///     .then(|v| v)
///     .await?;
/// ```
#[derive(Default)]
pub struct Pipeline {
    passable: Value,
    args: Vec<Value>,
    stages: Vec<Box<dyn FilterStage>>,
}

impl Pipeline {
    /// Starts a pipeline carrying `value`.
    pub fn send(value: Value) -> Self {
        Self {
            passable: value,
            ..Self::default()
        }
    }

    /// Sets the extra arguments passed to every stage.
    pub fn with(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Sets the stages, first one runs first.
    pub fn through(mut self, stages: Vec<Box<dyn FilterStage>>) -> Self {
        self.stages = stages;
        self
    }

    /// Appends one stage.
    pub fn pipe(mut self, stage: impl FilterStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Runs every stage in order and hands the result to `destination`.
    ///
    /// The first failing stage stops the pipeline.
    pub async fn then<F>(self, destination: F) -> HookResult<Value>
    where
        F: FnOnce(Value) -> Value,
    {
        let mut value = self.passable;
        for stage in &self.stages {
            value = stage.handle(value, &self.args).await?;
        }
        Ok(destination(value))
    }

    /// Runs every stage and returns the final value unchanged.
    pub async fn then_return(self) -> HookResult<Value> {
        self.then(|value| value).await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("passable", &self.passable)
            .field("args", &self.args)
            .field("stages", &self.stages.len())
            .finish()
    }
}
