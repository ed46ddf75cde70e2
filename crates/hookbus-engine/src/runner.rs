//! Executes one descriptor: decode, resolve, hydrate, call, persist, release.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use hookbus_core::error::HookError;
use hookbus_core::result::HookResult;
use hookbus_core::types::hook::{HookRegistration, StateKind};

use crate::codec::{self, Invocation};
use crate::pool::InstancePool;
use crate::resolver::{ClosureFn, FunctionFn, Resolver};
use crate::state::StateBridge;
use crate::target::Hookable;

/// A resolved callable, ready to invoke.
enum Target {
    Closure { body: ClosureFn, env: Value },
    Function(FunctionFn),
    Receiver { instance: Box<dyn Hookable>, method: String },
}

impl Target {
    async fn invoke(&mut self, args: &[Value]) -> HookResult<Value> {
        match self {
            Self::Closure { body, env } => body(env, args),
            Self::Function(body) => body(args),
            Self::Receiver { instance, method } => instance.call(method, args).await,
        }
    }

    fn receiver(&mut self) -> Option<&mut dyn Hookable> {
        match self {
            Self::Receiver { instance, .. } => Some(instance.as_mut()),
            _ => None,
        }
    }
}

/// Runs hook callbacks.
///
/// Shared callbacks run under the state lock of their key. The lock is
/// released on every exit path, including a panic inside the callback,
/// which is resumed once the lock is gone.
#[derive(Debug, Clone)]
pub struct HookRunner {
    resolver: Arc<dyn Resolver>,
    bridge: Arc<StateBridge>,
    pool: Arc<InstancePool>,
}

impl HookRunner {
    /// Creates a runner.
    pub fn new(
        resolver: Arc<dyn Resolver>,
        bridge: Arc<StateBridge>,
        pool: Arc<InstancePool>,
    ) -> Self {
        Self {
            resolver,
            bridge,
            pool,
        }
    }

    /// The state bridge used for shared callbacks.
    pub fn bridge(&self) -> &Arc<StateBridge> {
        &self.bridge
    }

    /// The pool holding scoped receivers.
    pub fn pool(&self) -> &Arc<InstancePool> {
        &self.pool
    }

    /// Runs a registration, keying shared state by its descriptor.
    pub async fn run_registration(
        &self,
        registration: &HookRegistration,
        args: &[Value],
    ) -> HookResult<Value> {
        let key = codec::state_key(&registration.descriptor);
        self.run(&registration.descriptor, args, Some(&key), registration.state_kind)
            .await
    }

    /// Runs a descriptor.
    ///
    /// `state_key` is only used for [`StateKind::Shared`]; when omitted it
    /// is derived from the descriptor.
    pub async fn run(
        &self,
        descriptor: &str,
        args: &[Value],
        state_key: Option<&str>,
        state_kind: StateKind,
    ) -> HookResult<Value> {
        if state_kind != StateKind::Shared {
            return self.execute(descriptor, args, None, state_kind).await;
        }

        let key = state_key
            .map(str::to_owned)
            .unwrap_or_else(|| codec::state_key(descriptor));

        if !self.bridge.lock(&key).await? {
            return Err(HookError::lock_timeout(&key));
        }

        let outcome = AssertUnwindSafe(self.execute(descriptor, args, Some(&key), state_kind))
            .catch_unwind()
            .await;
        let released = self.bridge.unlock(&key).await;

        match outcome {
            Ok(Ok(value)) => {
                released?;
                Ok(value)
            }
            Ok(Err(e)) => {
                if let Err(unlock_err) = released {
                    warn!(key = %key, error = %unlock_err, "Failed to release state lock after hook error");
                }
                Err(e)
            }
            Err(panic) => {
                if let Err(unlock_err) = released {
                    error!(key = %key, error = %unlock_err, "Failed to release state lock after hook panic");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }

    async fn execute(
        &self,
        descriptor: &str,
        args: &[Value],
        state_key: Option<&str>,
        state_kind: StateKind,
    ) -> HookResult<Value> {
        let invocation = codec::decode(descriptor)?;
        debug!(shape = invocation.shape(), state_kind = %state_kind, "Running hook");

        let pool_key =
            (state_kind == StateKind::Scoped).then(|| codec::pool_key(descriptor, state_kind));
        let mut target = self.acquire(invocation, pool_key.as_deref())?;

        if let (Some(key), Some(receiver)) = (state_key, target.receiver()) {
            self.bridge.hydrate(key, receiver).await?;
        }

        let result = target.invoke(args).await;

        if let (Some(key), Some(receiver)) = (state_key, target.receiver()) {
            let persisted = self.bridge.persist(key, receiver).await;
            match (&result, persisted) {
                (Ok(_), Err(e)) => return Err(e),
                (Err(_), Err(e)) => {
                    warn!(key, error = %e, "Failed to persist state after hook error");
                }
                _ => {}
            }
        }

        if let (Some(pool_key), Target::Receiver { instance, .. }) = (pool_key, target) {
            self.pool.put(pool_key, instance);
        }

        result
    }

    fn acquire(&self, invocation: Invocation, pool_key: Option<&str>) -> HookResult<Target> {
        match invocation {
            Invocation::Direct(payload) => Ok(Target::Closure {
                body: self.resolver.closure(&payload.name)?,
                env: payload.env,
            }),
            Invocation::Named(name) => Ok(Target::Function(self.resolver.function(&name)?)),
            Invocation::BoundMethod { receiver, method } => {
                let instance = match pool_key.and_then(|k| self.pool.take(k)) {
                    Some(instance) => instance,
                    None => self.resolver.restore(&receiver.type_name, &receiver.state)?,
                };
                Ok(Target::Receiver { instance, method })
            }
            Invocation::UnresolvedMethod { type_name, method } => {
                let instance = match pool_key.and_then(|k| self.pool.take(k)) {
                    Some(instance) => instance,
                    None => self.resolver.resolve(&type_name)?,
                };
                Ok(Target::Receiver { instance, method })
            }
        }
    }
}
