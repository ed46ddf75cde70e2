//! Capability resolver consumed by the runner, and the [`Container`]
//! implementation used when the host has no container of its own.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use hookbus_core::error::HookError;
use hookbus_core::result::HookResult;

use crate::target::{HookTarget, Hookable};

/// Closure body: receives its captured environment and the call arguments.
pub type ClosureFn = Arc<dyn Fn(&Value, &[Value]) -> HookResult<Value> + Send + Sync>;

/// Named function body.
pub type FunctionFn = Arc<dyn Fn(&[Value]) -> HookResult<Value> + Send + Sync>;

/// Resolves the targets named by descriptors.
///
/// Resolution must be deterministic per identifier for the lifetime of the
/// process. Every lookup failure is an `UnresolvedTarget` error.
pub trait Resolver: Send + Sync + std::fmt::Debug {
    /// Returns a fresh instance of a named type.
    fn resolve(&self, type_name: &str) -> HookResult<Box<dyn Hookable>>;

    /// Reconstructs an instance of a named type from its serialized fields.
    fn restore(&self, type_name: &str, state: &Value) -> HookResult<Box<dyn Hookable>>;

    /// Returns the body of a named closure.
    fn closure(&self, name: &str) -> HookResult<ClosureFn>;

    /// Returns a named function.
    fn function(&self, name: &str) -> HookResult<FunctionFn>;
}

/// Constructors for one registered type.
#[derive(Clone, Copy)]
struct TypeFactory {
    make: fn() -> Box<dyn Hookable>,
    restore: fn(&Value) -> HookResult<Box<dyn Hookable>>,
}

fn make_default<T: HookTarget + Default>() -> Box<dyn Hookable> {
    Box::new(T::default())
}

fn restore_from<T: HookTarget>(state: &Value) -> HookResult<Box<dyn Hookable>> {
    let instance: T = serde_json::from_value(state.clone()).map_err(|e| {
        HookError::malformed(format!(
            "Embedded receiver of type '{}' could not be restored: {e}",
            T::TYPE_NAME
        ))
    })?;
    Ok(Box::new(instance))
}

/// Table-driven resolver.
///
/// Types, closures, and functions are registered once at boot and looked up
/// by identifier afterwards.
#[derive(Default)]
pub struct Container {
    types: HashMap<String, TypeFactory>,
    closures: HashMap<String, ClosureFn>,
    functions: HashMap<String, FunctionFn>,
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a receiver type under its `TYPE_NAME`.
    pub fn register<T: HookTarget + Default>(&mut self) -> &mut Self {
        debug!(type_name = T::TYPE_NAME, "Registered hook target type");
        self.types.insert(
            T::TYPE_NAME.to_string(),
            TypeFactory {
                make: make_default::<T>,
                restore: restore_from::<T>,
            },
        );
        self
    }

    /// Registers a named closure body.
    pub fn closure<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&Value, &[Value]) -> HookResult<Value> + Send + Sync + 'static,
    {
        self.closures.insert(name.into(), Arc::new(body));
        self
    }

    /// Registers a named function.
    pub fn function<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&[Value]) -> HookResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(body));
        self
    }

    fn factory(&self, type_name: &str) -> HookResult<TypeFactory> {
        self.types
            .get(type_name)
            .copied()
            .ok_or_else(|| HookError::unresolved(format!("Unknown hook target type '{type_name}'")))
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.types.keys().collect();
        let mut closures: Vec<_> = self.closures.keys().collect();
        let mut functions: Vec<_> = self.functions.keys().collect();
        types.sort();
        closures.sort();
        functions.sort();
        f.debug_struct("Container")
            .field("types", &types)
            .field("closures", &closures)
            .field("functions", &functions)
            .finish()
    }
}

impl Resolver for Container {
    fn resolve(&self, type_name: &str) -> HookResult<Box<dyn Hookable>> {
        Ok((self.factory(type_name)?.make)())
    }

    fn restore(&self, type_name: &str, state: &Value) -> HookResult<Box<dyn Hookable>> {
        (self.factory(type_name)?.restore)(state)
    }

    fn closure(&self, name: &str) -> HookResult<ClosureFn> {
        self.closures
            .get(name)
            .cloned()
            .ok_or_else(|| HookError::unresolved(format!("Unknown hook closure '{name}'")))
    }

    fn function(&self, name: &str) -> HookResult<FunctionFn> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| HookError::unresolved(format!("Unknown hook function '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hookbus_core::error::ErrorKind;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Greeter {
        greeting: String,
    }

    #[async_trait]
    impl Hookable for Greeter {
        async fn call(&mut self, method: &str, args: &[Value]) -> HookResult<Value> {
            match method {
                "greet" => Ok(json!(format!(
                    "{} {}",
                    self.greeting,
                    args.first().and_then(Value::as_str).unwrap_or("world")
                ))),
                other => Err(HookError::unresolved(format!("Greeter has no method '{other}'"))),
            }
        }
    }

    impl HookTarget for Greeter {
        const TYPE_NAME: &'static str = "greeter";
    }

    #[tokio::test]
    async fn test_restore_uses_embedded_fields() {
        let mut container = Container::new();
        container.register::<Greeter>();

        let mut greeter = container
            .restore("greeter", &json!({"greeting": "hi"}))
            .unwrap();
        let out = greeter.call("greet", &[json!("bob")]).await.unwrap();
        assert_eq!(out, json!("hi bob"));
    }

    #[test]
    fn test_unknown_targets_are_unresolved() {
        let container = Container::new();
        assert!(container.resolve("nope").unwrap_err().is(ErrorKind::UnresolvedTarget));
        assert!(Resolver::closure(&container, "nope").err().unwrap().is(ErrorKind::UnresolvedTarget));
        assert!(Resolver::function(&container, "nope").err().unwrap().is(ErrorKind::UnresolvedTarget));
    }

    #[test]
    fn test_restore_with_bad_fields_is_malformed() {
        let mut container = Container::new();
        container.register::<Greeter>();
        let err = container.restore("greeter", &json!({"greeting": 5})).unwrap_err();
        assert!(err.is(ErrorKind::MalformedDescriptor));
    }
}
