//! Callback codec: turns a registrable callback into a size-bounded
//! descriptor string and classifies descriptors back into an [`Invocation`].
//!
//! Descriptor shapes:
//!
//! - `Closure:<base64 json {fn, env}>`: a named closure body plus its
//!   captured environment.
//! - `Object:<base64 json {type, state}>@<method>`: a serialized receiver.
//! - `<Type>@<method>`: a type resolved lazily through the resolver.
//! - `<identifier>`: a named function resolved lazily.
//!
//! Decoding never executes anything.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use hookbus_core::error::HookError;
use hookbus_core::result::HookResult;
use hookbus_core::types::hook::StateKind;

use crate::target::HookTarget;

/// Maximum encoded descriptor size in bytes.
pub const MAX_DESCRIPTOR_BYTES: usize = 8192;

const CLOSURE_PREFIX: &str = "Closure:";
const OBJECT_PREFIX: &str = "Object:";

/// A callback as handed to `add_filter` / `add_action`.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    /// A closure body registered with the resolver under `name`, with a
    /// serializable captured environment.
    Closure {
        /// Closure name known to the resolver.
        name: String,
        /// Captured environment.
        env: Value,
    },
    /// A serialized receiver plus the method to call on it.
    Object {
        /// Type identifier of the receiver.
        type_name: String,
        /// Serialized field state of the receiver.
        state: Value,
        /// Method name.
        method: String,
    },
    /// A type resolved at execution time plus the method to call.
    Method {
        /// Type identifier.
        type_name: String,
        /// Method name.
        method: String,
    },
    /// A named function resolved at execution time.
    Function(String),
}

impl Callback {
    /// Builds a closure callback capturing `env`.
    pub fn closure(name: impl Into<String>, env: impl Serialize) -> HookResult<Self> {
        Ok(Self::Closure {
            name: name.into(),
            env: serde_json::to_value(env)?,
        })
    }

    /// Builds a callback bound to a serialized copy of `receiver`.
    pub fn object<T: HookTarget>(receiver: &T, method: impl Into<String>) -> HookResult<Self> {
        Ok(Self::Object {
            type_name: T::TYPE_NAME.to_string(),
            state: serde_json::to_value(receiver)?,
            method: method.into(),
        })
    }

    /// Builds a `Type@method` callback.
    pub fn method(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Method {
            type_name: type_name.into(),
            method: method.into(),
        }
    }

    /// Builds a bare named-function callback.
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function(name.into())
    }
}

/// Closure payload extracted from a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosurePayload {
    /// Closure name known to the resolver.
    #[serde(rename = "fn")]
    pub name: String,
    /// Captured environment.
    #[serde(default)]
    pub env: Value,
}

/// Receiver payload extracted from a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPayload {
    /// Type identifier of the receiver.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Serialized field state.
    pub state: Value,
}

/// Invocation plan produced by [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Self-contained closure with its captured environment.
    Direct(ClosurePayload),
    /// Embedded receiver plus method.
    BoundMethod {
        /// Serialized receiver.
        receiver: ObjectPayload,
        /// Method name.
        method: String,
    },
    /// Receiver type to resolve plus method.
    UnresolvedMethod {
        /// Type identifier.
        type_name: String,
        /// Method name.
        method: String,
    },
    /// Named function.
    Named(String),
}

impl Invocation {
    /// Short shape name used in logs.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Direct(_) => "closure",
            Self::BoundMethod { .. } => "object",
            Self::UnresolvedMethod { .. } => "method",
            Self::Named(_) => "function",
        }
    }
}

/// Encodes a callback into a descriptor.
///
/// Fails with `Oversize` if the result exceeds [`MAX_DESCRIPTOR_BYTES`]; the
/// descriptor is never truncated.
pub fn encode(callback: &Callback) -> HookResult<String> {
    let descriptor = match callback {
        Callback::Closure { name, env } => {
            check_identifier(name)?;
            let payload = ClosurePayload {
                name: name.clone(),
                env: env.clone(),
            };
            format!(
                "{CLOSURE_PREFIX}{}",
                STANDARD.encode(serde_json::to_vec(&payload)?)
            )
        }
        Callback::Object {
            type_name,
            state,
            method,
        } => {
            check_identifier(type_name)?;
            check_identifier(method)?;
            let payload = ObjectPayload {
                type_name: type_name.clone(),
                state: state.clone(),
            };
            format!(
                "{OBJECT_PREFIX}{}@{method}",
                STANDARD.encode(serde_json::to_vec(&payload)?)
            )
        }
        Callback::Method { type_name, method } => {
            check_leading_identifier(type_name)?;
            check_identifier(method)?;
            format!("{type_name}@{method}")
        }
        Callback::Function(name) => {
            check_leading_identifier(name)?;
            name.clone()
        }
    };

    if descriptor.len() > MAX_DESCRIPTOR_BYTES {
        return Err(HookError::oversize(descriptor.len(), MAX_DESCRIPTOR_BYTES));
    }

    Ok(descriptor)
}

/// Classifies a descriptor into an invocation plan.
pub fn decode(descriptor: &str) -> HookResult<Invocation> {
    if descriptor.is_empty() {
        return Err(HookError::malformed("Empty hook descriptor"));
    }

    if let Some(payload) = descriptor.strip_prefix(CLOSURE_PREFIX) {
        let payload: ClosurePayload = decode_payload(payload)?;
        return Ok(Invocation::Direct(payload));
    }

    if let Some(rest) = descriptor.strip_prefix(OBJECT_PREFIX) {
        let (payload, method) = rest.rsplit_once('@').ok_or_else(|| {
            HookError::malformed("Object descriptor is missing its '@method' suffix")
        })?;
        check_identifier(method)?;
        let receiver: ObjectPayload = decode_payload(payload)?;
        return Ok(Invocation::BoundMethod {
            receiver,
            method: method.to_string(),
        });
    }

    match descriptor.split_once('@') {
        Some((type_name, method)) => {
            check_identifier(type_name)?;
            check_identifier(method)?;
            Ok(Invocation::UnresolvedMethod {
                type_name: type_name.to_string(),
                method: method.to_string(),
            })
        }
        None => {
            check_identifier(descriptor)?;
            Ok(Invocation::Named(descriptor.to_string()))
        }
    }
}

/// Deterministic state record key for a descriptor.
pub fn state_key(descriptor: &str) -> String {
    hex_digest(descriptor.as_bytes(), &[])
}

/// Instance pool key for a descriptor under a state kind.
pub fn pool_key(descriptor: &str, state_kind: StateKind) -> String {
    hex_digest(descriptor.as_bytes(), state_kind.as_str().as_bytes())
}

fn hex_digest(data: &[u8], suffix: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.update(suffix);
    format!("{:x}", hasher.finalize())
}

fn decode_payload<T: serde::de::DeserializeOwned>(payload: &str) -> HookResult<T> {
    let bytes = STANDARD.decode(payload).map_err(|e| {
        HookError::malformed(format!("Descriptor payload is not valid base64: {e}"))
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| HookError::malformed(format!("Descriptor payload is not valid JSON: {e}")))
}

/// Identifiers are non-empty and free of whitespace and the `@` separator.
/// `::`, `.`, `-` and `\` are allowed so namespaced names round-trip.
fn check_identifier(ident: &str) -> HookResult<()> {
    if ident.is_empty() {
        return Err(HookError::malformed("Descriptor contains an empty identifier"));
    }
    if ident.chars().any(|c| c.is_whitespace() || c == '@') {
        return Err(HookError::malformed(format!(
            "Invalid identifier in descriptor: '{ident}'"
        )));
    }
    Ok(())
}

/// An identifier that starts a plain descriptor must not look like a
/// closure or object prefix, or it would decode as a different shape.
fn check_leading_identifier(ident: &str) -> HookResult<()> {
    check_identifier(ident)?;
    if ident.starts_with(CLOSURE_PREFIX) || ident.starts_with(OBJECT_PREFIX) {
        return Err(HookError::malformed(format!(
            "Identifier '{ident}' collides with a reserved descriptor prefix"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbus_core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_function_descriptor_is_bare_name() {
        let descriptor = encode(&Callback::function("wp_trim_excerpt")).unwrap();
        assert_eq!(descriptor, "wp_trim_excerpt");
        assert_eq!(
            decode(&descriptor).unwrap(),
            Invocation::Named("wp_trim_excerpt".to_string())
        );
    }

    #[test]
    fn test_method_descriptor() {
        let descriptor = encode(&Callback::method("SeoPlugin", "title")).unwrap();
        assert_eq!(descriptor, "SeoPlugin@title");
        assert_eq!(
            decode(&descriptor).unwrap(),
            Invocation::UnresolvedMethod {
                type_name: "SeoPlugin".to_string(),
                method: "title".to_string(),
            }
        );
    }

    #[test]
    fn test_object_state_round_trips_exactly() {
        let state = json!({"count": 3, "label": "a@b c", "nested": {"list": [1, 2, null]}});
        let callback = Callback::Object {
            type_name: "counter".to_string(),
            state: state.clone(),
            method: "bump".to_string(),
        };
        let descriptor = encode(&callback).unwrap();
        assert!(descriptor.starts_with("Object:"));

        match decode(&descriptor).unwrap() {
            Invocation::BoundMethod { receiver, method } => {
                assert_eq!(receiver.type_name, "counter");
                assert_eq!(receiver.state, state);
                assert_eq!(method, "bump");
            }
            other => panic!("unexpected invocation: {other:?}"),
        }
    }

    #[test]
    fn test_closure_env_round_trips() {
        let callback = Callback::closure("add", json!({"n": 1})).unwrap();
        let descriptor = encode(&callback).unwrap();
        assert_eq!(
            decode(&descriptor).unwrap(),
            Invocation::Direct(ClosurePayload {
                name: "add".to_string(),
                env: json!({"n": 1}),
            })
        );
    }

    #[test]
    fn test_oversize_is_rejected() {
        let callback = Callback::closure("big", "x".repeat(MAX_DESCRIPTOR_BYTES)).unwrap();
        let err = encode(&callback).unwrap_err();
        assert!(err.is(ErrorKind::Oversize));
    }

    #[test]
    fn test_malformed_descriptors() {
        for descriptor in [
            "",
            "Closure:!!!not-base64",
            "Object:e30=",
            "Type@",
            "@method",
            "two words",
            "a@b@c",
        ] {
            let err = decode(descriptor).unwrap_err();
            assert!(
                err.is(ErrorKind::MalformedDescriptor),
                "expected malformed for {descriptor:?}, got {err}"
            );
        }
    }

    #[test]
    fn test_reserved_prefixes_rejected_at_encode() {
        for callback in [
            Callback::function("Object:x"),
            Callback::function("Closure:abc"),
            Callback::method("Closure:abc", "run"),
            Callback::method("Object:e30=", "run"),
        ] {
            let err = encode(&callback).unwrap_err();
            assert!(err.is(ErrorKind::MalformedDescriptor), "accepted {callback:?}");
        }

        // Only a leading prefix is reserved.
        assert_eq!(
            encode(&Callback::method("Seo", "Object:title")).unwrap(),
            "Seo@Object:title"
        );
        assert_eq!(
            encode(&Callback::function("Vendor::Object:fmt")).unwrap(),
            "Vendor::Object:fmt"
        );
    }

    #[test]
    fn test_state_key_is_deterministic() {
        assert_eq!(state_key("a@b"), state_key("a@b"));
        assert_ne!(state_key("a@b"), state_key("a@c"));
        assert_eq!(state_key("a@b").len(), 64);
        assert_ne!(
            pool_key("a@b", StateKind::Scoped),
            pool_key("a@b", StateKind::Shared)
        );
    }
}
