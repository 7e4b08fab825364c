//! Per-call invocation context.
//!
//! An [`InvocationContext`] describes one call: which operation, on which
//! target entity, with which arguments, made by whom. It is built fresh for
//! every call and never shared between calls.

use crate::identity::PrincipalId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Correlation id for the records emitted during one invocation (UUIDv7).
pub type InvocationId = Uuid;

/// One positional argument, optionally named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    name: Option<String>,
    value: Value,
}

impl Argument {
    pub fn positional(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Stable textual fingerprint: `name=<json>` or `<json>`.
    ///
    /// Values render as compact JSON. Object keys come out sorted, so two
    /// arguments that compare equal always fingerprint identically.
    pub fn fingerprint(&self) -> String {
        match &self.name {
            Some(name) => format!("{}={}", name, self.value),
            None => self.value.to_string(),
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fingerprint())
    }
}

/// Immutable description of a single call flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationContext {
    invocation_id: InvocationId,
    operation: String,
    target: String,
    args: Vec<Argument>,
    caller: Option<PrincipalId>,
}

impl InvocationContext {
    /// Start building a context for `operation` on the entity `target`.
    pub fn builder(
        operation: impl Into<String>,
        target: impl Into<String>,
    ) -> InvocationContextBuilder {
        InvocationContextBuilder {
            operation: operation.into(),
            target: target.into(),
            args: Vec::new(),
            caller: None,
        }
    }

    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Identifier of the entity that owns the operation.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// The calling principal, or `None` for an unauthenticated call.
    pub fn caller(&self) -> Option<&PrincipalId> {
        self.caller.as_ref()
    }

    /// Fingerprints of every argument, in call order.
    pub fn arg_fingerprints(&self) -> Vec<String> {
        self.args.iter().map(Argument::fingerprint).collect()
    }
}

/// Builder for [`InvocationContext`].
#[derive(Debug, Clone)]
pub struct InvocationContextBuilder {
    operation: String,
    target: String,
    args: Vec<Argument>,
    caller: Option<PrincipalId>,
}

impl InvocationContextBuilder {
    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(Argument::positional(value));
        self
    }

    /// Append a named argument.
    pub fn named_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.push(Argument::named(name, value));
        self
    }

    /// Append a prepared argument.
    pub fn argument(mut self, argument: Argument) -> Self {
        self.args.push(argument);
        self
    }

    /// Set the calling principal.
    pub fn caller(mut self, caller: impl Into<PrincipalId>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Set or clear the calling principal.
    pub fn maybe_caller(mut self, caller: Option<PrincipalId>) -> Self {
        self.caller = caller;
        self
    }

    pub fn build(self) -> InvocationContext {
        InvocationContext {
            invocation_id: Uuid::now_v7(),
            operation: self.operation,
            target: self.target,
            args: self.args,
            caller: self.caller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_getters() {
        let ctx = InvocationContext::builder("balance", "agent:alice")
            .named_arg("currency", "EUR")
            .arg(3)
            .caller("admin")
            .build();

        assert_eq!(ctx.operation(), "balance");
        assert_eq!(ctx.target(), "agent:alice");
        assert_eq!(ctx.args().len(), 2);
        assert_eq!(ctx.caller().map(PrincipalId::as_str), Some("admin"));
        assert_eq!(ctx.arg_fingerprints(), vec!["currency=\"EUR\"", "3"]);
    }

    #[test]
    fn test_each_build_gets_fresh_invocation_id() {
        let builder = InvocationContext::builder("op", "t").arg(1);
        let a = builder.clone().build();
        let b = builder.build();
        assert_ne!(a.invocation_id(), b.invocation_id());
        assert_eq!(a.arg_fingerprints(), b.arg_fingerprints());
    }

    #[test]
    fn test_fingerprint_object_keys_sorted() {
        let a = Argument::positional(json!({"b": 2, "a": 1}));
        let b = Argument::positional(json!({"a": 1, "b": 2}));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), "{\"a\":1,\"b\":2}");
    }

    #[test]
    fn test_fingerprint_distinguishes_types() {
        assert_ne!(
            Argument::positional(5).fingerprint(),
            Argument::positional("5").fingerprint()
        );
        assert_eq!(Argument::named("x", 5).fingerprint(), "x=5");
        assert_eq!(Argument::positional(json!(null)).to_string(), "null");
    }

    #[test]
    fn test_unauthenticated_context() {
        let ctx = InvocationContext::builder("lookup", "container")
            .maybe_caller(None)
            .build();
        assert!(ctx.caller().is_none());
    }
}
