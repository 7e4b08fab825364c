//! Structured cache keys.
//!
//! A key is never a concatenated string: the operation, target and argument
//! fingerprints are kept as separate fields, so two different calls cannot
//! collide however their arguments are spelled. The private inner struct
//! means keys only come from the constructors below.

use aspectra_core::{CachingSpec, InvocationContext, KeyScope, PrincipalId};
use std::fmt;

/// Key of a cached invocation result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inner: CacheKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKeyInner {
    caller: Option<PrincipalId>,
    body: KeyBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyBody {
    Explicit(String),
    Derived {
        operation: String,
        target: String,
        args: Vec<String>,
    },
}

impl CacheKey {
    /// A key chosen by the operation's author.
    pub fn explicit(key: impl Into<String>) -> Self {
        Self {
            inner: CacheKeyInner {
                caller: None,
                body: KeyBody::Explicit(key.into()),
            },
        }
    }

    /// A key derived from the call shape: operation + target + arguments.
    pub fn derived(
        operation: impl Into<String>,
        target: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            inner: CacheKeyInner {
                caller: None,
                body: KeyBody::Derived {
                    operation: operation.into(),
                    target: target.into(),
                    args,
                },
            },
        }
    }

    /// Qualify this key with a caller identity.
    pub fn scoped_to(mut self, caller: Option<PrincipalId>) -> Self {
        self.inner.caller = caller;
        self
    }

    /// Compute the key for one invocation.
    ///
    /// Pure: the same context, spec and scope always yield the same key.
    /// Under [`KeyScope::PerCaller`] the caller (or its absence) is part of
    /// the key; under [`KeyScope::Shared`] it is ignored.
    pub fn for_invocation(ctx: &InvocationContext, spec: &CachingSpec, scope: KeyScope) -> Self {
        let key = match &spec.key {
            Some(explicit) => Self::explicit(explicit.clone()),
            None => Self::derived(ctx.operation(), ctx.target(), ctx.arg_fingerprints()),
        };
        match scope {
            KeyScope::PerCaller => key.scoped_to(ctx.caller().cloned()),
            KeyScope::Shared => key,
        }
    }

    /// Caller this key is scoped to, if any.
    pub fn caller(&self) -> Option<&PrincipalId> {
        self.inner.caller.as_ref()
    }

    /// Operation of a derived key (`None` for explicit keys).
    pub fn operation(&self) -> Option<&str> {
        match &self.inner.body {
            KeyBody::Derived { operation, .. } => Some(operation),
            KeyBody::Explicit(_) => None,
        }
    }

    /// The explicit key text (`None` for derived keys).
    pub fn explicit_key(&self) -> Option<&str> {
        match &self.inner.body {
            KeyBody::Explicit(key) => Some(key),
            KeyBody::Derived { .. } => None,
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self.inner.body, KeyBody::Explicit(_))
    }
}

/// Human-readable rendering for logs: `[caller] target.operation(a, b)` or
/// `[caller] key`. Not used for identity.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(caller) = &self.inner.caller {
            write!(f, "[{}] ", caller)?;
        }
        match &self.inner.body {
            KeyBody::Explicit(key) => f.write_str(key),
            KeyBody::Derived {
                operation,
                target,
                args,
            } => write!(f, "{}.{}({})", target, operation, args.join(", ")),
        }
    }
}
