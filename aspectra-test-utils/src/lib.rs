//! ASPECTRA Test Utilities
//!
//! Shared test infrastructure for the ASPECTRA workspace:
//! - Mock identity provider with fixed role assignments
//! - Counting and failing targets for observing invocations
//! - Proptest generators for arguments, contexts and principals
//! - Fixtures for a cache store on simulated time

// Re-export core types for convenience
pub use aspectra_cache::{CacheStore, ManualClock};
pub use aspectra_core::{
    Argument, DownstreamFailure, IdentityProvider, InvocationContext, OperationDescriptor,
    PipelineError, PipelineResult, PrincipalId,
};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::error::Error as StdError;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// MOCK IDENTITY
// ============================================================================

/// Identity provider with a fixed principal → roles table.
///
/// Uses the default authentication rule: any caller identity counts as
/// authenticated, known or not. Unknown callers resolve to no roles.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    roles: HashMap<PrincipalId, BTreeSet<String>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user<I, R>(mut self, id: impl Into<PrincipalId>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.roles
            .insert(id.into(), roles.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn resolve_roles(&self, principal: &PrincipalId) -> BTreeSet<String> {
        self.roles.get(principal).cloned().unwrap_or_default()
    }
}

// ============================================================================
// TARGETS
// ============================================================================

/// Target that returns a fixed value and counts how often it ran.
#[derive(Debug)]
pub struct CountingTarget {
    value: Value,
    calls: AtomicUsize,
}

impl CountingTarget {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Run the target once.
    pub async fn call(&self) -> PipelineResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.value.clone())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Target that always fails with the same shared error.
///
/// Every call returns a clone of one [`DownstreamFailure`], so callers can
/// check that the error that came back is the very one thrown.
#[derive(Debug)]
pub struct FailingTarget {
    failure: DownstreamFailure,
    calls: AtomicUsize,
}

impl FailingTarget {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            failure: DownstreamFailure::new(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub async fn call(&self) -> PipelineResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PipelineError::Downstream(self.failure.clone()))
    }

    /// The failure every call returns.
    pub fn failure(&self) -> &DownstreamFailure {
        &self.failure
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Map;

    /// Generate a JSON scalar or a small flat object.
    pub fn arb_json_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            (-1.0e6f64..1.0e6).prop_map(Value::from),
            "[a-zA-Z0-9 _-]{0,24}".prop_map(Value::from),
            prop::collection::btree_map("[a-z]{1,6}", any::<i32>(), 0..4).prop_map(|fields| {
                let map: Map<String, Value> = fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect();
                Value::Object(map)
            }),
        ]
    }

    /// Generate a non-null result value.
    pub fn arb_result_value() -> impl Strategy<Value = Value> {
        arb_json_value()
    }

    /// Generate a positional or named argument.
    pub fn arb_argument() -> impl Strategy<Value = Argument> {
        (proptest::option::of("[a-z]{1,6}"), arb_json_value()).prop_map(|(name, value)| {
            match name {
                Some(name) => Argument::named(name, value),
                None => Argument::positional(value),
            }
        })
    }

    /// Generate an ordered argument list.
    pub fn arb_arguments() -> impl Strategy<Value = Vec<Argument>> {
        prop::collection::vec(arb_argument(), 0..5)
    }

    /// Generate a principal id.
    pub fn arb_principal_id() -> impl Strategy<Value = PrincipalId> {
        "[a-z]{3,10}".prop_map(PrincipalId::from)
    }

    /// Generate a role set drawn from the stock role names.
    pub fn arb_role_set() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set(
            prop_oneof![
                Just("ADMIN".to_string()),
                Just("MANAGER".to_string()),
                Just("USER".to_string()),
                Just("GUEST".to_string()),
            ],
            0..4,
        )
    }

    /// Generate a context for `operation` on `target` with random arguments
    /// and an optional caller.
    pub fn arb_context(
        operation: &'static str,
        target: &'static str,
    ) -> impl Strategy<Value = InvocationContext> {
        (arb_arguments(), proptest::option::of(arb_principal_id())).prop_map(
            move |(args, caller)| {
                args.into_iter()
                    .fold(InvocationContext::builder(operation, target), |b, arg| {
                        b.argument(arg)
                    })
                    .maybe_caller(caller)
                    .build()
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use std::sync::Arc;

    /// A cache store driven by a manual clock.
    pub fn manual_cache() -> (Arc<CacheStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(CacheStore::with_clock(clock.clone()));
        (store, clock)
    }

    /// Identity table matching the stock accounts.
    pub fn stock_identity() -> StaticIdentity {
        StaticIdentity::new()
            .with_user("admin", ["ADMIN", "MANAGER", "USER"])
            .with_user("manager", ["MANAGER", "USER"])
            .with_user("user", ["USER"])
            .with_user("guest", ["GUEST"])
    }
}
