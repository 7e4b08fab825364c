//! Role-based access control stage.

use crate::interceptor::{Interceptor, Next};
use crate::logging::{LogRecord, RecordSink};
use aspectra_core::{
    AccessError, IdentityProvider, InvocationContext, OperationDescriptor, PipelineResult, Principal,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Refuses calls whose caller holds none of the descriptor's required roles.
///
/// Descriptors with no required roles pass through. A refused call never
/// reaches the caching stage or the target.
pub struct AccessControlInterceptor {
    identity: Arc<dyn IdentityProvider>,
    sink: Arc<dyn RecordSink>,
}

impl AccessControlInterceptor {
    pub fn new(identity: Arc<dyn IdentityProvider>, sink: Arc<dyn RecordSink>) -> Self {
        Self { identity, sink }
    }

    /// Decide whether `ctx` may run `descriptor`, returning the matched role.
    pub async fn authorize(
        &self,
        descriptor: &OperationDescriptor,
        ctx: &InvocationContext,
    ) -> Result<Option<String>, AccessError> {
        let required = descriptor.required_roles();
        if required.is_empty() {
            return Ok(None);
        }

        let caller = match ctx.caller() {
            Some(caller) if self.identity.is_authenticated(ctx) => caller,
            _ => {
                return Err(AccessError::Unauthenticated {
                    operation: ctx.operation().to_string(),
                })
            }
        };

        let principal = Principal {
            id: caller.clone(),
            roles: self.identity.resolve_roles(caller).await,
        };
        match principal.matching_role(required) {
            Some(role) => Ok(Some(role.to_string())),
            None => Err(AccessError::Forbidden {
                principal: principal.id.to_string(),
                operation: ctx.operation().to_string(),
                required_roles: required.iter().cloned().collect(),
            }),
        }
    }

    fn record_denial(&self, ctx: &InvocationContext, error: &AccessError) {
        let (principal, required_roles, kind) = match error {
            AccessError::Unauthenticated { .. } => (None, Vec::new(), "Unauthenticated"),
            AccessError::Forbidden {
                principal,
                required_roles,
                ..
            } => (Some(principal.clone()), required_roles.clone(), "Forbidden"),
        };

        self.sink.record(&LogRecord::Denied {
            invocation_id: ctx.invocation_id(),
            at: Utc::now(),
            operation: ctx.operation().to_string(),
            target: ctx.target().to_string(),
            principal,
            required_roles,
            kind: kind.to_string(),
        });
    }
}

#[async_trait]
impl Interceptor for AccessControlInterceptor {
    fn name(&self) -> &'static str {
        "access_control"
    }

    fn applies(&self, descriptor: &OperationDescriptor) -> bool {
        descriptor.is_restricted()
    }

    async fn intercept(
        &self,
        descriptor: &OperationDescriptor,
        ctx: &InvocationContext,
        next: Next<'_>,
    ) -> PipelineResult<Value> {
        match self.authorize(descriptor, ctx).await {
            Ok(matched) => {
                tracing::debug!(
                    invocation_id = %ctx.invocation_id(),
                    operation = %ctx.operation(),
                    principal = ?ctx.caller().map(|c| c.as_str()),
                    matched_role = matched.as_deref().unwrap_or("<unrestricted>"),
                    "Access granted"
                );
                next.run(descriptor, ctx).await
            }
            Err(error) => {
                self.record_denial(ctx, &error);
                Err(error.into())
            }
        }
    }
}

impl std::fmt::Debug for AccessControlInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControlInterceptor").finish_non_exhaustive()
    }
}
