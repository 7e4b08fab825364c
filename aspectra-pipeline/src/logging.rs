//! Execution logging.
//!
//! The logging stage is outermost, so every call is recorded with its real
//! elapsed time: cache hits, access denials and downstream failures alike.
//! Records go to a [`RecordSink`]; the default [`TracingSink`] turns them
//! into `tracing` events at the operation's configured level.

use crate::interceptor::{Interceptor, Next};
use aspectra_core::{
    render_value, truncate, InvocationContext, InvocationId, LogLevel, OperationDescriptor,
    PipelineConfig, PipelineResult, Timestamp,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

// ============================================================================
// RECORDS
// ============================================================================

/// One structured record emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogRecord {
    /// Emitted before the downstream chain runs.
    Start {
        invocation_id: InvocationId,
        at: Timestamp,
        level: LogLevel,
        operation: String,
        target: String,
        message: Option<String>,
        args: Vec<String>,
    },
    /// Emitted after the downstream chain returned a value.
    Success {
        invocation_id: InvocationId,
        at: Timestamp,
        level: LogLevel,
        operation: String,
        target: String,
        duration_ms: f64,
        result: String,
    },
    /// Emitted after the downstream chain failed. Always ERROR.
    Failure {
        invocation_id: InvocationId,
        at: Timestamp,
        operation: String,
        target: String,
        duration_ms: f64,
        kind: String,
        message: String,
    },
    /// Emitted by access control when a call is refused. Always WARN.
    Denied {
        invocation_id: InvocationId,
        at: Timestamp,
        operation: String,
        target: String,
        principal: Option<String>,
        required_roles: Vec<String>,
        kind: String,
    },
}

impl LogRecord {
    pub fn invocation_id(&self) -> InvocationId {
        match self {
            Self::Start { invocation_id, .. }
            | Self::Success { invocation_id, .. }
            | Self::Failure { invocation_id, .. }
            | Self::Denied { invocation_id, .. } => *invocation_id,
        }
    }

    pub fn operation(&self) -> &str {
        match self {
            Self::Start { operation, .. }
            | Self::Success { operation, .. }
            | Self::Failure { operation, .. }
            | Self::Denied { operation, .. } => operation,
        }
    }

    pub fn level(&self) -> LogLevel {
        match self {
            Self::Start { level, .. } | Self::Success { level, .. } => *level,
            Self::Failure { .. } => LogLevel::Error,
            Self::Denied { .. } => LogLevel::Warn,
        }
    }

    /// Elapsed time for end records.
    pub fn duration_ms(&self) -> Option<f64> {
        match self {
            Self::Success { duration_ms, .. } | Self::Failure { duration_ms, .. } => {
                Some(*duration_ms)
            }
            Self::Start { .. } | Self::Denied { .. } => None,
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
            Self::Denied { .. } => "denied",
        }
    }
}

// ============================================================================
// SINKS
// ============================================================================

/// Destination of [`LogRecord`]s. Shared by every concurrent invocation.
pub trait RecordSink: Send + Sync {
    fn record(&self, record: &LogRecord);
}

/// Emit a `tracing` event at a level chosen at runtime.
macro_rules! event_at {
    ($level:expr, $($field:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($field)+),
            LogLevel::Debug => tracing::debug!($($field)+),
            LogLevel::Info => tracing::info!($($field)+),
            LogLevel::Warn => tracing::warn!($($field)+),
            LogLevel::Error => tracing::error!($($field)+),
        }
    };
}

/// Forwards records to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn record(&self, record: &LogRecord) {
        match record {
            LogRecord::Start {
                invocation_id,
                level,
                operation,
                target,
                message,
                args,
                ..
            } => event_at!(
                *level,
                invocation_id = %invocation_id,
                operation = %operation,
                target_entity = %target,
                note = message.as_deref().unwrap_or(""),
                args = ?args,
                "Invocation started"
            ),
            LogRecord::Success {
                invocation_id,
                level,
                operation,
                target,
                duration_ms,
                result,
                ..
            } => event_at!(
                *level,
                invocation_id = %invocation_id,
                operation = %operation,
                target_entity = %target,
                duration_ms = *duration_ms,
                result = %result,
                "Invocation succeeded"
            ),
            LogRecord::Failure {
                invocation_id,
                operation,
                target,
                duration_ms,
                kind,
                message,
                ..
            } => tracing::error!(
                invocation_id = %invocation_id,
                operation = %operation,
                target_entity = %target,
                duration_ms = *duration_ms,
                error_kind = %kind,
                error = %message,
                "Invocation failed"
            ),
            LogRecord::Denied {
                invocation_id,
                operation,
                target,
                principal,
                required_roles,
                kind,
                ..
            } => tracing::warn!(
                invocation_id = %invocation_id,
                operation = %operation,
                target_entity = %target,
                principal = principal.as_deref().unwrap_or("<anonymous>"),
                required_roles = ?required_roles,
                error_kind = %kind,
                "Invocation denied"
            ),
        }
    }
}

/// Keeps records in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records of one invocation.
    pub fn records_for(&self, invocation_id: InvocationId) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.invocation_id() == invocation_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl RecordSink for MemorySink {
    fn record(&self, record: &LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

// ============================================================================
// INTERCEPTOR
// ============================================================================

/// Times each call and emits a start record and exactly one end record.
pub struct LoggingInterceptor {
    sink: Arc<dyn RecordSink>,
    arg_render_limit: usize,
    result_render_limit: usize,
}

impl LoggingInterceptor {
    pub fn new(sink: Arc<dyn RecordSink>, config: &PipelineConfig) -> Self {
        Self {
            sink,
            arg_render_limit: config.arg_render_limit,
            result_render_limit: config.result_render_limit,
        }
    }

    fn render_args(&self, ctx: &InvocationContext) -> Vec<String> {
        ctx.args()
            .iter()
            .map(|arg| truncate(&arg.to_string(), self.arg_render_limit))
            .collect()
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn applies(&self, descriptor: &OperationDescriptor) -> bool {
        descriptor.logging().is_some()
    }

    async fn intercept(
        &self,
        descriptor: &OperationDescriptor,
        ctx: &InvocationContext,
        next: Next<'_>,
    ) -> PipelineResult<Value> {
        let (message, level) = match descriptor.logging() {
            Some(spec) => (spec.message().map(str::to_string), spec.level),
            None => (None, LogLevel::default()),
        };

        self.sink.record(&LogRecord::Start {
            invocation_id: ctx.invocation_id(),
            at: Utc::now(),
            level,
            operation: ctx.operation().to_string(),
            target: ctx.target().to_string(),
            message,
            args: self.render_args(ctx),
        });

        let started = Instant::now();
        let outcome = next.run(descriptor, ctx).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let end = match &outcome {
            Ok(value) => LogRecord::Success {
                invocation_id: ctx.invocation_id(),
                at: Utc::now(),
                level,
                operation: ctx.operation().to_string(),
                target: ctx.target().to_string(),
                duration_ms,
                result: render_value(value, self.result_render_limit),
            },
            Err(error) => LogRecord::Failure {
                invocation_id: ctx.invocation_id(),
                at: Utc::now(),
                operation: ctx.operation().to_string(),
                target: ctx.target().to_string(),
                duration_ms,
                kind: error.kind().to_string(),
                message: error.to_string(),
            },
        };
        self.sink.record(&end);

        outcome
    }
}

impl std::fmt::Debug for LoggingInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingInterceptor")
            .field("arg_render_limit", &self.arg_render_limit)
            .field("result_render_limit", &self.result_render_limit)
            .finish_non_exhaustive()
    }
}
