//! Error types for ASPECTRA operations

use std::any::type_name;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Access-control failures raised before the target or the cache is touched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Access denied to {operation}: caller is not authenticated")]
    Unauthenticated { operation: String },

    #[error(
        "Access denied to {operation}: principal '{principal}' lacks the required roles, needs one of {required_roles:?}"
    )]
    Forbidden {
        principal: String,
        operation: String,
        required_roles: Vec<String>,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// A failure raised by the wrapped operation itself.
///
/// The original error is kept behind an `Arc` so the failure can be cloned
/// through the pipeline and still be recovered with [`downcast_ref`].
/// Display and `source` are forwarded to the original error unchanged.
///
/// [`downcast_ref`]: DownstreamFailure::downcast_ref
#[derive(Clone)]
pub struct DownstreamFailure {
    kind: String,
    inner: Arc<dyn StdError + Send + Sync + 'static>,
}

impl DownstreamFailure {
    /// Wrap an operation error, recording its short type name as the kind.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            kind: short_type_name::<E>().to_string(),
            inner: Arc::new(error),
        }
    }

    /// Wrap an already shared error under an explicit kind.
    pub fn from_shared(
        kind: impl Into<String>,
        inner: Arc<dyn StdError + Send + Sync + 'static>,
    ) -> Self {
        Self {
            kind: kind.into(),
            inner,
        }
    }

    /// Short type name of the original error (e.g. `LedgerError`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Borrow the original error as a trait object.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    /// Recover the original error if it is an `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Check whether the original error is an `E`.
    pub fn is<E>(&self) -> bool
    where
        E: StdError + 'static,
    {
        self.inner.is::<E>()
    }

    /// True if both failures share the same original error allocation.
    pub fn same_origin(&self, other: &DownstreamFailure) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for DownstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownstreamFailure")
            .field("kind", &self.kind)
            .field("inner", &self.inner)
            .finish()
    }
}

impl fmt::Display for DownstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for DownstreamFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// Master error type for a pipeline invocation.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Downstream(#[from] DownstreamFailure),

    #[error("Result codec failed for {operation}: {reason}")]
    Codec { operation: String, reason: String },
}

impl PipelineError {
    /// Failure kind as reported in log records.
    pub fn kind(&self) -> &str {
        match self {
            Self::Access(AccessError::Unauthenticated { .. }) => "Unauthenticated",
            Self::Access(AccessError::Forbidden { .. }) => "Forbidden",
            Self::Downstream(failure) => failure.kind(),
            Self::Codec { .. } => "Codec",
        }
    }

    /// Returns true for access-control denials of either kind.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Access(_))
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Access(AccessError::Unauthenticated { .. }))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Access(AccessError::Forbidden { .. }))
    }

    /// The wrapped operation's failure, if that is what this is.
    pub fn downstream(&self) -> Option<&DownstreamFailure> {
        match self {
            Self::Downstream(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Result type alias for pipeline invocations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Last path segment of a type name, without generic parameters.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// =============================================================================
// TESTS
// =============================================================================
