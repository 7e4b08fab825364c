//! ASPECTRA Core - Invocation Types
//!
//! Data carried through the interception pipeline: per-call invocation
//! contexts, per-operation descriptors, principals, errors and configuration.
//! All other crates depend on this. No interception logic lives here.

pub mod config;
pub mod constants;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod identity;
pub mod render;

pub use config::{KeyScope, PipelineConfig};
pub use context::{Argument, InvocationContext, InvocationContextBuilder, InvocationId};
pub use descriptor::{CachingSpec, LogLevel, LoggingSpec, OperationDescriptor};
pub use error::{AccessError, ConfigError, DownstreamFailure, PipelineError, PipelineResult};
pub use identity::{
    compute_password_hash, IdentityProvider, PasswordHash, Principal, PrincipalId, Timestamp,
};
pub use render::{render_value, truncate};
