//! ASPECTRA Pipeline - Cross-Cutting Interception
//!
//! Wraps arbitrary operations with execution logging, TTL result caching
//! and role-based access control, composed explicitly per call:
//!
//! ```text
//! Logging → AccessControl → Caching → target
//! ```
//!
//! Nothing is global. The cache store, identity provider and record sink
//! are constructed by the caller and injected through [`PipelineBuilder`],
//! and every call carries its own [`InvocationContext`] naming the caller.
//!
//! # Example
//!
//! ```
//! use aspectra_core::{InvocationContext, LogLevel, OperationDescriptor};
//! use aspectra_pipeline::{InMemoryIdentityStore, Pipeline};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[derive(Debug, thiserror::Error)]
//! # #[error("ledger offline")]
//! # struct LedgerOffline;
//! # async fn run() -> Result<(), aspectra_core::PipelineError> {
//! let pipeline = Pipeline::builder()
//!     .identity(Arc::new(InMemoryIdentityStore::with_default_users()))
//!     .build()
//!     .expect("default config is valid");
//!
//! let balance = OperationDescriptor::new("balance")
//!     .logged("reading balance", LogLevel::Info)
//!     .cached_for(Duration::from_secs(60))
//!     .requires_roles(["USER"]);
//!
//! let ctx = InvocationContext::builder("balance", "agent:alice")
//!     .caller("user")
//!     .build();
//!
//! let value: f64 = pipeline
//!     .invoke_typed(&balance, &ctx, || async { Ok::<_, LedgerOffline>(250.0) })
//!     .await?;
//! assert_eq!(value, 250.0);
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod caching;
pub mod identity;
pub mod interceptor;
pub mod logging;
pub mod pipeline;
pub mod telemetry;

pub use access::AccessControlInterceptor;
pub use caching::CachingInterceptor;
pub use identity::InMemoryIdentityStore;
pub use interceptor::{Interceptor, Next, Target};
pub use logging::{LogRecord, LoggingInterceptor, MemorySink, RecordSink, TracingSink};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig, TelemetryError};
