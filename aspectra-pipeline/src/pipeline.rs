//! The composer: wraps a target in the interceptor chain.
//!
//! Stage order, outermost first:
//!
//! ```text
//! logging → access_control → caching → target
//! ```
//!
//! Logging sees every outcome with true elapsed time; denials never reach the
//! cache; only granted calls read or populate it. A stage whose concern is
//! disabled for the descriptor is skipped and the rest keep their order.

use crate::access::AccessControlInterceptor;
use crate::caching::CachingInterceptor;
use crate::identity::InMemoryIdentityStore;
use crate::interceptor::{Interceptor, Next, Target};
use crate::logging::{LoggingInterceptor, RecordSink, TracingSink};
use aspectra_cache::{CacheStore, ExpirySweeper, SweeperHandle};
use aspectra_core::{
    ConfigError, DownstreamFailure, IdentityProvider, InvocationContext, OperationDescriptor,
    PipelineConfig, PipelineError, PipelineResult,
};
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

/// An explicitly constructed interception pipeline.
///
/// Holds no per-call state; share one instance (behind an `Arc` if needed)
/// across all concurrent invocations.
pub struct Pipeline {
    stages: Vec<Arc<dyn Interceptor>>,
    cache: Arc<CacheStore>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Pipeline with the standard stages and default settings.
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        let config = PipelineConfig::default();
        let cache = Arc::new(CacheStore::new());
        let stages = standard_stages(&config, cache.clone(), identity, Arc::new(TracingSink));
        Self {
            stages,
            cache,
            config,
        }
    }

    /// Pipeline over an explicit stage list, applied in the given order.
    ///
    /// `cache` is only what [`cache`](Self::cache) hands back; stages that
    /// cache must already hold their own store.
    pub fn from_stages(
        stages: Vec<Arc<dyn Interceptor>>,
        cache: Arc<CacheStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            stages,
            cache,
            config,
        }
    }

    /// Stage names, outermost first.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Stages that would run for `descriptor`, outermost first.
    pub fn active_stages(&self, descriptor: &OperationDescriptor) -> Vec<&'static str> {
        self.stages
            .iter()
            .filter(|stage| stage.applies(descriptor))
            .map(|stage| stage.name())
            .collect()
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `target` through the chain.
    ///
    /// The target runs at most once and not at all when a stage
    /// short-circuits (denial or cache hit). Its error comes back unchanged.
    pub async fn invoke<F, Fut>(
        &self,
        descriptor: &OperationDescriptor,
        ctx: &InvocationContext,
        target: F,
    ) -> PipelineResult<Value>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = PipelineResult<Value>> + Send,
    {
        let target: Target<'_> = Box::new(move || target().boxed());
        Next::new(&self.stages, target).run(descriptor, ctx).await
    }

    /// Run a typed operation through the chain.
    ///
    /// The result crosses the chain as JSON and is decoded back, so a cached
    /// result comes back as the same type and value as a fresh one. An `Err`
    /// from the target becomes [`PipelineError::Downstream`] and can be
    /// recovered with [`DownstreamFailure::downcast_ref`].
    pub async fn invoke_typed<T, E, F, Fut>(
        &self,
        descriptor: &OperationDescriptor,
        ctx: &InvocationContext,
        target: F,
    ) -> PipelineResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        E: StdError + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        let encode_op = ctx.operation().to_string();
        let value = self
            .invoke(descriptor, ctx, move || async move {
                let typed = target().await.map_err(DownstreamFailure::new)?;
                serde_json::to_value(typed).map_err(|e| PipelineError::Codec {
                    operation: encode_op,
                    reason: e.to_string(),
                })
            })
            .await?;

        serde_json::from_value(value).map_err(|e| PipelineError::Codec {
            operation: ctx.operation().to_string(),
            reason: e.to_string(),
        })
    }

    /// Start the background expiry sweep if `sweep_interval` is configured.
    ///
    /// Must be called from within a tokio runtime. The sweep runs until
    /// [`SweeperHandle::shutdown`]; dropping the handle leaves it running.
    pub fn start_sweeper(&self) -> Option<SweeperHandle> {
        self.config.sweep_interval.map(|every| {
            ExpirySweeper::new(self.cache.clone())
                .with_interval(every)
                .spawn()
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

fn standard_stages(
    config: &PipelineConfig,
    cache: Arc<CacheStore>,
    identity: Arc<dyn IdentityProvider>,
    sink: Arc<dyn RecordSink>,
) -> Vec<Arc<dyn Interceptor>> {
    vec![
        Arc::new(LoggingInterceptor::new(sink.clone(), config)),
        Arc::new(AccessControlInterceptor::new(identity, sink)),
        Arc::new(CachingInterceptor::new(cache, config.key_scope)),
    ]
}

/// Wires the standard pipeline from injected collaborators.
///
/// Unset parts default to: a fresh [`CacheStore`] on the system clock, an
/// empty [`InMemoryIdentityStore`] (so every restricted call is refused), a
/// [`TracingSink`] and [`PipelineConfig::default`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    cache: Option<Arc<CacheStore>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    sink: Option<Arc<dyn RecordSink>>,
}

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the configuration and assemble the pipeline.
    pub fn build(self) -> Result<Pipeline, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let cache = self.cache.unwrap_or_else(|| Arc::new(CacheStore::new()));
        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(InMemoryIdentityStore::new()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));

        let stages = standard_stages(&config, cache.clone(), identity, sink);
        tracing::debug!(
            key_scope = %config.key_scope,
            sweep_interval = ?config.sweep_interval,
            "Pipeline assembled"
        );

        Ok(Pipeline {
            stages,
            cache,
            config,
        })
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("identity", &self.identity.is_some())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
