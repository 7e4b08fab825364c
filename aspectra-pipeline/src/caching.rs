//! Result caching stage.

use crate::interceptor::{Interceptor, Next};
use aspectra_cache::{CacheKey, CacheLookup, CacheStore};
use aspectra_core::{InvocationContext, KeyScope, OperationDescriptor, PipelineResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Serves live cached results and stores fresh non-null ones.
///
/// Sits inside access control, so only granted calls read or populate the
/// store. A failing call propagates its error and stores nothing.
#[derive(Debug)]
pub struct CachingInterceptor {
    store: Arc<CacheStore>,
    key_scope: KeyScope,
}

impl CachingInterceptor {
    pub fn new(store: Arc<CacheStore>, key_scope: KeyScope) -> Self {
        Self { store, key_scope }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn key_scope(&self) -> KeyScope {
        self.key_scope
    }
}

#[async_trait]
impl Interceptor for CachingInterceptor {
    fn name(&self) -> &'static str {
        "caching"
    }

    fn applies(&self, descriptor: &OperationDescriptor) -> bool {
        descriptor.caching().is_some()
    }

    async fn intercept(
        &self,
        descriptor: &OperationDescriptor,
        ctx: &InvocationContext,
        next: Next<'_>,
    ) -> PipelineResult<Value> {
        let Some(spec) = descriptor.caching() else {
            return next.run(descriptor, ctx).await;
        };

        let key = CacheKey::for_invocation(ctx, spec, self.key_scope);
        match self.store.get(&key) {
            CacheLookup::Hit(entry) => {
                tracing::debug!(
                    invocation_id = %ctx.invocation_id(),
                    cache_key = %key,
                    created_at = %entry.created_at(),
                    remaining_ttl_secs = entry.remaining_ttl(self.store.now()).as_secs(),
                    "Cache HIT"
                );
                return Ok(entry.to_value());
            }
            CacheLookup::Expired(entry) => {
                tracing::debug!(
                    invocation_id = %ctx.invocation_id(),
                    cache_key = %key,
                    expired_at = %entry.expires_at(),
                    "Cache EXPIRED"
                );
            }
            CacheLookup::Miss => {
                tracing::debug!(
                    invocation_id = %ctx.invocation_id(),
                    cache_key = %key,
                    "Cache MISS"
                );
            }
        }

        let value = next.run(descriptor, ctx).await?;

        if value.is_null() {
            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                cache_key = %key,
                "Null result not cached"
            );
        } else {
            self.store.put(key.clone(), value.clone(), spec.ttl);
            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                cache_key = %key,
                ttl_secs = spec.ttl.as_secs(),
                "Cache STORE"
            );
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::Target;
    use aspectra_cache::ManualClock;
    use aspectra_core::{DownstreamFailure, PipelineError};
    use futures_util::FutureExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("ledger unavailable")]
    struct LedgerDown;

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<CacheStore>,
        stage: Arc<dyn Interceptor>,
        calls: Arc<AtomicUsize>,
    }

    impl Fixture {
        fn new(scope: KeyScope) -> Self {
            let clock = Arc::new(ManualClock::new());
            let store = Arc::new(CacheStore::with_clock(clock.clone()));
            let stage: Arc<dyn Interceptor> = Arc::new(CachingInterceptor::new(store.clone(), scope));
            Self {
                clock,
                store,
                stage,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn counting<'a>(&self, value: Value) -> Target<'a> {
            let calls = self.calls.clone();
            Box::new(move || {
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(value)
                }
                .boxed()
            })
        }

        async fn call<'a>(
            &'a self,
            descriptor: &OperationDescriptor,
            ctx: &InvocationContext,
            target: Target<'a>,
        ) -> PipelineResult<Value> {
            Next::new(std::slice::from_ref(&self.stage), target)
                .run(descriptor, ctx)
                .await
        }
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_served_from_cache() {
        let fx = Fixture::new(KeyScope::PerCaller);
        let descriptor = OperationDescriptor::new("balance").cached_for(Duration::from_secs(60));
        let ctx = InvocationContext::builder("balance", "agent:a").arg(5).caller("admin").build();

        let first = fx.call(&descriptor, &ctx, fx.counting(json!(100))).await.unwrap();
        let second = fx.call(&descriptor, &ctx, fx.counting(json!(999))).await.unwrap();

        assert_eq!(first, json!(100));
        assert_eq!(second, json!(100));
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.store.size(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_reinvokes_target() {
        let fx = Fixture::new(KeyScope::PerCaller);
        let descriptor = OperationDescriptor::new("balance").cached_for(Duration::from_secs(60));
        let ctx = InvocationContext::builder("balance", "agent:a").build();

        fx.call(&descriptor, &ctx, fx.counting(json!(1))).await.unwrap();
        fx.clock.advance(Duration::from_secs(61));
        let refreshed = fx.call(&descriptor, &ctx, fx.counting(json!(2))).await.unwrap();

        assert_eq!(refreshed, json!(2));
        assert_eq!(fx.calls.load(Ordering::SeqCst), 2);
        assert_eq!(fx.store.get(&CacheKey::derived("balance", "agent:a", vec![])).hit().map(|e| e.to_value()), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_failure_leaves_no_entry() {
        let fx = Fixture::new(KeyScope::Shared);
        let descriptor = OperationDescriptor::new("balance").cached();
        let ctx = InvocationContext::builder("balance", "agent:a").build();

        let err = fx
            .call(
                &descriptor,
                &ctx,
                Box::new(|| async { Err(PipelineError::from(DownstreamFailure::new(LedgerDown))) }.boxed()),
            )
            .await
            .unwrap_err();

        assert!(err.downstream().is_some_and(|f| f.is::<LedgerDown>()));
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_null_result_is_not_cached() {
        let fx = Fixture::new(KeyScope::Shared);
        let descriptor = OperationDescriptor::new("notify").cached();
        let ctx = InvocationContext::builder("notify", "bus").build();

        fx.call(&descriptor, &ctx, fx.counting(Value::Null)).await.unwrap();
        fx.call(&descriptor, &ctx, fx.counting(Value::Null)).await.unwrap();

        assert!(fx.store.is_empty());
        assert_eq!(fx.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_per_caller_scope_isolates_results() {
        let fx = Fixture::new(KeyScope::PerCaller);
        let descriptor = OperationDescriptor::new("top").cached_as("k", Duration::from_secs(60));
        let admin = InvocationContext::builder("top", "ledger").caller("admin").build();
        let manager = InvocationContext::builder("top", "ledger").caller("manager").build();

        let a = fx.call(&descriptor, &admin, fx.counting(json!("admin view"))).await.unwrap();
        let m = fx.call(&descriptor, &manager, fx.counting(json!("manager view"))).await.unwrap();

        assert_eq!(a, json!("admin view"));
        assert_eq!(m, json!("manager view"));
        assert_eq!(fx.store.size(), 2);
    }

    #[tokio::test]
    async fn test_shared_scope_serves_across_callers() {
        let fx = Fixture::new(KeyScope::Shared);
        let descriptor = OperationDescriptor::new("top").cached_as("k", Duration::from_secs(60));
        let admin = InvocationContext::builder("top", "ledger").caller("admin").build();
        let manager = InvocationContext::builder("top", "ledger").caller("manager").build();

        fx.call(&descriptor, &admin, fx.counting(json!("first"))).await.unwrap();
        let m = fx.call(&descriptor, &manager, fx.counting(json!("second"))).await.unwrap();

        assert_eq!(m, json!("first"));
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
        assert!(fx.store.contains(&CacheKey::explicit("k")));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hit_event_reports_entry_age() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let fx = Fixture::new(KeyScope::Shared);
        let descriptor = OperationDescriptor::new("balance").cached_for(Duration::from_secs(60));
        let ctx = InvocationContext::builder("balance", "agent:a").build();

        fx.call(&descriptor, &ctx, fx.counting(json!(1))).await.unwrap();
        fx.clock.advance(Duration::from_secs(20));
        fx.call(&descriptor, &ctx, fx.counting(json!(2))).await.unwrap();

        let out = logs.contents();
        let hit = out
            .lines()
            .find(|line| line.contains("Cache HIT"))
            .expect("hit event emitted");
        assert!(hit.contains("created_at=2024-01-01 00:00:00 UTC"));
        assert!(hit.contains("remaining_ttl_secs=40"));
    }

    #[test]
    fn test_applies_only_to_cached_descriptors() {
        let stage = CachingInterceptor::new(Arc::new(CacheStore::new()), KeyScope::default());
        assert!(!stage.applies(&OperationDescriptor::new("plain")));
        assert!(stage.applies(&OperationDescriptor::new("cached").cached()));
        assert_eq!(stage.key_scope(), KeyScope::PerCaller);
    }
}
