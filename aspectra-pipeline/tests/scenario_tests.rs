//! End-to-end scenarios through the full standard chain.

use aspectra_cache::{CacheKey, CacheLookup};
use aspectra_core::{InvocationContext, KeyScope, LogLevel, OperationDescriptor, PipelineConfig};
use aspectra_pipeline::{InMemoryIdentityStore, LogRecord, MemorySink, Pipeline};
use aspectra_test_utils::fixtures::manual_cache;
use aspectra_test_utils::{CountingTarget, FailingTarget};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("agent {0} not found")]
struct AgentNotFound(String);

fn admin_only_report() -> OperationDescriptor {
    OperationDescriptor::new("report")
        .logged("building report", LogLevel::Info)
        .cached_as("k", Duration::from_secs(60))
        .requires_roles(["ADMIN"])
}

fn report_call(caller: &str) -> InvocationContext {
    InvocationContext::builder("report", "agents")
        .named_arg("x", 5)
        .caller(caller)
        .build()
}

#[tokio::test]
async fn admin_report_is_stored_under_explicit_key_then_served_from_cache() {
    let (cache, clock) = manual_cache();
    let sink = Arc::new(MemorySink::new());
    let pipeline = Pipeline::builder()
        .cache(cache.clone())
        .identity(Arc::new(InMemoryIdentityStore::with_default_users()))
        .sink(sink.clone())
        .config(PipelineConfig::default().with_key_scope(KeyScope::Shared))
        .build()
        .unwrap();
    let descriptor = admin_only_report();
    let target = CountingTarget::new(42);

    let first = pipeline
        .invoke(&descriptor, &report_call("admin"), || target.call())
        .await
        .unwrap();
    assert_eq!(first, serde_json::json!(42));
    assert_eq!(target.calls(), 1);

    let key = CacheKey::explicit("k");
    match cache.get(&key) {
        CacheLookup::Hit(entry) => {
            assert_eq!(entry.value(), &serde_json::json!(42));
            assert_eq!(entry.ttl(), Duration::from_secs(60));
        }
        other => panic!("expected a stored entry, got {other:?}"),
    }

    clock.advance(Duration::from_secs(30));
    let second = pipeline
        .invoke(&descriptor, &report_call("admin"), || target.call())
        .await
        .unwrap();
    assert_eq!(second, serde_json::json!(42));
    assert_eq!(target.calls(), 1);

    let stats = cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(sink.len(), 4);
}

#[tokio::test]
async fn user_is_refused_admin_report_without_touching_cache() {
    let (cache, _clock) = manual_cache();
    let sink = Arc::new(MemorySink::new());
    let pipeline = Pipeline::builder()
        .cache(cache.clone())
        .identity(Arc::new(InMemoryIdentityStore::with_default_users()))
        .sink(sink.clone())
        .config(PipelineConfig::default().with_key_scope(KeyScope::Shared))
        .build()
        .unwrap();
    let target = CountingTarget::new(42);
    let ctx = report_call("user");

    let err = pipeline
        .invoke(&admin_only_report(), &ctx, || target.call())
        .await
        .unwrap_err();

    assert!(err.is_forbidden());
    assert_eq!(target.calls(), 0);
    assert!(cache.is_empty());
    assert_eq!(cache.stats().misses, 0);

    let records = sink.records_for(ctx.invocation_id());
    assert!(records
        .iter()
        .any(|r| matches!(r, LogRecord::Denied { kind, .. } if kind == "Forbidden")));
}

#[tokio::test]
async fn logged_failure_reports_duration_and_keeps_error() {
    let sink = Arc::new(MemorySink::new());
    let pipeline = Pipeline::builder().sink(sink.clone()).build().unwrap();
    let descriptor = OperationDescriptor::new("find_agent").logged("", LogLevel::Info);
    let ctx = InvocationContext::builder("find_agent", "registry")
        .arg("agent-7")
        .build();
    let target = FailingTarget::new(AgentNotFound("agent-7".to_string()));

    let err = pipeline
        .invoke(&descriptor, &ctx, || target.call())
        .await
        .unwrap_err();

    let failure = err.downstream().expect("downstream failure");
    assert!(failure.same_origin(target.failure()));
    assert_eq!(
        failure.downcast_ref::<AgentNotFound>().map(|e| e.0.as_str()),
        Some("agent-7")
    );

    let records = sink.records_for(ctx.invocation_id());
    assert_eq!(records.len(), 2);
    match &records[1] {
        LogRecord::Failure {
            duration_ms,
            kind,
            message,
            ..
        } => {
            assert!(*duration_ms >= 0.0);
            assert_eq!(kind, "AgentNotFound");
            assert_eq!(message, "agent agent-7 not found");
        }
        other => panic!("expected failure record, got {other:?}"),
    }
}
