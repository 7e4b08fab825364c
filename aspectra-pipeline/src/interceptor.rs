//! The interceptor abstraction and the continuation it drives.

use aspectra_core::{InvocationContext, OperationDescriptor, PipelineResult};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// The innermost call: the wrapped operation, already bound to its inputs.
///
/// Called at most once per invocation.
pub type Target<'a> = Box<dyn FnOnce() -> BoxFuture<'a, PipelineResult<Value>> + Send + 'a>;

/// A composable unit that runs around an invocation.
///
/// An interceptor may act before and after calling [`Next::run`], or return
/// without calling it to short-circuit the rest of the chain.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Stable stage name used in logs and [`Pipeline::stage_names`].
    ///
    /// [`Pipeline::stage_names`]: crate::Pipeline::stage_names
    fn name(&self) -> &'static str;

    /// Whether this stage participates for `descriptor`.
    ///
    /// Stages that do not apply are skipped entirely; the rest of the chain
    /// keeps its order.
    fn applies(&self, descriptor: &OperationDescriptor) -> bool;

    async fn intercept(
        &self,
        descriptor: &OperationDescriptor,
        ctx: &InvocationContext,
        next: Next<'_>,
    ) -> PipelineResult<Value>;
}

/// The remainder of the chain after the current stage.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Interceptor>],
    target: Target<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stages: &'a [Arc<dyn Interceptor>], target: Target<'a>) -> Self {
        Self { stages, target }
    }

    /// Names of the stages still ahead that apply to `descriptor`.
    pub fn remaining(&self, descriptor: &OperationDescriptor) -> Vec<&'static str> {
        self.stages
            .iter()
            .filter(|stage| stage.applies(descriptor))
            .map(|stage| stage.name())
            .collect()
    }

    /// Continue with the next applicable stage, or the target once none
    /// remain.
    pub async fn run(
        self,
        descriptor: &OperationDescriptor,
        ctx: &InvocationContext,
    ) -> PipelineResult<Value> {
        let Next { mut stages, target } = self;

        while let Some((stage, rest)) = stages.split_first() {
            if stage.applies(descriptor) {
                let next = Next::new(rest, target);
                return stage.intercept(descriptor, ctx, next).await;
            }
            stages = rest;
        }

        target().await
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.stages.iter().map(|stage| stage.name()).collect();
        f.debug_struct("Next").field("stages", &names).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use serde_json::json;
    use std::sync::Mutex;

    /// Appends its name to a shared trail on the way in and out.
    struct Tracer {
        name: &'static str,
        trail: Arc<Mutex<Vec<String>>>,
        applies: bool,
    }

    #[async_trait]
    impl Interceptor for Tracer {
        fn name(&self) -> &'static str {
            self.name
        }

        fn applies(&self, _descriptor: &OperationDescriptor) -> bool {
            self.applies
        }

        async fn intercept(
            &self,
            descriptor: &OperationDescriptor,
            ctx: &InvocationContext,
            next: Next<'_>,
        ) -> PipelineResult<Value> {
            self.trail.lock().unwrap().push(format!("enter {}", self.name));
            let result = next.run(descriptor, ctx).await;
            self.trail.lock().unwrap().push(format!("exit {}", self.name));
            result
        }
    }

    fn tracer(name: &'static str, trail: &Arc<Mutex<Vec<String>>>, applies: bool) -> Arc<dyn Interceptor> {
        Arc::new(Tracer {
            name,
            trail: trail.clone(),
            applies,
        })
    }

    #[tokio::test]
    async fn test_stages_run_outside_in_and_skip_inapplicable() {
        let trail = Arc::new(Mutex::new(Vec::new()));
        let stages = vec![
            tracer("a", &trail, true),
            tracer("b", &trail, false),
            tracer("c", &trail, true),
        ];
        let descriptor = OperationDescriptor::new("op");
        let ctx = InvocationContext::builder("op", "target").build();

        let target_trail = trail.clone();
        let target: Target<'_> = Box::new(move || {
            async move {
                target_trail.lock().unwrap().push("target".to_string());
                Ok(json!(1))
            }
            .boxed()
        });

        let next = Next::new(&stages, target);
        assert_eq!(next.remaining(&descriptor), vec!["a", "c"]);

        let result = next.run(&descriptor, &ctx).await.unwrap();
        assert_eq!(result, json!(1));
        assert_eq!(
            *trail.lock().unwrap(),
            vec!["enter a", "enter c", "target", "exit c", "exit a"]
        );
    }

    #[tokio::test]
    async fn test_empty_chain_calls_target() {
        let descriptor = OperationDescriptor::new("op");
        let ctx = InvocationContext::builder("op", "target").build();
        let target: Target<'_> = Box::new(|| async { Ok(json!("direct")) }.boxed());

        let result = Next::new(&[], target).run(&descriptor, &ctx).await.unwrap();
        assert_eq!(result, json!("direct"));
    }
}
