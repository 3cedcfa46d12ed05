//! The pipeline runner.

use std::future::Future;
use std::sync::Arc;

use codewright_core::error::PipelineError;
use tracing::{debug, warn};

use crate::context::PipelineContext;
use crate::hooks::{Hook, HookEvent, HookPayload};
use crate::middleware::Middleware;
use crate::processor::{Processor, ProcessorOutput};

/// The result of one [`Pipeline::execute`].
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Input as it left the middleware chain.
    pub input: String,
    /// Output of the first processor that claimed the input, if any.
    pub output: Option<ProcessorOutput>,
    pub context: PipelineContext,
}

impl PipelineRun {
    /// The winning processor's text, or the processed input.
    pub fn text(&self) -> &str {
        self.output
            .as_ref()
            .map_or(self.input.as_str(), |o| o.text.as_str())
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    session_id: Option<String>,
    middleware: Vec<Arc<dyn Middleware>>,
    processors: Vec<Arc<dyn Processor>>,
    hooks: Vec<(HookEvent, Arc<dyn Hook>)>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the session id stamped on every run. Without one, each pipeline
    /// gets a generated `session_<uuid>` id at build time.
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn processor(mut self, processor: impl Processor + 'static) -> Self {
        self.processors.push(Arc::new(processor));
        self
    }

    /// Register an already shared processor, e.g. one the caller keeps a
    /// handle to for inspection.
    pub fn shared_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn hook(mut self, event: HookEvent, hook: impl Hook + 'static) -> Self {
        self.hooks.push((event, Arc::new(hook)));
        self
    }

    pub fn build(self) -> Pipeline {
        let session_id = self
            .session_id
            .unwrap_or_else(|| format!("session_{}", uuid::Uuid::new_v4().simple()));
        Pipeline {
            session_id,
            middleware: self.middleware,
            processors: self.processors,
            hooks: self.hooks,
        }
    }
}

/// Middleware, processors and hooks, fixed at build time.
///
/// A run goes `BeforeProcess` hooks → middleware (in order) → processors
/// (first output wins) → `AfterProcess` hooks. A middleware or processor
/// failure fires the `OnError` hooks and is then returned as-is; a failing
/// hook is returned directly.
#[derive(Clone)]
pub struct Pipeline {
    session_id: String,
    middleware: Vec<Arc<dyn Middleware>>,
    processors: Vec<Arc<dyn Processor>>,
    hooks: Vec<(HookEvent, Arc<dyn Hook>)>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("session_id", &self.session_id)
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field(
                "processors",
                &self.processors.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn execute(&self, input: &str) -> Result<PipelineRun, PipelineError> {
        self.execute_with(input, |_| async { Ok(()) })
            .await
            .map(|(run, ())| run)
    }

    /// Run the pipeline around a downstream component.
    ///
    /// `downstream` receives the processed input after the processors ran
    /// and before `AfterProcess` fires. Its failure is treated like a
    /// processor failure.
    pub async fn execute_with<T, F, Fut>(
        &self,
        input: &str,
        downstream: F,
    ) -> Result<(PipelineRun, T), PipelineError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut ctx = PipelineContext::new(self.session_id.clone());

        self.fire(HookEvent::BeforeProcess, input, None, None, &ctx)
            .await?;

        let mut processed = input.to_string();
        let result = async {
            processed = self.run_middleware(processed.clone(), &mut ctx).await?;
            let output = self.run_processors(&processed, &mut ctx).await?;
            let value = downstream(processed.clone()).await?;
            Ok::<_, PipelineError>((output, value))
        }
        .await;

        let (output, value) = match result {
            Ok(done) => done,
            Err(error) => {
                warn!(session = %ctx.session_id, error = %error, "Pipeline failed");
                self.fire(HookEvent::OnError, &processed, None, Some(&error), &ctx)
                    .await?;
                return Err(error);
            }
        };

        self.fire(
            HookEvent::AfterProcess,
            &processed,
            output.as_ref(),
            None,
            &ctx,
        )
        .await?;

        Ok((
            PipelineRun {
                input: processed,
                output,
                context: ctx,
            },
            value,
        ))
    }

    async fn run_middleware(
        &self,
        mut input: String,
        ctx: &mut PipelineContext,
    ) -> Result<String, PipelineError> {
        for middleware in &self.middleware {
            debug!(middleware = middleware.name(), "Applying middleware");
            input = middleware.handle(input, ctx).await?;
        }
        Ok(input)
    }

    async fn run_processors(
        &self,
        input: &str,
        ctx: &mut PipelineContext,
    ) -> Result<Option<ProcessorOutput>, PipelineError> {
        for processor in &self.processors {
            if !processor.can_handle(input, ctx) {
                continue;
            }
            debug!(processor = processor.name(), "Running processor");
            match processor.process(input, ctx).await? {
                Some(output) if !output.is_empty() => {
                    debug!(processor = processor.name(), "Processor claimed input");
                    return Ok(Some(output));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    async fn fire(
        &self,
        event: HookEvent,
        input: &str,
        output: Option<&ProcessorOutput>,
        error: Option<&PipelineError>,
        ctx: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let payload = HookPayload {
            event,
            input,
            output,
            error,
            context: ctx,
        };
        for (_, hook) in self.hooks.iter().filter(|(e, _)| *e == event) {
            hook.call(&payload).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::hooks::hook_fn;
    use crate::middleware::{MinLengthMiddleware, TrimMiddleware, middleware_fn};

    /// Claims every input and counts how often it ran.
    struct Claiming {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Processor for Claiming {
        fn name(&self) -> &str {
            self.name
        }

        async fn process(
            &self,
            input: &str,
            _ctx: &mut PipelineContext,
        ) -> Result<Option<ProcessorOutput>, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(ProcessorOutput::text(self.name, input.to_uppercase())))
        }
    }

    struct Failing;

    #[async_trait]
    impl Processor for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn process(
            &self,
            _input: &str,
            _ctx: &mut PipelineContext,
        ) -> Result<Option<ProcessorOutput>, PipelineError> {
            Err(PipelineError::Processor {
                name: "failing".into(),
                message: "boom".into(),
            })
        }
    }

    struct Declining;

    #[async_trait]
    impl Processor for Declining {
        fn name(&self) -> &str {
            "declining"
        }

        fn can_handle(&self, _input: &str, _ctx: &PipelineContext) -> bool {
            false
        }

        async fn process(
            &self,
            _input: &str,
            _ctx: &mut PipelineContext,
        ) -> Result<Option<ProcessorOutput>, PipelineError> {
            panic!("process called although can_handle is false");
        }
    }

    /// Runs but produces nothing.
    struct Silent {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Processor for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn process(
            &self,
            _input: &str,
            _ctx: &mut PipelineContext,
        ) -> Result<Option<ProcessorOutput>, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(ProcessorOutput::text("silent", "")))
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> impl Hook + 'static {
        let log = Arc::clone(log);
        hook_fn(move |payload: &HookPayload<'_>| {
            log.lock().unwrap().push(format!("{tag}:{}", payload.input));
            Ok(())
        })
    }

    #[tokio::test]
    async fn middleware_runs_in_registration_order() {
        let pipeline = Pipeline::builder()
            .middleware(middleware_fn("first", |input: String, _ctx: &mut PipelineContext| {
                Ok(format!("{input}-m1"))
            }))
            .middleware(middleware_fn("second", |input: String, _ctx: &mut PipelineContext| {
                assert!(input.ends_with("-m1"));
                Ok(format!("{input}-m2"))
            }))
            .build();

        let run = pipeline.execute("x").await.unwrap();
        assert_eq!(run.input, "x-m1-m2");
        assert!(run.output.is_none());
        assert_eq!(run.text(), "x-m1-m2");
    }

    #[tokio::test]
    async fn first_claiming_processor_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .processor(Declining)
            .processor(Claiming { name: "first", calls: Arc::clone(&first) })
            .processor(Claiming { name: "second", calls: Arc::clone(&second) })
            .build();

        let run = pipeline.execute("hello").await.unwrap();
        let output = run.output.unwrap();
        assert_eq!(output.processor, "first");
        assert_eq!(output.text, "HELLO");
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_output_does_not_claim_the_input() {
        let silent = Arc::new(AtomicUsize::new(0));
        let real = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .processor(Silent { calls: Arc::clone(&silent) })
            .processor(Claiming { name: "real", calls: Arc::clone(&real) })
            .build();

        let run = pipeline.execute("hello").await.unwrap();
        let output = run.output.unwrap();
        assert_eq!(output.processor, "real");
        assert_eq!(output.text, "HELLO");
        assert_eq!(silent.load(Ordering::SeqCst), 1);
        assert_eq!(real.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_output_alone_leaves_the_input_unclaimed() {
        let pipeline = Pipeline::builder()
            .processor(Silent { calls: Arc::new(AtomicUsize::new(0)) })
            .build();

        let run = pipeline.execute("hello").await.unwrap();
        assert!(run.output.is_none());
        assert_eq!(run.text(), "hello");
    }

    #[tokio::test]
    async fn hooks_fire_around_a_successful_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .middleware(TrimMiddleware)
            .hook(HookEvent::BeforeProcess, recorder(&log, "before"))
            .hook(HookEvent::AfterProcess, recorder(&log, "after"))
            .hook(HookEvent::OnError, recorder(&log, "error"))
            .build();

        pipeline.execute("  hi  ").await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["before:  hi  ", "after:hi"]);
    }

    #[tokio::test]
    async fn rejection_fires_on_error_and_skips_after() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let later = Arc::new(AtomicUsize::new(0));
        let later_hits = Arc::clone(&later);
        let pipeline = Pipeline::builder()
            .middleware(MinLengthMiddleware::new(1))
            .middleware(middleware_fn("never", move |input: String, _ctx: &mut PipelineContext| {
                later_hits.fetch_add(1, Ordering::SeqCst);
                Ok(input)
            }))
            .hook(HookEvent::AfterProcess, recorder(&log, "after"))
            .hook(HookEvent::OnError, recorder(&log, "error"))
            .build();

        let err = pipeline.execute("   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::Rejected(_)));
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert_eq!(*log.lock().unwrap(), vec!["error:   "]);
    }

    #[tokio::test]
    async fn processor_failure_is_returned_after_on_error() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_hook = Arc::clone(&seen);
        let pipeline = Pipeline::builder()
            .processor(Failing)
            .hook(
                HookEvent::OnError,
                hook_fn(move |payload: &HookPayload<'_>| {
                    *seen_in_hook.lock().unwrap() = payload.error.cloned();
                    Ok(())
                }),
            )
            .build();

        let err = pipeline.execute("x").await.unwrap_err();
        assert_eq!(err.to_string(), "processor 'failing' failed: boom");
        assert_eq!(seen.lock().unwrap().as_ref(), Some(&err));
    }

    #[tokio::test]
    async fn failing_hook_propagates() {
        let pipeline = Pipeline::builder()
            .hook(
                HookEvent::BeforeProcess,
                hook_fn(|payload: &HookPayload<'_>| {
                    Err(PipelineError::Hook {
                        event: payload.event.to_string(),
                        message: "nope".into(),
                    })
                }),
            )
            .build();

        let err = pipeline.execute("x").await.unwrap_err();
        assert_eq!(err.to_string(), "hook 'before_process' failed: nope");
    }

    #[tokio::test]
    async fn downstream_failure_fires_on_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .hook(HookEvent::OnError, recorder(&log, "error"))
            .hook(HookEvent::AfterProcess, recorder(&log, "after"))
            .build();

        let result: Result<(PipelineRun, ()), _> = pipeline
            .execute_with("ask", |_| async {
                Err(PipelineError::Downstream("model offline".into()))
            })
            .await;
        assert_eq!(result.unwrap_err().to_string(), "model offline");
        assert_eq!(*log.lock().unwrap(), vec!["error:ask"]);
    }

    #[tokio::test]
    async fn downstream_sees_processed_input() {
        let pipeline = Pipeline::builder().middleware(TrimMiddleware).build();
        let (run, echoed) = pipeline
            .execute_with(" ping ", |text| async move { Ok(format!("{text}!")) })
            .await
            .unwrap();
        assert_eq!(echoed, "ping!");
        assert_eq!(run.input, "ping");
    }

    #[tokio::test]
    async fn session_id_is_stable_per_pipeline() {
        let pipeline = Pipeline::builder().build();
        assert!(pipeline.session_id().starts_with("session_"));
        let a = pipeline.execute("a").await.unwrap();
        let b = pipeline.execute("b").await.unwrap();
        assert_eq!(a.context.session_id, b.context.session_id);

        let fixed = Pipeline::builder().session_id("fixed").build();
        assert_eq!(fixed.execute("c").await.unwrap().context.session_id, "fixed");
    }
}
