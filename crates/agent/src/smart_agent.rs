//! A [`CodingAgent`] wrapped in the request pipeline.
//!
//! Input is trimmed, validated, enriched and logged before the agent sees
//! it; the reply has its code blocks extracted (and optionally saved) and is
//! formatted for the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use codewright_config::PipelineConfig;
use codewright_core::error::PipelineError;
use codewright_core::session::{Resource, SessionStore};
use codewright_core::transport::Usage;
use codewright_pipeline::{
    CodeBlock, CodeExtractionProcessor, ContextEnrichmentProcessor, Hook, HookEvent,
    LoggingProcessor, Middleware, MinLengthMiddleware, Pipeline, PipelineBuilder,
    PipelineContext, Processor, RequestLogEntry, ResponseFormattingProcessor, SavedFile,
    TrimMiddleware,
};
use serde::Serialize;
use tracing::debug;

use crate::coding_agent::{AgentReply, ChatOptions, CodingAgent};

#[derive(Debug, Clone, Serialize)]
pub struct SmartResponse {
    /// The reply, formatted when formatting is enabled.
    pub message: String,
    pub code_blocks: Vec<CodeBlock>,
    /// Files written by auto-save.
    pub files: Vec<SavedFile>,
    pub usage: Usage,
    pub context: PipelineContext,
    pub reply: AgentReply,
}

pub struct SmartAgentBuilder {
    agent: CodingAgent,
    pipeline: PipelineBuilder,
    processors: Vec<Arc<dyn Processor>>,
    enrichment: ContextEnrichmentProcessor,
    config: PipelineConfig,
    sessions: Option<Arc<dyn SessionStore>>,
}

impl SmartAgentBuilder {
    /// Extra middleware, run after trimming and length validation.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.pipeline = self.pipeline.middleware(middleware);
        self
    }

    /// Extra processor, offered the input after enrichment and logging.
    pub fn processor(mut self, processor: impl Processor + 'static) -> Self {
        self.processors.push(Arc::new(processor));
        self
    }

    pub fn hook(mut self, event: HookEvent, hook: impl Hook + 'static) -> Self {
        self.pipeline = self.pipeline.hook(event, hook);
        self
    }

    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.pipeline = self.pipeline.session_id(id);
        self
    }

    /// Name stamped into the context as `user`.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.enrichment = self.enrichment.with_user(user);
        self
    }

    /// Attach extracted code blocks to this store as session resources.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    pub fn build(self) -> SmartAgent {
        let mut pipeline = self.pipeline.shared_processor(Arc::new(self.enrichment));

        let logger = self.config.enable_logging.then(|| {
            let mut logger = LoggingProcessor::new();
            if let Some(path) = &self.config.log_file {
                logger = logger.with_log_file(path);
            }
            Arc::new(logger)
        });
        if let Some(logger) = &logger {
            pipeline = pipeline.shared_processor(Arc::clone(logger) as Arc<dyn Processor>);
        }
        for processor in self.processors {
            pipeline = pipeline.shared_processor(processor);
        }

        let mut extractor = CodeExtractionProcessor::new();
        if self.config.auto_save_code {
            extractor = extractor.with_auto_save(&self.config.output_dir);
        }
        let formatter = self
            .config
            .enable_formatting
            .then(|| ResponseFormattingProcessor::new().with_colors(self.config.colors));

        SmartAgent {
            agent: self.agent,
            pipeline: pipeline.build(),
            extractor,
            formatter,
            logger,
            sessions: self.sessions,
        }
    }
}

pub struct SmartAgent {
    agent: CodingAgent,
    pipeline: Pipeline,
    extractor: CodeExtractionProcessor,
    formatter: Option<ResponseFormattingProcessor>,
    logger: Option<Arc<LoggingProcessor>>,
    sessions: Option<Arc<dyn SessionStore>>,
}

impl SmartAgent {
    pub fn builder(
        agent: CodingAgent,
        config: &PipelineConfig,
        working_dir: impl Into<PathBuf>,
    ) -> SmartAgentBuilder {
        let pipeline = Pipeline::builder()
            .middleware(TrimMiddleware)
            .middleware(MinLengthMiddleware::new(config.min_input_len));
        SmartAgentBuilder {
            agent,
            pipeline,
            processors: Vec::new(),
            enrichment: ContextEnrichmentProcessor::new(working_dir),
            config: config.clone(),
            sessions: None,
        }
    }

    pub fn agent(&self) -> &CodingAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut CodingAgent {
        &mut self.agent
    }

    pub fn session_id(&self) -> &str {
        self.pipeline.session_id()
    }

    /// Most recent request log entries; empty when logging is disabled.
    pub fn request_logs(&self, limit: usize) -> Vec<RequestLogEntry> {
        self.logger
            .as_ref()
            .map(|logger| logger.logs(limit))
            .unwrap_or_default()
    }

    pub async fn execute(&mut self, input: &str) -> Result<SmartResponse, codewright_core::Error> {
        let agent = &mut self.agent;
        let mut failure: Option<codewright_core::Error> = None;
        let slot = &mut failure;

        let result = self
            .pipeline
            .execute_with(input, |text| async move {
                match agent.chat(&text, ChatOptions::default()).await {
                    Ok(reply) => Ok(reply),
                    Err(e) => {
                        let message = e.to_string();
                        *slot = Some(e);
                        Err(PipelineError::Downstream(message))
                    }
                }
            })
            .await;

        let (run, reply) = match result {
            Ok(done) => done,
            // The agent's own error is more useful than its pipeline wrapper.
            Err(PipelineError::Downstream(_)) if failure.is_some() => {
                return Err(failure.unwrap_or_else(|| {
                    codewright_core::Error::Internal("agent failure was not captured".into())
                }));
            }
            Err(e) => return Err(e.into()),
        };

        let extraction = self.extractor.extract(&reply.message).await?;
        if extraction.has_code() {
            self.attach_code(&extraction.code_blocks).await?;
        }

        let message = match &self.formatter {
            Some(formatter) => formatter.format(&extraction),
            None => reply.message.clone(),
        };

        Ok(SmartResponse {
            message,
            code_blocks: extraction.code_blocks,
            files: extraction.files,
            usage: reply.usage,
            context: run.context,
            reply,
        })
    }

    async fn attach_code(&self, blocks: &[CodeBlock]) -> Result<(), codewright_core::Error> {
        let Some(store) = &self.sessions else {
            return Ok(());
        };

        let session_id = self.pipeline.session_id();
        if store.get_session(session_id).await.is_none() {
            let mut metadata = serde_json::Map::new();
            metadata.insert("source".into(), serde_json::json!("smart_agent"));
            store.create_session(session_id, metadata).await?;
        }

        for block in blocks {
            let resource = Resource::new(
                "code",
                &block.filename,
                serde_json::json!({ "language": block.language, "code": block.code }),
            );
            let id = store.add_resource(session_id, resource).await?;
            debug!(session = session_id, resource = %id, "Code block attached");
        }
        Ok(())
    }
}
