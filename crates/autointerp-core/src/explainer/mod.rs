//! Explanation orchestrator.
//!
//! - `highlight` / `annotate`: render one example
//! - `prompt`: pure message assembly
//! - `parse`: extraction strategies for the model output
//! - `run`: the per-record build/generate/parse cycle
//! - `batch`: bounded concurrent runs over many records

pub mod annotate;
pub mod batch;
pub mod highlight;
pub mod parse;
pub mod prompt;
mod run;


use std::sync::Arc;

use crate::config::ExplainerConfig;
use crate::error::ExplainError;
use crate::features::FeatureRecord;
use crate::providers::llm::{Generation, Generator, Message};
use crate::providers::tokenizer::Decoder;
use parse::{parser_for, ExplanationParser};
use prompt::PromptFlags;

pub use batch::{explain_batch, BatchItem};

/// Outcome of one successful explanation run.
///
/// A response whose content could not be parsed still produces a result,
/// with `parse_failed` set and the fallback text as `explanation`.
#[derive(Debug, Clone)]
pub struct ExplainerResult {
    pub record: FeatureRecord,
    pub explanation: String,
    pub parse_failed: bool,
    /// Messages sent to the backend (verbose mode only).
    pub prompt: Option<Vec<Message>>,
    /// Raw backend response (verbose mode only).
    pub response: Option<Generation>,
}

/// Drives one request/response cycle per record. Holds no per-record state,
/// so a single instance can be shared across concurrent tasks.
#[derive(Clone)]
pub struct Explainer {
    generator: Arc<dyn Generator>,
    decoder: Option<Arc<dyn Decoder>>,
    parser: Arc<dyn ExplanationParser>,
    config: ExplainerConfig,
}

impl Explainer {
    pub fn new(generator: Arc<dyn Generator>, config: ExplainerConfig) -> Self {
        Self {
            generator,
            decoder: None,
            parser: Arc::from(parser_for(config.parser)),
            config,
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Replace the parser selected by `config.parser`.
    pub fn with_parser(mut self, parser: Arc<dyn ExplanationParser>) -> Self {
        self.parser = parser;
        self
    }

    pub(crate) fn flags(&self) -> PromptFlags {
        PromptFlags {
            cot: self.config.cot,
            activations: self.config.activations,
            logits: self.config.logits,
        }
    }

    /// Validate `record` and render its prompt without calling the backend.
    ///
    /// Decoded text and normalized activations are cached on the record's
    /// train examples.
    pub fn build_messages(&self, record: &mut FeatureRecord) -> Result<Vec<Message>, ExplainError> {
        run::build_messages_impl(self, record)
    }

    /// Explain one record.
    pub async fn explain(&self, record: FeatureRecord) -> Result<ExplainerResult, ExplainError> {
        run::explain_impl(self, record).await
    }

    /// Blocking wrapper over [`Explainer::explain`].
    ///
    /// Starts a current-thread runtime. Inside an async context it returns
    /// [`ExplainError::InsideRuntime`] instead.
    pub fn explain_blocking(&self, record: FeatureRecord) -> Result<ExplainerResult, ExplainError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ExplainError::InsideRuntime);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| ExplainError::Runtime { source })?;
        runtime.block_on(self.explain(record))
    }
}
