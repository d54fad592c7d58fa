//! Natural-language explanations for sparse autoencoder features.
//!
//! Given a [`FeatureRecord`] whose train examples were picked upstream, the
//! [`Explainer`] renders them as highlighted text, asks a [`Generator`] what
//! the feature detects, and extracts the answer. [`RecordStore`] persists
//! the result as one JSON document per feature.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use autointerp_core::{Example, Explainer, ExplainerConfig, Feature, FeatureRecord};
//! use autointerp_core::providers::llm::fake::FakeGenerator;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let example = Example::new(vec![1, 2, 3], vec![0.1, 0.9, 0.05])?
//!     .with_str_toks(vec!["The".into(), " cat".into(), " sat".into()]);
//! let record = FeatureRecord::new(Feature::new("layers.6", 42)).with_train(vec![example]);
//!
//! let generator = Arc::new(FakeGenerator::fixed("[EXPLANATION]: feline nouns"));
//! let explainer = Explainer::new(generator, ExplainerConfig::default());
//! let result = explainer.explain(record).await?;
//! assert_eq!(result.explanation, "feline nouns");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod explainer;
pub mod features;
pub mod providers;
pub mod storage;

pub use config::{BackendConfig, Config, ExperimentConfig, ExplainerConfig, ParserKind};
pub use error::{ConfigError, ExampleError, ExplainError, StoreError, StoreResult};
pub use explainer::{explain_batch, BatchItem, Explainer, ExplainerResult};
pub use features::{Example, Feature, FeatureParseError, FeatureRecord};
pub use providers::llm::{Generation, GenerationParams, Generator, Message, Role};
pub use providers::tokenizer::Decoder;
pub use storage::{RecordDocument, RecordStore};
