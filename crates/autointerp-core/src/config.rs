//! Run configuration.
//!
//! One YAML document with three optional sections:
//!
//! ```yaml
//! explainer:
//!   cot: true
//!   activations: true
//!   threshold: 0.6
//!   generation:
//!     temperature: 0.0
//!     max_tokens: 500
//! backend:
//!   provider: openai
//!   model: gpt-4o-mini
//! experiment:
//!   train_type: quantiles
//!   n_examples_train: 40
//! ```
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `OPENAI_API_KEY` | Backend API key |
//! | `OPENAI_BASE_URL` | Overrides `backend.base_url` |

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::providers::llm::GenerationParams;

/// Default fraction of an example's max activation above which tokens are highlighted.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub explainer: ExplainerConfig,
    pub backend: BackendConfig,
    pub experiment: ExperimentConfig,
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.explainer.validate()?;
        self.backend.validate()?;
        self.experiment.validate()
    }
}

/// Which response parser extracts the explanation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// `[EXPLANATION]: ...` marker search.
    #[default]
    Marker,
    /// `{"explanation": "..."}` object in the output.
    Json,
}

impl std::str::FromStr for ParserKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "marker" => Ok(Self::Marker),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid {
                message: format!("unknown parser '{other}' (expected marker|json)"),
            }),
        }
    }
}

/// Explainer construction options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplainerConfig {
    /// Return the prompt and raw backend response alongside the result.
    pub verbose: bool,
    /// Ask the model to reason step by step before answering.
    pub cot: bool,
    /// Include the top promoted logits as a hint.
    pub logits: bool,
    /// Append per-token activation strengths after each example.
    pub activations: bool,
    /// Fraction of max activation used for both highlighting and annotation.
    pub threshold: f32,
    pub parser: ParserKind,
    /// Forwarded verbatim to the backend.
    pub generation: GenerationParams,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            cot: false,
            logits: false,
            activations: false,
            threshold: DEFAULT_THRESHOLD,
            parser: ParserKind::default(),
            generation: GenerationParams::default(),
        }
    }
}

impl ExplainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "explainer.threshold must be within [0, 1], got {}",
                    self.threshold
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAI,
    Fake,
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "fake" => Ok(Self::Fake),
            other => Err(ConfigError::Invalid {
                message: format!("unknown provider '{other}' (expected openai|fake)"),
            }),
        }
    }
}

/// Generation backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub provider: ProviderKind,
    pub model: String,
    /// OpenAI-compatible API root; `/chat/completions` is appended.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum retries for transient failures (429, 5xx, transport).
    pub max_retries: u32,
    /// First retry backoff in milliseconds; doubles per retry.
    pub retry_base_ms: u64,
    /// Records explained concurrently.
    pub max_concurrency: usize,
}

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: "gpt-4o-mini".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
            max_retries: 3,
            retry_base_ms: 500,
            max_concurrency: 8,
        }
    }
}

impl BackendConfig {
    /// Apply `OPENAI_BASE_URL` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                message: "backend.max_concurrency must be at least 1".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "backend.model must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// How upstream picked the examples shown to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainType {
    Top,
    Random,
    #[default]
    Quantiles,
}

/// How upstream picked the held-out examples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[default]
    Quantiles,
    Activation,
}

/// Upstream sampling settings.
///
/// Not interpreted by the explainer; carried so a run's outputs record how
/// their evidence was selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Examples sampled for explanation generation.
    pub n_examples_train: usize,
    /// Examples sampled for explanation testing.
    pub n_examples_test: usize,
    /// Activation quantiles to sample from.
    pub n_quantiles: usize,
    /// Tokens per example.
    pub example_ctx_len: usize,
    /// Random (non-activating) examples to sample.
    pub n_random: usize,
    pub train_type: TrainType,
    pub test_type: TestType,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_examples_train: 40,
            n_examples_test: 5,
            n_quantiles: 20,
            example_ctx_len: 32,
            n_random: 50,
            train_type: TrainType::default(),
            test_type: TestType::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("n_examples_train", self.n_examples_train),
            ("n_quantiles", self.n_quantiles),
            ("example_ctx_len", self.example_ctx_len),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    message: format!("experiment.{name} must be at least 1"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.explainer.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.experiment.n_examples_train, 40);
        assert_eq!(config.experiment.train_type, TrainType::Quantiles);
        assert_eq!(config.backend.provider, ProviderKind::OpenAI);
    }

    #[test]
    fn parses_full_document() {
        let yaml = r#"
explainer:
  cot: true
  activations: true
  threshold: 0.7
  parser: json
  generation:
    temperature: 0.5
    max_tokens: 300
    top_p: 0.9
backend:
  provider: fake
  model: local-model
  max_concurrency: 2
experiment:
  train_type: top
  test_type: activation
  n_examples_test: 10
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert!(config.explainer.cot);
        assert!(config.explainer.activations);
        assert!(!config.explainer.logits);
        assert_eq!(config.explainer.parser, ParserKind::Json);
        assert_eq!(config.explainer.generation.temperature, Some(0.5));
        assert_eq!(config.explainer.generation.max_tokens, Some(300));
        assert_eq!(
            config.explainer.generation.extra.get("top_p"),
            Some(&serde_json::json!(0.9))
        );
        assert_eq!(config.backend.provider, ProviderKind::Fake);
        assert_eq!(config.backend.max_concurrency, 2);
        assert_eq!(config.experiment.train_type, TrainType::Top);
        assert_eq!(config.experiment.test_type, TestType::Activation);
        assert_eq!(config.experiment.n_examples_test, 10);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_yaml::from_str::<Config>("explainer:\n  treshold: 0.5\n").unwrap_err();
        assert!(err.to_string().contains("treshold"));
    }

    #[test]
    fn threshold_out_of_range_is_invalid() {
        let mut config = Config::default();
        config.explainer.threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let mut config = Config::default();
        config.backend.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_path_reports_parse_errors_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("autointerp.yaml");
        std::fs::write(&path, "explainer: [not, a, map]").unwrap();

        let err = Config::from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("autointerp.yaml"));
    }

    #[test]
    fn provider_kind_from_str() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
        assert_eq!("fake".parse::<ProviderKind>().unwrap(), ProviderKind::Fake);
        assert!("anthropic".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn parser_kind_from_str() {
        assert_eq!("JSON".parse::<ParserKind>().unwrap(), ParserKind::Json);
        assert_eq!("marker".parse::<ParserKind>().unwrap(), ParserKind::Marker);
        assert!("regex".parse::<ParserKind>().is_err());
    }
}
