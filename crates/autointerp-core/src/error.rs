//! Error types for the explanation pipeline.
//!
//! Parse failures are intentionally absent: an unparsable model response is
//! recovered inside the explainer and never surfaces as an error.

use std::path::PathBuf;

/// Problems with a single example's evidence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExampleError {
    /// `tokens` and `activations` disagree in length.
    #[error("tokens/activations length mismatch: {tokens} tokens, {activations} activations")]
    LengthMismatch { tokens: usize, activations: usize },

    /// NaN or infinite activations cannot be rendered or persisted.
    #[error("non-finite activation at token {index}")]
    NonFiniteActivation { index: usize },

    /// Cached normalized activations do not line up with the tokens.
    #[error("normalized activations length mismatch: {tokens} tokens, {normalized} values")]
    NormalizedMismatch { tokens: usize, normalized: usize },

    /// Decoded text does not line up with the tokens.
    #[error("decoded text length mismatch: {tokens} tokens, {decoded} strings")]
    DecodeMismatch { tokens: usize, decoded: usize },

    /// No decoder was configured and the example carries no decoded text.
    #[error("no decoded token text: attach str_toks or configure a decoder")]
    MissingText,

    /// The decoder itself failed.
    #[error("decoder failed: {message}")]
    Decode { message: String },
}

/// Errors returned by the explainer for a single record.
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    /// The record has no train examples to show.
    #[error("malformed input for {feature}: no train examples")]
    EmptyTrain { feature: String },

    /// A train example failed validation or could not be rendered.
    #[error("malformed input for {feature}: train example {index}: {source}")]
    InvalidExample {
        feature: String,
        index: usize,
        #[source]
        source: ExampleError,
    },

    /// The generation backend failed; no fallback explanation is produced.
    #[error("generation backend failed for {feature}: {source}")]
    Backend {
        feature: String,
        #[source]
        source: anyhow::Error,
    },

    /// A batch task ended without producing a result.
    #[error("explanation task for {feature} aborted: {message}")]
    Task { feature: String, message: String },

    /// The blocking wrapper could not start its runtime.
    #[error("failed to start runtime: {source}")]
    Runtime {
        #[source]
        source: std::io::Error,
    },

    /// The blocking wrapper was called from inside an async runtime.
    #[error("explain_blocking called from inside an async runtime; use explain instead")]
    InsideRuntime,
}

impl ExplainError {
    /// Bad data rather than bad model output.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::EmptyTrain { .. } | Self::InvalidExample { .. })
    }

    /// The backend call failed (possibly a systemic outage).
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }

    /// Canonical name of the feature involved, when known.
    pub fn feature(&self) -> Option<&str> {
        match self {
            Self::EmptyTrain { feature }
            | Self::InvalidExample { feature, .. }
            | Self::Backend { feature, .. }
            | Self::Task { feature, .. } => Some(feature),
            Self::Runtime { .. } | Self::InsideRuntime => None,
        }
    }
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document exists for the requested feature.
    #[error("record not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Filesystem failure.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Evidence that would not survive a save/load round trip.
    #[error("refusing to save {}: {field}[{index}]: {source}", path.display())]
    InvalidExample {
        path: PathBuf,
        field: &'static str,
        index: usize,
        #[source]
        source: ExampleError,
    },

    /// The document could not be encoded or decoded.
    #[error("invalid record document {}: {source}", path.display())]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}
