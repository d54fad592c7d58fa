use autointerp_core::config::ProviderKind;
use autointerp_core::ParserKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "autointerp",
    version,
    about = "Explain sparse autoencoder features in natural language"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate explanations for stored feature records
    Explain(ExplainArgs),
    /// Print the prompt for one stored record without calling a backend
    Prompt(PromptArgs),
    /// Print a stored result document, or list stored features
    Show(ShowArgs),
}

/// Options shared by every command that renders prompts.
#[derive(Args, Clone, Debug, Default)]
pub struct ExplainerOpts {
    /// YAML config file (explainer/backend/experiment sections)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// ask for step-by-step reasoning before the explanation
    #[arg(long)]
    pub cot: bool,

    /// append per-token activation strengths after each example
    #[arg(long)]
    pub activations: bool,

    /// include the record's top logits as a hint
    #[arg(long)]
    pub logits: bool,

    /// highlight threshold as a fraction of each example's max activation
    #[arg(long)]
    pub threshold: Option<f32>,

    /// response parser (marker|json)
    #[arg(long)]
    pub parser: Option<ParserKind>,

    /// HuggingFace vocab.json used to decode token ids
    #[arg(long)]
    pub vocab: Option<PathBuf>,

    /// HuggingFace tokenizer.json used to decode token ids
    #[cfg(feature = "hf-tokenizer")]
    #[arg(long, conflicts_with = "vocab")]
    pub tokenizer: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub opts: ExplainerOpts,

    /// directory of feature documents saved with examples
    #[arg(long)]
    pub records: PathBuf,

    /// directory the explained records are written to
    #[arg(long)]
    pub out: PathBuf,

    /// only explain these features (comma-separated canonical names)
    #[arg(long, value_delimiter = ',')]
    pub features: Vec<String>,

    /// generation backend (openai|fake)
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    /// backend model name
    #[arg(long)]
    pub model: Option<String>,

    /// OpenAI-compatible API root (overrides config and OPENAI_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// records explained concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// store the prompt and raw response alongside each explanation
    #[arg(long)]
    pub verbose: bool,

    /// also write examples/train/test into the output documents
    #[arg(long)]
    pub save_examples: bool,

    /// fixed response for the fake provider
    #[arg(long, default_value = "[EXPLANATION]: placeholder explanation from the fake backend")]
    pub fake_response: String,
}

#[derive(Args, Clone, Debug)]
pub struct PromptArgs {
    #[command(flatten)]
    pub opts: ExplainerOpts,

    /// directory of feature documents saved with examples
    #[arg(long)]
    pub records: PathBuf,

    /// canonical feature name, e.g. layers.6_feature42
    pub feature: String,

    /// print the messages as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ShowArgs {
    /// directory of feature documents
    #[arg(long)]
    pub dir: PathBuf,

    /// canonical feature name; lists stored features when omitted
    pub feature: Option<String>,
}
