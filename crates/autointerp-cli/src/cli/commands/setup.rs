//! Config, decoder and explainer assembly shared by the commands.

use anyhow::Context;
use autointerp_core::providers::tokenizer::VocabDecoder;
use autointerp_core::{Config, Decoder, Explainer, Feature, Generator};
use std::sync::Arc;

use crate::cli::args::ExplainerOpts;

/// Config file (or defaults) with command-line flags applied on top.
pub(crate) fn load_config(opts: &ExplainerOpts) -> anyhow::Result<Config> {
    let mut config = match &opts.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    let explainer = &mut config.explainer;
    explainer.cot |= opts.cot;
    explainer.activations |= opts.activations;
    explainer.logits |= opts.logits;
    if let Some(threshold) = opts.threshold {
        explainer.threshold = threshold;
    }
    if let Some(parser) = opts.parser {
        explainer.parser = parser;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(feature = "hf-tokenizer")]
fn tokenizer_decoder(opts: &ExplainerOpts) -> anyhow::Result<Option<Arc<dyn Decoder>>> {
    match &opts.tokenizer {
        Some(path) => {
            let decoder = autointerp_core::providers::tokenizer::HfDecoder::from_file(path)?;
            Ok(Some(Arc::new(decoder)))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "hf-tokenizer"))]
fn tokenizer_decoder(_opts: &ExplainerOpts) -> anyhow::Result<Option<Arc<dyn Decoder>>> {
    Ok(None)
}

pub(crate) fn load_decoder(opts: &ExplainerOpts) -> anyhow::Result<Option<Arc<dyn Decoder>>> {
    if let Some(decoder) = tokenizer_decoder(opts)? {
        return Ok(Some(decoder));
    }

    match &opts.vocab {
        Some(path) => {
            let decoder = VocabDecoder::from_json_file(path)?;
            tracing::debug!(tokens = decoder.len(), "loaded vocab");
            Ok(Some(Arc::new(decoder)))
        }
        None => Ok(None),
    }
}

pub(crate) fn build_explainer(
    generator: Arc<dyn Generator>,
    config: &Config,
    decoder: Option<Arc<dyn Decoder>>,
) -> Explainer {
    let explainer = Explainer::new(generator, config.explainer.clone());
    match decoder {
        Some(decoder) => explainer.with_decoder(decoder),
        None => explainer,
    }
}

pub(crate) fn parse_feature(name: &str) -> anyhow::Result<Feature> {
    name.trim()
        .parse::<Feature>()
        .with_context(|| format!("invalid feature name: {name}"))
}
