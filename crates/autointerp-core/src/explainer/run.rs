use tracing::{debug, error, info_span, warn, Instrument};

use super::annotate::annotate;
use super::highlight::highlight;
use super::parse::FALLBACK_EXPLANATION;
use super::prompt::build_prompt;
use super::{Explainer, ExplainerResult};
use crate::error::ExplainError;
use crate::features::FeatureRecord;
use crate::providers::llm::Message;

pub(crate) fn build_messages_impl(
    explainer: &Explainer,
    record: &mut FeatureRecord,
) -> Result<Vec<Message>, ExplainError> {
    if let Err(e) = record.validate() {
        warn!(feature = %record.feature, error = %e, "rejecting record");
        return Err(e);
    }

    let threshold = explainer.config.threshold;
    let decoder = explainer.decoder.as_deref();
    let feature = record.feature.to_string();

    let mut blocks = Vec::with_capacity(record.train.len());
    for (index, example) in record.train.iter_mut().enumerate() {
        let invalid = |source| ExplainError::InvalidExample {
            feature: feature.clone(),
            index,
            source,
        };
        let mut block = highlight(index + 1, example, threshold, decoder).map_err(invalid)?;
        if explainer.config.activations {
            block.push('\n');
            block.push_str(&annotate(example, threshold).map_err(invalid)?);
        }
        blocks.push(block);
    }

    Ok(build_prompt(
        &blocks.join("\n"),
        explainer.flags(),
        record.top_logits.as_deref(),
    ))
}

pub(crate) async fn explain_impl(
    explainer: &Explainer,
    mut record: FeatureRecord,
) -> Result<ExplainerResult, ExplainError> {
    let span = info_span!("explain", feature = %record.feature);
    async move {
        let messages = build_messages_impl(explainer, &mut record)?;
        debug!(messages = messages.len(), "prompt built");

        let generation = match explainer
            .generator
            .generate(&messages, &explainer.config.generation)
            .await
        {
            Ok(generation) => generation,
            Err(source) => {
                error!(
                    provider = explainer.generator.provider_name(),
                    error = %source,
                    "generation failed"
                );
                return Err(ExplainError::Backend {
                    feature: record.feature.to_string(),
                    source,
                });
            }
        };

        let (explanation, parse_failed) = match explainer.parser.extract(&generation.text) {
            Ok(Some(explanation)) => (explanation, false),
            Ok(None) => {
                warn!("no explanation found in response");
                (FALLBACK_EXPLANATION.to_string(), true)
            }
            Err(e) => {
                error!(error = %e, "failed to parse response");
                (FALLBACK_EXPLANATION.to_string(), true)
            }
        };

        record.explanation = Some(explanation.clone());
        let (prompt, response) = if explainer.config.verbose {
            (Some(messages), Some(generation))
        } else {
            (None, None)
        };

        Ok(ExplainerResult {
            record,
            explanation,
            parse_failed,
            prompt,
            response,
        })
    }
    .instrument(span)
    .await
}
