use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use super::{Example, Feature};
use crate::error::ExplainError;

/// Evidence and explanation for one feature.
///
/// Created by the upstream sampler with `train` (and usually `test`) filled
/// in; the explainer attaches `explanation`. `train` must be ordered by
/// activation strength, strongest first.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub feature: Feature,
    /// Full activating pool the sampler drew `train`/`test` from.
    pub examples: Vec<Example>,
    pub train: Vec<Example>,
    pub test: Vec<Example>,
    pub top_logits: Option<Vec<String>>,
    pub explanation: Option<String>,
    /// Additional fields attached by later stages (scores, prompts, ...).
    pub extra: BTreeMap<String, Value>,
}

impl FeatureRecord {
    pub fn new(feature: Feature) -> Self {
        Self {
            feature,
            examples: Vec::new(),
            train: Vec::new(),
            test: Vec::new(),
            top_logits: None,
            explanation: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_train(mut self, train: Vec<Example>) -> Self {
        self.train = train;
        self
    }

    pub fn with_test(mut self, test: Vec<Example>) -> Self {
        self.test = test;
        self
    }

    pub fn with_top_logits(mut self, top_logits: Vec<String>) -> Self {
        self.top_logits = Some(top_logits);
        self
    }

    /// Max activation of the strongest (first) train example.
    pub fn max_activation(&self) -> Option<f32> {
        self.train.first().map(Example::max_activation)
    }

    /// Reject records the explainer cannot work with.
    ///
    /// Out-of-order train examples are only logged: the ordering is the
    /// sampler's contract and only affects `max_activation`.
    pub fn validate(&self) -> Result<(), ExplainError> {
        if self.train.is_empty() {
            return Err(ExplainError::EmptyTrain {
                feature: self.feature.to_string(),
            });
        }
        for (index, example) in self.train.iter().enumerate() {
            example
                .validate()
                .map_err(|source| ExplainError::InvalidExample {
                    feature: self.feature.to_string(),
                    index,
                    source,
                })?;
        }
        let unordered = self
            .train
            .windows(2)
            .any(|pair| pair[0].max_activation() < pair[1].max_activation());
        if unordered {
            warn!(
                feature = %self.feature,
                "train examples are not ordered by max activation"
            );
        }
        Ok(())
    }
}
