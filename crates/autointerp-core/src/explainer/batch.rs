use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{Explainer, ExplainerResult};
use crate::error::ExplainError;
use crate::features::{Feature, FeatureRecord};

/// Result for the record at position `index` of the input.
#[derive(Debug)]
pub struct BatchItem {
    pub index: usize,
    pub feature: Feature,
    pub outcome: Result<ExplainerResult, ExplainError>,
}

/// Explain `records` as independent tasks, at most `max_concurrency` at a
/// time.
///
/// Tasks complete in any order; the returned items are in input order. One
/// record failing never affects the others.
pub async fn explain_batch(
    explainer: Arc<Explainer>,
    records: Vec<FeatureRecord>,
    max_concurrency: usize,
) -> Vec<BatchItem> {
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let features: Vec<Feature> = records.iter().map(|r| r.feature.clone()).collect();
    let mut join_set = JoinSet::new();

    for (index, record) in records.into_iter().enumerate() {
        let sem = sem.clone();
        let explainer = explainer.clone();
        join_set.spawn(async move {
            let feature = record.feature.to_string();
            let Ok(_permit) = sem.acquire_owned().await else {
                return (
                    index,
                    Err(ExplainError::Task {
                        feature,
                        message: "concurrency limiter closed".to_string(),
                    }),
                );
            };
            (index, explainer.explain(record).await)
        });
    }

    let mut outcomes: Vec<Option<Result<ExplainerResult, ExplainError>>> =
        features.iter().map(|_| None).collect();
    let mut join_error = None;
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok((index, outcome)) => {
                debug!(index, ok = outcome.is_ok(), "task finished");
                outcomes[index] = Some(outcome);
            }
            Err(e) => {
                warn!(error = %e, "explanation task did not complete");
                join_error = Some(e.to_string());
            }
        }
    }

    features
        .into_iter()
        .zip(outcomes)
        .enumerate()
        .map(|(index, (feature, outcome))| {
            let outcome = outcome.unwrap_or_else(|| {
                Err(ExplainError::Task {
                    feature: feature.to_string(),
                    message: join_error
                        .clone()
                        .unwrap_or_else(|| "task did not complete".to_string()),
                })
            });
            BatchItem {
                index,
                feature,
                outcome,
            }
        })
        .collect()
}
