//! CLI command: autointerp explain
//!
//! Explain every stored record in a directory and save the results.
//!
//! Usage:
//!   autointerp explain --records <dir> --out <dir> [--config autointerp.yaml]
//!
//! Examples:
//!   autointerp explain --records cache/layers.6 --out explanations --cot
//!   autointerp explain --records cache --out out --provider fake --features layers.6_feature42

use anyhow::Context;
use autointerp_core::config::ProviderKind;
use autointerp_core::providers::llm::fake::FakeGenerator;
use autointerp_core::providers::llm::openai::OpenAIClient;
use autointerp_core::{explain_batch, BatchItem, Config, ExplainError, Generator, RecordStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::setup;
use crate::cli::args::ExplainArgs;
use crate::exit_codes;

pub const MANIFEST_FILE: &str = "run_manifest.json";

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct RunCounts {
    pub total: usize,
    pub explained: usize,
    pub parse_fallbacks: usize,
    pub malformed: usize,
    pub backend_failures: usize,
    pub other_failures: usize,
}

impl RunCounts {
    pub fn failed(&self) -> usize {
        self.malformed + self.backend_failures + self.other_failures
    }
}

#[derive(Debug, Serialize)]
struct FeatureOutcome {
    feature: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunManifest<'a> {
    tool_version: &'static str,
    records_dir: &'a Path,
    out_dir: &'a Path,
    config: &'a Config,
    counts: &'a RunCounts,
    features: Vec<FeatureOutcome>,
}

fn resolve_config(args: &ExplainArgs) -> anyhow::Result<Config> {
    let mut config = setup::load_config(&args.opts)?;
    config.explainer.verbose |= args.verbose;

    let backend = &mut config.backend;
    if let Some(provider) = args.provider {
        backend.provider = provider;
    }
    if let Some(model) = &args.model {
        backend.model = model.clone();
    }
    if let Some(concurrency) = args.concurrency {
        backend.max_concurrency = concurrency;
    }
    config.backend = config.backend.clone().with_env_overrides();
    if let Some(base_url) = &args.base_url {
        config.backend.base_url = base_url.clone();
    }

    config.validate()?;
    Ok(config)
}

fn build_generator(config: &Config, fake_response: &str) -> anyhow::Result<Arc<dyn Generator>> {
    match config.backend.provider {
        ProviderKind::OpenAI => {
            let client = OpenAIClient::new(
                &config.backend,
                std::env::var("OPENAI_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty()),
            )?;
            if client.api_key.is_none() {
                warn!("OPENAI_API_KEY is not set; requests are sent without authentication");
            }
            Ok(Arc::new(client))
        }
        ProviderKind::Fake => Ok(Arc::new(
            FakeGenerator::fixed(fake_response).with_model(config.backend.model.clone()),
        )),
    }
}

fn status_of(item: &BatchItem) -> (&'static str, Option<String>) {
    match &item.outcome {
        Ok(result) if result.parse_failed => ("parse_fallback", None),
        Ok(_) => ("explained", None),
        Err(e @ (ExplainError::EmptyTrain { .. } | ExplainError::InvalidExample { .. })) => {
            ("malformed", Some(e.to_string()))
        }
        Err(e @ ExplainError::Backend { .. }) => ("backend_failure", Some(e.to_string())),
        Err(e) => ("failed", Some(e.to_string())),
    }
}

pub async fn run(args: ExplainArgs) -> anyhow::Result<i32> {
    let config = resolve_config(&args)?;
    let decoder = setup::load_decoder(&args.opts)?;
    let generator = build_generator(&config, &args.fake_response)?;

    let inputs = RecordStore::new(&args.records);
    let features = if args.features.is_empty() {
        inputs
            .list_features()
            .await
            .with_context(|| format!("failed to list records in {}", args.records.display()))?
    } else {
        args.features
            .iter()
            .map(|name| setup::parse_feature(name))
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    let mut records = Vec::with_capacity(features.len());
    for feature in &features {
        let record = inputs
            .load_record(feature)
            .await
            .with_context(|| format!("failed to load record {feature}"))?;
        records.push(record);
    }
    info!(
        records = records.len(),
        provider = generator.provider_name(),
        concurrency = config.backend.max_concurrency,
        "explaining"
    );

    let explainer = Arc::new(setup::build_explainer(generator, &config, decoder));
    let items = explain_batch(explainer, records, config.backend.max_concurrency).await;

    let outputs = RecordStore::new(&args.out);
    let mut counts = RunCounts {
        total: items.len(),
        ..Default::default()
    };
    let mut outcomes = Vec::with_capacity(items.len());

    for item in items {
        let (mut status, mut detail) = status_of(&item);
        match item.outcome {
            Ok(result) => {
                let mut record = result.record;
                if let Some(prompt) = result.prompt {
                    record
                        .extra
                        .insert("prompt".to_string(), serde_json::to_value(prompt)?);
                }
                if let Some(response) = result.response {
                    record
                        .extra
                        .insert("response".to_string(), serde_json::to_value(response)?);
                }
                if config.explainer.verbose {
                    record
                        .extra
                        .insert("parse_failed".to_string(), result.parse_failed.into());
                }
                match outputs.save(&record, args.save_examples).await {
                    Ok(_) if result.parse_failed => {
                        counts.explained += 1;
                        counts.parse_fallbacks += 1;
                    }
                    Ok(_) => counts.explained += 1,
                    Err(e) => {
                        error!(feature = %item.feature, error = %e, "failed to save result");
                        counts.other_failures += 1;
                        status = "store_failure";
                        detail = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                error!(feature = %item.feature, error = %e, "no explanation produced");
                if e.is_malformed_input() {
                    counts.malformed += 1;
                } else if e.is_backend() {
                    counts.backend_failures += 1;
                } else {
                    counts.other_failures += 1;
                }
            }
        }
        outcomes.push(FeatureOutcome {
            feature: item.feature.to_string(),
            status,
            error: detail,
        });
    }

    if counts.total > 0 && counts.backend_failures == counts.total {
        error!("every backend call failed; check the backend configuration");
    }

    write_manifest(&args.records, &args.out, &config, &counts, outcomes).await?;

    println!(
        "explained {}/{} features ({} parse fallbacks, {} malformed, {} backend failures, {} other failures)",
        counts.explained,
        counts.total,
        counts.parse_fallbacks,
        counts.malformed,
        counts.backend_failures,
        counts.other_failures
    );
    println!("results: {}", args.out.display());

    Ok(if counts.failed() == 0 {
        exit_codes::SUCCESS
    } else {
        exit_codes::RECORD_FAILED
    })
}

async fn write_manifest(
    records_dir: &Path,
    out_dir: &Path,
    config: &Config,
    counts: &RunCounts,
    features: Vec<FeatureOutcome>,
) -> anyhow::Result<PathBuf> {
    let manifest = RunManifest {
        tool_version: env!("CARGO_PKG_VERSION"),
        records_dir,
        out_dir,
        config,
        counts,
        features,
    };
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let path = out_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
