//! Per-feature result documents.
//!
//! # Layout
//!
//! ```text
//! {dir}/
//!   {module_name}_feature{feature_index}.json   # one flat JSON object per feature
//! ```
//!
//! Writes go through a temp file and a rename, so a concurrent reader sees
//! either the previous document or the complete new one.

mod document;
mod io;

pub use document::{RecordDocument, RESERVED_FIELDS};

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::features::{Example, Feature, FeatureRecord};

const DOCUMENT_EXTENSION: &str = "json";

/// Directory of feature documents.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, feature: &Feature) -> PathBuf {
        self.dir.join(format!("{}.{}", feature, DOCUMENT_EXTENSION))
    }

    /// Persist `record`, replacing any previous document for its feature.
    ///
    /// Evidence (`examples`, `train`, `test`) is only written when
    /// `include_examples` is set, and is validated first so that nothing
    /// unreadable reaches disk.
    pub async fn save(
        &self,
        record: &FeatureRecord,
        include_examples: bool,
    ) -> StoreResult<PathBuf> {
        let path = self.path_for(&record.feature);
        if include_examples {
            check_evidence(record, &path)?;
        }
        io::ensure_dir(&self.dir).await?;
        let document = RecordDocument::snapshot(record, include_examples);
        let bytes = serde_json::to_vec_pretty(&document).map_err(|source| StoreError::Serde {
            path: path.clone(),
            source,
        })?;
        io::write_atomic(&path, &bytes).await?;
        debug!(feature = %record.feature, path = %path.display(), include_examples, "saved record");
        Ok(path)
    }

    /// Read the stored document for `feature`.
    pub async fn load(&self, feature: &Feature) -> StoreResult<RecordDocument> {
        let path = self.path_for(feature);
        let bytes = io::read(&path).await?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Serde { path, source })
    }

    /// Rebuild a full record. Evidence is only present if the document was
    /// saved with examples.
    pub async fn load_record(&self, feature: &Feature) -> StoreResult<FeatureRecord> {
        let document = self.load(feature).await?;
        Ok(document.into_record(feature.clone()))
    }

    /// Apply the stored fields for `record.feature` onto `record`, keeping
    /// in-memory evidence the document does not carry.
    pub async fn load_into(&self, record: &mut FeatureRecord) -> StoreResult<()> {
        let document = self.load(&record.feature).await?;
        document.apply_to(record);
        Ok(())
    }

    /// Features with a stored document, sorted. Files whose name is not a
    /// canonical feature name are skipped.
    pub async fn list_features(&self) -> StoreResult<Vec<Feature>> {
        let io_error = |source| StoreError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: self.dir.clone(),
                })
            }
            Err(e) => return Err(io_error(e)),
        };

        let mut features = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.parse::<Feature>() {
                Ok(feature) => features.push(feature),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping non-feature file"),
            }
        }
        features.sort();
        Ok(features)
    }
}

fn check_evidence(record: &FeatureRecord, path: &Path) -> StoreResult<()> {
    let fields: [(&'static str, &[Example]); 3] = [
        ("examples", &record.examples),
        ("train", &record.train),
        ("test", &record.test),
    ];
    for (field, examples) in fields {
        for (index, example) in examples.iter().enumerate() {
            example
                .validate()
                .map_err(|source| StoreError::InvalidExample {
                    path: path.to_path_buf(),
                    field,
                    index,
                    source,
                })?;
        }
    }
    Ok(())
}
