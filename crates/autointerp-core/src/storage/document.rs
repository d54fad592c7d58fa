use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::features::{Example, Feature, FeatureRecord};

/// Top-level keys owned by the document or by its file name. `extra`
/// entries with these names are not persisted.
pub const RESERVED_FIELDS: [&str; 6] = [
    "feature",
    "explanation",
    "top_logits",
    "examples",
    "train",
    "test",
];

/// Persisted form of a [`FeatureRecord`].
///
/// A flat JSON object. The feature identity is carried by the file name,
/// so it never appears in the document. Evidence lists are present only
/// when the record was saved with examples. Every other top-level key lands
/// in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_logits: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Example>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train: Option<Vec<Example>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<Vec<Example>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RecordDocument {
    /// Copy the persistable fields of `record`.
    pub fn snapshot(record: &FeatureRecord, include_examples: bool) -> Self {
        let mut extra = BTreeMap::new();
        for (key, value) in &record.extra {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                warn!(feature = %record.feature, key = %key, "dropping extra field with reserved name");
                continue;
            }
            extra.insert(key.clone(), value.clone());
        }

        let evidence = |examples: &Vec<Example>| include_examples.then(|| examples.clone());
        Self {
            explanation: record.explanation.clone(),
            top_logits: record.top_logits.clone(),
            examples: evidence(&record.examples),
            train: evidence(&record.train),
            test: evidence(&record.test),
            extra,
        }
    }

    /// Overwrite the fields of `record` that this document carries.
    pub fn apply_to(self, record: &mut FeatureRecord) {
        if let Some(explanation) = self.explanation {
            record.explanation = Some(explanation);
        }
        if let Some(top_logits) = self.top_logits {
            record.top_logits = Some(top_logits);
        }
        if let Some(examples) = self.examples {
            record.examples = examples;
        }
        if let Some(train) = self.train {
            record.train = train;
        }
        if let Some(test) = self.test {
            record.test = test;
        }
        record.extra.extend(self.extra);
    }

    /// Rebuild a record for `feature` from this document alone.
    pub fn into_record(self, feature: Feature) -> FeatureRecord {
        let mut record = FeatureRecord::new(feature);
        self.apply_to(&mut record);
        record
    }

    pub fn has_examples(&self) -> bool {
        self.train.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> FeatureRecord {
        let train = vec![Example::new(vec![1, 2], vec![0.5, 1.5]).unwrap()];
        let mut record = FeatureRecord::new(Feature::new("layer1", 9))
            .with_train(train)
            .with_top_logits(vec!["x".to_string()]);
        record.explanation = Some("dates".to_string());
        record.extra.insert("score".to_string(), json!(0.75));
        record
    }

    #[test]
    fn snapshot_without_examples_is_flat_and_small() {
        let doc = RecordDocument::snapshot(&record(), false);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({"explanation": "dates", "top_logits": ["x"], "score": 0.75})
        );
    }

    #[test]
    fn snapshot_with_examples_includes_evidence() {
        let doc = RecordDocument::snapshot(&record(), true);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["train"][0]["tokens"], json!([1, 2]));
        assert_eq!(value["test"], json!([]));
        assert!(value.get("feature").is_none());
    }

    #[test]
    fn reserved_extra_keys_are_dropped() {
        let mut record = record();
        record
            .extra
            .insert("explanation".to_string(), json!("shadow"));
        record
            .extra
            .insert("feature".to_string(), json!("layer2_feature0"));
        let doc = RecordDocument::snapshot(&record, false);
        assert_eq!(doc.explanation.as_deref(), Some("dates"));
        assert!(!doc.extra.contains_key("explanation"));
        assert!(!doc.extra.contains_key("feature"));

        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("feature").is_none());
        assert_eq!(value["score"], json!(0.75));
    }

    #[test]
    fn unknown_keys_land_in_extra() {
        let doc: RecordDocument =
            serde_json::from_str(r#"{"explanation": "e", "fuzz_score": 0.5, "notes": "x"}"#)
                .unwrap();
        assert_eq!(doc.explanation.as_deref(), Some("e"));
        assert_eq!(doc.extra.get("fuzz_score"), Some(&json!(0.5)));
        assert!(!doc.has_examples());
    }

    #[test]
    fn apply_keeps_fields_the_document_lacks() {
        let mut target = record();
        let doc: RecordDocument = serde_json::from_str(r#"{"explanation": "new"}"#).unwrap();
        doc.apply_to(&mut target);
        assert_eq!(target.explanation.as_deref(), Some("new"));
        assert_eq!(target.train.len(), 1);
        assert_eq!(target.top_logits, Some(vec!["x".to_string()]));
    }
}
