//! Feature identity and activation evidence.
//!
//! - `Feature`: which latent of which module
//! - `Example`: one token span with its per-token activations
//! - `FeatureRecord`: the unit of work handed to the explainer

mod example;
mod record;

pub use example::{Example, NORMALIZED_SCALE};
pub use record::FeatureRecord;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FEATURE_SEPARATOR: &str = "_feature";

/// A single latent dimension of an autoencoder.
///
/// The `Display` form `{module_name}_feature{feature_index}` is the canonical
/// identity and the stem of the persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Feature {
    pub module_name: String,
    pub feature_index: usize,
}

impl Feature {
    pub fn new(module_name: impl Into<String>, feature_index: usize) -> Self {
        Self {
            module_name: module_name.into(),
            feature_index,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.module_name, FEATURE_SEPARATOR, self.feature_index
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid feature name '{name}': expected <module>_feature<index>")]
pub struct FeatureParseError {
    pub name: String,
}

impl FromStr for Feature {
    type Err = FeatureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || FeatureParseError {
            name: s.to_string(),
        };
        // Module names may themselves contain "_feature"; the index is always last.
        let (module_name, index) = s.rsplit_once(FEATURE_SEPARATOR).ok_or_else(err)?;
        if module_name.is_empty() || index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }
        let feature_index = index.parse().map_err(|_| err())?;
        Ok(Self::new(module_name, feature_index))
    }
}
