use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::error::ExampleError;
use crate::providers::tokenizer::Decoder;

/// Upper bound of the integer range normalized activations are rescaled into.
pub const NORMALIZED_SCALE: f32 = 10.0;

/// One token span of evidence for a feature.
///
/// Equality and hashing only look at `tokens`: two examples over the same
/// text collapse to one in any set or map, even when their activation
/// patterns differ. Samplers rely on this for deduplication.
///
/// `str_toks` and `normalized_activations` are display caches filled in
/// lazily by the highlighter and annotator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Example {
    pub tokens: Vec<u32>,
    pub activations: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str_toks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_activations: Option<Vec<f32>>,
}

impl Example {
    pub fn new(tokens: Vec<u32>, activations: Vec<f32>) -> Result<Self, ExampleError> {
        let example = Self {
            tokens,
            activations,
            str_toks: None,
            normalized_activations: None,
        };
        example.validate()?;
        Ok(example)
    }

    /// Zip parallel batches of token and activation rows into examples.
    pub fn from_batch(
        tokens: Vec<Vec<u32>>,
        activations: Vec<Vec<f32>>,
    ) -> Result<Vec<Self>, ExampleError> {
        if tokens.len() != activations.len() {
            return Err(ExampleError::LengthMismatch {
                tokens: tokens.len(),
                activations: activations.len(),
            });
        }
        tokens
            .into_iter()
            .zip(activations)
            .map(|(toks, acts)| Self::new(toks, acts))
            .collect()
    }

    /// Attach already-decoded token text.
    pub fn with_str_toks(mut self, str_toks: Vec<String>) -> Self {
        self.str_toks = Some(str_toks);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Largest activation in the span, `0.0` for an empty span.
    pub fn max_activation(&self) -> f32 {
        self.activations
            .iter()
            .copied()
            .reduce(f32::max)
            .unwrap_or(0.0)
    }

    /// Check that every per-token sequence lines up with `tokens`.
    pub fn validate(&self) -> Result<(), ExampleError> {
        let tokens = self.tokens.len();
        if self.activations.len() != tokens {
            return Err(ExampleError::LengthMismatch {
                tokens,
                activations: self.activations.len(),
            });
        }
        if let Some(index) = self.activations.iter().position(|a| !a.is_finite()) {
            return Err(ExampleError::NonFiniteActivation { index });
        }
        if let Some(str_toks) = &self.str_toks {
            if str_toks.len() != tokens {
                return Err(ExampleError::DecodeMismatch {
                    tokens,
                    decoded: str_toks.len(),
                });
            }
        }
        if let Some(normalized) = &self.normalized_activations {
            if normalized.len() != tokens {
                return Err(ExampleError::NormalizedMismatch {
                    tokens,
                    normalized: normalized.len(),
                });
            }
        }
        Ok(())
    }

    /// Decoded text per token, decoding once and caching on first use.
    pub fn ensure_str_toks(
        &mut self,
        decoder: Option<&dyn Decoder>,
    ) -> Result<&[String], ExampleError> {
        if self.str_toks.is_none() {
            let decoder = decoder.ok_or(ExampleError::MissingText)?;
            let decoded = decoder
                .batch_decode(&self.tokens)
                .map_err(|e| ExampleError::Decode {
                    message: e.to_string(),
                })?;
            if decoded.len() != self.tokens.len() {
                return Err(ExampleError::DecodeMismatch {
                    tokens: self.tokens.len(),
                    decoded: decoded.len(),
                });
            }
            self.str_toks = Some(decoded);
        }
        self.str_toks.as_deref().ok_or(ExampleError::MissingText)
    }

    /// Normalized activations, derived from `activations` on first use.
    pub fn ensure_normalized(&mut self) -> &[f32] {
        if self.normalized_activations.is_none() {
            let max_activation = self.max_activation();
            self.normalized_activations =
                Some(Self::normalize_activations(&self.activations, max_activation));
        }
        self.normalized_activations.as_deref().unwrap_or_default()
    }

    /// Rescale activations into `0..=NORMALIZED_SCALE` relative to `max_activation`.
    pub fn normalize_activations(activations: &[f32], max_activation: f32) -> Vec<f32> {
        if max_activation <= 0.0 || !max_activation.is_finite() {
            return vec![0.0; activations.len()];
        }
        activations
            .iter()
            .map(|a| {
                (a / max_activation * NORMALIZED_SCALE)
                    .floor()
                    .clamp(0.0, NORMALIZED_SCALE)
            })
            .collect()
    }
}

impl PartialEq for Example {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl Eq for Example {}

impl Hash for Example {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tokens.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct SpaceDecoder;

    impl Decoder for SpaceDecoder {
        fn batch_decode(&self, tokens: &[u32]) -> anyhow::Result<Vec<String>> {
            Ok(tokens.iter().map(|t| format!(" t{t}")).collect())
        }
    }

    struct ShortDecoder;

    impl Decoder for ShortDecoder {
        fn batch_decode(&self, _tokens: &[u32]) -> anyhow::Result<Vec<String>> {
            Ok(vec!["only".to_string()])
        }
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let err = Example::new(vec![1, 2, 3], vec![0.1, 0.2]).unwrap_err();
        assert_eq!(
            err,
            ExampleError::LengthMismatch {
                tokens: 3,
                activations: 2
            }
        );
    }

    #[test]
    fn non_finite_activations_are_rejected() {
        let err = Example::new(vec![1, 2], vec![f32::NAN, 1.0]).unwrap_err();
        assert_eq!(err, ExampleError::NonFiniteActivation { index: 0 });

        let err = Example::new(vec![1, 2, 3], vec![0.0, 1.0, f32::INFINITY]).unwrap_err();
        assert_eq!(err, ExampleError::NonFiniteActivation { index: 2 });
    }

    #[test]
    fn from_batch_zips_rows() {
        let examples = Example::from_batch(
            vec![vec![1, 2], vec![3, 4]],
            vec![vec![0.0, 1.0], vec![2.0, 0.5]],
        )
        .unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[1].max_activation(), 2.0);
    }

    #[test]
    fn max_activation_of_empty_span_is_zero() {
        let example = Example::new(vec![], vec![]).unwrap();
        assert_eq!(example.max_activation(), 0.0);
        assert!(example.is_empty());
    }

    #[test]
    fn equality_ignores_activations() {
        let a = Example::new(vec![5, 6, 7], vec![0.0, 1.0, 0.0]).unwrap();
        let b = Example::new(vec![5, 6, 7], vec![3.0, 0.0, 0.0]).unwrap();
        assert_eq!(a, b);

        let set: HashSet<Example> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn decodes_once_and_caches() {
        let mut example = Example::new(vec![1, 2], vec![0.0, 1.0]).unwrap();
        let text = example.ensure_str_toks(Some(&SpaceDecoder)).unwrap().to_vec();
        assert_eq!(text, vec![" t1", " t2"]);

        // Cached text wins over a decoder that would now disagree.
        let again = example.ensure_str_toks(Some(&ShortDecoder)).unwrap();
        assert_eq!(again, text.as_slice());
    }

    #[test]
    fn missing_decoder_without_text_is_an_error() {
        let mut example = Example::new(vec![1], vec![1.0]).unwrap();
        assert_eq!(
            example.ensure_str_toks(None).unwrap_err(),
            ExampleError::MissingText
        );
    }

    #[test]
    fn decoder_length_mismatch_is_rejected() {
        let mut example = Example::new(vec![1, 2, 3], vec![0.0; 3]).unwrap();
        let err = example.ensure_str_toks(Some(&ShortDecoder)).unwrap_err();
        assert_eq!(
            err,
            ExampleError::DecodeMismatch {
                tokens: 3,
                decoded: 1
            }
        );
        assert!(example.str_toks.is_none());
    }

    #[test]
    fn normalization_is_floored_into_scale() {
        let normalized = Example::normalize_activations(&[0.25, 2.0, 0.125, 1.0], 2.0);
        assert_eq!(normalized, vec![1.0, 10.0, 0.0, 5.0]);
    }

    #[test]
    fn normalization_of_non_positive_maximum_is_zero() {
        assert_eq!(
            Example::normalize_activations(&[-1.0, -0.5], -0.5),
            vec![0.0, 0.0]
        );
    }

    #[test]
    fn validate_checks_cached_sequences() {
        let mut example = Example::new(vec![1, 2], vec![0.0, 1.0]).unwrap();
        example.normalized_activations = Some(vec![0.0]);
        assert_eq!(
            example.validate().unwrap_err(),
            ExampleError::NormalizedMismatch {
                tokens: 2,
                normalized: 1
            }
        );
    }
}
