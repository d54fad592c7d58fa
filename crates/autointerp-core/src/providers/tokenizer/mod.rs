//! Token id to text decoding.

#[cfg(feature = "hf-tokenizer")]
pub mod hf;
pub mod vocab;

#[cfg(feature = "hf-tokenizer")]
pub use hf::HfDecoder;
pub use vocab::VocabDecoder;

/// Decodes token ids into per-token text.
///
/// Must return exactly one string per id, in order. Each string keeps the
/// token's own leading whitespace so that concatenation reproduces the text.
pub trait Decoder: Send + Sync {
    fn batch_decode(&self, tokens: &[u32]) -> anyhow::Result<Vec<String>>;
}
