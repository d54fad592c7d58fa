use std::path::Path;
use tokenizers::Tokenizer;

use super::Decoder;

/// Decoder backed by a HuggingFace `tokenizer.json`.
pub struct HfDecoder {
    tokenizer: Tokenizer,
}

impl HfDecoder {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer {}: {e}", path.display()))?;
        Ok(Self::new(tokenizer))
    }
}

impl Decoder for HfDecoder {
    fn batch_decode(&self, tokens: &[u32]) -> anyhow::Result<Vec<String>> {
        // One id at a time so each string keeps its own leading whitespace.
        tokens
            .iter()
            .map(|&id| {
                self.tokenizer
                    .decode(&[id], false)
                    .map_err(|e| anyhow::anyhow!("failed to decode token {id}: {e}"))
            })
            .collect()
    }
}
