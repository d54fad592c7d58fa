use anyhow::Context;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::Decoder;

/// Decoder backed by a HuggingFace-style `vocab.json` (`{"token": id}`).
///
/// Boundary glyphs used by byte-level BPE and sentencepiece vocabularies are
/// mapped back to the whitespace they stand for. Ids missing from the
/// vocabulary render as `<id>`.
#[derive(Debug, Clone, Default)]
pub struct VocabDecoder {
    id_to_token: HashMap<u32, String>,
}

impl VocabDecoder {
    pub fn from_vocab(vocab: impl IntoIterator<Item = (String, u32)>) -> Self {
        let id_to_token = vocab
            .into_iter()
            .map(|(token, id)| (id, render_token(&token)))
            .collect();
        Self { id_to_token }
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read vocab: {}", path.display()))?;
        let vocab: BTreeMap<String, u32> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse vocab: {}", path.display()))?;
        Ok(Self::from_vocab(vocab))
    }

    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }
}

fn render_token(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            'Ġ' | '▁' => ' ',
            'Ċ' => '\n',
            'ĉ' => '\t',
            other => other,
        })
        .collect()
}

impl Decoder for VocabDecoder {
    fn batch_decode(&self, tokens: &[u32]) -> anyhow::Result<Vec<String>> {
        Ok(tokens
            .iter()
            .map(|id| {
                self.id_to_token
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| format!("<{id}>"))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn maps_boundary_glyphs_to_whitespace() {
        let decoder = VocabDecoder::from_vocab([
            ("The".to_string(), 0),
            ("Ġcat".to_string(), 1),
            ("Ċ".to_string(), 2),
            ("▁sat".to_string(), 3),
        ]);
        let text = decoder.batch_decode(&[0, 1, 2, 3]).unwrap();
        assert_eq!(text, vec!["The", " cat", "\n", " sat"]);
    }

    #[test]
    fn unknown_ids_render_as_placeholders() {
        let decoder = VocabDecoder::from_vocab([("a".to_string(), 0)]);
        assert_eq!(decoder.batch_decode(&[0, 9]).unwrap(), vec!["a", "<9>"]);
    }

    #[test]
    fn loads_vocab_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        std::fs::write(&path, r#"{"hello": 5, "Ġworld": 6}"#).unwrap();

        let decoder = VocabDecoder::from_json_file(&path).unwrap();
        assert_eq!(decoder.len(), 2);
        assert_eq!(
            decoder.batch_decode(&[5, 6]).unwrap().concat(),
            "hello world"
        );
    }
}
