//! Extraction of the explanation from free-form model output.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::ParserKind;

pub const EXPLANATION_MARKER: &str = "[EXPLANATION]:";

/// Returned when the output carries no explanation.
pub const FALLBACK_EXPLANATION: &str = "Explanation could not be parsed.";

/// Pulls an explanation out of raw backend text.
///
/// A missing explanation is not an error: `extract` returns `None`. `Err`
/// is reserved for outputs the strategy cannot process at all.
pub trait ExplanationParser: Send + Sync {
    fn extract(&self, text: &str) -> anyhow::Result<Option<String>>;

    /// Like `extract`, with [`FALLBACK_EXPLANATION`] standing in for a
    /// missing explanation.
    fn parse(&self, text: &str) -> anyhow::Result<String> {
        Ok(self
            .extract(text)?
            .unwrap_or_else(|| FALLBACK_EXPLANATION.to_string()))
    }
}

/// Looks for `[EXPLANATION]:` and returns the trimmed remainder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerParser;

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[EXPLANATION\]:\s*(.*)").unwrap())
}

impl ExplanationParser for MarkerParser {
    fn extract(&self, text: &str) -> anyhow::Result<Option<String>> {
        Ok(marker_regex()
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string()))
    }
}

/// Reads the `explanation` field of the first JSON object in the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl ExplanationParser for JsonParser {
    fn extract(&self, text: &str) -> anyhow::Result<Option<String>> {
        let text = text.trim();
        let Some(start) = text.find('{') else {
            return Ok(None);
        };

        let value: serde_json::Value = serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<serde_json::Value>()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no JSON object found in output"))?
            .map_err(|e| anyhow::anyhow!("invalid JSON in output: {}", e))?;

        Ok(value
            .get("explanation")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string()))
    }
}

/// Parser for a configured strategy.
pub fn parser_for(kind: ParserKind) -> Box<dyn ExplanationParser> {
    match kind {
        ParserKind::Marker => Box::new(MarkerParser),
        ParserKind::Json => Box::new(JsonParser),
    }
}
