//! Bracket markup for above-threshold token runs.

use crate::error::ExampleError;
use crate::features::Example;
use crate::providers::tokenizer::Decoder;

pub const HIGHLIGHT_OPEN: &str = "<<";
pub const HIGHLIGHT_CLOSE: &str = ">>";

/// Render `example` as `Example {index}: ...` with every maximal run of
/// tokens whose activation exceeds `max_activation * threshold_fraction`
/// wrapped in `<<...>>`.
///
/// `index` is 1-based. Token text is decoded once and cached on the example.
pub fn highlight(
    index: usize,
    example: &mut Example,
    threshold_fraction: f32,
    decoder: Option<&dyn Decoder>,
) -> Result<String, ExampleError> {
    example.validate()?;
    let threshold = example.max_activation() * threshold_fraction;
    example.ensure_str_toks(decoder)?;
    let str_toks = example
        .str_toks
        .as_deref()
        .ok_or(ExampleError::MissingText)?;
    Ok(render(index, str_toks, &example.activations, threshold))
}

/// Pure rendering over already-decoded text. Extra trailing tokens on
/// either side are ignored.
pub fn render(index: usize, str_toks: &[String], activations: &[f32], threshold: f32) -> String {
    let mut result = format!("Example {index}: ");
    let len = str_toks.len().min(activations.len());
    let above = |i: usize| activations[i] > threshold;

    let mut i = 0;
    while i < len {
        if above(i) {
            result.push_str(HIGHLIGHT_OPEN);
            while i < len && above(i) {
                result.push_str(&str_toks[i]);
                i += 1;
            }
            result.push_str(HIGHLIGHT_CLOSE);
        } else {
            result.push_str(&str_toks[i]);
            i += 1;
        }
    }
    result
}
