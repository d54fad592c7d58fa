//! Compact `(token : strength)` listing for the strongest tokens.

use crate::error::ExampleError;
use crate::features::Example;

/// Render `Activations: ("tok" : 7), ...` for every token whose activation
/// exceeds `max_activation * threshold_fraction`.
///
/// Strength is the truncated normalized activation (0..=10). The example
/// must already have been highlighted so its token text is cached.
pub fn annotate(example: &mut Example, threshold_fraction: f32) -> Result<String, ExampleError> {
    example.validate()?;
    if example.str_toks.is_none() {
        return Err(ExampleError::MissingText);
    }
    let threshold = example.max_activation() * threshold_fraction;
    example.ensure_normalized();

    let (Some(str_toks), Some(normalized)) = (&example.str_toks, &example.normalized_activations)
    else {
        return Err(ExampleError::MissingText);
    };

    let pairs: Vec<String> = example
        .activations
        .iter()
        .zip(str_toks.iter().zip(normalized))
        .filter(|(activation, _)| **activation > threshold)
        .map(|(_, (token, strength))| format!("(\"{}\" : {})", token, *strength as i64))
        .collect();

    Ok(format!("Activations: {}", pairs.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(words: &[&str], acts: &[f32]) -> Example {
        let tokens = (0..words.len() as u32).collect();
        Example::new(tokens, acts.to_vec())
            .unwrap()
            .with_str_toks(words.iter().map(|w| w.to_string()).collect())
    }

    #[test]
    fn lists_only_tokens_above_threshold() {
        let mut ex = example(&["The", "cat", "sat"], &[0.1, 0.9, 0.05]);
        assert_eq!(annotate(&mut ex, 0.6).unwrap(), "Activations: (\"cat\" : 10)");
    }

    #[test]
    fn uses_cached_normalized_values() {
        let mut ex = example(&[" a", " b", " c"], &[4.0, 3.0, 1.0]);
        ex.normalized_activations = Some(vec![9.7, 6.2, 1.0]);
        assert_eq!(
            annotate(&mut ex, 0.5).unwrap(),
            "Activations: (\" a\" : 9), (\" b\" : 6)"
        );
    }

    #[test]
    fn derives_and_caches_normalized_values() {
        let mut ex = example(&["x", "y"], &[2.0, 1.5]);
        assert_eq!(
            annotate(&mut ex, 0.5).unwrap(),
            "Activations: (\"x\" : 10), (\"y\" : 7)"
        );
        assert_eq!(ex.normalized_activations, Some(vec![10.0, 7.0]));
    }

    #[test]
    fn nothing_above_threshold_yields_empty_listing() {
        let mut ex = example(&["x"], &[0.0]);
        assert_eq!(annotate(&mut ex, 0.6).unwrap(), "Activations: ");
    }

    #[test]
    fn requires_decoded_text() {
        let mut ex = Example::new(vec![1], vec![1.0]).unwrap();
        assert_eq!(annotate(&mut ex, 0.6).unwrap_err(), ExampleError::MissingText);
    }
}
