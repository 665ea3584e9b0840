//! Token estimation helpers.

/// Rough token count for model-facing text, about 3.5 bytes per token.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.len() as f64 / 3.5).max(1.0) as usize
}
