//! Shared guardrails for scan sizes, worker counts, and keyword lists.
//!
//! Traversal depth and the context budget are caller inputs and pass through
//! unchanged. Only the candidate-file cap and the worker count are clamped.

pub const MAX_CANDIDATE_FILES: usize = 64;
pub const MAX_BATCH_WORKERS: usize = 64;

pub fn clamp_int(value: usize, minimum: usize, maximum: usize) -> usize {
    value.max(minimum).min(maximum)
}

pub fn clamp_file_cap(value: usize) -> usize {
    clamp_int(value, 1, MAX_CANDIDATE_FILES)
}

pub fn clamp_workers(value: usize) -> usize {
    clamp_int(value, 1, MAX_BATCH_WORKERS)
}

/// Trim, drop empties, and remove case-insensitive duplicates, keeping the
/// first spelling. Every surviving keyword is kept whole, however many there
/// are, so the all-keywords file filter sees the full list.
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut result = Vec::new();
    for keyword in keywords {
        let trimmed = keyword.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lowered = trimmed.to_lowercase();
        if seen.contains(&lowered) {
            continue;
        }
        seen.push(lowered);
        result.push(trimmed.to_string());
    }
    result
}
