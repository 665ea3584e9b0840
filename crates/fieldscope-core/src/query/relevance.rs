//! Keyword relevance of a method body.

/// Lines that never count toward relevance: comments and annotations.
fn is_ignored_line(trimmed: &str) -> bool {
    trimmed.starts_with('@')
        || trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
}

/// True when any keyword occurs (case-insensitive substring) on a code line.
///
/// `keywords_lower` must already be lowercased.
pub fn is_relevant_lower(text: &str, keywords_lower: &[String]) -> bool {
    if keywords_lower.is_empty() {
        return false;
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_ignored_line(line))
        .any(|line| {
            let lowered = line.to_lowercase();
            keywords_lower.iter().any(|k| lowered.contains(k.as_str()))
        })
}

pub fn is_relevant(text: &str, keywords: &[String]) -> bool {
    let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    is_relevant_lower(text, &lowered)
}
