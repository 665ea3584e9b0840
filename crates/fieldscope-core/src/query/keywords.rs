//! Keyword derivation and stable keys for field metadata.

use sha2::{Digest, Sha256};

use crate::models::FieldMetadata;
use crate::query::guards::normalize_keywords;

const FALLBACK_KEYWORDS: &[&str] = &["validate", "check"];

/// Last non-empty `/`-separated segment of an XPath, without predicates or
/// an attribute `@`.
pub fn xpath_leaf(xpath: &str) -> Option<&str> {
    let segment = xpath
        .split('/')
        .map(str::trim)
        .rfind(|s| !s.is_empty())?;
    let segment = segment.split('[').next().unwrap_or(segment);
    let segment = segment.trim_start_matches('@').trim();
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

/// Search keywords for a field: the XPath leaf, then the field name.
///
/// Falls back to generic validation words when the field carries neither.
pub fn field_keywords(field: &FieldMetadata) -> Vec<String> {
    let mut raw = Vec::new();
    if let Some(leaf) = xpath_leaf(&field.backend_xpath) {
        raw.push(leaf.to_string());
    }
    raw.push(field.field_name.clone());
    let keywords = normalize_keywords(&raw);
    if keywords.is_empty() {
        FALLBACK_KEYWORDS.iter().map(|k| k.to_string()).collect()
    } else {
        keywords
    }
}

/// Short hex digest, first `len` characters of SHA-256.
pub fn short_hash(text: &str, len: usize) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex.chars().take(len).collect()
}

/// `<field_name>_<8 hex chars>`; the hash covers the XPath, or the field
/// name when there is no XPath.
pub fn field_key(field: &FieldMetadata) -> String {
    let basis = if field.backend_xpath.trim().is_empty() {
        field.field_name.as_str()
    } else {
        field.backend_xpath.as_str()
    };
    format!("{}_{}", field.field_name, short_hash(basis, 8))
}
