//! Intrinsic method scoring for score-propagated expansion.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::models::{MethodSignature, SourceMethod};
use crate::query::relevance::is_relevant_lower;

/// Scores a seed method on its own merits. Opaque to the expander.
pub trait IntrinsicScorer: Send + Sync {
    fn score(&self, method: &SourceMethod) -> u64;
}

impl<F> IntrinsicScorer for F
where
    F: Fn(&SourceMethod) -> u64 + Send + Sync,
{
    fn score(&self, method: &SourceMethod) -> u64 {
        self(method)
    }
}

pub const KEYWORD_WEIGHT: u64 = 10;
pub const MAPPING_ANNOTATION_WEIGHT: u64 = 8;
pub const FIELD_MAPPING_WEIGHT: u64 = 12;

static MAPPING_ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@(?:Mapping|AfterMapping|BeforeMapping)\b").unwrap());

/// Default scorer for mapper-style code.
///
/// Keyword relevance, MapStruct-style mapping annotations, and `map…<kw>…(`
/// calls each add weight, plus an optional per-signature external weight.
pub struct MappingAwareScorer {
    keywords_lower: Vec<String>,
    field_mapping_res: Vec<Regex>,
    external: HashMap<MethodSignature, u64>,
}

impl MappingAwareScorer {
    pub fn new(keywords: &[String]) -> Self {
        let field_mapping_res = keywords
            .iter()
            .filter_map(|k| {
                let pattern = format!(
                    r"(?i)\b(map[A-Za-z0-9_]*{}[A-Za-z0-9_]*)\s*\(",
                    regex::escape(k)
                );
                match Regex::new(&pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(keyword = %k, error = %e, "skipping unusable keyword pattern");
                        None
                    }
                }
            })
            .collect();
        Self {
            keywords_lower: keywords.iter().map(|k| k.to_lowercase()).collect(),
            field_mapping_res,
            external: HashMap::new(),
        }
    }

    pub fn with_external_weights(mut self, weights: HashMap<MethodSignature, u64>) -> Self {
        self.external = weights;
        self
    }

    pub fn mapping_annotations(text: &str) -> usize {
        text.lines()
            .filter(|line| MAPPING_ANNOTATION_RE.is_match(line.trim_start()))
            .count()
    }

    /// Distinct `map…<keyword>…(` call names in the text, case-insensitive.
    pub fn field_mappings(&self, text: &str) -> usize {
        let mut names: HashSet<String> = HashSet::new();
        for re in &self.field_mapping_res {
            for caps in re.captures_iter(text) {
                names.insert(caps[1].to_lowercase());
            }
        }
        names.len()
    }
}

impl IntrinsicScorer for MappingAwareScorer {
    fn score(&self, method: &SourceMethod) -> u64 {
        let mut score = 0;
        if is_relevant_lower(&method.text, &self.keywords_lower) {
            score += KEYWORD_WEIGHT;
        }
        score += Self::mapping_annotations(&method.text) as u64 * MAPPING_ANNOTATION_WEIGHT;
        score += self.field_mappings(&method.text) as u64 * FIELD_MAPPING_WEIGHT;
        score += self.external.get(&method.signature()).copied().unwrap_or(0);
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn method(text: &str) -> SourceMethod {
        SourceMethod {
            file_path: "AddressMapper.java".to_string(),
            package_name: String::new(),
            class_name: "AddressMapper".to_string(),
            name: "toDto".to_string(),
            param_types: vec!["Address".to_string()],
            start_line: 1,
            end_line: 1,
            text: text.to_string(),
            calls_made: BTreeSet::new(),
        }
    }

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_plain_keyword_match() {
        let scorer = MappingAwareScorer::new(&kw(&["postalCode"]));
        assert_eq!(scorer.score(&method("dto.setPostalCode(a.zip);")), 10);
        assert_eq!(scorer.score(&method("return null;")), 0);
    }

    #[test]
    fn test_annotations_and_mapping_calls() {
        let text = "@Mapping(target = \"postalCode\", source = \"zip\")
@AfterMapping
AddressDto toDto(Address a) {
    dto.x = mapPostalCode(a);
    dto.y = MAPPOSTALCODE(a);
    dto.z = mapPostalCodeSuffix(a);
}";
        let scorer = MappingAwareScorer::new(&kw(&["postalCode"]));
        assert_eq!(MappingAwareScorer::mapping_annotations(text), 2);
        assert_eq!(scorer.field_mappings(text), 2);
        assert_eq!(scorer.score(&method(text)), 10 + 2 * 8 + 2 * 12);
    }

    #[test]
    fn test_keyword_is_escaped() {
        let scorer = MappingAwareScorer::new(&kw(&["a.b"]));
        assert_eq!(scorer.field_mappings("mapAxb(v);"), 0);
    }

    #[test]
    fn test_external_weight() {
        let mut weights = HashMap::new();
        weights.insert(MethodSignature::new("AddressMapper", "toDto", &["Address"]), 7);
        let scorer = MappingAwareScorer::new(&kw(&["zip"])).with_external_weights(weights);
        assert_eq!(scorer.score(&method("return null;")), 7);
    }

    #[test]
    fn test_closure_scorer() {
        let scorer = |m: &SourceMethod| -> u64 { m.text.len() as u64 };
        let boxed: &dyn IntrinsicScorer = &scorer;
        assert_eq!(boxed.score(&method("abc")), 3);
    }
}
