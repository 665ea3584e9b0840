//! Shared typed models used across scanning, segmentation, and query layers.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Method identity
// ---------------------------------------------------------------------------

/// Cross-file key of a method: `Class.method(T1,T2)`.
///
/// Not globally unique. Two classes with the same simple name in different
/// packages collide, and the method table keeps whichever it saw first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodSignature {
    pub class_name: String,
    pub method_name: String,
    pub param_types: Vec<String>,
}

impl MethodSignature {
    pub fn new(class_name: &str, method_name: &str, param_types: &[&str]) -> Self {
        Self {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            param_types: param_types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.class_name,
            self.method_name,
            self.param_types.join(",")
        )
    }
}

impl Serialize for MethodSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// SourceMethod
// ---------------------------------------------------------------------------

/// One declared method in one source file.
///
/// Built once per parse of a file and never mutated afterwards.
#[derive(Clone, Debug, Serialize)]
pub struct SourceMethod {
    pub file_path: String,
    pub package_name: String,
    pub class_name: String,
    pub name: String,
    pub param_types: Vec<String>,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub text: String,
    /// Identifiers the body invokes, by bare name.
    pub calls_made: BTreeSet<String>,
}

impl SourceMethod {
    pub fn signature(&self) -> MethodSignature {
        MethodSignature {
            class_name: self.class_name.clone(),
            method_name: self.name.clone(),
            param_types: self.param_types.clone(),
        }
    }

    /// Per-file identity used for deduplication: name plus parameter types.
    pub fn local_key(&self) -> (&str, &[String]) {
        (self.name.as_str(), self.param_types.as_slice())
    }

    pub fn qualified_name(&self) -> String {
        if self.package_name.is_empty() {
            format!("{}.{}", self.class_name, self.name)
        } else {
            format!("{}.{}.{}", self.package_name, self.class_name, self.name)
        }
    }

    pub fn calls(&self, name: &str) -> bool {
        self.calls_made.contains(name)
    }
}

// ---------------------------------------------------------------------------
// Field metadata
// ---------------------------------------------------------------------------

/// Spreadsheet-derived description of one API field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub field_name: String,
    #[serde(default)]
    pub backend_xpath: String,
    #[serde(default)]
    pub description: String,
}

impl FieldMetadata {
    pub fn new(field_name: &str, backend_xpath: &str) -> Self {
        Self {
            field_name: field_name.to_string(),
            backend_xpath: backend_xpath.to_string(),
            description: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction output
// ---------------------------------------------------------------------------

/// File path to formatted snippets, in candidate-rank order.
pub type SnippetsByFile = IndexMap<String, Vec<String>>;

/// How a method relates to the seed set, rendered into its snippet header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MethodCategory {
    Seed,
    CallerAndCallee,
    /// Calls a seed.
    CallsSeedMethod,
    /// Called by a seed.
    CalledBySeed,
    IndirectlyRelated,
    Propagated,
}

impl MethodCategory {
    pub fn label(self) -> &'static str {
        match self {
            MethodCategory::Seed => "SEED",
            MethodCategory::CallerAndCallee => "CALLER_AND_CALLEE",
            MethodCategory::CallsSeedMethod => "CALLS_SEED_METHOD",
            MethodCategory::CalledBySeed => "CALLED_BY_SEED",
            MethodCategory::IndirectlyRelated => "INDIRECTLY_RELATED",
            MethodCategory::Propagated => "PROPAGATED",
        }
    }
}

/// A snippet annotated with its trimming priority (1 is most important).
///
/// `order` is the encounter position and breaks priority ties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankedSnippet {
    pub priority: u8,
    pub order: usize,
    pub file_path: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(package: &str) -> SourceMethod {
        SourceMethod {
            file_path: "src/AddressMapper.java".to_string(),
            package_name: package.to_string(),
            class_name: "AddressMapper".to_string(),
            name: "mapPostalCode".to_string(),
            param_types: vec!["String".to_string(), "int".to_string()],
            start_line: 3,
            end_line: 7,
            text: String::new(),
            calls_made: BTreeSet::new(),
        }
    }

    #[test]
    fn test_signature_display() {
        let sig = method("").signature();
        assert_eq!(sig.to_string(), "AddressMapper.mapPostalCode(String,int)");
    }

    #[test]
    fn test_signature_serializes_as_string() {
        let sig = MethodSignature::new("A", "run", &[]);
        assert_eq!(serde_json::to_string(&sig).unwrap(), "\"A.run()\"");
    }

    #[test]
    fn test_qualified_name_with_package() {
        assert_eq!(
            method("com.bank.acct").qualified_name(),
            "com.bank.acct.AddressMapper.mapPostalCode"
        );
        assert_eq!(method("").qualified_name(), "AddressMapper.mapPostalCode");
    }

    #[test]
    fn test_local_key_ignores_class() {
        let a = method("a");
        let mut b = method("b");
        b.class_name = "Other".to_string();
        assert_eq!(a.local_key(), b.local_key());
    }

    #[test]
    fn test_field_metadata_deserialize_defaults() {
        let field: FieldMetadata = serde_json::from_str(r#"{"field_name": "PostalCode"}"#).unwrap();
        assert_eq!(field.field_name, "PostalCode");
        assert!(field.backend_xpath.is_empty());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(MethodCategory::CallerAndCallee.label(), "CALLER_AND_CALLEE");
        assert_eq!(MethodCategory::Seed.label(), "SEED");
        assert_eq!(MethodCategory::CallsSeedMethod.label(), "CALLS_SEED_METHOD");
        assert_eq!(MethodCategory::CalledBySeed.label(), "CALLED_BY_SEED");
        assert_eq!(
            serde_json::to_string(&MethodCategory::CalledBySeed).unwrap(),
            "\"CALLED_BY_SEED\""
        );
    }
}
