//! Call-site extraction and the name-indexed call graph.
//!
//! Calls are resolved by bare method name against every known method,
//! regardless of receiver, enclosing type, or file. A call to `save(..)` links
//! to every method named `save`. This is a lossy approximation and the graph
//! keeps every candidate rather than guessing one.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::models::{MethodSignature, SourceMethod};

// ---------------------------------------------------------------------------
// Call extraction
// ---------------------------------------------------------------------------

static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:([A-Za-z_][A-Za-z0-9_]*)\s*\.\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap()
});

/// Keywords and constructs that look like calls but are not.
pub fn is_call_keyword(name: &str) -> bool {
    matches!(
        name,
        "if" | "for"
            | "while"
            | "switch"
            | "catch"
            | "synchronized"
            | "return"
            | "new"
            | "super"
            | "this"
            | "throw"
            | "else"
            | "try"
            | "do"
            | "assert"
            | "case"
            | "yield"
            | "instanceof"
    )
}

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// Names of the methods a declaration's body invokes.
///
/// Only text after the first `{` is scanned, so the declaration header and
/// its annotations never count. Capitalised names (constructors and type
/// references), annotation arguments, and single-letter names are skipped.
pub fn extract_calls(method_text: &str) -> BTreeSet<String> {
    let mut calls = BTreeSet::new();
    let Some(open) = method_text.find('{') else {
        return calls;
    };
    let body = &method_text[open + 1..];

    for line in body.lines() {
        if is_comment_line(line.trim()) {
            continue;
        }
        for caps in CALL_RE.captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };
            let Some(name) = caps.get(2).map(|m| m.as_str()) else {
                continue;
            };
            if name.len() < 2 || is_call_keyword(name) {
                continue;
            }
            if name.starts_with(|c: char| c.is_ascii_uppercase()) {
                continue;
            }
            if line[..whole.start()].ends_with('@') {
                continue;
            }
            calls.insert(name.to_string());
        }
    }
    calls
}

// ---------------------------------------------------------------------------
// Method table
// ---------------------------------------------------------------------------

/// Every method discovered in one extraction call, keyed by signature.
///
/// Insertion order is candidate-file order then source order, and indices
/// are stable for the lifetime of the table.
#[derive(Debug, Default)]
pub struct MethodTable {
    methods: IndexMap<MethodSignature, SourceMethod>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a method; on a signature collision the first one stays.
    pub fn insert(&mut self, method: SourceMethod) -> bool {
        let signature = method.signature();
        if let Some(existing) = self.methods.get(&signature) {
            debug!(
                signature = %signature,
                kept = %existing.file_path,
                dropped = %method.file_path,
                "signature collision"
            );
            return false;
        }
        self.methods.insert(signature, method);
        true
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<(&MethodSignature, &SourceMethod)> {
        self.methods.get_index(idx)
    }

    pub fn method(&self, idx: usize) -> Option<&SourceMethod> {
        self.methods.get_index(idx).map(|(_, m)| m)
    }

    pub fn signature(&self, idx: usize) -> Option<&MethodSignature> {
        self.methods.get_index(idx).map(|(s, _)| s)
    }

    pub fn index_of(&self, signature: &MethodSignature) -> Option<usize> {
        self.methods.get_index_of(signature)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &MethodSignature, &SourceMethod)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(idx, (sig, m))| (idx, sig, m))
    }
}

impl FromIterator<SourceMethod> for MethodTable {
    fn from_iter<I: IntoIterator<Item = SourceMethod>>(iter: I) -> Self {
        let mut table = MethodTable::new();
        for method in iter {
            table.insert(method);
        }
        table
    }
}

// ---------------------------------------------------------------------------
// Call graph
// ---------------------------------------------------------------------------

/// Adjacency over a `MethodTable`, both directions, by table index.
#[derive(Debug, Default)]
pub struct CallGraph {
    by_name: HashMap<String, Vec<usize>>,
    callees: Vec<Vec<usize>>,
    callers: Vec<Vec<usize>>,
}

impl CallGraph {
    pub fn build(table: &MethodTable) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, _, method) in table.iter() {
            by_name.entry(method.name.clone()).or_default().push(idx);
        }

        let mut callees: Vec<Vec<usize>> = vec![Vec::new(); table.len()];
        let mut callers: Vec<Vec<usize>> = vec![Vec::new(); table.len()];
        for (idx, _, method) in table.iter() {
            for called in &method.calls_made {
                if let Some(targets) = by_name.get(called) {
                    for &target in targets {
                        callees[idx].push(target);
                        callers[target].push(idx);
                    }
                }
            }
        }
        for list in callees.iter_mut().chain(callers.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            by_name,
            callees,
            callers,
        }
    }

    /// Every method whose name is `name`.
    pub fn candidates(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn callees(&self, idx: usize) -> &[usize] {
        self.callees.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn callers(&self, idx: usize) -> &[usize] {
        self.callers.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.callees.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_method(class: &str, name: &str, calls: &[&str]) -> SourceMethod {
        SourceMethod {
            file_path: format!("{class}.java"),
            package_name: String::new(),
            class_name: class.to_string(),
            name: name.to_string(),
            param_types: Vec::new(),
            start_line: 1,
            end_line: 1,
            text: String::new(),
            calls_made: calls.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_extract_calls_basic() {
        let text = "public void run(String postalCode) {\n    validator.check(postalCode);\n    normalize(x);\n}";
        assert_eq!(extract_calls(text), set(&["check", "normalize"]));
    }

    #[test]
    fn test_extract_calls_skips_keywords_and_constructors() {
        let text = "void run() {\n    if (ok(a)) { return wrap(new Address(b)); }\n    for (int i = 0; i < n; i++) {}\n    super(x);\n}";
        assert_eq!(extract_calls(text), set(&["ok", "wrap"]));
    }

    #[test]
    fn test_extract_calls_skips_header_and_annotations() {
        let text = "@Mapping(target = \"zip\")\nString mapZip(String v) {\n    @SuppressWarnings(\"x\") int y = f(v);\n    return trim(v);\n}";
        assert_eq!(extract_calls(text), set(&["trim"]));
    }

    #[test]
    fn test_extract_calls_skips_comment_lines() {
        let text = "void run() {\n    // legacy(x);\n    * doc(y)\n    live(z);\n}";
        assert_eq!(extract_calls(text), set(&["live"]));
    }

    #[test]
    fn test_extract_calls_without_body() {
        assert!(extract_calls("abstract void run(int x);").is_empty());
    }

    #[test]
    fn test_method_table_first_insert_wins() {
        let mut table = MethodTable::new();
        let mut first = make_method("A", "run", &[]);
        first.file_path = "one/A.java".to_string();
        let mut second = make_method("A", "run", &[]);
        second.file_path = "two/A.java".to_string();
        assert!(table.insert(first));
        assert!(!table.insert(second));
        assert_eq!(table.len(), 1);
        assert_eq!(table.method(0).unwrap().file_path, "one/A.java");
    }

    #[test]
    fn test_call_graph_name_resolution_keeps_all_candidates() {
        let table: MethodTable = vec![
            make_method("A", "entry", &["save"]),
            make_method("B", "save", &[]),
            make_method("C", "save", &[]),
        ]
        .into_iter()
        .collect();
        let graph = CallGraph::build(&table);
        assert_eq!(graph.candidates("save"), &[1, 2]);
        assert_eq!(graph.callees(0), &[1, 2]);
        assert_eq!(graph.callers(1), &[0]);
        assert_eq!(graph.callers(2), &[0]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_call_graph_cycle_and_unknown_names() {
        let table: MethodTable = vec![
            make_method("A", "ping", &["pong", "println"]),
            make_method("B", "pong", &["ping"]),
        ]
        .into_iter()
        .collect();
        let graph = CallGraph::build(&table);
        assert_eq!(graph.callees(0), &[1]);
        assert_eq!(graph.callees(1), &[0]);
        assert!(graph.candidates("println").is_empty());
        assert!(graph.callees(99).is_empty());
    }
}
