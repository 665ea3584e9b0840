//! Method segmentation backends.
//!
//! A segmenter turns one file's text into the ordered list of method
//! declarations it contains: name, parameter types, and where the declaration
//! starts. End lines are not taken from the backend; `symbols` computes them
//! by brace balancing so both backends agree on span semantics.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use tree_sitter::Node;

use crate::config::SegmenterKind;

/// One method declaration as reported by a segmenter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSegment {
    pub name: String,
    pub param_types: Vec<String>,
    /// First line of the declaration, annotations included (1-based).
    pub start_line: usize,
    /// Line holding the method name; brace balancing starts here (1-based).
    pub name_line: usize,
    /// Innermost enclosing type, if any.
    pub class_name: Option<String>,
}

/// Capability interface over the structural parser.
pub trait MethodSegmenter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Declarations in source order. `Err` means the file could not be
    /// segmented and should be skipped.
    fn segments(&self, source: &str) -> Result<Vec<MethodSegment>, String>;
}

pub fn segmenter_for(kind: SegmenterKind) -> Box<dyn MethodSegmenter> {
    match kind {
        SegmenterKind::TreeSitter => Box::new(TreeSitterSegmenter),
        SegmenterKind::Lexical => Box::new(LexicalSegmenter),
        SegmenterKind::TreeSitterWithFallback => Box::new(FallbackSegmenter {
            primary: TreeSitterSegmenter,
            fallback: LexicalSegmenter,
        }),
    }
}

/// Reduce a declared parameter type to its bare name: generic arguments,
/// array brackets, varargs dots, and whitespace are removed.
///
/// `List<Map<String, Integer>>` becomes `List`, `byte[]` becomes `byte`.
pub fn normalize_param_type(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut generic_depth = 0usize;
    for ch in raw.replace("...", "").chars() {
        match ch {
            '<' => generic_depth += 1,
            '>' => generic_depth = generic_depth.saturating_sub(1),
            _ if generic_depth > 0 => {}
            '[' | ']' => {}
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// tree-sitter backend
// ---------------------------------------------------------------------------

const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

/// Java grammar backend. A file the grammar reports errors for is rejected.
pub struct TreeSitterSegmenter;

impl TreeSitterSegmenter {
    fn node_text<'a>(node: Node<'_>, bytes: &'a [u8]) -> &'a str {
        node.utf8_text(bytes).unwrap_or("")
    }

    fn param_types(node: Node<'_>, bytes: &[u8]) -> Vec<String> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut cursor = params.walk();
        let mut types = Vec::new();
        for param in params.named_children(&mut cursor) {
            let type_node = match param.kind() {
                "formal_parameter" => param.child_by_field_name("type"),
                "spread_parameter" => {
                    let mut inner = param.walk();
                    let found = param
                        .named_children(&mut inner)
                        .find(|c| c.kind() != "modifiers" && c.kind() != "variable_declarator");
                    found
                }
                _ => None,
            };
            if let Some(t) = type_node {
                types.push(normalize_param_type(Self::node_text(t, bytes)));
            }
        }
        types
    }
}

impl MethodSegmenter for TreeSitterSegmenter {
    fn name(&self) -> &'static str {
        "tree_sitter"
    }

    fn segments(&self, source: &str) -> Result<Vec<MethodSegment>, String> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| format!("Failed to set language: {e}"))?;
        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or_else(|| "parser produced no tree".to_string())?;
        let root = tree.root_node();
        if root.has_error() {
            return Err("source has syntax errors".to_string());
        }

        let bytes = source.as_bytes();
        let mut segments = Vec::new();
        // Depth-first, children pushed in reverse so pops follow source order.
        let mut stack: Vec<(Node<'_>, Option<String>)> = vec![(root, None)];
        while let Some((node, enclosing)) = stack.pop() {
            let kind = node.kind();
            let mut scope = enclosing;
            if TYPE_DECLARATION_KINDS.contains(&kind) {
                if let Some(name) = node.child_by_field_name("name") {
                    scope = Some(Self::node_text(name, bytes).to_string());
                }
            } else if kind == "method_declaration" {
                if let Some(name_node) = node.child_by_field_name("name") {
                    segments.push(MethodSegment {
                        name: Self::node_text(name_node, bytes).to_string(),
                        param_types: Self::param_types(node, bytes),
                        start_line: node.start_position().row + 1,
                        name_line: name_node.start_position().row + 1,
                        class_name: scope.clone(),
                    });
                }
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
            for child in children.into_iter().rev() {
                stack.push((child, scope.clone()));
            }
        }
        Ok(segments)
    }
}

// ---------------------------------------------------------------------------
// Lexical backend
// ---------------------------------------------------------------------------

static JAVA_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|protected|private|abstract|final|static|sealed|non-sealed|strictfp)\s+)*(?:class|interface|enum|record|@interface)\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .unwrap()
});

static JAVA_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|protected|private|static|final|abstract|synchronized|native|default|strictfp)\s+)*(?:<[^>]*>\s+)?([A-Za-z_][A-Za-z0-9_<>\[\],.? ]*?)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*(?:throws\s+[A-Za-z0-9_.,\s]+?)?\s*[{;]",
    )
    .unwrap()
});

static LEADING_ANNOTATIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:@[A-Za-z_][A-Za-z0-9_.]*(?:\([^)]*\))?\s*)+").unwrap()
});

const MODIFIER_WORDS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "synchronized",
    "native",
    "default",
    "strictfp",
];

const STATEMENT_WORDS: &[&str] = &[
    "return", "throw", "new", "else", "case", "yield", "assert", "package", "import",
];

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// Split a parameter list on commas outside generic brackets.
fn split_params(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in raw.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&raw[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

/// Type of one `Type name` parameter chunk, with annotations and `final` dropped.
fn lexical_param_type(chunk: &str) -> Option<String> {
    let stripped = LEADING_ANNOTATIONS_RE.replace(chunk, "");
    let stripped = stripped.trim().trim_start_matches("final ").trim();
    let (type_part, _name) = stripped.rsplit_once(char::is_whitespace)?;
    let normalized = normalize_param_type(type_part);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn brace_delta(line: &str) -> i64 {
    line.chars().fold(0i64, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    })
}

/// Line-oriented regex scanner with a class stack. Never fails.
///
/// A method is recognised only when its header sits on one line directly
/// inside a type body.
pub struct LexicalSegmenter;

impl MethodSegmenter for LexicalSegmenter {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn segments(&self, source: &str) -> Result<Vec<MethodSegment>, String> {
        let lines: Vec<&str> = source.lines().collect();
        let mut segments = Vec::new();
        // (class name, brace depth of its body)
        let mut class_stack: Vec<(String, i64)> = Vec::new();
        let mut depth: i64 = 0;

        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || is_comment_line(trimmed) {
                continue;
            }
            let code = LEADING_ANNOTATIONS_RE.replace(line, "");

            if let Some(caps) = JAVA_CLASS_RE.captures(&code) {
                class_stack.push((caps[1].to_string(), depth + 1));
            } else if let Some((class_name, body_depth)) = class_stack.last() {
                if *body_depth == depth {
                    if let Some(caps) = JAVA_METHOD_RE.captures(&code) {
                        let return_type = caps[1].trim();
                        let name = &caps[2];
                        let first_word = return_type.split_whitespace().next().unwrap_or("");
                        let is_declaration = !MODIFIER_WORDS.contains(&return_type)
                            && !STATEMENT_WORDS.contains(&first_word)
                            && name != class_name.as_str();
                        if is_declaration {
                            let mut start = idx;
                            while start > 0 && lines[start - 1].trim_start().starts_with('@') {
                                start -= 1;
                            }
                            segments.push(MethodSegment {
                                name: name.to_string(),
                                param_types: split_params(&caps[3])
                                    .into_iter()
                                    .filter_map(lexical_param_type)
                                    .collect(),
                                start_line: start + 1,
                                name_line: idx + 1,
                                class_name: Some(class_name.clone()),
                            });
                        }
                    }
                }
            }

            depth += brace_delta(line);
            while class_stack.last().is_some_and(|(_, body)| depth < *body) {
                class_stack.pop();
            }
        }
        Ok(segments)
    }
}

// ---------------------------------------------------------------------------
// Fallback composition
// ---------------------------------------------------------------------------

/// Grammar backend first, lexical scanner for files it rejects.
pub struct FallbackSegmenter {
    primary: TreeSitterSegmenter,
    fallback: LexicalSegmenter,
}

impl MethodSegmenter for FallbackSegmenter {
    fn name(&self) -> &'static str {
        "tree_sitter_with_fallback"
    }

    fn segments(&self, source: &str) -> Result<Vec<MethodSegment>, String> {
        self.primary.segments(source).or_else(|err| {
            debug!(error = %err, "grammar segmentation failed, using lexical scanner");
            self.fallback.segments(source)
        })
    }
}
