//! Method records from source text.
//!
//! The segmenter reports where each declaration starts; this module decides
//! where it ends by brace balancing, slices the text span, drops in-file
//! duplicates, and records the calls each body makes.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{ExtractError, ExtractResult};
use crate::indexer::callgraph::extract_calls;
use crate::indexer::parser::MethodSegmenter;
use crate::models::SourceMethod;

static JAVA_PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*package\s+([A-Za-z0-9_.]+)\s*;").unwrap());

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// `line` without a trailing `//` comment. Slashes inside a string literal
/// are left alone.
fn strip_trailing_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut prev = '\0';
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' if prev != '\\' => in_string = !in_string,
            '/' if prev == '/' && !in_string => return &line[..idx - 1],
            _ => {}
        }
        prev = ch;
    }
    line
}

/// Package declared by the file, or an empty string.
pub fn package_name(source: &str) -> String {
    source
        .lines()
        .find_map(|line| JAVA_PACKAGE_RE.captures(line).map(|caps| caps[1].to_string()))
        .unwrap_or_default()
}

/// End line (1-based, inclusive) of the declaration whose header is on
/// `start_line`.
///
/// Blank and comment lines are skipped, as are trailing `//` comments. The
/// method ends on the line where
/// brace depth returns to zero after having been positive. A `;` seen before
/// any `{` ends a bodiless declaration. Unbalanced braces clamp to the last
/// line of the file.
pub fn find_method_end(lines: &[&str], start_line: usize) -> usize {
    let mut depth: i64 = 0;
    let mut opened = false;
    for (idx, line) in lines.iter().enumerate().skip(start_line.saturating_sub(1)) {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_comment_line(trimmed) {
            continue;
        }
        for ch in strip_trailing_comment(line).chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => {
                    depth -= 1;
                    if opened && depth == 0 {
                        return idx + 1;
                    }
                }
                ';' if !opened => return idx + 1,
                _ => {}
            }
        }
    }
    lines.len()
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Segment one file into `SourceMethod` records, in source order.
///
/// Only the first declaration of each `(name, parameter types)` pair is
/// kept. A segmenter failure is returned as `ExtractError::Parse`.
pub fn segment_file(
    path: &str,
    source: &str,
    segmenter: &dyn MethodSegmenter,
) -> ExtractResult<Vec<SourceMethod>> {
    let segments = segmenter
        .segments(source)
        .map_err(|message| ExtractError::parse(path, message))?;

    let package = package_name(source);
    let default_class = file_stem(path);
    let lines: Vec<&str> = source.lines().collect();
    let mut seen: HashSet<(String, Vec<String>)> = HashSet::new();
    let mut methods = Vec::with_capacity(segments.len());

    for segment in segments {
        let key = (segment.name.clone(), segment.param_types.clone());
        if !seen.insert(key) {
            continue;
        }
        let start = segment.start_line.clamp(1, lines.len().max(1));
        let end = find_method_end(&lines, segment.name_line).max(start);
        let text = lines
            .get(start - 1..end)
            .map(|span| span.join("\n"))
            .unwrap_or_default();
        let calls_made = extract_calls(&text);

        methods.push(SourceMethod {
            file_path: path.to_string(),
            package_name: package.clone(),
            class_name: segment
                .class_name
                .unwrap_or_else(|| default_class.clone()),
            name: segment.name,
            param_types: segment.param_types,
            start_line: start,
            end_line: end,
            text,
            calls_made,
        });
    }
    Ok(methods)
}
