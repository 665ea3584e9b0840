//! Context ranking and budget trimming.
//!
//! Snippets are ranked by marker heuristics, stably sorted, and packed in
//! order into a character budget. Packing stops at the first block that does
//! not fit; later, smaller blocks are not tried.

use serde::Serialize;
use tracing::info;

use crate::config::RankingMarkers;
use crate::models::{RankedSnippet, SnippetsByFile};
use crate::query::tokenizer::estimate_tokens;

/// Outcome of trimming snippets into a budget.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrimmedContext {
    pub text: String,
    pub included: usize,
    pub available: usize,
    /// Length of `text` in characters.
    pub chars: usize,
    pub estimated_tokens: usize,
}

/// Header of a seed snippet or of one that matched the keywords directly.
fn is_seed_header(snippet: &str) -> bool {
    let header = snippet.lines().next().unwrap_or("");
    header.contains("[SEED]") || header.contains("[CONTAINS KEYWORDS]")
}

/// 1 for seed headers and domain markers, 2 for visibility markers,
/// 3 otherwise.
pub fn snippet_priority(snippet: &str, markers: &RankingMarkers) -> u8 {
    if is_seed_header(snippet) {
        return 1;
    }
    let lowered = snippet.to_lowercase();
    let has_any = |words: &[String]| {
        words
            .iter()
            .any(|w| !w.is_empty() && lowered.contains(&w.to_lowercase()))
    };
    if has_any(&markers.domain) {
        1
    } else if has_any(&markers.visibility) {
        2
    } else {
        3
    }
}

/// Flatten and rank snippets. Ties keep encounter order.
pub fn rank_snippets(snippets: &SnippetsByFile, markers: &RankingMarkers) -> Vec<RankedSnippet> {
    let mut ranked: Vec<RankedSnippet> = snippets
        .iter()
        .flat_map(|(path, texts)| texts.iter().map(move |text| (path, text)))
        .enumerate()
        .map(|(order, (path, text))| RankedSnippet {
            priority: snippet_priority(text, markers),
            order,
            file_path: path.clone(),
            text: text.clone(),
        })
        .collect();
    ranked.sort_by_key(|s| (s.priority, s.order));
    ranked
}

pub fn format_block(file_path: &str, snippet: &str) -> String {
    format!("File: {file_path}\n{snippet}\n")
}

/// Rank, then greedily pack whole blocks until the next one would overflow
/// `max_chars`.
pub fn assemble_context(
    snippets: &SnippetsByFile,
    max_chars: usize,
    markers: &RankingMarkers,
) -> TrimmedContext {
    let ranked = rank_snippets(snippets, markers);
    let available = ranked.len();

    let mut text = String::new();
    let mut chars = 0usize;
    let mut included = 0usize;
    for snippet in &ranked {
        let block = format_block(&snippet.file_path, &snippet.text);
        let block_chars = block.chars().count();
        if chars + block_chars > max_chars {
            break;
        }
        text.push_str(&block);
        chars += block_chars;
        included += 1;
    }

    if available > 0 {
        info!(included, available, chars, budget = max_chars, "assembled code context");
    }
    TrimmedContext {
        estimated_tokens: estimate_tokens(&text),
        text,
        included,
        available,
        chars,
    }
}

/// Trimmed context text under the default priority markers.
pub fn trim_code_context(snippets: &SnippetsByFile, max_chars: usize) -> String {
    assemble_context(snippets, max_chars, &RankingMarkers::default()).text
}
