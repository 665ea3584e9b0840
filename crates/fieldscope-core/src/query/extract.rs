//! End-to-end extraction: scan, segment, seed, expand, render snippets.
//!
//! Every call owns its method table, graph, and frontier. Nothing is cached
//! between calls; each call re-reads its candidate files from disk.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::config::{ExtractorConfig, PropagationConfig};
use crate::errors::ExtractResult;
use crate::indexer::callgraph::{CallGraph, MethodTable};
use crate::indexer::filesystem::scan_candidate_files;
use crate::indexer::parser::segmenter_for;
use crate::indexer::symbols::segment_file;
use crate::models::{MethodCategory, MethodSignature, SnippetsByFile, SourceMethod};
use crate::query::context::{assemble_context, TrimmedContext};
use crate::query::expand::{expand, propagate_scores, ExpansionOptions};
use crate::query::guards::normalize_keywords;
use crate::query::relevance::is_relevant_lower;
use crate::query::scoring::{IntrinsicScorer, MappingAwareScorer};

/// Methods and call graph built from one scan.
#[derive(Debug, Default)]
pub struct IndexedSources {
    /// Candidate file paths in rank order.
    pub files: Vec<String>,
    pub table: MethodTable,
    pub graph: CallGraph,
    /// Keyword-relevant methods, in table order.
    pub seeds: Vec<usize>,
    /// Lowercased, normalised keywords.
    pub keywords_lower: Vec<String>,
}

/// Why a method is in the result, plus its score in propagated mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub category: MethodCategory,
    pub score: Option<u64>,
}

/// Scan `root`, segment every candidate file, and build the call graph.
///
/// Files that fail to segment are skipped with a warning.
pub fn index_sources(root: &Path, keywords: &[String], config: &ExtractorConfig) -> IndexedSources {
    let keywords_lower: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let candidates = scan_candidate_files(root, keywords, config);
    let segmenter = segmenter_for(config.segmenter);

    let mut table = MethodTable::new();
    let mut files = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let path = candidate.display_path();
        match segment_file(&path, &candidate.source, segmenter.as_ref()) {
            Ok(methods) => {
                for method in methods {
                    table.insert(method);
                }
            }
            Err(e) => {
                warn!(error = %e, segmenter = segmenter.name(), "skipping file");
            }
        }
        files.push(path);
    }

    let graph = CallGraph::build(&table);
    let seeds: Vec<usize> = table
        .iter()
        .filter(|(_, _, m)| is_relevant_lower(&m.text, &keywords_lower))
        .map(|(idx, _, _)| idx)
        .collect();

    info!(
        files = files.len(),
        methods = table.len(),
        edges = graph.edge_count(),
        seeds = seeds.len(),
        "indexed candidate sources"
    );
    IndexedSources {
        files,
        table,
        graph,
        seeds,
        keywords_lower,
    }
}

/// Relation of a non-seed method to the seed set.
fn classify(idx: usize, seeds: &HashSet<usize>, graph: &CallGraph) -> MethodCategory {
    if seeds.contains(&idx) {
        return MethodCategory::Seed;
    }
    let calls_seed = graph.callees(idx).iter().any(|c| seeds.contains(c));
    let called_by_seed = graph.callers(idx).iter().any(|c| seeds.contains(c));
    match (calls_seed, called_by_seed) {
        (true, true) => MethodCategory::CallerAndCallee,
        (true, false) => MethodCategory::CallsSeedMethod,
        (false, true) => MethodCategory::CalledBySeed,
        (false, false) => MethodCategory::IndirectlyRelated,
    }
}

fn expansion_options(config: &ExtractorConfig) -> ExpansionOptions {
    ExpansionOptions {
        max_depth: config.max_depth,
        include_callers: config.include_callers,
        include_callees: config.include_callees,
    }
}

/// Plain mode: everything reachable within the depth limit.
pub fn select_reachable(
    indexed: &IndexedSources,
    config: &ExtractorConfig,
) -> IndexMap<usize, Selection> {
    let seed_set: HashSet<usize> = indexed.seeds.iter().copied().collect();
    expand(&indexed.graph, &indexed.seeds, &expansion_options(config))
        .into_keys()
        .map(|idx| {
            let selection = Selection {
                category: classify(idx, &seed_set, &indexed.graph),
                score: None,
            };
            (idx, selection)
        })
        .collect()
}

/// Propagated mode: seeds, callees scoring at least the threshold, and
/// (boolean) callers when enabled.
pub fn select_propagated(
    indexed: &IndexedSources,
    config: &ExtractorConfig,
    propagation: &PropagationConfig,
    scorer: &dyn IntrinsicScorer,
) -> IndexMap<usize, Selection> {
    let depth = if config.include_callees {
        config.max_depth
    } else {
        0
    };
    let scores = propagate_scores(
        &indexed.table,
        &indexed.graph,
        &indexed.seeds,
        scorer,
        propagation.propagation_factor,
        depth,
    );
    let seed_set: HashSet<usize> = indexed.seeds.iter().copied().collect();

    let mut selected: IndexMap<usize, Selection> = IndexMap::new();
    for (&idx, &score) in &scores {
        if seed_set.contains(&idx) {
            selected.insert(
                idx,
                Selection {
                    category: MethodCategory::Seed,
                    score: Some(score),
                },
            );
        } else if score >= propagation.threshold {
            selected.insert(
                idx,
                Selection {
                    category: MethodCategory::Propagated,
                    score: Some(score),
                },
            );
        }
    }

    if config.include_callers {
        let options = ExpansionOptions {
            max_depth: config.max_depth,
            include_callers: true,
            include_callees: false,
        };
        for idx in expand(&indexed.graph, &indexed.seeds, &options).into_keys() {
            selected.entry(idx).or_insert_with(|| Selection {
                category: classify(idx, &seed_set, &indexed.graph),
                score: None,
            });
        }
    }
    selected
}

/// Header comment identifying a method, followed by its source text.
pub fn render_snippet(method: &SourceMethod, selection: &Selection, contains_keywords: bool) -> String {
    let mut header = format!(
        "// [{}] Method: {}",
        selection.category.label(),
        method.qualified_name()
    );
    if contains_keywords {
        header.push_str(" [CONTAINS KEYWORDS]");
    }
    if let Some(score) = selection.score {
        header.push_str(&format!(" [Score: {score}]"));
    }
    format!("{header}\n// File: {}\n{}", method.file_path, method.text)
}

/// Group selected methods by file: files in candidate order, methods by
/// start line.
pub fn render_snippets(
    indexed: &IndexedSources,
    selected: &IndexMap<usize, Selection>,
) -> SnippetsByFile {
    let mut by_file: IndexMap<&str, Vec<(usize, &SourceMethod, &Selection)>> = indexed
        .files
        .iter()
        .map(|f| (f.as_str(), Vec::new()))
        .collect();
    for (&idx, selection) in selected {
        if let Some(method) = indexed.table.method(idx) {
            by_file
                .entry(method.file_path.as_str())
                .or_default()
                .push((idx, method, selection));
        }
    }

    let mut snippets = SnippetsByFile::new();
    for (path, mut methods) in by_file {
        if methods.is_empty() {
            continue;
        }
        methods.sort_by_key(|(idx, m, _)| (m.start_line, *idx));
        let rendered = methods
            .into_iter()
            .map(|(_, m, selection)| {
                let relevant = is_relevant_lower(&m.text, &indexed.keywords_lower);
                render_snippet(m, selection, relevant)
            })
            .collect();
        snippets.insert(path.to_string(), rendered);
    }
    snippets
}

/// Extract annotated snippets for `keywords`, scoring seeds with `scorer`
/// when propagation is configured.
pub fn extract_code_blocks_with(
    root: &Path,
    keywords: &[String],
    config: &ExtractorConfig,
    scorer: &dyn IntrinsicScorer,
) -> ExtractResult<SnippetsByFile> {
    config.validate()?;
    let keywords = normalize_keywords(keywords);
    if keywords.is_empty() {
        return Ok(SnippetsByFile::new());
    }
    let indexed = index_sources(root, &keywords, config);
    if indexed.seeds.is_empty() {
        return Ok(SnippetsByFile::new());
    }

    let selected = match &config.propagation {
        Some(propagation) => select_propagated(&indexed, config, propagation, scorer),
        None => select_reachable(&indexed, config),
    };
    let snippets = render_snippets(&indexed, &selected);
    info!(
        seeds = indexed.seeds.len(),
        selected = selected.len(),
        files = snippets.len(),
        "extracted code blocks"
    );
    Ok(snippets)
}

/// Extract annotated snippets with the default mapping-aware scorer.
pub fn extract_code_blocks(
    root: &Path,
    keywords: &[String],
    config: &ExtractorConfig,
) -> ExtractResult<SnippetsByFile> {
    let normalized = normalize_keywords(keywords);
    let scorer = MappingAwareScorer::new(&normalized);
    extract_code_blocks_with(root, &normalized, config, &scorer)
}

/// Propagated score of every method the propagation reached, seeds included.
///
/// Uses `config.propagation`, or the default parameters when it is unset.
pub fn extract_propagated_scores(
    root: &Path,
    keywords: &[String],
    config: &ExtractorConfig,
    scorer: &dyn IntrinsicScorer,
) -> ExtractResult<IndexMap<MethodSignature, u64>> {
    config.validate()?;
    let keywords = normalize_keywords(keywords);
    if keywords.is_empty() {
        return Ok(IndexMap::new());
    }
    let propagation = config.propagation.clone().unwrap_or_default();
    let indexed = index_sources(root, &keywords, config);
    let scores = propagate_scores(
        &indexed.table,
        &indexed.graph,
        &indexed.seeds,
        scorer,
        propagation.propagation_factor,
        config.max_depth,
    );
    Ok(scores
        .into_iter()
        .filter_map(|(idx, score)| indexed.table.signature(idx).map(|s| (s.clone(), score)))
        .collect())
}

/// Extract and trim in one call, using the configured budget and markers.
pub fn build_context(
    root: &Path,
    keywords: &[String],
    config: &ExtractorConfig,
) -> ExtractResult<TrimmedContext> {
    let snippets = extract_code_blocks(root, keywords, config)?;
    Ok(assemble_context(
        &snippets,
        config.max_context_chars,
        &config.ranking,
    ))
}
