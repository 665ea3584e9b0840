//! Criterion benchmarks for fieldscope-core.
//!
//! Everything here is plain Rust; no Python runtime is needed.
//!
//! ## Benchmark groups
//!
//! 1. **guards**: input clamping and keyword normalisation.
//! 2. **segmentation**: tree-sitter and lexical segmenters on a synthetic class.
//! 3. **call_graph**: call extraction and graph construction.
//! 4. **expansion**: plain BFS and score propagation on a synthetic chain graph.
//! 5. **context**: ranking and trimming at several budgets.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/fieldscope-core/Cargo.toml
//! # Run only the expansion group:
//! cargo bench --manifest-path crates/fieldscope-core/Cargo.toml -- expansion
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use _fieldscope_core::config::RankingMarkers;
use _fieldscope_core::indexer::callgraph::{extract_calls, CallGraph, MethodTable};
use _fieldscope_core::indexer::parser::{LexicalSegmenter, MethodSegmenter, TreeSitterSegmenter};
use _fieldscope_core::indexer::symbols::segment_file;
use _fieldscope_core::models::{SnippetsByFile, SourceMethod};
use _fieldscope_core::query::context::assemble_context;
use _fieldscope_core::query::expand::{expand, propagate_scores, ExpansionOptions};
use _fieldscope_core::query::guards::{clamp_file_cap, clamp_workers, normalize_keywords};
use _fieldscope_core::query::tokenizer::estimate_tokens;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A class with `methods` methods where method `i` calls method `i + 1`.
fn synthetic_class(methods: usize) -> String {
    let mut src = String::from("package com.bench;\n\npublic class Chain {\n");
    for i in 0..methods {
        src.push_str(&format!("    @Override\n    public String step{i}(String value, int count) {{\n"));
        if i + 1 < methods {
            src.push_str(&format!("        return step{}(value.trim(), count);\n", i + 1));
        } else {
            src.push_str("        return value.postalCode();\n");
        }
        src.push_str("    }\n\n");
    }
    src.push_str("}\n");
    src
}

fn synthetic_table(methods: usize) -> MethodTable {
    let source = synthetic_class(methods);
    segment_file("Chain.java", &source, &TreeSitterSegmenter)
        .unwrap()
        .into_iter()
        .collect()
}

fn synthetic_snippets(count: usize) -> SnippetsByFile {
    let mut snippets = SnippetsByFile::new();
    for i in 0..count {
        let marker = match i % 3 {
            0 => "field",
            1 => "public",
            _ => "plain",
        };
        snippets
            .entry(format!("src/File{}.java", i % 7))
            .or_default()
            .push(format!("// {marker} snippet {i}\n{}", "x".repeat(80 + i % 40)));
    }
    snippets
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_guards(c: &mut Criterion) {
    let mut group = c.benchmark_group("guards");

    group.bench_function("clamp_file_cap", |b| {
        b.iter(|| clamp_file_cap(black_box(500)));
    });

    group.bench_function("clamp_workers", |b| {
        b.iter(|| clamp_workers(black_box(0)));
    });

    group.bench_function("normalize_keywords", |b| {
        let keywords: Vec<String> = ["PostalCode", " postalcode ", "", "Zip", "ZIP", "city"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        b.iter(|| normalize_keywords(black_box(&keywords)));
    });

    group.bench_function("estimate_tokens_1000_lines", |b| {
        let text = "    return mapper.toDto(address);\n".repeat(1000);
        b.iter(|| estimate_tokens(black_box(&text)));
    });

    group.finish();
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");

    for methods in [10usize, 100] {
        let source = synthetic_class(methods);
        group.bench_with_input(
            BenchmarkId::new("tree_sitter", methods),
            &source,
            |b, source| {
                b.iter(|| TreeSitterSegmenter.segments(black_box(source)).unwrap());
            },
        );
        group.bench_with_input(BenchmarkId::new("lexical", methods), &source, |b, source| {
            b.iter(|| LexicalSegmenter.segments(black_box(source)).unwrap());
        });
        group.bench_with_input(
            BenchmarkId::new("segment_file", methods),
            &source,
            |b, source| {
                b.iter(|| segment_file("Chain.java", black_box(source), &TreeSitterSegmenter).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_call_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_graph");

    group.bench_function("extract_calls", |b| {
        let body = "public void run(Address a) {\n    dto.setPostalCode(normalize(a.getZip()));\n    if (check(a)) { log(a); }\n}";
        b.iter(|| extract_calls(black_box(body)));
    });

    for methods in [100usize, 1000] {
        let table = synthetic_table(methods);
        group.bench_with_input(BenchmarkId::new("build", methods), &table, |b, table| {
            b.iter(|| CallGraph::build(black_box(table)));
        });
    }

    group.finish();
}

fn bench_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("expansion");

    let table = synthetic_table(500);
    let graph = CallGraph::build(&table);
    let seeds = vec![0usize, 250];

    for depth in [2usize, 6] {
        let options = ExpansionOptions {
            max_depth: depth,
            include_callers: true,
            include_callees: true,
        };
        group.bench_with_input(BenchmarkId::new("expand", depth), &options, |b, options| {
            b.iter(|| expand(&graph, black_box(&seeds), options));
        });
        group.bench_with_input(BenchmarkId::new("propagate", depth), &depth, |b, &depth| {
            let scorer = |_: &SourceMethod| -> u64 { 1000 };
            b.iter(|| propagate_scores(&table, &graph, black_box(&seeds), &scorer, 0.75, depth));
        });
    }

    group.finish();
}

fn bench_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("context");
    let markers = RankingMarkers::default();
    let snippets = synthetic_snippets(200);

    for budget in [2_500usize, 20_000] {
        group.bench_with_input(BenchmarkId::new("assemble", budget), &budget, |b, &budget| {
            b.iter(|| assemble_context(black_box(&snippets), budget, &markers));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_guards,
    bench_segmentation,
    bench_call_graph,
    bench_expansion,
    bench_context
);
criterion_main!(benches);
