//! Python bindings: the `_fieldscope_core` extension module.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3::wrap_pyfunction;
use tracing::warn;

use crate::config::{ExtractorConfig, PropagationConfig, SegmenterKind};
use crate::errors::{ExtractError, ExtractResult};
use crate::indexer::pipeline;
use crate::models::{FieldMetadata, SnippetsByFile, SourceMethod};
use crate::query::scoring::{IntrinsicScorer, MappingAwareScorer};
use crate::query::{context, extract, guards, keywords, tokenizer};

/// Python callable used as an intrinsic scorer.
///
/// Receives a dict describing the method and must return a non-negative int.
/// A raising or ill-typed callable scores the method 0.
struct PyScorer {
    callable: PyObject,
}

fn method_dict<'py>(py: Python<'py>, method: &SourceMethod) -> PyResult<Bound<'py, PyDict>> {
    let d = PyDict::new(py);
    d.set_item("signature", method.signature().to_string())?;
    d.set_item("qualified_name", method.qualified_name())?;
    d.set_item("file_path", &method.file_path)?;
    d.set_item("class_name", &method.class_name)?;
    d.set_item("name", &method.name)?;
    d.set_item("param_types", &method.param_types)?;
    d.set_item("start_line", method.start_line)?;
    d.set_item("end_line", method.end_line)?;
    d.set_item("text", &method.text)?;
    d.set_item("calls_made", method.calls_made.iter().collect::<Vec<_>>())?;
    Ok(d)
}

impl IntrinsicScorer for PyScorer {
    fn score(&self, method: &SourceMethod) -> u64 {
        Python::with_gil(|py| {
            let result = method_dict(py, method)
                .and_then(|d| self.callable.call1(py, (d,)))
                .and_then(|r| r.extract::<u64>(py));
            match result {
                Ok(score) => score,
                Err(e) => {
                    warn!(method = %method.signature(), error = %e, "scorer callable failed");
                    0
                }
            }
        })
    }
}

fn segmenter_kind(name: &str) -> ExtractResult<SegmenterKind> {
    SegmenterKind::parse(name)
        .ok_or_else(|| ExtractError::Config(format!("unknown segmenter: {name}")))
}

#[pyfunction]
#[pyo3(signature = (
    src_dir,
    keywords,
    max_depth=2,
    include_callers=true,
    include_callees=true,
    max_files=3,
    propagation_factor=None,
    threshold=8,
    segmenter="tree_sitter"
))]
#[allow(clippy::too_many_arguments)]
fn extract_code_context(
    py: Python<'_>,
    src_dir: &str,
    keywords: Vec<String>,
    max_depth: usize,
    include_callers: bool,
    include_callees: bool,
    max_files: usize,
    propagation_factor: Option<f64>,
    threshold: u64,
    segmenter: &str,
) -> PyResult<SnippetsByFile> {
    let config = ExtractorConfig {
        max_depth,
        include_callers,
        include_callees,
        max_candidate_files: max_files,
        propagation: propagation_factor.map(|propagation_factor| PropagationConfig {
            propagation_factor,
            threshold,
        }),
        segmenter: segmenter_kind(segmenter)?,
        ..ExtractorConfig::default()
    };
    let snippets =
        py.allow_threads(|| extract::extract_code_blocks(Path::new(src_dir), &keywords, &config))?;
    Ok(snippets)
}

#[pyfunction]
#[pyo3(signature = (src_dir, keywords, scorer=None, propagation_factor=0.75, max_depth=2, max_files=3))]
fn propagate_scores(
    py: Python<'_>,
    src_dir: &str,
    keywords: Vec<String>,
    scorer: Option<PyObject>,
    propagation_factor: f64,
    max_depth: usize,
    max_files: usize,
) -> PyResult<IndexMap<String, u64>> {
    let config = ExtractorConfig {
        max_depth,
        max_candidate_files: max_files,
        propagation: Some(PropagationConfig {
            propagation_factor,
            ..PropagationConfig::default()
        }),
        ..ExtractorConfig::default()
    };
    let scores = py.allow_threads(|| {
        let root = Path::new(src_dir);
        match scorer {
            Some(callable) => {
                let scorer = PyScorer { callable };
                extract::extract_propagated_scores(root, &keywords, &config, &scorer)
            }
            None => {
                let scorer = MappingAwareScorer::new(&guards::normalize_keywords(&keywords));
                extract::extract_propagated_scores(root, &keywords, &config, &scorer)
            }
        }
    })?;
    Ok(scores
        .into_iter()
        .map(|(sig, score)| (sig.to_string(), score))
        .collect())
}

#[pyfunction]
#[pyo3(signature = (snippets_by_file, max_chars=2500))]
fn trim_code_context(snippets_by_file: SnippetsByFile, max_chars: usize) -> String {
    context::trim_code_context(&snippets_by_file, max_chars)
}

#[pyfunction]
#[pyo3(signature = (field_name, backend_xpath=""))]
fn field_keywords(field_name: &str, backend_xpath: &str) -> Vec<String> {
    keywords::field_keywords(&FieldMetadata::new(field_name, backend_xpath))
}

#[pyfunction]
#[pyo3(signature = (field_name, backend_xpath=""))]
fn field_key(field_name: &str, backend_xpath: &str) -> String {
    keywords::field_key(&FieldMetadata::new(field_name, backend_xpath))
}

#[pyfunction]
#[pyo3(signature = (src_dir, fields, workers=6, max_chars=2500, max_depth=2))]
fn build_field_contexts(
    py: Python<'_>,
    src_dir: &str,
    fields: Vec<HashMap<String, String>>,
    workers: usize,
    max_chars: usize,
    max_depth: usize,
) -> IndexMap<String, String> {
    let fields: Vec<FieldMetadata> = fields
        .into_iter()
        .map(|mut f| FieldMetadata {
            field_name: f.remove("field_name").unwrap_or_default(),
            backend_xpath: f.remove("backend_xpath").unwrap_or_default(),
            description: f.remove("description").unwrap_or_default(),
        })
        .collect();
    let config = ExtractorConfig {
        max_context_chars: max_chars,
        max_depth,
        ..ExtractorConfig::from_env()
    };
    py.allow_threads(|| {
        pipeline::build_field_contexts(Path::new(src_dir), &fields, &config, workers)
    })
}

#[pyfunction]
fn estimate_tokens(text: &str) -> usize {
    tokenizer::estimate_tokens(text)
}

// ---------------------------------------------------------------------------
// Top-level Python module: _fieldscope_core
// ---------------------------------------------------------------------------

#[pymodule]
fn _fieldscope_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("MAX_CANDIDATE_FILES", guards::MAX_CANDIDATE_FILES)?;
    m.add("MAX_BATCH_WORKERS", guards::MAX_BATCH_WORKERS)?;
    m.add("DEFAULT_BATCH_WORKERS", pipeline::DEFAULT_BATCH_WORKERS)?;

    m.add_function(wrap_pyfunction!(extract_code_context, m)?)?;
    m.add_function(wrap_pyfunction!(propagate_scores, m)?)?;
    m.add_function(wrap_pyfunction!(trim_code_context, m)?)?;
    m.add_function(wrap_pyfunction!(field_keywords, m)?)?;
    m.add_function(wrap_pyfunction!(field_key, m)?)?;
    m.add_function(wrap_pyfunction!(build_field_contexts, m)?)?;
    m.add_function(wrap_pyfunction!(estimate_tokens, m)?)?;
    Ok(())
}
