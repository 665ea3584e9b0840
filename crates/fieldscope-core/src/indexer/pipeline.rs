//! Per-field batch extraction with Rayon-based parallelism.
//!
//! One whole extraction runs per field. Fields are independent: a failing
//! field gets an empty context and never aborts its siblings.

use std::path::Path;
use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ExtractorConfig;
use crate::models::FieldMetadata;
use crate::query::context::TrimmedContext;
use crate::query::extract::build_context;
use crate::query::guards::clamp_workers;
use crate::query::keywords::{field_key, field_keywords};

pub const DEFAULT_BATCH_WORKERS: usize = 6;

/// Outcome of extracting context for one field.
#[derive(Clone, Debug, Serialize)]
pub struct FieldContext {
    pub key: String,
    pub field_name: String,
    pub keywords: Vec<String>,
    pub context: TrimmedContext,
    pub error: Option<String>,
}

fn field_worker(root: &Path, field: &FieldMetadata, config: &ExtractorConfig) -> FieldContext {
    let key = field_key(field);
    let keywords = field_keywords(field);
    let (context, error) = match build_context(root, &keywords, config) {
        Ok(ctx) => (ctx, None),
        Err(e) => {
            warn!(field = %field.field_name, error = %e, "field extraction failed");
            (TrimmedContext::default(), Some(e.to_string()))
        }
    };
    FieldContext {
        key,
        field_name: field.field_name.clone(),
        keywords,
        context,
        error,
    }
}

/// Extract every field on a fixed-size pool. Results keep input order.
pub fn extract_fields(
    root: &Path,
    fields: &[FieldMetadata],
    config: &ExtractorConfig,
    workers: usize,
) -> Vec<FieldContext> {
    if fields.is_empty() {
        return vec![];
    }
    let started = Instant::now();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(clamp_workers(workers))
        .build();

    let results: Vec<FieldContext> = match pool {
        Ok(pool) => pool.install(|| {
            fields
                .par_iter()
                .map(|field| field_worker(root, field, config))
                .collect()
        }),
        Err(e) => {
            warn!(error = %e, "worker pool unavailable, extracting sequentially");
            fields
                .iter()
                .map(|field| field_worker(root, field, config))
                .collect()
        }
    };

    info!(
        fields = results.len(),
        failed = results.iter().filter(|r| r.error.is_some()).count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch extraction finished"
    );
    results
}

/// Field key to trimmed context text, in input order.
pub fn build_field_contexts(
    root: &Path,
    fields: &[FieldMetadata],
    config: &ExtractorConfig,
    workers: usize,
) -> IndexMap<String, String> {
    extract_fields(root, fields, config, workers)
        .into_iter()
        .map(|r| (r.key, r.context.text))
        .collect()
}
