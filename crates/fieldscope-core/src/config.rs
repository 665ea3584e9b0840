//! Extraction configuration: defaults, JSON loading, and environment overrides.
//!
//! The character budget, traversal depth, direction flags, and propagation
//! parameters are the whole tuning surface of an extraction call. Everything
//! else about the process (model prompts, spreadsheets) lives outside.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{ExtractError, ExtractResult};
use crate::query::guards::clamp_file_cap;

pub const ENV_MAX_FILES: &str = "FIELDSCOPE_MAX_FILES";
pub const ENV_MAX_DEPTH: &str = "FIELDSCOPE_MAX_DEPTH";
pub const ENV_CONTEXT_CHARS: &str = "FIELDSCOPE_CONTEXT_CHARS";
pub const ENV_SEGMENTER: &str = "FIELDSCOPE_SEGMENTER";
pub const ENV_INCLUDE_CALLERS: &str = "FIELDSCOPE_INCLUDE_CALLERS";

/// How candidate files are ordered before the file cap applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRanking {
    /// Every candidate weighs the same; walk order decides.
    #[default]
    WalkOrder,
    /// More keyword occurrences rank first; walk order breaks ties.
    KeywordDensity,
}

/// Which method segmenter backs the extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmenterKind {
    /// tree-sitter grammar; files that fail to parse are skipped.
    #[default]
    TreeSitter,
    /// Line-oriented regex scanner, never fails.
    Lexical,
    /// tree-sitter first, lexical scanner for files that fail to parse.
    TreeSitterWithFallback,
}

impl SegmenterKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "tree_sitter" | "treesitter" => Some(SegmenterKind::TreeSitter),
            "lexical" | "regex" => Some(SegmenterKind::Lexical),
            "tree_sitter_with_fallback" | "fallback" => Some(SegmenterKind::TreeSitterWithFallback),
            _ => None,
        }
    }
}

/// Parameters of score-propagated expansion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Per-depth decay, strictly between 0 and 1.
    pub propagation_factor: f64,
    /// Minimum propagated score for a non-seed method to be kept.
    pub threshold: u64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            propagation_factor: 0.75,
            threshold: 8,
        }
    }
}

/// Substrings that decide a snippet's trimming priority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingMarkers {
    /// Priority 1.
    pub domain: Vec<String>,
    /// Priority 2.
    pub visibility: Vec<String>,
}

impl Default for RankingMarkers {
    fn default() -> Self {
        Self {
            domain: ["xpath", "field", "validate", "check"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            visibility: ["public", "private", "protected"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub source_extension: String,
    pub skip_dirs: Vec<String>,
    pub max_candidate_files: usize,
    pub file_ranking: FileRanking,
    pub segmenter: SegmenterKind,
    pub max_depth: usize,
    pub include_callers: bool,
    pub include_callees: bool,
    /// `Some` switches expansion to score-propagated mode.
    pub propagation: Option<PropagationConfig>,
    pub max_context_chars: usize,
    pub ranking: RankingMarkers,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            source_extension: "java".to_string(),
            skip_dirs: [".git", "target", "build", "out", "node_modules"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            max_candidate_files: 3,
            file_ranking: FileRanking::WalkOrder,
            segmenter: SegmenterKind::TreeSitter,
            max_depth: 2,
            include_callers: true,
            include_callees: true,
            propagation: None,
            max_context_chars: 2500,
            ranking: RankingMarkers::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn from_json(text: &str) -> ExtractResult<Self> {
        let config: ExtractorConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `FIELDSCOPE_*` environment variables applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; malformed values are logged and ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_FILES) {
            match raw.trim().parse::<usize>() {
                Ok(v) => self.max_candidate_files = v,
                Err(_) => warn!(var = ENV_MAX_FILES, value = %raw, "ignoring malformed override"),
            }
        }
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            match raw.trim().parse::<usize>() {
                Ok(v) => self.max_depth = v,
                Err(_) => warn!(var = ENV_MAX_DEPTH, value = %raw, "ignoring malformed override"),
            }
        }
        if let Some(raw) = lookup(ENV_CONTEXT_CHARS) {
            match raw.trim().parse::<usize>() {
                Ok(v) => self.max_context_chars = v,
                Err(_) => {
                    warn!(var = ENV_CONTEXT_CHARS, value = %raw, "ignoring malformed override")
                }
            }
        }
        if let Some(raw) = lookup(ENV_SEGMENTER) {
            match SegmenterKind::parse(&raw) {
                Some(kind) => self.segmenter = kind,
                None => warn!(var = ENV_SEGMENTER, value = %raw, "ignoring malformed override"),
            }
        }
        if let Some(raw) = lookup(ENV_INCLUDE_CALLERS) {
            match parse_flag(&raw) {
                Some(flag) => self.include_callers = flag,
                None => {
                    warn!(var = ENV_INCLUDE_CALLERS, value = %raw, "ignoring malformed override")
                }
            }
        }
        self
    }

    pub fn validate(&self) -> ExtractResult<()> {
        if self.source_extension.trim().trim_start_matches('.').is_empty() {
            return Err(ExtractError::Config(
                "source_extension must not be empty".to_string(),
            ));
        }
        if let Some(propagation) = &self.propagation {
            let factor = propagation.propagation_factor;
            if !(factor > 0.0 && factor < 1.0) {
                return Err(ExtractError::Config(format!(
                    "propagation_factor must be in (0, 1), got {factor}"
                )));
            }
        }
        Ok(())
    }

    pub fn effective_file_cap(&self) -> usize {
        clamp_file_cap(self.max_candidate_files)
    }

    /// Extension without a leading dot, lowercased.
    pub fn extension(&self) -> String {
        self.source_extension
            .trim()
            .trim_start_matches('.')
            .to_lowercase()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
