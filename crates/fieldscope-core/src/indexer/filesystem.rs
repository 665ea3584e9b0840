//! Source-tree scanning: keyword-conjunction file filter and candidate ranking.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{ExtractorConfig, FileRanking};

/// A source file whose text contains every requested keyword.
#[derive(Clone, Debug)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub source: String,
    pub weight: usize,
}

impl CandidateFile {
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

fn is_skipped_dir(name: &OsStr, skip_dirs: &[String]) -> bool {
    let name = name.to_string_lossy();
    skip_dirs.iter().any(|d| d.as_str() == name)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Walk `root` in file-name order and return every file with `extension`.
///
/// A missing or non-directory root yields nothing. Unreadable directory
/// entries are skipped.
pub fn iter_source_files(root: &Path, extension: &str, skip_dirs: &[String]) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.depth() > 0
                && entry.file_type().is_dir()
                && is_skipped_dir(entry.file_name(), skip_dirs))
        })
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                debug!(error = %err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), extension))
        .map(|entry| entry.into_path())
        .collect()
}

/// True when every lowercased keyword occurs in the lowercased content.
pub fn contains_all_keywords(content_lower: &str, keywords_lower: &[String]) -> bool {
    !keywords_lower.is_empty() && keywords_lower.iter().all(|k| content_lower.contains(k.as_str()))
}

fn keyword_occurrences(content_lower: &str, keywords_lower: &[String]) -> usize {
    keywords_lower
        .iter()
        .map(|k| content_lower.matches(k.as_str()).count())
        .sum()
}

/// Select, rank, and cap the files that contain all `keywords`.
///
/// Ranking is stable: equal weights keep walk order.
pub fn scan_candidate_files(
    root: &Path,
    keywords: &[String],
    config: &ExtractorConfig,
) -> Vec<CandidateFile> {
    if keywords.is_empty() {
        return Vec::new();
    }
    let keywords_lower: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let extension = config.extension();
    let files = iter_source_files(root, &extension, &config.skip_dirs);
    let files_seen = files.len();

    let mut candidates: Vec<CandidateFile> = Vec::new();
    for path in files {
        let source = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let lowered = source.to_lowercase();
        if !contains_all_keywords(&lowered, &keywords_lower) {
            continue;
        }
        let weight = match config.file_ranking {
            FileRanking::WalkOrder => 1,
            FileRanking::KeywordDensity => keyword_occurrences(&lowered, &keywords_lower),
        };
        candidates.push(CandidateFile {
            path,
            source,
            weight,
        });
    }

    let matched = candidates.len();
    candidates.sort_by(|a, b| b.weight.cmp(&a.weight));
    candidates.truncate(config.effective_file_cap());

    info!(
        root = %root.display(),
        files_seen,
        matched,
        kept = candidates.len(),
        "scanned source tree"
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::guards::normalize_keywords;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn names(candidates: &[CandidateFile]) -> Vec<String> {
        candidates
            .iter()
            .map(|c| c.path.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_conjunction_requires_every_keyword() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Both.java", "class Both { String a; String B; }");
        write(dir.path(), "OnlyA.java", "class OnlyA { String a; }");
        let config = ExtractorConfig::default();
        let found = scan_candidate_files(dir.path(), &kw(&["a", "b"]), &config);
        assert_eq!(names(&found), vec!["Both.java"]);
    }

    #[test]
    fn test_every_keyword_counts_in_long_lists() {
        let dir = tempfile::tempdir().unwrap();
        let present: Vec<String> = (0..32).map(|i| format!("token{i:02}")).collect();
        write(dir.path(), "A.java", &format!("class A {{ /* {} */ }}", present.join(" ")));
        let mut keywords = present.clone();
        keywords.push("absentKeyword".to_string());
        let config = ExtractorConfig::default();

        let found = scan_candidate_files(dir.path(), &normalize_keywords(&keywords), &config);
        assert!(found.is_empty());

        let found = scan_candidate_files(dir.path(), &normalize_keywords(&present), &config);
        assert_eq!(names(&found), vec!["A.java"]);
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Mapper.java", "class Mapper { void mapPOSTALCODE() {} }");
        let config = ExtractorConfig::default();
        let found = scan_candidate_files(dir.path(), &kw(&["postalCode"]), &config);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_only_recognised_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.txt", "postalCode");
        write(dir.path(), "Address.JAVA", "class Address { String postalCode; }");
        let config = ExtractorConfig::default();
        let found = scan_candidate_files(dir.path(), &kw(&["postalCode"]), &config);
        assert_eq!(names(&found), vec!["Address.JAVA"]);
    }

    #[test]
    fn test_cap_keeps_walk_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["D.java", "B.java", "A.java", "C.java"] {
            write(dir.path(), name, "class X { int zip; }");
        }
        let config = ExtractorConfig::default();
        let found = scan_candidate_files(dir.path(), &kw(&["zip"]), &config);
        assert_eq!(names(&found), vec!["A.java", "B.java", "C.java"]);
    }

    #[test]
    fn test_keyword_density_ranking() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A.java", "zip");
        write(dir.path(), "B.java", "zip zip zip");
        write(dir.path(), "C.java", "zip zip");
        let config = ExtractorConfig {
            file_ranking: FileRanking::KeywordDensity,
            max_candidate_files: 2,
            ..ExtractorConfig::default()
        };
        let found = scan_candidate_files(dir.path(), &kw(&["zip"]), &config);
        assert_eq!(names(&found), vec!["B.java", "C.java"]);
        assert_eq!(found[0].weight, 3);
    }

    #[test]
    fn test_skip_dirs_pruned() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "target/Gen.java", "zip");
        write(dir.path(), "src/main/Real.java", "zip");
        let files = iter_source_files(dir.path(), "java", &["target".to_string()]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/main/Real.java"));
    }

    #[test]
    fn test_nonexistent_root_is_empty() {
        let config = ExtractorConfig::default();
        let found = scan_candidate_files(
            Path::new("/definitely/not/here/fieldscope"),
            &kw(&["zip"]),
            &config,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_empty_keywords_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A.java", "class A {}");
        let found = scan_candidate_files(dir.path(), &[], &ExtractorConfig::default());
        assert!(found.is_empty());
    }

    #[test]
    fn test_invalid_utf8_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Bad.java"), [0x7a, 0x69, 0x70, 0xff, 0xfe]).unwrap();
        write(dir.path(), "Good.java", "zip");
        let found = scan_candidate_files(dir.path(), &kw(&["zip"]), &ExtractorConfig::default());
        assert_eq!(names(&found), vec!["Good.java"]);
    }
}
