//! Single-project metric collection.
//!
//! [`ProjectCollector`] walks one Python project tree and produces a
//! [`ProjectSnapshot`]: file counts split into core and test modules, line
//! counts, documentation counts, a test-case count from pytest (with a
//! filename-heuristic fallback), and coverage from a Cobertura report when
//! one is present. A missing project directory yields a zeroed snapshot,
//! never an error.

pub mod coverage;
pub mod tests_count;

pub use coverage::CoverageSummary;
pub use tests_count::{FallbackCounter, HeuristicCounter, PytestCollector, TestCounter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::CollectorConfig;
use crate::subprocess::SubprocessManager;
use crate::Result;

/// One project's metrics at a point in time.
///
/// Immutable once produced; `core_file_count + test_file_count` always
/// equals `python_file_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub name: String,
    pub path: PathBuf,
    pub python_file_count: usize,
    pub core_file_count: usize,
    pub test_file_count: usize,
    pub lines_of_code: usize,
    pub test_count: usize,
    pub documentation_file_count: usize,
    /// Line coverage in percent, absent when no report was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_percentage: Option<f64>,
    /// Full coverage detail when a report was parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageSummary>,
    pub collected_at: DateTime<Utc>,
}

impl ProjectSnapshot {
    /// All-zero snapshot for a project whose path does not exist.
    pub fn empty(name: &str, path: &Path) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            python_file_count: 0,
            core_file_count: 0,
            test_file_count: 0,
            lines_of_code: 0,
            test_count: 0,
            documentation_file_count: 0,
            coverage_percentage: None,
            coverage: None,
            collected_at: Utc::now(),
        }
    }
}

/// Walks a project tree and produces a [`ProjectSnapshot`].
pub struct ProjectCollector {
    root: PathBuf,
    config: CollectorConfig,
    counter: Box<dyn TestCounter>,
}

impl ProjectCollector {
    /// Collector with the default configuration and the standard test
    /// counter wiring (pytest, falling back to the filename heuristic).
    ///
    /// The path is not validated here; a nonexistent root produces a zeroed
    /// snapshot at collection time.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, CollectorConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: CollectorConfig) -> Self {
        let counter = FallbackCounter::pytest_with_heuristic(
            SubprocessManager::production(),
            config.pytest_timeout,
            config.excludes.clone(),
        );
        Self::with_counter(root, config, Box::new(counter))
    }

    /// Inject an alternative test counter (used by tests).
    pub fn with_counter(
        root: impl Into<PathBuf>,
        config: CollectorConfig,
        counter: Box<dyn TestCounter>,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            counter,
        }
    }

    /// Collect all metrics for the project rooted at this collector's path.
    pub async fn collect(&self, name: &str) -> Result<ProjectSnapshot> {
        if !self.root.is_dir() {
            warn!(path = %self.root.display(), "project path missing, recording zeroed snapshot");
            return Ok(ProjectSnapshot::empty(name, &self.root));
        }

        let scan = self.scan_tree();
        let test_count = match self.counter.count(&self.root).await {
            Ok(count) => count,
            Err(err) => {
                warn!(project = name, error = %err, "test counting failed, recording zero");
                0
            }
        };
        let coverage = coverage::for_project(&self.root);

        debug!(
            project = name,
            python_files = scan.python_files,
            lines = scan.lines,
            tests = test_count,
            "collected project metrics"
        );

        Ok(ProjectSnapshot {
            name: name.to_string(),
            path: self.root.clone(),
            python_file_count: scan.python_files,
            core_file_count: scan.core_files,
            test_file_count: scan.test_files,
            lines_of_code: scan.lines,
            test_count,
            documentation_file_count: scan.doc_files,
            coverage_percentage: coverage.as_ref().map(|c| c.percentage),
            coverage,
            collected_at: Utc::now(),
        })
    }

    fn scan_tree(&self) -> TreeCounts {
        let mut counts = TreeCounts::default();
        let walker = WalkDir::new(&self.root).into_iter().filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            match entry.file_name().to_str() {
                Some(dir) => !self.config.excludes.is_excluded_dir(dir),
                None => false,
            }
        });

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if self.config.excludes.is_excluded_file(relative) {
                continue;
            }

            if path.extension().is_some_and(|ext| ext == "py") {
                // Skip unreadable or non-UTF-8 files from both the file and
                // line counts.
                let text = match fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(err) => {
                        debug!(path = %path.display(), error = %err, "skipping unreadable file");
                        continue;
                    }
                };
                counts.python_files += 1;
                if is_test_file(relative) {
                    counts.test_files += 1;
                } else {
                    counts.core_files += 1;
                }
                counts.lines += text.lines().count();
            } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if self.config.doc_extensions.contains(&ext.to_ascii_lowercase()) {
                    counts.doc_files += 1;
                }
            }
        }

        counts
    }
}

#[derive(Debug, Default)]
struct TreeCounts {
    python_files: usize,
    core_files: usize,
    test_files: usize,
    lines: usize,
    doc_files: usize,
}

/// Classify a Python file (by its root-relative path) as a test module.
fn is_test_file(relative: &Path) -> bool {
    let in_tests_dir = relative.components().any(|component| {
        matches!(component, Component::Normal(part) if part == "tests")
    });
    if in_tests_dir {
        return true;
    }
    let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_ascii_lowercase();
    lower.starts_with("test_")
        || lower.ends_with("_test.py")
        || lower == "conftest.py"
        || lower.contains("test")
}
