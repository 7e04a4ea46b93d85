//! Explicit configuration passed into constructors; no process-wide state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Directory names that always exclude their whole subtree: caches, virtual
/// environments, version-control metadata.
const STRUCTURAL_EXCLUDES: &[&str] = &[
    "__pycache__",
    ".venv",
    "venv",
    "env",
    ".env",
    ".git",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    "htmlcov",
    "node_modules",
];

/// Directory names that commonly hold generated output but may also contain
/// hand-written code: a `.py` file under one of these still counts.
const SOFT_EXCLUDES: &[&str] = &[".github", "archive", "build", "dist"];

/// Filename prefixes excluded outright (AppleDouble droppings and the like).
const PREFIX_EXCLUDES: &[&str] = &["._"];

/// Two-tier exclusion rule set for project tree walks.
///
/// Structural patterns exclude a directory and everything under it. Soft
/// patterns exclude everything under the directory *except* `.py` files,
/// so source trees that happen to use names like `build` for real code are
/// not silently dropped.
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    structural: BTreeSet<String>,
    soft: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl Default for ExcludeRules {
    fn default() -> Self {
        Self {
            structural: STRUCTURAL_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            soft: SOFT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            prefixes: PREFIX_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExcludeRules {
    /// Add directory names to the structural tier; they exclude their whole
    /// subtree on top of the defaults.
    pub fn extend_structural<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.structural.extend(names.into_iter().map(Into::into));
    }

    /// Add directory names to the soft tier; `.py` files under them still
    /// count.
    pub fn extend_soft<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.soft.extend(names.into_iter().map(Into::into));
    }

    /// Whether a file at `path` (relative to the project root) is excluded
    /// from metrics.
    pub fn is_excluded_file(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if self.prefixes.iter().any(|p| name.starts_with(p)) {
                return true;
            }
        }

        let is_python = path.extension().is_some_and(|ext| ext == "py");
        for component in path.components() {
            let Component::Normal(part) = component else {
                continue;
            };
            let Some(part) = part.to_str() else {
                continue;
            };
            if self.structural.contains(part) {
                return true;
            }
            // Soft excludes let Python sources through but drop everything
            // else (generated docs, build artifacts).
            if self.soft.contains(part) && !is_python {
                return true;
            }
        }

        false
    }

    /// Whether a directory subtree can be skipped entirely during the walk.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.structural.contains(name) || self.prefixes.iter().any(|p| name.starts_with(p))
    }
}

/// Settings for a single-project collection run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub excludes: ExcludeRules,
    pub doc_extensions: BTreeSet<String>,
    pub pytest_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            excludes: ExcludeRules::default(),
            doc_extensions: ["md", "rst", "txt", "html", "pdf"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            pytest_timeout: Duration::from_secs(60),
        }
    }
}

/// One entry in the projects file passed to `pymetra aggregate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    pub path: PathBuf,
    /// `owner/repo` slug for optional GitHub enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
}

/// The projects file: `{"projects": [{"name": ..., "path": ..., "github"?: ...}]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectsConfig {
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

impl ProjectsConfig {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::MetricsError::storage(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| crate::MetricsError::Parse(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_excludes_apply_to_files_inside() {
        let rules = ExcludeRules::default();
        assert!(rules.is_excluded_file(Path::new(".venv/lib/module.py")));
        assert!(rules.is_excluded_file(Path::new("pkg/__pycache__/cached.py")));
        assert!(rules.is_excluded_file(Path::new("htmlcov/index.html")));
    }

    #[test]
    fn soft_excludes_let_python_sources_through() {
        let rules = ExcludeRules::default();
        assert!(!rules.is_excluded_file(Path::new("build/generator.py")));
        assert!(!rules.is_excluded_file(Path::new(".github/scripts/bump.py")));
        assert!(rules.is_excluded_file(Path::new("build/output.txt")));
    }

    #[test]
    fn prefix_excludes_match_filenames() {
        let rules = ExcludeRules::default();
        assert!(rules.is_excluded_file(Path::new("docs/._readme.md")));
        assert!(!rules.is_excluded_file(Path::new("docs/readme.md")));
    }

    #[test]
    fn regular_sources_are_kept() {
        let rules = ExcludeRules::default();
        assert!(!rules.is_excluded_file(Path::new("src/app/main.py")));
        assert!(!rules.is_excluded_file(Path::new("tests/test_main.py")));
    }

    #[test]
    fn caller_supplied_patterns_extend_the_defaults() {
        let mut rules = ExcludeRules::default();
        rules.extend_structural(["generated"]);
        rules.extend_soft(["scratch"]);

        assert!(rules.is_excluded_dir("generated"));
        assert!(rules.is_excluded_file(Path::new("generated/module.py")));
        // Soft tier: Python sources survive, everything else is dropped.
        assert!(!rules.is_excluded_file(Path::new("scratch/tool.py")));
        assert!(rules.is_excluded_file(Path::new("scratch/notes.txt")));
        // Defaults remain in force.
        assert!(rules.is_excluded_file(Path::new(".venv/lib/module.py")));
    }

    #[test]
    fn projects_config_parses() {
        let json = r#"{"projects": [{"name": "alpha", "path": "/srv/alpha", "github": "org/alpha"}]}"#;
        let config: ProjectsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.projects.len(), 1);
        assert_eq!(config.projects[0].name, "alpha");
        assert_eq!(config.projects[0].github.as_deref(), Some("org/alpha"));
    }

    #[test]
    fn malformed_projects_file_is_a_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("projects.json");
        std::fs::write(&path, "{\"projects\": [oops").unwrap();

        match ProjectsConfig::load(&path) {
            Err(crate::MetricsError::Parse(msg)) => {
                assert!(msg.contains("projects.json"));
            }
            other => panic!("expected Parse error, got {other:?}"),
        }
    }
}
