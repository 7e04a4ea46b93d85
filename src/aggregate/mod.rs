//! Multi-project aggregation.
//!
//! [`MultiProjectAggregator`] runs the single-project collector over a list
//! of named projects, optionally enriches each with GitHub repository stats
//! and git contribution stats, and folds the snapshots into one
//! [`AggregateSnapshot`]. Enrichment failures are isolated per project and
//! never abort the run.

pub mod alerts;
pub mod history;

pub use alerts::{AlertEvaluator, AlertRecord, AlertSet};
pub use history::{Comparison, DeltaRecord, HistoryEntry, HistoryStore, Trend};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::collect::{ProjectCollector, ProjectSnapshot};
use crate::config::{CollectorConfig, ProjectsConfig};
use crate::fmt;
use crate::github::{GitHubClient, RepoStats};
use crate::gitstats::GitContributions;
use crate::{MetricsError, Result};

/// One flattened per-project row, kept in the order projects were added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub name: String,
    pub modules: usize,
    pub python_files: usize,
    pub lines_of_code: usize,
    pub tests: usize,
    pub documentation_files: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f64>,
}

impl ProjectSummary {
    fn from_snapshot(snapshot: &ProjectSnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            modules: snapshot.core_file_count,
            python_files: snapshot.python_file_count,
            lines_of_code: snapshot.lines_of_code,
            tests: snapshot.test_count,
            documentation_files: snapshot.documentation_file_count,
            coverage: snapshot.coverage_percentage,
        }
    }
}

/// Reduction over a set of project snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub project_count: usize,
    pub total_python_files: usize,
    /// Core (non-test) Python files only.
    pub total_modules: usize,
    pub total_lines_of_code: usize,
    pub total_tests: usize,
    pub total_documentation_files: usize,
    /// Line-count-weighted coverage; `None` when no project reports any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_coverage: Option<f64>,
    pub per_project_summaries: Vec<ProjectSummary>,
    pub collected_at: DateTime<Utc>,
}

impl AggregateSnapshot {
    fn empty() -> Self {
        Self {
            project_count: 0,
            total_python_files: 0,
            total_modules: 0,
            total_lines_of_code: 0,
            total_tests: 0,
            total_documentation_files: 0,
            global_coverage: None,
            per_project_summaries: Vec::new(),
            collected_at: Utc::now(),
        }
    }
}

/// A collected project plus its optional remote enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(flatten)]
    pub snapshot: ProjectSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<RepoStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitContributions>,
}

/// On-disk layout of the aggregated export file.
#[derive(Debug, Serialize, Deserialize)]
struct ExportDocument {
    aggregated: AggregateSnapshot,
    projects: BTreeMap<String, ProjectSummary>,
    collection_date: DateTime<Utc>,
    projects_details: BTreeMap<String, ProjectRecord>,
}

/// Collects many projects and reduces them to an [`AggregateSnapshot`].
pub struct MultiProjectAggregator {
    projects: BTreeMap<String, ProjectRecord>,
    /// Insertion order of project names, for stable summary rows.
    order: Vec<String>,
    config: CollectorConfig,
    history: Option<HistoryStore>,
    github: Option<GitHubClient>,
}

impl Default for MultiProjectAggregator {
    fn default() -> Self {
        Self::new(CollectorConfig::default())
    }
}

impl MultiProjectAggregator {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            projects: BTreeMap::new(),
            order: Vec::new(),
            config,
            history: None,
            github: None,
        }
    }

    /// Enable history persistence under `dir`; each successful export also
    /// appends a history entry.
    pub fn with_history(mut self, dir: impl Into<PathBuf>) -> Self {
        self.history = Some(HistoryStore::new(dir));
        self
    }

    /// Enable GitHub enrichment for projects that carry a repo slug.
    pub fn with_github(mut self, client: GitHubClient) -> Self {
        self.github = Some(client);
        self
    }

    /// Collect one project and fold it in. Returns the snapshot, or `None`
    /// when collection itself failed; a repeated name replaces the earlier
    /// record.
    pub async fn collect_project(
        &mut self,
        name: &str,
        path: &Path,
        remote: Option<&str>,
    ) -> Option<ProjectSnapshot> {
        let collector = ProjectCollector::with_config(path, self.config.clone());
        let snapshot = match collector.collect(name).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(project = name, error = %err, "collection failed, skipping project");
                return None;
            }
        };

        let github = match (remote, self.github.as_ref()) {
            (Some(slug), Some(client)) => match client.repo_stats(slug).await {
                Ok(stats) => Some(stats),
                Err(err) => {
                    warn!(project = name, repo = slug, error = %err, "GitHub enrichment failed");
                    None
                }
            },
            _ => None,
        };
        let git = GitContributions::collect(path).await;

        if !self.projects.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.projects.insert(
            name.to_string(),
            ProjectRecord {
                snapshot: snapshot.clone(),
                github,
                git,
            },
        );
        Some(snapshot)
    }

    /// Collect every entry of a projects file.
    pub async fn collect_all(&mut self, config: &ProjectsConfig) {
        for entry in &config.projects {
            info!(project = %entry.name, path = %entry.path.display(), "collecting project");
            self.collect_project(&entry.name, &entry.path, entry.github.as_deref())
                .await;
        }
    }

    /// Fold all collected snapshots. An empty aggregator yields a zeroed
    /// aggregate, not an error.
    pub fn aggregate(&self) -> AggregateSnapshot {
        if self.projects.is_empty() {
            return AggregateSnapshot::empty();
        }

        let mut totals = AggregateSnapshot::empty();
        let mut weighted_sum = 0.0_f64;
        let mut weight_lines = 0_usize;

        for name in &self.order {
            let Some(record) = self.projects.get(name) else {
                continue;
            };
            let snapshot = &record.snapshot;
            totals.project_count += 1;
            totals.total_python_files += snapshot.python_file_count;
            totals.total_modules += snapshot.core_file_count;
            totals.total_lines_of_code += snapshot.lines_of_code;
            totals.total_tests += snapshot.test_count;
            totals.total_documentation_files += snapshot.documentation_file_count;
            totals
                .per_project_summaries
                .push(ProjectSummary::from_snapshot(snapshot));

            if let Some(coverage) = snapshot.coverage_percentage {
                if snapshot.lines_of_code > 0 {
                    weighted_sum += coverage * snapshot.lines_of_code as f64;
                    weight_lines += snapshot.lines_of_code;
                }
            }
        }

        if weight_lines > 0 {
            totals.global_coverage =
                Some((weighted_sum / weight_lines as f64 * 100.0).round() / 100.0);
        }
        totals.collected_at = Utc::now();
        totals
    }

    /// Markdown summary table for embedding in a README.
    pub fn generate_readme_table(&self) -> String {
        let aggregate = self.aggregate();
        let mut table = String::new();
        table.push_str("| **Project** | **Modules** | **Lines** | **Tests** | **Coverage** |\n");
        table.push_str("|---|---|---|---|---|\n");

        for row in &aggregate.per_project_summaries {
            let coverage = row
                .coverage
                .map(|c| format!("{c:.1}%"))
                .unwrap_or_else(|| "N/A".to_string());
            table.push_str(&format!(
                "| {} | `{}` | `{}` | `{}` | {} |\n",
                row.name,
                fmt::thousands(row.modules as i64),
                fmt::thousands(row.lines_of_code as i64),
                fmt::thousands(row.tests as i64),
                coverage,
            ));
        }

        let global = aggregate
            .global_coverage
            .map(|c| format!("{c:.1}%"))
            .unwrap_or_else(|| "N/A".to_string());
        table.push_str(&format!(
            "| **TOTAL** | `{}` | `{}` | `{}` | {} |\n",
            fmt::thousands(aggregate.total_modules as i64),
            fmt::thousands(aggregate.total_lines_of_code as i64),
            fmt::thousands(aggregate.total_tests as i64),
            global,
        ));
        table
    }

    fn export_document(&self) -> ExportDocument {
        let aggregated = self.aggregate();
        let projects = aggregated
            .per_project_summaries
            .iter()
            .map(|row| (row.name.clone(), row.clone()))
            .collect();
        ExportDocument {
            collection_date: aggregated.collected_at,
            projects,
            projects_details: self.projects.clone(),
            aggregated,
        }
    }

    fn try_export_json(&self, path: &Path) -> Result<()> {
        let document = self.export_document();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| MetricsError::storage(parent, e))?;
            }
        }
        let json = serde_json::to_string_pretty(&document)?;
        fs::write(path, json).map_err(|e| MetricsError::storage(path, e))?;

        if let Some(history) = &self.history {
            let saved = history.save(&document.aggregated)?;
            debug!(path = %saved.display(), "history entry saved");
        }
        Ok(())
    }

    /// Write the aggregated export file (and a history entry when history
    /// is enabled). Returns `false` on any failure.
    pub fn export_aggregated_json(&self, path: &Path) -> bool {
        match self.try_export_json(path) {
            Ok(()) => {
                info!(path = %path.display(), "aggregated metrics exported");
                true
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "aggregated export failed");
                false
            }
        }
    }

    fn try_load_json(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| MetricsError::storage(path, e))?;
        let document: ExportDocument = serde_json::from_str(&content)
            .map_err(|e| MetricsError::Parse(format!("{}: {e}", path.display())))?;
        self.projects = document.projects_details;
        self.order = self.projects.keys().cloned().collect();
        Ok(())
    }

    /// Restore the per-project detail section of a previous export,
    /// replacing the in-memory set. Returns `false` on any failure.
    pub fn load_from_json(&mut self, path: &Path) -> bool {
        match self.try_load_json(path) {
            Ok(()) => true,
            Err(err) => {
                error!(path = %path.display(), error = %err, "loading aggregated export failed");
                false
            }
        }
    }

    /// Human-readable evolution report against the most recent history
    /// entry.
    pub fn evolution_report(&self) -> Result<String> {
        let history = self
            .history
            .as_ref()
            .ok_or_else(|| MetricsError::Collection("history is not enabled".to_string()))?;
        let comparison = history.compare(&self.aggregate())?;
        Ok(history::render_report(&comparison))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, core: usize, tests_files: usize, lines: usize) -> ProjectSnapshot {
        ProjectSnapshot {
            name: name.to_string(),
            path: PathBuf::from(format!("/proj/{name}")),
            python_file_count: core + tests_files,
            core_file_count: core,
            test_file_count: tests_files,
            lines_of_code: lines,
            test_count: 0,
            documentation_file_count: 0,
            coverage_percentage: None,
            coverage: None,
            collected_at: Utc::now(),
        }
    }

    fn aggregator_with(records: Vec<ProjectSnapshot>) -> MultiProjectAggregator {
        let mut agg = MultiProjectAggregator::default();
        for snapshot in records {
            agg.order.push(snapshot.name.clone());
            agg.projects.insert(
                snapshot.name.clone(),
                ProjectRecord {
                    snapshot,
                    github: None,
                    git: None,
                },
            );
        }
        agg
    }

    #[test]
    fn empty_aggregator_yields_zeroed_aggregate() {
        let aggregate = MultiProjectAggregator::default().aggregate();
        assert_eq!(aggregate.project_count, 0);
        assert_eq!(aggregate.total_lines_of_code, 0);
        assert!(aggregate.global_coverage.is_none());
        assert!(aggregate.per_project_summaries.is_empty());
    }

    #[test]
    fn totals_are_sums_over_projects() {
        let mut alpha = snapshot("alpha", 10, 2, 500);
        alpha.test_count = 8;
        alpha.documentation_file_count = 2;
        alpha.coverage_percentage = Some(80.0);
        let mut beta = snapshot("beta", 5, 1, 200);
        beta.test_count = 3;
        beta.documentation_file_count = 1;

        let aggregate = aggregator_with(vec![alpha, beta]).aggregate();
        assert_eq!(aggregate.project_count, 2);
        assert_eq!(aggregate.total_modules, 15);
        assert_eq!(aggregate.total_python_files, 18);
        assert_eq!(aggregate.total_lines_of_code, 700);
        assert_eq!(aggregate.total_tests, 11);
        assert_eq!(aggregate.total_documentation_files, 3);
        // Only alpha reports coverage, so it carries full weight.
        assert_eq!(aggregate.global_coverage, Some(80.0));
    }

    #[test]
    fn global_coverage_is_line_weighted() {
        let mut alpha = snapshot("alpha", 1, 0, 900);
        alpha.coverage_percentage = Some(90.0);
        let mut beta = snapshot("beta", 1, 0, 100);
        beta.coverage_percentage = Some(50.0);

        let aggregate = aggregator_with(vec![alpha, beta]).aggregate();
        // (90*900 + 50*100) / 1000 = 86.0
        assert_eq!(aggregate.global_coverage, Some(86.0));
    }

    #[test]
    fn coverage_absent_when_no_project_reports_it() {
        let aggregate = aggregator_with(vec![snapshot("a", 3, 1, 100)]).aggregate();
        assert!(aggregate.global_coverage.is_none());
    }

    #[test]
    fn zero_line_projects_do_not_weight_coverage() {
        let mut ghost = snapshot("ghost", 0, 0, 0);
        ghost.coverage_percentage = Some(100.0);
        let mut real = snapshot("real", 1, 0, 200);
        real.coverage_percentage = Some(40.0);

        let aggregate = aggregator_with(vec![ghost, real]).aggregate();
        assert_eq!(aggregate.global_coverage, Some(40.0));
    }

    #[test]
    fn readme_table_includes_total_row_and_na() {
        let mut alpha = snapshot("alpha", 1200, 0, 45000);
        alpha.test_count = 310;
        alpha.coverage_percentage = Some(82.5);
        let beta = snapshot("beta", 5, 0, 200);

        let table = aggregator_with(vec![alpha, beta]).generate_readme_table();
        assert!(table.starts_with("| **Project** |"));
        assert!(table.contains("| alpha | `1,200` | `45,000` | `310` | 82.5% |"));
        assert!(table.contains("| beta | `5` | `200` | `0` | N/A |"));
        assert!(table.contains("| **TOTAL** | `1,205` | `45,200` |"));
    }

    #[test]
    fn export_then_load_restores_project_details() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("metrics/aggregated.json");

        let mut alpha = snapshot("alpha", 7, 2, 340);
        alpha.test_count = 12;
        alpha.coverage_percentage = Some(64.2);
        let original = aggregator_with(vec![alpha, snapshot("beta", 2, 0, 80)]);
        assert!(original.export_aggregated_json(&out));

        let mut restored = MultiProjectAggregator::default();
        assert!(restored.load_from_json(&out));
        let before = original.aggregate();
        let after = restored.aggregate();
        assert_eq!(after.project_count, before.project_count);
        assert_eq!(after.total_python_files, before.total_python_files);
        assert_eq!(after.total_lines_of_code, before.total_lines_of_code);
        assert_eq!(after.total_tests, before.total_tests);
        assert_eq!(after.global_coverage, before.global_coverage);
    }

    #[test]
    fn load_from_missing_file_reports_failure() {
        let mut agg = MultiProjectAggregator::default();
        assert!(!agg.load_from_json(Path::new("/nonexistent/aggregated.json")));
    }

    #[test]
    fn load_from_corrupt_export_reports_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("aggregated.json");
        std::fs::write(&path, "{\"aggregated\": oops").unwrap();

        let mut agg = MultiProjectAggregator::default();
        assert!(!agg.load_from_json(&path));
    }

    #[tokio::test]
    async fn repeated_name_replaces_earlier_record() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("one.py"), "x = 1\n").unwrap();

        let mut agg = MultiProjectAggregator::default();
        agg.collect_project("proj", dir.path(), None).await;
        std::fs::write(dir.path().join("two.py"), "y = 2\n").unwrap();
        agg.collect_project("proj", dir.path(), None).await;

        let aggregate = agg.aggregate();
        assert_eq!(aggregate.project_count, 1);
        assert_eq!(aggregate.total_python_files, 2);
    }
}
