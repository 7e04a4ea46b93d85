//! Snapshot renderers: JSON, Markdown, HTML, CSV, and YAML.
//!
//! Every exporter collapses I/O failures to `false` at the public boundary;
//! nothing here panics on an unwritable path.

mod html;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::collect::ProjectSnapshot;
use crate::fmt;
use crate::{MetricsError, Result};

/// Renders one project snapshot into the supported output formats.
pub struct MetricsExporter<'a> {
    snapshot: &'a ProjectSnapshot,
}

impl<'a> MetricsExporter<'a> {
    pub fn new(snapshot: &'a ProjectSnapshot) -> Self {
        Self { snapshot }
    }

    /// Pretty-printed JSON of the snapshot itself.
    pub fn export_json(&self, path: &Path) -> bool {
        self.boundary(path, "json", |s, path| {
            let json = serde_json::to_string_pretty(s.snapshot)?;
            write_with_parents(path, json.as_bytes())
        })
    }

    /// Fixed-schema Markdown summary table.
    pub fn export_markdown(&self, path: &Path) -> bool {
        self.boundary(path, "markdown", |s, path| {
            write_with_parents(path, s.render_markdown().as_bytes())
        })
    }

    /// Static HTML dashboard page.
    pub fn export_html(&self, path: &Path) -> bool {
        self.boundary(path, "html", |s, path| {
            write_with_parents(path, html::render(s.snapshot).as_bytes())
        })
    }

    /// `Metric,Value,Unit` rows.
    pub fn export_csv(&self, path: &Path) -> bool {
        self.boundary(path, "csv", |s, path| s.write_csv(path))
    }

    /// YAML rendering of the snapshot.
    pub fn export_yaml(&self, path: &Path) -> bool {
        self.boundary(path, "yaml", |s, path| {
            let yaml = serde_yaml::to_string(s.snapshot)
                .map_err(|e| MetricsError::Export(e.to_string()))?;
            write_with_parents(path, yaml.as_bytes())
        })
    }

    /// Write every format into `dir` as `metrics.<ext>`; per-format outcome
    /// keyed by format name.
    pub fn export_all(&self, dir: &Path) -> BTreeMap<&'static str, bool> {
        let mut results = BTreeMap::new();
        results.insert("json", self.export_json(&dir.join("metrics.json")));
        results.insert("markdown", self.export_markdown(&dir.join("metrics.md")));
        results.insert("html", self.export_html(&dir.join("metrics.html")));
        results.insert("csv", self.export_csv(&dir.join("metrics.csv")));
        results.insert("yaml", self.export_yaml(&dir.join("metrics.yaml")));
        results
    }

    fn boundary(
        &self,
        path: &Path,
        format: &str,
        render: impl Fn(&Self, &Path) -> Result<()>,
    ) -> bool {
        match render(self, path) {
            Ok(()) => {
                info!(format, path = %path.display(), "metrics exported");
                true
            }
            Err(err) => {
                error!(format, path = %path.display(), error = %err, "export failed");
                false
            }
        }
    }

    fn render_markdown(&self) -> String {
        let s = self.snapshot;
        let coverage = s
            .coverage_percentage
            .map(|c| format!("{c:.2}%"))
            .unwrap_or_else(|| "N/A".to_string());
        let mut doc = format!("# Metrics — {}\n\n", s.name);
        doc.push_str(&format!(
            "Collected {} from `{}`\n\n",
            s.collected_at.format("%Y-%m-%d %H:%M:%S"),
            s.path.display(),
        ));
        doc.push_str("| Metric | Value |\n|---|---|\n");
        doc.push_str(&format!(
            "| Python files | {} |\n",
            fmt::thousands(s.python_file_count as i64)
        ));
        doc.push_str(&format!(
            "| Core modules | {} |\n",
            fmt::thousands(s.core_file_count as i64)
        ));
        doc.push_str(&format!(
            "| Test files | {} |\n",
            fmt::thousands(s.test_file_count as i64)
        ));
        doc.push_str(&format!(
            "| Lines of code | {} |\n",
            fmt::thousands(s.lines_of_code as i64)
        ));
        doc.push_str(&format!(
            "| Tests | {} |\n",
            fmt::thousands(s.test_count as i64)
        ));
        doc.push_str(&format!(
            "| Documentation files | {} |\n",
            fmt::thousands(s.documentation_file_count as i64)
        ));
        doc.push_str(&format!("| Coverage | {coverage} |\n"));
        doc
    }

    fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| MetricsError::storage(parent, e))?;
            }
        }
        let s = self.snapshot;
        let mut writer =
            csv::Writer::from_path(path).map_err(|e| MetricsError::Export(e.to_string()))?;
        let mut row = |metric: &str, value: String, unit: &str| {
            writer
                .write_record([metric, &value, unit])
                .map_err(|e| MetricsError::Export(e.to_string()))
        };
        row("Metric", "Value".to_string(), "Unit")?;
        row("python_files", s.python_file_count.to_string(), "files")?;
        row("core_modules", s.core_file_count.to_string(), "files")?;
        row("test_files", s.test_file_count.to_string(), "files")?;
        row("lines_of_code", s.lines_of_code.to_string(), "lines")?;
        row("tests", s.test_count.to_string(), "tests")?;
        row(
            "documentation_files",
            s.documentation_file_count.to_string(),
            "files",
        )?;
        if let Some(coverage) = s.coverage_percentage {
            row("coverage", format!("{coverage:.2}"), "percent")?;
        }
        drop(row);
        writer
            .flush()
            .map_err(|e| MetricsError::Export(e.to_string()))?;
        Ok(())
    }
}

fn write_with_parents(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| MetricsError::storage(parent, e))?;
        }
    }
    fs::write(path, content).map_err(|e| MetricsError::storage(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn snapshot() -> ProjectSnapshot {
        ProjectSnapshot {
            name: "demo".to_string(),
            path: PathBuf::from("/work/demo"),
            python_file_count: 42,
            core_file_count: 35,
            test_file_count: 7,
            lines_of_code: 12345,
            test_count: 150,
            documentation_file_count: 9,
            coverage_percentage: Some(87.65),
            coverage: None,
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn json_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/metrics.json");
        let snapshot = snapshot();
        assert!(MetricsExporter::new(&snapshot).export_json(&path));

        let parsed: ProjectSnapshot =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.lines_of_code, 12345);
        assert_eq!(parsed.coverage_percentage, Some(87.65));
    }

    #[test]
    fn markdown_has_the_summary_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.md");
        let snapshot = snapshot();
        assert!(MetricsExporter::new(&snapshot).export_markdown(&path));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("# Metrics — demo"));
        assert!(text.contains("| Lines of code | 12,345 |"));
        assert!(text.contains("| Coverage | 87.65% |"));
    }

    #[test]
    fn csv_uses_metric_value_unit_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.csv");
        let snapshot = snapshot();
        assert!(MetricsExporter::new(&snapshot).export_csv(&path));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Metric,Value,Unit"));
        assert!(text.contains("lines_of_code,12345,lines"));
        assert!(text.contains("coverage,87.65,percent"));
    }

    #[test]
    fn html_mentions_every_headline_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.html");
        let snapshot = snapshot();
        assert!(MetricsExporter::new(&snapshot).export_html(&path));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("demo"));
        assert!(text.contains("12,345"));
        assert!(text.contains("87.7%"));
    }

    #[test]
    fn export_all_reports_each_format() {
        let dir = TempDir::new().unwrap();
        let snapshot = snapshot();
        let results = MetricsExporter::new(&snapshot).export_all(dir.path());
        assert_eq!(results.len(), 5);
        assert!(results.values().all(|ok| *ok));
        assert!(dir.path().join("metrics.yaml").exists());
    }

    #[test]
    fn unwritable_path_reports_false() {
        let snapshot = snapshot();
        let exporter = MetricsExporter::new(&snapshot);
        assert!(!exporter.export_json(Path::new("/proc/denied/metrics.json")));
    }
}
