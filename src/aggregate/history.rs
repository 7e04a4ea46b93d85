//! Append-only snapshot history and delta computation.
//!
//! Each saved [`AggregateSnapshot`] becomes one immutable JSON file named
//! `metrics_YYYYMMDD_HHMMSS.json` (with a `_N` suffix on a same-second
//! collision). The latest entry is found by descending filename order, and
//! [`HistoryStore::compare`] turns two snapshots into per-metric and
//! per-project [`DeltaRecord`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::AggregateSnapshot;
use crate::{MetricsError, Result};

const FILE_PREFIX: &str = "metrics_";
const FILE_SUFFIX: &str = ".json";

/// Direction of a metric between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn glyph(self) -> &'static str {
        match self {
            Trend::Up => "📈",
            Trend::Down => "📉",
            Trend::Stable => "➡️",
        }
    }
}

/// One metric's change between the previous and current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub current: f64,
    pub previous: f64,
    pub delta: f64,
    pub delta_percent: f64,
    pub trend: Trend,
}

impl DeltaRecord {
    pub fn new(previous: f64, current: f64) -> Self {
        let delta = current - previous;
        let delta_percent = if previous == 0.0 {
            if current > 0.0 {
                100.0
            } else {
                0.0
            }
        } else {
            round2(delta / previous * 100.0)
        };
        let trend = if delta.abs() < 0.01 {
            Trend::Stable
        } else if delta > 0.0 {
            Trend::Up
        } else {
            Trend::Down
        };
        Self {
            current,
            previous,
            delta,
            delta_percent,
            trend,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-project module/line/test deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDeltas {
    pub modules: DeltaRecord,
    pub lines_of_code: DeltaRecord,
    pub tests: DeltaRecord,
}

/// Result of comparing a current snapshot against a baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub has_previous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_date: Option<DateTime<Utc>>,
    pub current_date: DateTime<Utc>,
    /// Keyed by metric name (`total_modules`, `total_lines_of_code`, ...).
    pub deltas: BTreeMap<String, DeltaRecord>,
    /// Keyed by project name, over the union of both snapshots' projects.
    pub project_changes: BTreeMap<String, ProjectDeltas>,
}

impl Comparison {
    fn no_baseline(current: &AggregateSnapshot) -> Self {
        Self {
            has_previous: false,
            previous_date: None,
            current_date: current.collected_at,
            deltas: BTreeMap::new(),
            project_changes: BTreeMap::new(),
        }
    }
}

/// One persisted history file: the aggregate plus its write timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub snapshot: AggregateSnapshot,
    pub saved_at: DateTime<Utc>,
}

/// Directory of timestamp-named snapshot files.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a snapshot to a new file and return its path. Never
    /// overwrites: a second save in the same second gets a `_1`, `_2`, ...
    /// suffix.
    pub fn save(&self, snapshot: &AggregateSnapshot) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| MetricsError::storage(&self.dir, e))?;

        let entry = HistoryEntry {
            snapshot: snapshot.clone(),
            saved_at: Utc::now(),
        };
        let stamp = entry.saved_at.format("%Y%m%d_%H%M%S");
        let json = serde_json::to_string_pretty(&entry)?;

        let mut counter = 0_u32;
        loop {
            let filename = if counter == 0 {
                format!("{FILE_PREFIX}{stamp}{FILE_SUFFIX}")
            } else {
                format!("{FILE_PREFIX}{stamp}_{counter}{FILE_SUFFIX}")
            };
            let path = self.dir.join(filename);
            if path.exists() {
                counter += 1;
                continue;
            }
            fs::write(&path, &json).map_err(|e| MetricsError::storage(&path, e))?;
            debug!(path = %path.display(), "snapshot saved to history");
            return Ok(path);
        }
    }

    /// The most recent parseable entry, by descending filename order.
    /// Corrupt files are skipped with a warning.
    pub fn latest(&self) -> Result<Option<HistoryEntry>> {
        let mut names = match fs::read_dir(&self.dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
                .collect::<Vec<_>>(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                warn!(dir = %self.dir.display(), error = %err, "history directory unreadable");
                return Ok(None);
            }
        };
        names.sort_unstable_by(|a, b| b.cmp(a));

        for name in names {
            let path = self.dir.join(&name);
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable history file");
                    continue;
                }
            };
            match serde_json::from_str::<HistoryEntry>(&content) {
                Ok(entry) => return Ok(Some(entry)),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping corrupt history file");
                }
            }
        }
        Ok(None)
    }

    /// Compare a current snapshot against the most recent stored entry.
    pub fn compare(&self, current: &AggregateSnapshot) -> Result<Comparison> {
        match self.latest()? {
            Some(previous) => Ok(compare_snapshots(&previous.snapshot, current)),
            None => Ok(Comparison::no_baseline(current)),
        }
    }
}

/// Delta every tracked metric and every project between two snapshots.
pub fn compare_snapshots(previous: &AggregateSnapshot, current: &AggregateSnapshot) -> Comparison {
    let mut deltas = BTreeMap::new();
    deltas.insert(
        "total_modules".to_string(),
        DeltaRecord::new(previous.total_modules as f64, current.total_modules as f64),
    );
    deltas.insert(
        "total_lines_of_code".to_string(),
        DeltaRecord::new(
            previous.total_lines_of_code as f64,
            current.total_lines_of_code as f64,
        ),
    );
    deltas.insert(
        "total_tests".to_string(),
        DeltaRecord::new(previous.total_tests as f64, current.total_tests as f64),
    );
    deltas.insert(
        "total_documentation_files".to_string(),
        DeltaRecord::new(
            previous.total_documentation_files as f64,
            current.total_documentation_files as f64,
        ),
    );
    // Coverage is compared only when both snapshots report it.
    if let (Some(prev), Some(cur)) = (previous.global_coverage, current.global_coverage) {
        deltas.insert("global_coverage".to_string(), DeltaRecord::new(prev, cur));
    }

    let previous_rows: BTreeMap<&str, _> = previous
        .per_project_summaries
        .iter()
        .map(|row| (row.name.as_str(), row))
        .collect();
    let current_rows: BTreeMap<&str, _> = current
        .per_project_summaries
        .iter()
        .map(|row| (row.name.as_str(), row))
        .collect();
    let names: BTreeSet<&str> = previous_rows
        .keys()
        .chain(current_rows.keys())
        .copied()
        .collect();

    let mut project_changes = BTreeMap::new();
    for name in names {
        let prev = previous_rows.get(name);
        let cur = current_rows.get(name);
        let metric = |p: fn(&super::ProjectSummary) -> usize| {
            DeltaRecord::new(
                prev.map_or(0, |r| p(r)) as f64,
                cur.map_or(0, |r| p(r)) as f64,
            )
        };
        project_changes.insert(
            name.to_string(),
            ProjectDeltas {
                modules: metric(|r| r.modules),
                lines_of_code: metric(|r| r.lines_of_code),
                tests: metric(|r| r.tests),
            },
        );
    }

    Comparison {
        has_previous: true,
        previous_date: Some(previous.collected_at),
        current_date: current.collected_at,
        deltas,
        project_changes,
    }
}

/// Human-readable table of metric deltas with trend glyphs.
pub fn render_report(comparison: &Comparison) -> String {
    if !comparison.has_previous {
        return "No history available yet; this snapshot becomes the baseline.\n".to_string();
    }

    let mut report = String::new();
    report.push_str("## Metrics evolution\n\n");
    if let Some(previous) = comparison.previous_date {
        report.push_str(&format!(
            "Comparing {} → {}\n\n",
            previous.format("%Y-%m-%d %H:%M:%S"),
            comparison.current_date.format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    report.push_str("| Metric | Previous | Current | Delta | Trend |\n");
    report.push_str("|---|---|---|---|---|\n");

    for (metric, record) in &comparison.deltas {
        report.push_str(&format!(
            "| {} | {} | {} | {} ({:+.2}%) | {} |\n",
            metric_label(metric),
            format_value(metric, record.previous),
            format_value(metric, record.current),
            crate::fmt::signed(record.delta),
            record.delta_percent,
            record.trend.glyph(),
        ));
    }
    report
}

fn metric_label(key: &str) -> &str {
    match key {
        "total_modules" => "Modules",
        "total_lines_of_code" => "Lines of code",
        "total_tests" => "Tests",
        "total_documentation_files" => "Documentation files",
        "global_coverage" => "Coverage",
        other => other,
    }
}

fn format_value(key: &str, value: f64) -> String {
    if key == "global_coverage" {
        format!("{value:.2}%")
    } else {
        crate::fmt::thousands(value.round() as i64)
    }
}
