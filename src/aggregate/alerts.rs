//! Threshold alerting against the most recent history entry.
//!
//! Five metrics are tracked: modules, lines of code, tests, documentation
//! files, and global coverage. A metric is skipped when either side is
//! absent or the previous value is exactly zero; going from zero to any
//! positive value therefore never alerts. A metric is flagged when the
//! absolute percent change reaches the threshold (inclusive).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::history::HistoryStore;
use super::AggregateSnapshot;
use crate::Result;

/// Direction of a flagged change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

/// One metric whose change crossed the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Human-readable metric name.
    pub metric: String,
    /// Stable key (`total_modules`, `global_coverage`, ...).
    pub metric_key: String,
    pub previous: f64,
    pub current: f64,
    pub delta: f64,
    pub delta_percent: f64,
    pub direction: Direction,
    pub threshold: f64,
}

/// Result of one alert evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSet {
    pub has_alerts: bool,
    pub alerts: Vec<AlertRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_date: Option<DateTime<Utc>>,
    pub current_date: DateTime<Utc>,
    pub message: String,
}

impl AlertSet {
    fn quiet(current: &AggregateSnapshot, message: &str) -> Self {
        Self {
            has_alerts: false,
            alerts: Vec::new(),
            previous_date: None,
            current_date: current.collected_at,
            message: message.to_string(),
        }
    }

    /// Whether the set warrants filing an issue or notification.
    pub fn should_file(&self) -> bool {
        self.has_alerts
    }
}

/// Evaluates a snapshot against the stored baseline.
pub struct AlertEvaluator {
    history: HistoryStore,
}

impl AlertEvaluator {
    pub fn new(history: HistoryStore) -> Self {
        Self { history }
    }

    /// Evaluate `current` against the latest history entry with the given
    /// percent threshold.
    pub fn evaluate(&self, current: &AggregateSnapshot, threshold: f64) -> Result<AlertSet> {
        let Some(previous) = self.history.latest()? else {
            debug!("no history baseline, skipping alert evaluation");
            return Ok(AlertSet::quiet(current, "No baseline snapshot; no alerts."));
        };
        Ok(evaluate_against(&previous.snapshot, current, threshold))
    }
}

/// Pure evaluation between two snapshots.
pub fn evaluate_against(
    previous: &AggregateSnapshot,
    current: &AggregateSnapshot,
    threshold: f64,
) -> AlertSet {
    let metrics: [(&str, &str, Option<f64>, Option<f64>); 5] = [
        (
            "total_modules",
            "Modules",
            Some(previous.total_modules as f64),
            Some(current.total_modules as f64),
        ),
        (
            "total_lines_of_code",
            "Lines of code",
            Some(previous.total_lines_of_code as f64),
            Some(current.total_lines_of_code as f64),
        ),
        (
            "total_tests",
            "Tests",
            Some(previous.total_tests as f64),
            Some(current.total_tests as f64),
        ),
        (
            "total_documentation_files",
            "Documentation files",
            Some(previous.total_documentation_files as f64),
            Some(current.total_documentation_files as f64),
        ),
        (
            "global_coverage",
            "Coverage",
            previous.global_coverage,
            current.global_coverage,
        ),
    ];

    let mut alerts = Vec::new();
    for (key, label, prev, cur) in metrics {
        let (Some(prev), Some(cur)) = (prev, cur) else {
            continue;
        };
        if prev == 0.0 {
            continue;
        }
        let delta = cur - prev;
        let delta_percent = delta / prev * 100.0;
        if delta_percent.abs() >= threshold {
            alerts.push(AlertRecord {
                metric: label.to_string(),
                metric_key: key.to_string(),
                previous: prev,
                current: cur,
                delta,
                delta_percent: (delta_percent * 100.0).round() / 100.0,
                direction: if delta > 0.0 {
                    Direction::Increase
                } else {
                    Direction::Decrease
                },
                threshold,
            });
        }
    }

    let has_alerts = !alerts.is_empty();
    let message = if has_alerts {
        format_message(&alerts)
    } else {
        format!("No metric changed by {threshold}% or more.")
    };
    AlertSet {
        has_alerts,
        alerts,
        previous_date: Some(previous.collected_at),
        current_date: current.collected_at,
        message,
    }
}

/// Short bullet summary of flagged metrics.
pub fn format_message(alerts: &[AlertRecord]) -> String {
    let mut message = String::from("Significant metric changes detected:\n");
    for alert in alerts {
        let verb = match alert.direction {
            Direction::Increase => "increased",
            Direction::Decrease => "decreased",
        };
        message.push_str(&format!(
            "- {} {} by {:.2}% ({} → {})\n",
            alert.metric,
            verb,
            alert.delta_percent.abs(),
            crate::fmt::thousands(alert.previous.round() as i64),
            crate::fmt::thousands(alert.current.round() as i64),
        ));
    }
    message
}

/// Markdown body suitable for a tracking issue.
pub fn format_issue_body(set: &AlertSet) -> String {
    let mut body = String::from("## Metric change alert\n\n");
    if let Some(previous) = set.previous_date {
        body.push_str(&format!(
            "Baseline: {} — Current: {}\n\n",
            previous.format("%Y-%m-%d %H:%M:%S"),
            set.current_date.format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    body.push_str("| Metric | Previous | Current | Change |\n");
    body.push_str("|---|---|---|---|\n");
    for alert in &set.alerts {
        body.push_str(&format!(
            "| {} | {} | {} | {:+.2}% |\n",
            alert.metric,
            crate::fmt::thousands(alert.previous.round() as i64),
            crate::fmt::thousands(alert.current.round() as i64),
            alert.delta_percent,
        ));
    }
    body.push_str(
        "\nReview the recent commits for large additions, removals, or a \
         coverage regression, and close this issue once the change is \
         confirmed intentional.\n",
    );
    body
}
