//! Snapshot consistency checks.

use serde::{Deserialize, Serialize};

use crate::collect::ProjectSnapshot;

/// Outcome of validating one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// 0..=100, docked 10 per error and 2 per warning.
    pub score: u8,
}

/// Checks a snapshot for internal consistency and suspicious shapes.
pub struct SnapshotValidator;

impl SnapshotValidator {
    pub fn validate(snapshot: &ProjectSnapshot) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if snapshot.core_file_count + snapshot.test_file_count != snapshot.python_file_count {
            errors.push(format!(
                "file counts are inconsistent: {} core + {} test != {} total",
                snapshot.core_file_count, snapshot.test_file_count, snapshot.python_file_count,
            ));
        }
        if let Some(coverage) = snapshot.coverage_percentage {
            if !(0.0..=100.0).contains(&coverage) {
                errors.push(format!("coverage {coverage} is outside 0..=100"));
            }
        }

        if snapshot.python_file_count == 0 {
            warnings.push("no Python files were found".to_string());
        } else if snapshot.lines_of_code == 0 {
            warnings.push("Python files present but zero lines counted".to_string());
        }
        if snapshot.documentation_file_count == 0 {
            warnings.push("no documentation files were found".to_string());
        }

        let penalty = errors.len() * 10 + warnings.len() * 2;
        let score = 100_usize.saturating_sub(penalty) as u8;
        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn snapshot() -> ProjectSnapshot {
        ProjectSnapshot {
            name: "demo".to_string(),
            path: PathBuf::from("/work/demo"),
            python_file_count: 10,
            core_file_count: 8,
            test_file_count: 2,
            lines_of_code: 400,
            test_count: 12,
            documentation_file_count: 3,
            coverage_percentage: Some(75.0),
            coverage: None,
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn consistent_snapshot_scores_full() {
        let report = SnapshotValidator::validate(&snapshot());
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(report.score, 100);
    }

    #[test]
    fn inconsistent_counts_are_an_error() {
        let mut bad = snapshot();
        bad.core_file_count = 9;
        let report = SnapshotValidator::validate(&bad);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.score, 90);
    }

    #[test]
    fn out_of_range_coverage_is_an_error() {
        let mut bad = snapshot();
        bad.coverage_percentage = Some(104.5);
        let report = SnapshotValidator::validate(&bad);
        assert!(!report.valid);
        assert!(report.errors[0].contains("104.5"));
    }

    #[test]
    fn empty_tree_collects_warnings() {
        let empty = ProjectSnapshot::empty("bare", &PathBuf::from("/tmp/bare"));
        let report = SnapshotValidator::validate(&empty);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.score, 96);
    }

    #[test]
    fn multiple_findings_stack_penalties() {
        let mut awful = ProjectSnapshot::empty("awful", &PathBuf::from("/tmp/awful"));
        awful.core_file_count = 50;
        awful.coverage_percentage = Some(-3.0);
        // 2 errors and 2 warnings: 100 - 20 - 4.
        let report = SnapshotValidator::validate(&awful);
        assert!(!report.valid);
        assert_eq!(report.score, 76);
    }
}
