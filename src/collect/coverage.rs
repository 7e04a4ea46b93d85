//! Cobertura coverage report reader.
//!
//! Only the root `<coverage>` element attributes are consumed: `line-rate`,
//! `branch-rate`, and the raw covered/valid counters when present.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parsed summary of a Cobertura XML report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Line coverage in percent, rounded to 2 decimals.
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_covered: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_valid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches_covered: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches_valid: Option<u64>,
}

/// Relative locations probed by [`locate`], in order.
const SEARCH_ORDER: &[&str] = &[
    "coverage.xml",
    ".coverage.xml",
    "htmlcov/coverage.xml",
    "tests/coverage.xml",
];

/// Parse a Cobertura report. Any failure (unreadable file, malformed XML,
/// missing or non-numeric `line-rate`) yields `None`.
pub fn parse(path: &Path) -> Option<CoverageSummary> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_str(&content)
}

fn parse_str(content: &str) -> Option<CoverageSummary> {
    let mut reader = Reader::from_str(content);

    // The first element event is the document root.
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() != b"coverage" {
                    return None;
                }

                let mut line_rate = None;
                let mut branch_rate = None;
                let mut lines_covered = None;
                let mut lines_valid = None;
                let mut branches_covered = None;
                let mut branches_valid = None;

                for attr in e.attributes() {
                    let attr = attr.ok()?;
                    let value = String::from_utf8_lossy(&attr.value).into_owned();
                    match attr.key.as_ref() {
                        b"line-rate" => line_rate = value.parse::<f64>().ok(),
                        b"branch-rate" => branch_rate = value.parse::<f64>().ok(),
                        b"lines-covered" => lines_covered = value.parse::<u64>().ok(),
                        b"lines-valid" => lines_valid = value.parse::<u64>().ok(),
                        b"branches-covered" => branches_covered = value.parse::<u64>().ok(),
                        b"branches-valid" => branches_valid = value.parse::<u64>().ok(),
                        _ => {}
                    }
                }

                let percentage = round2(line_rate? * 100.0);
                return Some(CoverageSummary {
                    percentage,
                    branch_percentage: branch_rate.map(|r| round2(r * 100.0)),
                    lines_covered,
                    lines_valid,
                    branches_covered,
                    branches_valid,
                });
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

/// Find a coverage report under `project_root`, probing conventional
/// locations in a fixed order. The binary `.coverage` database is never a
/// candidate.
pub fn locate(project_root: &Path) -> Option<PathBuf> {
    SEARCH_ORDER
        .iter()
        .map(|rel| project_root.join(rel))
        .find(|candidate| candidate.is_file())
}

/// Locate and parse in one step.
pub fn for_project(project_root: &Path) -> Option<CoverageSummary> {
    locate(project_root).and_then(|path| parse(&path))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
