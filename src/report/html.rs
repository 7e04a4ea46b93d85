//! Static HTML dashboard rendering.

use crate::collect::ProjectSnapshot;
use crate::fmt;

/// Render a single-page dashboard for one snapshot.
pub fn render(snapshot: &ProjectSnapshot) -> String {
    let coverage = snapshot
        .coverage_percentage
        .map(|c| format!("{c:.1}%"))
        .unwrap_or_else(|| "N/A".to_string());

    let cards = [
        ("Python files", fmt::thousands(snapshot.python_file_count as i64)),
        ("Core modules", fmt::thousands(snapshot.core_file_count as i64)),
        ("Test files", fmt::thousands(snapshot.test_file_count as i64)),
        ("Lines of code", fmt::thousands(snapshot.lines_of_code as i64)),
        ("Tests", fmt::thousands(snapshot.test_count as i64)),
        (
            "Documentation",
            fmt::thousands(snapshot.documentation_file_count as i64),
        ),
        ("Coverage", coverage),
    ];

    let mut body = String::new();
    for (label, value) in cards {
        body.push_str(&format!(
            "      <div class=\"card\"><div class=\"value\">{value}</div>\
<div class=\"label\">{label}</div></div>\n"
        ));
    }

    let mut details = String::new();
    if let Some(cov) = &snapshot.coverage {
        if let (Some(covered), Some(valid)) = (cov.lines_covered, cov.lines_valid) {
            details.push_str(&format!(
                "      <li>Lines covered: {} / {}</li>\n",
                fmt::thousands(covered as i64),
                fmt::thousands(valid as i64),
            ));
        }
        if let Some(branch) = cov.branch_percentage {
            details.push_str(&format!("      <li>Branch coverage: {branch:.1}%</li>\n"));
        }
    }
    let details_section = if details.is_empty() {
        String::new()
    } else {
        format!("    <h2>Coverage detail</h2>\n    <ul>\n{details}    </ul>\n")
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{name} — metrics</title>
  <style>
    body {{ font-family: system-ui, sans-serif; margin: 2rem; color: #222; }}
    .cards {{ display: flex; flex-wrap: wrap; gap: 1rem; }}
    .card {{ border: 1px solid #ddd; border-radius: 8px; padding: 1rem 1.5rem;
             min-width: 8rem; text-align: center; }}
    .value {{ font-size: 1.8rem; font-weight: 600; }}
    .label {{ color: #666; margin-top: 0.25rem; }}
    footer {{ margin-top: 2rem; color: #888; font-size: 0.85rem; }}
  </style>
</head>
<body>
  <h1>{name}</h1>
  <div class="cards">
{body}  </div>
{details_section}  <footer>Collected {collected} from <code>{path}</code></footer>
</body>
</html>
"#,
        name = snapshot.name,
        body = body,
        details_section = details_section,
        collected = snapshot.collected_at.format("%Y-%m-%d %H:%M:%S"),
        path = snapshot.path.display(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::CoverageSummary;
    use chrono::Utc;
    use std::path::PathBuf;

    #[test]
    fn includes_coverage_detail_when_present() {
        let snapshot = ProjectSnapshot {
            name: "demo".to_string(),
            path: PathBuf::from("/work/demo"),
            python_file_count: 1,
            core_file_count: 1,
            test_file_count: 0,
            lines_of_code: 10,
            test_count: 0,
            documentation_file_count: 0,
            coverage_percentage: Some(80.0),
            coverage: Some(CoverageSummary {
                percentage: 80.0,
                branch_percentage: Some(60.0),
                lines_covered: Some(8),
                lines_valid: Some(10),
                branches_covered: None,
                branches_valid: None,
            }),
            collected_at: Utc::now(),
        };
        let html = render(&snapshot);
        assert!(html.contains("Lines covered: 8 / 10"));
        assert!(html.contains("Branch coverage: 60.0%"));
    }

    #[test]
    fn renders_na_without_coverage() {
        let snapshot = ProjectSnapshot::empty("bare", &PathBuf::from("/tmp/bare"));
        let html = render(&snapshot);
        assert!(html.contains("N/A"));
        assert!(!html.contains("Coverage detail"));
    }
}
