//! Test counting behind a trait seam.
//!
//! The primary implementation shells out to pytest in collection-only mode;
//! the fallback counts test-named files. The fallback is a heuristic lower
//! bound, not an exact test count.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::ExcludeRules;
use crate::error::Result;
use crate::subprocess::{ProcessCommandBuilder, SubprocessManager};

#[async_trait]
pub trait TestCounter: Send + Sync {
    async fn count(&self, project_root: &Path) -> Result<usize>;
}

/// Counts tests by running `python -m pytest --collect-only -q` and counting
/// stdout lines that mention a test identifier.
pub struct PytestCollector {
    subprocess: SubprocessManager,
    timeout: Duration,
}

impl PytestCollector {
    pub fn new(subprocess: SubprocessManager, timeout: Duration) -> Self {
        Self { subprocess, timeout }
    }
}

#[async_trait]
impl TestCounter for PytestCollector {
    async fn count(&self, project_root: &Path) -> Result<usize> {
        let command = ProcessCommandBuilder::new("python")
            .args(["-m", "pytest", "--collect-only", "-q"])
            .current_dir(project_root)
            .timeout(self.timeout)
            .build();

        let output = self.subprocess.runner().run(command).await?;
        if !output.status.success() {
            return Err(crate::MetricsError::Collection(format!(
                "pytest collection exited with {:?}",
                output.status.code()
            )));
        }

        let count = output
            .stdout
            .lines()
            .filter(|line| line.to_lowercase().contains("test"))
            .count();
        Ok(count)
    }
}

/// Counts files whose name contains `test` (case-insensitive) among
/// non-excluded `.py` files. A lower bound used when pytest is unavailable.
pub struct HeuristicCounter {
    excludes: ExcludeRules,
}

impl HeuristicCounter {
    pub fn new(excludes: ExcludeRules) -> Self {
        Self { excludes }
    }
}

#[async_trait]
impl TestCounter for HeuristicCounter {
    async fn count(&self, project_root: &Path) -> Result<usize> {
        let mut count = 0;
        for entry in WalkDir::new(project_root)
            .into_iter()
            .filter_entry(|e| {
                !e.file_type().is_dir()
                    || e.file_name()
                        .to_str()
                        .map(|name| !self.excludes.is_excluded_dir(name))
                        .unwrap_or(true)
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "py") {
                continue;
            }
            let relative = path.strip_prefix(project_root).unwrap_or(path);
            if self.excludes.is_excluded_file(relative) {
                continue;
            }
            if entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.to_lowercase().contains("test"))
            {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Try the primary counter, fall back on any failure.
///
/// The fallback policy lives here, in one place, instead of exception
/// branching scattered through call sites.
pub struct FallbackCounter {
    primary: Box<dyn TestCounter>,
    fallback: Box<dyn TestCounter>,
}

impl FallbackCounter {
    pub fn new(primary: Box<dyn TestCounter>, fallback: Box<dyn TestCounter>) -> Self {
        Self { primary, fallback }
    }

    /// Standard wiring: pytest first, filename heuristic second.
    pub fn pytest_with_heuristic(
        subprocess: SubprocessManager,
        timeout: Duration,
        excludes: ExcludeRules,
    ) -> Self {
        Self::new(
            Box::new(PytestCollector::new(subprocess, timeout)),
            Box::new(HeuristicCounter::new(excludes)),
        )
    }
}

#[async_trait]
impl TestCounter for FallbackCounter {
    async fn count(&self, project_root: &Path) -> Result<usize> {
        match self.primary.count(project_root).await {
            Ok(count) => Ok(count),
            Err(err) => {
                debug!(
                    "Primary test counter failed ({err}), falling back to file heuristic for {}",
                    project_root.display()
                );
                self.fallback.count(project_root).await
            }
        }
    }
}
