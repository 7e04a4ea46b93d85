//! Git contribution statistics for a project checkout.
//!
//! All numbers come from read-only `git` invocations through the subprocess
//! layer. A missing `.git` directory or any git failure yields `None`; the
//! aggregation pipeline treats the stats as optional enrichment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::subprocess::{ProcessCommandBuilder, SubprocessManager};

const GIT_TIMEOUT: Duration = Duration::from_secs(30);
const WINDOW_DAYS: u32 = 30;

/// Commit and churn statistics over a recent window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitContributions {
    pub total_commits: u64,
    pub window_days: u32,
    pub recent_commits: u64,
    pub recent_authors: u64,
    pub insertions: u64,
    pub deletions: u64,
    pub files_changed: u64,
}

impl GitContributions {
    /// Collect stats for the checkout at `path` with the default window.
    pub async fn collect(path: &Path) -> Option<Self> {
        Self::collect_with(&SubprocessManager::production(), path, WINDOW_DAYS).await
    }

    pub async fn collect_with(
        subprocess: &SubprocessManager,
        path: &Path,
        window_days: u32,
    ) -> Option<Self> {
        if !path.join(".git").exists() {
            return None;
        }
        let since = format!("{window_days} days ago");

        let total_commits = git_number(subprocess, path, &["rev-list", "--count", "HEAD"]).await?;
        let recent_commits = git_number(
            subprocess,
            path,
            &["rev-list", "--count", "--since", &since, "HEAD"],
        )
        .await?;
        let authors = git_stdout(
            subprocess,
            path,
            &["log", "--since", &since, "--format=%an"],
        )
        .await?;
        let recent_authors = authors
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect::<BTreeSet<_>>()
            .len() as u64;

        let numstat = git_stdout(
            subprocess,
            path,
            &["log", "--since", &since, "--numstat", "--format="],
        )
        .await?;
        let mut insertions = 0;
        let mut deletions = 0;
        let mut files_changed = 0;
        for line in numstat.lines() {
            let mut fields = line.split_whitespace();
            let (Some(added), Some(removed)) = (fields.next(), fields.next()) else {
                continue;
            };
            // Binary files show as "-    -    path"; count the file, skip
            // the line totals.
            files_changed += 1;
            insertions += added.parse::<u64>().unwrap_or(0);
            deletions += removed.parse::<u64>().unwrap_or(0);
        }

        Some(Self {
            total_commits,
            window_days,
            recent_commits,
            recent_authors,
            insertions,
            deletions,
            files_changed,
        })
    }
}

async fn git_stdout(subprocess: &SubprocessManager, path: &Path, args: &[&str]) -> Option<String> {
    let command = ProcessCommandBuilder::new("git")
        .args(args)
        .current_dir(path)
        .timeout(GIT_TIMEOUT)
        .build();
    match subprocess.runner().run(command).await {
        Ok(output) if output.status.success() => Some(output.stdout),
        Ok(output) => {
            debug!(?args, status = ?output.status, "git command failed");
            None
        }
        Err(err) => {
            debug!(?args, error = %err, "git command could not run");
            None
        }
    }
}

async fn git_number(subprocess: &SubprocessManager, path: &Path, args: &[&str]) -> Option<u64> {
    git_stdout(subprocess, path, args)
        .await?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git_repo_fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        dir
    }

    #[tokio::test]
    async fn missing_git_dir_yields_none() {
        let dir = TempDir::new().unwrap();
        let (subprocess, mock) = SubprocessManager::mock();
        assert!(GitContributions::collect_with(&subprocess, dir.path(), 30)
            .await
            .is_none());
        assert_eq!(mock.calls_to("git"), 0);
    }

    #[tokio::test]
    async fn aggregates_commit_counts_and_churn() {
        let dir = git_repo_fixture();
        let (subprocess, mock) = SubprocessManager::mock();
        mock.expect_success_matching(
            "git",
            |args| {
                args.contains(&"--count".to_string()) && !args.contains(&"--since".to_string())
            },
            "128\n",
        );
        mock.expect_success_matching(
            "git",
            |args| args.contains(&"--count".to_string()) && args.contains(&"--since".to_string()),
            "12\n",
        );
        mock.expect_success_matching(
            "git",
            |args| args.iter().any(|a| a == "--format=%an"),
            "alice\nbob\nalice\n",
        );
        mock.expect_success_matching(
            "git",
            |args| args.iter().any(|a| a == "--numstat"),
            "10\t2\tsrc/app.py\n-\t-\tassets/logo.png\n3\t0\tREADME.md\n",
        );

        let stats = GitContributions::collect_with(&subprocess, dir.path(), 30)
            .await
            .unwrap();
        assert_eq!(stats.total_commits, 128);
        assert_eq!(stats.recent_commits, 12);
        assert_eq!(stats.recent_authors, 2);
        assert_eq!(stats.insertions, 13);
        assert_eq!(stats.deletions, 2);
        assert_eq!(stats.files_changed, 3);
    }

    #[tokio::test]
    async fn git_failure_yields_none() {
        let dir = git_repo_fixture();
        let (subprocess, mock) = SubprocessManager::mock();
        mock.expect_failure("git", 128, "fatal: not a git repository\n");

        assert!(GitContributions::collect_with(&subprocess, dir.path(), 30)
            .await
            .is_none());
    }
}
