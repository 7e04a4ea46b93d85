//! # pymetra
//!
//! Collect, aggregate, and track static code metrics for Python project
//! trees: file and line counts, test counts, documentation files, and
//! Cobertura coverage, with history-based change detection and alerting.
//!
//! ## Modules
//!
//! - `collect` - Single-project metrics collection (file walk, test counting, coverage)
//! - `aggregate` - Multi-project aggregation, history store, and alert evaluation
//! - `report` - JSON / Markdown / HTML / CSV / YAML renderers
//! - `validate` - Consistency checks over collected snapshots
//! - `github` - Repository stats and issue filing against the GitHub API
//! - `gitstats` - Contribution statistics from the local git history
//! - `notify` - Slack and Discord webhook notifiers
//! - `subprocess` - Subprocess abstraction layer for testing
pub mod aggregate;
pub mod collect;
pub mod config;
pub mod error;
pub mod fmt;
pub mod github;
pub mod gitstats;
pub mod notify;
pub mod report;
pub mod subprocess;
pub mod validate;

pub use aggregate::{AggregateSnapshot, MultiProjectAggregator};
pub use collect::{ProjectCollector, ProjectSnapshot};
pub use error::{MetricsError, Result};
