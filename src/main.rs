use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error};

use pymetra::aggregate::{alerts, AlertEvaluator, HistoryStore, MultiProjectAggregator};
use pymetra::collect::ProjectCollector;
use pymetra::config::ProjectsConfig;
use pymetra::github::{GitHubClient, IssueClient};
use pymetra::notify::{self, Notifier};
use pymetra::report::MetricsExporter;
use pymetra::validate::SnapshotValidator;

/// Collect and aggregate static metrics from Python project trees
#[derive(Parser)]
#[command(name = "pymetra")]
#[command(about = "Python project metrics collector", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Markdown,
    Html,
    Csv,
    Yaml,
    All,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect metrics for a single project tree
    Collect {
        /// Project root to scan
        path: PathBuf,

        /// Output directory for rendered metrics
        #[arg(short, long, default_value = "metrics")]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "all")]
        format: Format,

        /// Validate the snapshot and print the report
        #[arg(long)]
        validate: bool,
    },
    /// Collect and aggregate metrics across a list of projects
    Aggregate {
        /// JSON file listing projects (`{"projects": [{"name", "path"}]}`)
        projects_file: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "metrics")]
        output: PathBuf,

        /// Print the README summary table
        #[arg(long)]
        readme_table: bool,

        /// Print the evolution report against the stored history
        #[arg(long)]
        evolution: bool,

        /// Skip writing a history entry
        #[arg(long)]
        no_history: bool,

        /// Enrich projects with GitHub repository statistics
        #[arg(long)]
        github_api: bool,

        /// Reuse a previous aggregated export instead of re-collecting
        #[arg(long)]
        load_from_json: bool,
    },
    /// Re-render a previously collected metrics file
    Export {
        /// A `metrics.json` file produced by `collect`
        metrics_file: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "metrics")]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "all")]
        format: Format,
    },
    /// Evaluate threshold alerts against the stored history
    Alerts {
        /// An aggregated export produced by `aggregate`
        metrics_file: PathBuf,

        /// Percent change that triggers an alert
        #[arg(short, long, default_value_t = 10.0)]
        threshold: f64,

        /// History directory holding baseline snapshots
        #[arg(long, default_value = "metrics/history")]
        history_dir: PathBuf,

        /// File a GitHub issue when alerts fire
        #[arg(long)]
        create_issue: bool,

        /// Send webhook notifications when alerts fire
        #[arg(long)]
        notify: bool,

        /// Repository owner for issue filing
        #[arg(long)]
        github_owner: Option<String>,

        /// Repository name for issue filing
        #[arg(long)]
        github_repo: Option<String>,

        /// Labels for the created issue
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,

        /// Assignees for the created issue
        #[arg(long, value_delimiter = ',')]
        assignees: Vec<String>,
    },
    /// Fetch repository statistics from GitHub
    Github {
        owner: String,
        repo: String,

        /// API token (falls back to GITHUB_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Write the stats as JSON into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate the consistency of a project's metrics
    Validate {
        /// Project root to scan
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("pymetra started with verbosity level: {}", cli.verbose);

    let result = match cli.command {
        Commands::Collect {
            path,
            output,
            format,
            validate,
        } => run_collect(path, output, format, validate).await,
        Commands::Aggregate {
            projects_file,
            output,
            readme_table,
            evolution,
            no_history,
            github_api,
            load_from_json,
        } => {
            run_aggregate(
                projects_file,
                output,
                readme_table,
                evolution,
                no_history,
                github_api,
                load_from_json,
            )
            .await
        }
        Commands::Export {
            metrics_file,
            output,
            format,
        } => run_export(metrics_file, output, format),
        Commands::Alerts {
            metrics_file,
            threshold,
            history_dir,
            create_issue,
            notify,
            github_owner,
            github_repo,
            labels,
            assignees,
        } => {
            run_alerts(
                metrics_file,
                threshold,
                history_dir,
                create_issue,
                notify,
                github_owner,
                github_repo,
                labels,
                assignees,
            )
            .await
        }
        Commands::Github {
            owner,
            repo,
            token,
            output,
        } => run_github(owner, repo, token, output).await,
        Commands::Validate { path } => run_validate(path).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn export_formats(
    exporter: &MetricsExporter<'_>,
    output: &Path,
    format: Format,
) -> anyhow::Result<()> {
    let ok = match format {
        Format::Json => exporter.export_json(&output.join("metrics.json")),
        Format::Markdown => exporter.export_markdown(&output.join("metrics.md")),
        Format::Html => exporter.export_html(&output.join("metrics.html")),
        Format::Csv => exporter.export_csv(&output.join("metrics.csv")),
        Format::Yaml => exporter.export_yaml(&output.join("metrics.yaml")),
        Format::All => {
            let results = exporter.export_all(output);
            for (format, ok) in &results {
                if !ok {
                    eprintln!("⚠️ export of {format} failed");
                }
            }
            results.values().all(|ok| *ok)
        }
    };
    if !ok {
        anyhow::bail!("export to {} failed", output.display());
    }
    Ok(())
}

async fn run_collect(
    path: PathBuf,
    output: PathBuf,
    format: Format,
    validate: bool,
) -> anyhow::Result<ExitCode> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project")
        .to_string();
    let snapshot = ProjectCollector::new(&path).collect(&name).await?;

    println!("📊 {name}: {} Python files, {} lines, {} tests",
        snapshot.python_file_count, snapshot.lines_of_code, snapshot.test_count);
    export_formats(&MetricsExporter::new(&snapshot), &output, format)?;
    println!("✅ Metrics written to {}", output.display());

    if validate {
        let report = SnapshotValidator::validate(&snapshot);
        print_validation(&report);
        if !report.valid {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::too_many_arguments)]
async fn run_aggregate(
    projects_file: PathBuf,
    output: PathBuf,
    readme_table: bool,
    evolution: bool,
    no_history: bool,
    github_api: bool,
    load_from_json: bool,
) -> anyhow::Result<ExitCode> {
    let mut aggregator = MultiProjectAggregator::default();
    if !no_history {
        aggregator = aggregator.with_history(output.join("history"));
    }
    if github_api {
        aggregator = aggregator.with_github(GitHubClient::new(None)?);
    }

    let export_path = output.join("aggregated_metrics.json");
    if load_from_json {
        if !aggregator.load_from_json(&export_path) {
            anyhow::bail!("could not load {}", export_path.display());
        }
    } else {
        let projects = ProjectsConfig::load(&projects_file)?;
        aggregator.collect_all(&projects).await;
    }

    if evolution {
        // Compare before this run's snapshot is appended to history.
        println!("{}", aggregator.evolution_report()?);
    }

    if !aggregator.export_aggregated_json(&export_path) {
        anyhow::bail!("aggregated export failed");
    }
    let aggregate = aggregator.aggregate();
    println!(
        "✅ Aggregated {} project(s): {} modules, {} lines, {} tests",
        aggregate.project_count,
        aggregate.total_modules,
        aggregate.total_lines_of_code,
        aggregate.total_tests,
    );

    if readme_table {
        println!("\n{}", aggregator.generate_readme_table());
    }
    Ok(ExitCode::SUCCESS)
}

fn run_export(metrics_file: PathBuf, output: PathBuf, format: Format) -> anyhow::Result<ExitCode> {
    let content = std::fs::read_to_string(&metrics_file)?;
    let snapshot = serde_json::from_str(&content)?;
    export_formats(&MetricsExporter::new(&snapshot), &output, format)?;
    println!("✅ Metrics re-rendered to {}", output.display());
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::too_many_arguments)]
async fn run_alerts(
    metrics_file: PathBuf,
    threshold: f64,
    history_dir: PathBuf,
    create_issue: bool,
    notify_flag: bool,
    github_owner: Option<String>,
    github_repo: Option<String>,
    labels: Vec<String>,
    assignees: Vec<String>,
) -> anyhow::Result<ExitCode> {
    let mut aggregator = MultiProjectAggregator::default();
    if !aggregator.load_from_json(&metrics_file) {
        anyhow::bail!("could not load {}", metrics_file.display());
    }
    let current = aggregator.aggregate();

    let evaluator = AlertEvaluator::new(HistoryStore::new(history_dir));
    let set = evaluator.evaluate(&current, threshold)?;
    println!("{}", set.message);

    if !set.should_file() {
        return Ok(ExitCode::SUCCESS);
    }

    if create_issue {
        let (Some(owner), Some(repo)) = (github_owner.as_deref(), github_repo.as_deref()) else {
            anyhow::bail!("--create-issue requires --github-owner and --github-repo");
        };
        let client = GitHubClient::new(None)?;
        let issues = IssueClient::new(&client, owner, repo);
        let title = format!(
            "Metric change alert ({})",
            set.current_date.format("%Y-%m-%d")
        );
        match issues.find_existing(&title).await? {
            Some(existing) => {
                println!("ℹ️ Issue already filed: {}", existing.html_url);
            }
            None => {
                let body = alerts::format_issue_body(&set);
                let issue = issues.create_issue(&title, &body, labels, assignees).await?;
                println!("✅ Filed issue #{}: {}", issue.number, issue.html_url);
            }
        }
    }

    if notify_flag {
        for notifier in notify::from_env() {
            if notifier.send(&set.message).await {
                println!("✅ Notified via {}", notifier.channel());
            } else {
                eprintln!("⚠️ Notification via {} failed", notifier.channel());
            }
        }
    }

    // Alerts were detected.
    Ok(ExitCode::FAILURE)
}

async fn run_github(
    owner: String,
    repo: String,
    token: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let client = GitHubClient::new(token)?;
    let stats = client.repo_stats(&format!("{owner}/{repo}")).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    if let Some(dir) = output {
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("github_{repo}.json"));
        std::fs::write(&path, serde_json::to_string_pretty(&stats)?)?;
        println!("✅ Stats written to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_validate(path: PathBuf) -> anyhow::Result<ExitCode> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project")
        .to_string();
    let snapshot = ProjectCollector::new(&path).collect(&name).await?;
    let report = SnapshotValidator::validate(&snapshot);
    print_validation(&report);
    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_validation(report: &pymetra::validate::ValidationReport) {
    if report.valid {
        println!("✅ Snapshot is consistent (score {}/100)", report.score);
    } else {
        println!("❌ Snapshot is inconsistent (score {}/100)", report.score);
    }
    for error in &report.errors {
        println!("  error: {error}");
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
}
