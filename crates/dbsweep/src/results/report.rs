//! Sweep summary: terminal table and JSON export.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use serde::Serialize;

use super::{Metrics, ResultKey};
use crate::bench::StopReason;
use crate::config::BenchmarkConfig;
use crate::error::HarnessError;

/// Sections that are not operation types.
const SUMMARY_SECTIONS: &[&str] = &["OVERALL", "CLEANUP", "TOTAL_GCS", "TOTAL_GC_TIME", "TOTAL_GC_TIME_%"];

/// Parsed view of one persisted result.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub key: ResultKey,
    pub path: PathBuf,
    pub elapsed_ms: u64,
    pub metrics: Metrics,
}

/// A recorded, non-fatal failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// `load`, `run`, `replica-set-init` or `teardown`
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    pub message: String,
}

impl FailureRecord {
    /// Stage name used for failed replica-set initiation.
    pub const REPLICA_SET_INIT: &'static str = "replica-set-init";

    /// Record for a failure collected during a sweep.
    pub fn from_error(error: &HarnessError) -> Self {
        match error {
            HarnessError::BenchmarkExecutionFailure { phase, iteration, reason } => Self {
                stage: phase.name().to_string(),
                iteration: Some(*iteration),
                message: reason.clone(),
            },
            HarnessError::ReplicaSetInitFailure(message) => Self {
                stage: Self::REPLICA_SET_INIT.to_string(),
                iteration: None,
                message: message.clone(),
            },
            other => Self { stage: "sweep".to_string(), iteration: None, message: other.to_string() },
        }
    }
}

/// Everything a sweep produced.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub config: BenchmarkConfig,
    /// Compose project the sweep ran against
    pub project: String,
    pub results: Vec<ResultSummary>,
    pub failures: Vec<FailureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped: Option<StopReason>,
}

impl SweepReport {
    /// Process exit code for a sweep that ran to its end or stopped early.
    pub fn exit_code(&self) -> i32 {
        self.stopped.map_or(0, |reason| reason.exit_code())
    }
}

/// JSON export wrapper.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    metadata: ReportMetadata,
    #[serde(flatten)]
    report: &'a SweepReport,
}

#[derive(Debug, Serialize)]
struct ReportMetadata {
    timestamp: String,
    platform: String,
    dbsweep_version: String,
}

/// Export a sweep report to a JSON file.
pub fn export_json(report: &SweepReport, path: &Path) -> anyhow::Result<()> {
    let wrapped = JsonReport {
        metadata: ReportMetadata {
            timestamp: chrono::Utc::now().to_rfc3339(),
            platform: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            dbsweep_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        report,
    };

    let json = serde_json::to_string_pretty(&wrapped)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}

/// Formats a sweep report for the terminal.
pub struct ReportPrinter {
    color: bool,
}

impl ReportPrinter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Print the report to stdout.
    pub fn print(&self, report: &SweepReport) {
        print!("{}", self.render(report));
    }

    /// Render the report.
    ///
    /// Example output:
    /// ```text
    /// Results: redis / 3 nodes / 50-50 (project dbsweep-redis)
    ///   load-0    runtime    10.11 s   throughput    98.9 ops/s
    ///             INSERT        1000 ops   avg     245.0 us
    ///   run-0     runtime     9.87 s   throughput   101.3 ops/s
    ///             READ           496 ops   avg     245.3 us
    ///             UPDATE         504 ops   avg     301.8 us
    /// ```
    pub fn render(&self, report: &SweepReport) -> String {
        let config = &report.config;
        let mut out = String::new();

        let nodes = if config.node_count() == 1 { "node" } else { "nodes" };
        let title = format!(
            "{} / {} {} / {}",
            config.kind(),
            config.node_count(),
            nodes,
            config.ratios().label()
        );
        let _ = writeln!(out);
        if self.color {
            let _ = writeln!(out, "{}: {} (project {})", "Results".bold(), title.cyan(), report.project);
        } else {
            let _ = writeln!(out, "Results: {} (project {})", title, report.project);
        }

        if report.results.is_empty() {
            let _ = writeln!(out, "  no results captured");
        }

        for result in &report.results {
            self.render_result(&mut out, result);
        }

        if !report.failures.is_empty() {
            let _ = writeln!(out);
            let heading = format!("Failures ({})", report.failures.len());
            if self.color {
                let _ = writeln!(out, "{}", heading.red().bold());
            } else {
                let _ = writeln!(out, "{heading}");
            }
            for failure in &report.failures {
                let stage = match failure.iteration {
                    Some(i) => format!("{}-{}", failure.stage, i),
                    None => failure.stage.clone(),
                };
                let _ = writeln!(out, "  {stage}: {}", failure.message);
            }
        }

        if let Some(reason) = report.stopped {
            let _ = writeln!(out);
            let line = format!("Sweep stopped early: {reason}");
            if self.color {
                let _ = writeln!(out, "{}", line.yellow());
            } else {
                let _ = writeln!(out, "{line}");
            }
        }

        out
    }

    fn render_result(&self, out: &mut String, result: &ResultSummary) {
        let metrics = &result.metrics;
        let label = format!("{:<8}", result.key.label());
        let label = if self.color { label.bold().to_string() } else { label };

        if metrics.is_empty() {
            let _ = writeln!(out, "  {label}  no metrics in {}", result.path.display());
            return;
        }

        let runtime = metrics
            .number("OVERALL", "RunTime(ms)")
            .map_or_else(|| "-".to_string(), |ms| format!("{:.2} s", ms / 1000.0));
        let throughput = metrics
            .number("OVERALL", "Throughput(ops/sec)")
            .map_or_else(|| "-".to_string(), |t| format!("{t:.1} ops/s"));
        let _ = writeln!(out, "  {label}  runtime {runtime:>10}   throughput {throughput:>14}");

        for section in metrics.sections() {
            if SUMMARY_SECTIONS.contains(&section) {
                continue;
            }
            let ops = metrics
                .number(section, "Operations")
                .map_or_else(|| "-".to_string(), |n| format!("{n:.0}"));
            let avg = metrics
                .number(section, "AverageLatency(us)")
                .map_or_else(|| "-".to_string(), |us| format!("{us:.1} us"));
            let _ = writeln!(out, "  {:<8}  {section:<12} {ops:>10} ops   avg {avg:>12}", "");
        }
    }
}
