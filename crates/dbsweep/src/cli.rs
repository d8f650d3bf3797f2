//! Command-line interface for the sweep harness.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{BenchmarkConfig, FailurePolicy, LoadPolicy, Ratio, RatioPair, RunProfile, StoreKind};
use crate::error::{HarnessError, Result};

/// Benchmark a replicated Redis or MongoDB deployment with YCSB.
///
/// Generates a Docker Compose deployment with NODE_COUNT nodes, brings it
/// up, writes a YCSB workload with the given read/update mix, and runs
/// load/run iterations against it. Raw YCSB output is kept under
/// results/{kind}/{nodes}/{read%}-{write%}/.
#[derive(Parser, Debug)]
#[command(name = "dbsweep")]
#[command(author, version, about, long_about = None)]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// Storage system to benchmark.
    ///
    /// Valid values: redis, mongodb (alias: mongo)
    #[arg(value_name = "DB_KIND")]
    pub db_kind: String,

    /// Number of nodes (primary plus secondaries), at least 1.
    #[arg(value_name = "NODE_COUNT")]
    pub node_count: String,

    /// Proportion of read operations, between 0 and 1.
    #[arg(value_name = "READ_RATIO")]
    pub read_ratio: String,

    /// Proportion of update operations, between 0 and 1.
    #[arg(value_name = "WRITE_RATIO")]
    pub write_ratio: String,

    /// Reuse the running deployment instead of regenerating and
    /// redeploying it (0 or 1).
    #[arg(value_name = "REUSE")]
    pub reuse: Option<String>,

    /// Settings file.
    ///
    /// Defaults to ./dbsweep.toml when present.
    #[arg(short = 'c', long, value_name = "FILE", env = "DBSWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run profile.
    ///
    /// Valid values:
    /// - quick: 1 iteration (default)
    /// - standard: 3 iterations
    /// - thorough: 10 iterations
    #[arg(long, default_value = "quick")]
    pub profile: String,

    /// Number of iterations; overrides --profile.
    #[arg(long)]
    pub iterations: Option<u32>,

    /// When the load phase runs.
    ///
    /// Valid values: per-iteration (default), once
    #[arg(long, default_value = "per-iteration")]
    pub load_policy: String,

    /// Stop the sweep at the first failed phase.
    #[arg(long)]
    pub fail_fast: bool,

    /// Delete generated workloads and all previous results before the sweep.
    #[arg(long)]
    pub reset: bool,

    /// Tear the deployment down after the sweep.
    #[arg(long)]
    pub teardown: bool,

    /// Export the parsed results to a JSON file.
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Validate the arguments and build the sweep configuration.
    ///
    /// Every problem is reported as [`HarnessError::InvalidConfig`].
    pub fn into_config(self) -> Result<BenchmarkConfig> {
        let kind: StoreKind = self.db_kind.parse()?;

        let node_count: u32 = self.node_count.trim().parse().map_err(|_| {
            HarnessError::invalid(format!(
                "Node count must be a positive integer, got {:?}",
                self.node_count
            ))
        })?;

        let read: Ratio = self.read_ratio.parse()?;
        let write: Ratio = self.write_ratio.parse()?;

        let reuse = match self.reuse.as_deref() {
            None | Some("0") => false,
            Some("1") => true,
            Some(other) => {
                return Err(HarnessError::invalid(format!(
                    "Reuse flag must be 0 or 1, got {other:?}"
                )));
            }
        };

        let profile: RunProfile = self.profile.parse()?;
        let iterations = self.iterations.unwrap_or_else(|| profile.iterations());
        let load_policy: LoadPolicy = self.load_policy.parse()?;
        let failure_policy = if self.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Continue
        };

        let config = BenchmarkConfig::new(kind, node_count, RatioPair::new(read, write))?
            .with_iterations(iterations)?
            .with_reuse(reuse)
            .with_load_policy(load_policy)
            .with_failure_policy(failure_policy)
            .with_reset(self.reset)
            .with_teardown(self.teardown);

        Ok(config)
    }

    /// Whether colored output should be used.
    pub fn color(&self) -> bool {
        !self.no_color && supports_color()
    }
}

/// Check if the terminal supports color output.
fn supports_color() -> bool {
    use std::io::IsTerminal;

    // https://no-color.org/
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    std::io::stdout().is_terminal()
}
