//! Benchmark execution.
//!
//! A [`PhaseExecutor`] runs one YCSB phase to completion; the
//! [`BenchmarkDriver`] sequences phases across iterations and hands every
//! captured output to the result collector as soon as it exists.

mod runner;
mod ycsb;

pub use runner::{BenchmarkDriver, DriverOutcome, StopReason};
pub use ycsb::YcsbExecutor;

use std::fmt;
use std::time::Duration;

use dbsweep_deploy::DeployError;
use serde::Serialize;

use crate::results::ResultKey;
use crate::workload::WorkloadSpec;

/// YCSB phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Initial data population
    Load,
    /// Measured workload execution
    Run,
}

impl Phase {
    /// Subcommand passed to `ycsb.sh`, also used in result file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Run => "run",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of a successful phase invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutput {
    /// Complete standard output of the benchmark tool
    pub stdout: String,
    /// Wall-clock duration of the invocation
    pub elapsed: Duration,
}

/// One captured phase invocation, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub key: ResultKey,
    /// Raw payload, stored unmodified
    pub output: String,
    pub elapsed: Duration,
}

/// Runs benchmark phases against a live deployment.
pub trait PhaseExecutor {
    /// Run `phase` with the given workload file and block until it exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be started or exits non-zero.
    fn execute(&self, phase: Phase, workload: &WorkloadSpec) -> Result<PhaseOutput, DeployError>;
}
