//! Iteration driver.

use std::fmt;

use dbsweep_deploy::signal;
use serde::Serialize;

use super::{Phase, PhaseExecutor, RunResult};
use crate::config::{BenchmarkConfig, FailurePolicy};
use crate::error::{HarnessError, Result};
use crate::results::{PersistedResult, PhaseSpinner, ResultCollector, ResultKey};
use crate::workload::WorkloadSpec;

/// Why a sweep ended before its last phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// A phase failed under [`FailurePolicy::FailFast`]
    FailFast,
    /// Shutdown was requested with Ctrl+C
    Interrupted,
}

impl StopReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FailFast => 3,
            Self::Interrupted => 130,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail-fast after a failed phase"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// What the driver produced.
#[derive(Debug, Default)]
pub struct DriverOutcome {
    /// Results written to disk, in execution order
    pub persisted: Vec<PersistedResult>,
    /// One [`HarnessError::BenchmarkExecutionFailure`] per failed phase
    pub failures: Vec<HarnessError>,
    pub stopped: Option<StopReason>,
}

/// Runs `load`/`run` phases for every iteration, one at a time.
///
/// Iterations never overlap: each phase blocks until the benchmark tool
/// exits, and its output is persisted before the next phase starts.
pub struct BenchmarkDriver<'a> {
    config: &'a BenchmarkConfig,
    executor: &'a dyn PhaseExecutor,
    collector: &'a ResultCollector,
    interrupted: Box<dyn Fn() -> bool + 'a>,
    show_progress: bool,
    color: bool,
}

impl<'a> BenchmarkDriver<'a> {
    pub fn new(
        config: &'a BenchmarkConfig,
        executor: &'a dyn PhaseExecutor,
        collector: &'a ResultCollector,
    ) -> Self {
        Self {
            config,
            executor,
            collector,
            interrupted: Box::new(signal::shutdown_requested),
            show_progress: false,
            color: false,
        }
    }

    /// Replace the Ctrl+C check consulted before every phase.
    #[must_use]
    pub fn with_interrupt_check(mut self, check: impl Fn() -> bool + 'a) -> Self {
        self.interrupted = Box::new(check);
        self
    }

    /// Show a spinner per phase.
    #[must_use]
    pub fn with_progress(mut self, show: bool, color: bool) -> Self {
        self.show_progress = show;
        self.color = color;
        self
    }

    /// Phases of one iteration under the configured load policy.
    pub fn phases(&self, iteration: u32) -> Vec<Phase> {
        if self.config.load_policy().loads_in(iteration) {
            vec![Phase::Load, Phase::Run]
        } else {
            vec![Phase::Run]
        }
    }

    /// Run every iteration.
    ///
    /// Phase failures are collected in the outcome. Only a failure to
    /// persist a result (or to clear a stale one) is returned as an error.
    pub fn run(&self, workload: &WorkloadSpec) -> Result<DriverOutcome> {
        let config = self.config;
        let mut outcome = DriverOutcome::default();
        let context = format!(
            "{} / {} node(s) / {}",
            config.kind(),
            config.node_count(),
            config.ratios().label()
        );

        'sweep: for iteration in 0..config.iterations() {
            for phase in self.phases(iteration) {
                if (self.interrupted)() {
                    tracing::warn!("Shutdown requested, not starting {}-{}", phase, iteration);
                    outcome.stopped = Some(StopReason::Interrupted);
                    break 'sweep;
                }

                let key = ResultKey {
                    kind: config.kind(),
                    node_count: config.node_count(),
                    ratios: config.ratios(),
                    phase,
                    iteration,
                };
                tracing::info!("Starting {} (iteration {}/{})", phase, iteration + 1, config.iterations());
                let spinner = PhaseSpinner::start(&key.label(), &context, self.show_progress, self.color);

                match self.executor.execute(phase, workload) {
                    Ok(output) => {
                        let result = RunResult { key, output: output.stdout, elapsed: output.elapsed };
                        let path = self.collector.persist(&result)?;
                        spinner.finish_ok(result.elapsed);
                        outcome.persisted.push(PersistedResult {
                            key,
                            path,
                            elapsed: result.elapsed,
                        });
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        spinner.finish_failed(&reason);
                        self.collector.discard(&key)?;
                        tracing::error!("{} phase failed in iteration {}: {}", phase, iteration, reason);
                        outcome.failures.push(HarnessError::BenchmarkExecutionFailure {
                            phase,
                            iteration,
                            reason,
                        });
                        if config.failure_policy() == FailurePolicy::FailFast {
                            outcome.stopped = Some(StopReason::FailFast);
                            break 'sweep;
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }
}
