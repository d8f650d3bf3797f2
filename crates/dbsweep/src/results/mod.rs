//! Result persistence, parsing and reporting.
//!
//! - [`ResultCollector`] writes raw phase output under
//!   `{root}/{kind}/{nodes}/{read%}-{write%}/{phase}-{iteration}.txt`
//! - [`Metrics`] extracts `[SECTION], Measurement, value` lines
//! - [`ReportPrinter`] / [`export_json`] present a finished sweep
//! - [`PhaseSpinner`] shows the phase currently running

pub mod live;
pub mod parse;
pub mod report;

pub use live::PhaseSpinner;
pub use parse::{Metric, MetricValue, Metrics};
pub use report::{export_json, FailureRecord, ReportPrinter, ResultSummary, SweepReport};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::bench::{Phase, RunResult};
use crate::config::{RatioPair, StoreKind};
use crate::error::{HarnessError, Result};
use crate::topology::write_artifact;

/// Identity of one phase invocation; determines where its output is stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResultKey {
    pub kind: StoreKind,
    pub node_count: u32,
    pub ratios: RatioPair,
    pub phase: Phase,
    pub iteration: u32,
}

impl ResultKey {
    /// Path below the results root. Pure function of the key.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.kind.name())
            .join(self.node_count.to_string())
            .join(self.ratios.label())
            .join(format!("{}-{}.txt", self.phase, self.iteration))
    }

    /// Short label such as `run-2`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.phase, self.iteration)
    }
}

/// A result that has been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedResult {
    pub key: ResultKey,
    pub path: PathBuf,
    pub elapsed: Duration,
}

/// Stores raw phase output and reads it back as metrics.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    root: PathBuf,
}

impl ResultCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where the result for `key` lives.
    pub fn path_for(&self, key: &ResultKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Write the raw payload, replacing any earlier result with the same key.
    pub fn persist(&self, result: &RunResult) -> Result<PathBuf> {
        let path = self.path_for(&result.key);
        write_artifact(&path, &result.output)?;
        tracing::debug!("Persisted {} ({} bytes)", path.display(), result.output.len());
        Ok(path)
    }

    /// Remove an earlier result stored under `key`, if there is one.
    ///
    /// Called when a phase fails so a previous sweep's file is not read
    /// back as this sweep's result.
    pub fn discard(&self, key: &ResultKey) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Removed stale result {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HarnessError::io(path)(e)),
        }
    }

    /// Read a persisted result and extract its metrics.
    ///
    /// A file without any metric line yields empty metrics and a warning.
    pub fn parse(&self, path: &Path) -> Result<Metrics> {
        let text = std::fs::read_to_string(path).map_err(HarnessError::io(path))?;
        let metrics = Metrics::parse_str(&text);
        if metrics.is_empty() {
            tracing::warn!("No metric lines found in {}", path.display());
        }
        Ok(metrics)
    }
}
