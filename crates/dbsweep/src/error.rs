//! Error types for the sweep harness.

use std::path::PathBuf;

use dbsweep_deploy::DeployError;
use thiserror::Error;

use crate::bench::Phase;

/// Errors raised while preparing or running a sweep.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Invalid CLI arguments or settings; nothing has been written yet
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A template the generators depend on is absent
    #[error("Missing template: {}", .0.display())]
    MissingTemplate(PathBuf),

    /// One load or run invocation failed
    #[error("{phase} phase failed in iteration {iteration}: {reason}")]
    BenchmarkExecutionFailure {
        /// Phase that failed
        phase: Phase,
        /// Zero-based iteration index
        iteration: u32,
        /// Human-readable failure description
        reason: String,
    },

    /// Replica-set initiation after bring-up did not succeed
    #[error("Replica set initiation failed: {0}")]
    ReplicaSetInitFailure(String),

    /// Deployment backend failure
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// Filesystem failure on a generated artifact
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The settings file could not be read or parsed
    #[error("Failed to load settings from {}: {message}", path.display())]
    Settings {
        /// Settings file path
        path: PathBuf,
        /// Parser or I/O message
        message: String,
    },
}

impl HarnessError {
    /// Shorthand for [`HarnessError::InvalidConfig`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Closure mapping an I/O error on `path` into [`HarnessError::Io`].
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    /// Process exit code for this error.
    ///
    /// `1` for configuration problems (nothing was touched), `2` for
    /// everything that went wrong at runtime.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig(_) | Self::Settings { .. } => 1,
            _ => 2,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
