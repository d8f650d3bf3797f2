//! Deployment backend abstraction
//!
//! This module provides traits for bringing up a multi-container storage
//! deployment from a generated descriptor, abstracting over the tool that
//! actually runs the containers.
//!
//! # Architecture
//!
//! The deployment system is built around two core traits:
//!
//! - [`DeployBackend`]: Represents a container orchestration mechanism
//!   (e.g., the `docker compose` plugin or the standalone `docker-compose`)
//! - [`DeploymentHandle`]: A handle to a launched deployment that controls
//!   its teardown and allows running commands inside its services
//!
//! # Backend Selection
//!
//! Applications can use [`BackendType`] to request a specific backend,
//! or use [`first_available_backend()`] to pick the first available one
//! from an ordered list.
//!
//! # Example
//!
//! ```ignore
//! use dbsweep_deploy::{DeployBackend, first_available_backend};
//!
//! let backends: Vec<Box<dyn DeployBackend>> = vec![/* ... */];
//! let backend = first_available_backend(&backends)?;
//!
//! let handle = backend.deploy("dbsweep-redis", descriptor_path)?;
//! // ... run benchmarks against the deployment ...
//! handle.tear_down()?;
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::command::CommandOutput;

/// Errors that can occur during deployment operations
#[derive(Error, Debug)]
pub enum DeployError {
    /// The requested backend is not available on this system
    #[error("Deployment backend not available: {0}")]
    BackendUnavailable(String),

    /// The descriptor file handed to the backend doesn't exist
    #[error("Deployment descriptor does not exist: {}", .0.display())]
    DescriptorNotFound(PathBuf),

    /// The orchestration tool could not be started at all
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        /// Rendered command line
        command: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The orchestration tool ran but reported failure
    #[error("`{command}` exited with {}: {stderr}", describe_exit(.code))]
    CommandFailed {
        /// Rendered command line
        command: String,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Trimmed standard error of the failed command
        stderr: String,
    },

    /// The admin endpoint never became reachable
    #[error("Admin endpoint {endpoint} not reachable after {attempts} attempts: {last_error}")]
    AdminUnreachable {
        /// Endpoint that was polled
        endpoint: String,
        /// Number of connection attempts made
        attempts: u32,
        /// Error reported by the final attempt
        last_error: String,
    },

    /// An administrative command was rejected by the storage system
    #[error("Admin command failed on {endpoint}: {message}")]
    AdminCommand {
        /// Endpoint the command ran against
        endpoint: String,
        /// Error text returned by the client
        message: String,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

impl DeployError {
    /// Build a [`DeployError::CommandFailed`] from a captured command output.
    pub fn command_failed(output: &CommandOutput) -> Self {
        Self::CommandFailed {
            command: output.command.clone(),
            code: output.code,
            stderr: output.stderr_excerpt(),
        }
    }
}

/// A handle to a launched deployment
///
/// Unlike a mount, a deployment outlives the process that started it: the
/// harness deliberately leaves containers running so a later invocation can
/// reuse them. Dropping the handle therefore does nothing; call
/// [`tear_down()`](DeploymentHandle::tear_down) to stop the deployment.
///
/// # Scope
///
/// Teardown only affects the containers belonging to
/// [`project()`](DeploymentHandle::project). Unrelated containers on the
/// same host are never touched.
pub trait DeploymentHandle: Send {
    /// Project name that scopes every container of this deployment
    fn project(&self) -> &str;

    /// Descriptor the deployment was launched from
    fn descriptor(&self) -> &Path;

    /// Run a command inside one service of the deployment and capture its output
    ///
    /// A non-zero exit status is *not* an error at this level; callers
    /// inspect [`CommandOutput::success()`] so they can report the
    /// storage system's own error text.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Spawn`] if the orchestration tool cannot be run.
    fn exec(&self, service: &str, args: &[String]) -> Result<CommandOutput, DeployError>;

    /// Stop and remove every container of this deployment
    ///
    /// # Errors
    ///
    /// Returns an error if the orchestration tool fails to stop the project.
    fn tear_down(self: Box<Self>) -> Result<(), DeployError>;
}

/// A backend that can launch deployments from descriptor files
///
/// # Thread Safety
///
/// Backends must be `Send + Sync`. Deploy operations block until the
/// orchestration tool reports the containers launched, which is not the
/// same as the storage system being ready to serve.
pub trait DeployBackend: Send + Sync {
    /// Human-readable name for this backend
    fn name(&self) -> &'static str;

    /// Unique identifier for this backend
    fn id(&self) -> &'static str;

    /// Check if this backend is usable on the current system
    fn is_available(&self) -> bool;

    /// Get a human-readable explanation of why the backend is unavailable
    ///
    /// Returns `None` if the backend is available.
    fn unavailable_reason(&self) -> Option<String>;

    /// Get the backend type enum value
    fn backend_type(&self) -> BackendType;

    /// Launch the deployment described by `descriptor` under `project`
    ///
    /// Any previous deployment of the same project is stopped first, so the
    /// returned handle always refers to freshly created containers.
    ///
    /// # Errors
    ///
    /// - [`DeployError::DescriptorNotFound`] - Descriptor file is missing
    /// - [`DeployError::Spawn`] - Orchestration tool could not be started
    /// - [`DeployError::CommandFailed`] - Orchestration tool reported failure
    fn deploy(
        &self,
        project: &str,
        descriptor: &Path,
    ) -> Result<Box<dyn DeploymentHandle>, DeployError>;

    /// Get a handle to an already-running deployment without touching it
    fn attach(&self, project: &str, descriptor: &Path) -> Box<dyn DeploymentHandle>;
}

/// Available backend types for launching deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendType {
    /// `docker compose` (Compose v2 CLI plugin)
    #[default]
    ComposePlugin,

    /// `docker-compose` (standalone binary)
    ComposeStandalone,
}

impl BackendType {
    /// Get the display name for logs and messages
    pub fn display_name(&self) -> &'static str {
        match self {
            BackendType::ComposePlugin => "docker compose",
            BackendType::ComposeStandalone => "docker-compose",
        }
    }

    /// Identifier matching [`DeployBackend::id`]
    pub fn id(&self) -> &'static str {
        match self {
            BackendType::ComposePlugin => "compose-plugin",
            BackendType::ComposeStandalone => "compose-standalone",
        }
    }

    /// Get all backend types, in default preference order
    pub fn all() -> &'static [BackendType] {
        &[BackendType::ComposePlugin, BackendType::ComposeStandalone]
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Select a specific backend by type from a list
///
/// Returns an error if the requested backend is missing or not available.
pub fn select_backend(
    backends: &[Box<dyn DeployBackend>],
    backend_type: BackendType,
) -> Result<&dyn DeployBackend, DeployError> {
    let id = backend_type.id();

    backends
        .iter()
        .find(|b| b.id() == id)
        .map(|b| b.as_ref())
        .filter(|b| b.is_available())
        .ok_or_else(|| {
            let reason = backends
                .iter()
                .find(|b| b.id() == id)
                .and_then(|b| b.unavailable_reason())
                .unwrap_or_else(|| "Backend not found".to_string());
            DeployError::BackendUnavailable(reason)
        })
}

/// Get the first available backend from an ordered list
///
/// The caller controls priority by ordering the backends list.
pub fn first_available_backend(
    backends: &[Box<dyn DeployBackend>],
) -> Result<&dyn DeployBackend, DeployError> {
    backends
        .iter()
        .find(|b| b.is_available())
        .map(|b| b.as_ref())
        .ok_or_else(|| {
            let reasons: Vec<String> = backends
                .iter()
                .filter_map(|b| b.unavailable_reason())
                .collect();
            DeployError::BackendUnavailable(if reasons.is_empty() {
                "No backends available".to_string()
            } else {
                reasons.join("; ")
            })
        })
}
