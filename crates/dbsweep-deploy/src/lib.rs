//! Deployment plumbing for dbsweep.
//!
//! This crate owns everything that touches processes outside the harness:
//!
//! - [`DeployBackend`] / [`DeploymentHandle`]: launching and tearing down a
//!   containerized storage deployment ([`ComposeBackend`] drives Docker
//!   Compose)
//! - [`AdminClient`] / [`AdminSession`]: post-bring-up administration
//!   ([`MongoShell`] runs `mongosh` inside a container)
//! - [`command`]: captured execution of external tools
//! - [`signal`]: Ctrl+C handling shared by the binary and the driver loop

#![warn(missing_docs)]

pub mod admin;
pub mod backend;
pub mod command;
pub mod compose;
pub mod signal;

pub use admin::{AdminClient, AdminSession, Endpoint, MongoShell, ReadinessPoll};
pub use backend::{
    first_available_backend, select_backend, BackendType, DeployBackend, DeployError,
    DeploymentHandle,
};
pub use command::{run_captured, run_checked, CommandOutput};
pub use compose::{ComposeBackend, ComposeHandle};
