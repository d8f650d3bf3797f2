//! Deployment lifecycle for a sweep.

use std::path::Path;

use dbsweep_deploy::{signal, AdminClient, DeployBackend, DeploymentHandle};

use crate::config::StoreKind;
use crate::error::{HarnessError, Result};
use crate::settings::{DeploySettings, PathSettings};
use crate::store::StoreStrategy;
use crate::topology::{declared_node_count, DeploymentDescriptor};

/// A launched deployment plus the outcome of its post-bring-up step.
pub struct BringUp {
    pub handle: Box<dyn DeploymentHandle>,
    /// Set when administration after bring-up failed; containers stay up
    pub admin_failure: Option<HarnessError>,
}

/// Brings deployments up and down and resets generated state.
pub struct DeploymentController<'a> {
    backend: &'a dyn DeployBackend,
    admin: &'a dyn AdminClient,
    settings: &'a DeploySettings,
    paths: &'a PathSettings,
}

impl<'a> DeploymentController<'a> {
    pub fn new(
        backend: &'a dyn DeployBackend,
        admin: &'a dyn AdminClient,
        settings: &'a DeploySettings,
        paths: &'a PathSettings,
    ) -> Self {
        Self { backend, admin, settings, paths }
    }

    /// Compose project for a kind.
    pub fn project(&self, kind: StoreKind) -> String {
        self.settings.project(kind)
    }

    /// Launch the deployment and run the kind's post-bring-up step.
    ///
    /// Any earlier deployment of the same project is replaced, so the
    /// replica set is always initiated on fresh containers. A failed
    /// post-bring-up step is returned in [`BringUp::admin_failure`] rather
    /// than as an error.
    #[tracing::instrument(level = "info", skip_all, fields(kind = %descriptor.kind, nodes = descriptor.nodes.len()))]
    pub fn bring_up(
        &self,
        strategy: &dyn StoreStrategy,
        descriptor: &DeploymentDescriptor,
    ) -> Result<BringUp> {
        let project = self.project(descriptor.kind);
        tracing::info!("Bringing up {} via {}", project, self.backend.name());
        let handle = self.backend.deploy(&project, &descriptor.path)?;

        let grace = self.settings.startup_grace;
        if !grace.is_zero() {
            tracing::info!("Waiting {:?} for containers to start", grace);
            if signal::wait_for_shutdown_timeout(grace) {
                tracing::warn!("Shutdown requested during startup grace period");
            }
        }

        let admin_failure = match strategy.post_bring_up(descriptor, handle.as_ref(), self.admin) {
            Ok(()) => None,
            Err(e) => {
                tracing::error!("{}", e);
                Some(e)
            }
        };

        Ok(BringUp { handle, admin_failure })
    }

    /// Handle to an already-running deployment of `kind`; nothing is started.
    pub fn attach(&self, kind: StoreKind) -> Box<dyn DeploymentHandle> {
        let project = self.project(kind);
        tracing::info!("Reusing running deployment {}", project);
        self.backend.attach(&project, &self.paths.descriptor(kind))
    }

    /// Node count of the descriptor a reused deployment was started from.
    ///
    /// `None` when no descriptor has been generated for this kind.
    pub fn attached_node_count(&self, strategy: &dyn StoreStrategy) -> Result<Option<usize>> {
        let path = self.paths.descriptor(strategy.kind());
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(declared_node_count(strategy, &contents))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HarnessError::io(path)(e)),
        }
    }

    /// Stop the deployment behind `handle`, and only that deployment.
    pub fn tear_down(&self, handle: Box<dyn DeploymentHandle>) -> Result<()> {
        handle.tear_down()?;
        Ok(())
    }

    /// Delete every generated workload and the whole results tree.
    ///
    /// Destructive. Only called at the start of a sweep.
    pub fn reset_state(&self) -> Result<()> {
        for dir in [&self.paths.workloads, &self.paths.results] {
            tracing::info!("Resetting {}", dir.display());
            remove_dir_if_exists(dir)?;
            std::fs::create_dir_all(dir).map_err(HarnessError::io(dir))?;
        }
        Ok(())
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HarnessError::Io { path: dir.to_path_buf(), source: e }),
    }
}
