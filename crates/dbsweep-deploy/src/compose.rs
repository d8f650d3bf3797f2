//! Docker Compose deployment backend.
//!
//! Every invocation is scoped with `-p <project> -f <descriptor>`, so
//! bring-up, teardown and `exec` only ever touch the containers of one
//! deployment.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use crate::backend::{BackendType, DeployBackend, DeployError, DeploymentHandle};
use crate::command::{run_captured, run_checked, CommandOutput};

/// Deployment backend driving the Docker Compose CLI.
#[derive(Debug)]
pub struct ComposeBackend {
    backend_type: BackendType,
    use_sudo: bool,
    unavailable: OnceLock<Option<String>>,
}

impl ComposeBackend {
    /// Create a backend for the given Compose flavour.
    pub fn new(backend_type: BackendType) -> Self {
        Self {
            backend_type,
            use_sudo: false,
            unavailable: OnceLock::new(),
        }
    }

    /// Prefix every Compose invocation with `sudo`.
    ///
    /// Needed on hosts where the invoking user is not in the `docker` group.
    #[must_use]
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    /// Both Compose flavours, plugin first.
    pub fn all(use_sudo: bool) -> Vec<Box<dyn DeployBackend>> {
        BackendType::all()
            .iter()
            .map(|&t| Box::new(ComposeBackend::new(t).with_sudo(use_sudo)) as Box<dyn DeployBackend>)
            .collect()
    }

    fn invocation(&self, project: &str, descriptor: &Path) -> ComposeInvocation {
        ComposeInvocation {
            backend_type: self.backend_type,
            use_sudo: self.use_sudo,
            project: project.to_string(),
            descriptor: descriptor.to_path_buf(),
        }
    }

    fn probe(&self) -> Option<String> {
        let mut cmd = match self.backend_type {
            BackendType::ComposePlugin => {
                let mut cmd = Command::new("docker");
                cmd.args(["compose", "version"]);
                cmd
            }
            BackendType::ComposeStandalone => {
                let mut cmd = Command::new("docker-compose");
                cmd.arg("version");
                cmd
            }
        };

        match run_captured(&mut cmd) {
            Ok(out) if out.success() => None,
            Ok(out) => Some(format!(
                "`{}` failed: {}",
                out.command,
                out.stderr_excerpt()
            )),
            Err(e) => Some(e.to_string()),
        }
    }
}

impl DeployBackend for ComposeBackend {
    fn name(&self) -> &'static str {
        self.backend_type.display_name()
    }

    fn id(&self) -> &'static str {
        self.backend_type.id()
    }

    fn is_available(&self) -> bool {
        self.unavailable_reason().is_none()
    }

    fn unavailable_reason(&self) -> Option<String> {
        self.unavailable.get_or_init(|| self.probe()).clone()
    }

    fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    fn deploy(
        &self,
        project: &str,
        descriptor: &Path,
    ) -> Result<Box<dyn DeploymentHandle>, DeployError> {
        if !descriptor.is_file() {
            return Err(DeployError::DescriptorNotFound(descriptor.to_path_buf()));
        }

        let invocation = self.invocation(project, descriptor);

        // A leftover deployment of the same project would keep its state
        // (and an already-initiated replica set) across runs.
        let down = run_captured(&mut invocation.command(&["down", "--remove-orphans"]))?;
        if !down.success() {
            tracing::warn!(
                "Stopping previous deployment of {} failed: {}",
                project,
                down.stderr_excerpt()
            );
        }

        tracing::info!("Starting deployment {} from {}", project, descriptor.display());
        run_checked(&mut invocation.command(&["up", "-d"]))?;

        Ok(Box::new(ComposeHandle { invocation }))
    }

    fn attach(&self, project: &str, descriptor: &Path) -> Box<dyn DeploymentHandle> {
        Box::new(ComposeHandle {
            invocation: self.invocation(project, descriptor),
        })
    }
}

/// Everything needed to address one Compose project from the CLI.
#[derive(Debug, Clone)]
struct ComposeInvocation {
    backend_type: BackendType,
    use_sudo: bool,
    project: String,
    descriptor: PathBuf,
}

impl ComposeInvocation {
    fn command(&self, args: &[&str]) -> Command {
        let mut base: Vec<&str> = Vec::with_capacity(3);
        if self.use_sudo {
            base.push("sudo");
        }
        match self.backend_type {
            BackendType::ComposePlugin => base.extend(["docker", "compose"]),
            BackendType::ComposeStandalone => base.push("docker-compose"),
        }

        let mut cmd = Command::new(base[0]);
        cmd.args(&base[1..])
            .arg("-p")
            .arg(&self.project)
            .arg("-f")
            .arg(&self.descriptor)
            .args(args);
        cmd
    }
}

/// Handle to a deployment launched (or attached to) through Compose.
#[derive(Debug)]
pub struct ComposeHandle {
    invocation: ComposeInvocation,
}

impl DeploymentHandle for ComposeHandle {
    fn project(&self) -> &str {
        &self.invocation.project
    }

    fn descriptor(&self) -> &Path {
        &self.invocation.descriptor
    }

    fn exec(&self, service: &str, args: &[String]) -> Result<CommandOutput, DeployError> {
        let mut cmd = self.invocation.command(&["exec", "-T", service]);
        cmd.args(args);
        run_captured(&mut cmd)
    }

    fn tear_down(self: Box<Self>) -> Result<(), DeployError> {
        tracing::info!("Tearing down deployment {}", self.invocation.project);
        run_checked(&mut self.invocation.command(&["down", "--remove-orphans"]))?;
        Ok(())
    }
}
