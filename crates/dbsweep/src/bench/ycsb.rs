use std::path::PathBuf;
use std::process::Command;

use dbsweep_deploy::{run_checked, DeployError};

use super::{Phase, PhaseExecutor, PhaseOutput};
use crate::settings::YcsbSettings;
use crate::workload::WorkloadSpec;

/// Runs phases through the YCSB launcher script.
///
/// Invocation: `<launcher> <phase> <binding> <extra args...> -P <workload>`.
#[derive(Debug, Clone)]
pub struct YcsbExecutor {
    launcher: PathBuf,
    binding: String,
    extra_args: Vec<String>,
}

impl YcsbExecutor {
    pub fn new(settings: &YcsbSettings, binding: &str) -> Self {
        Self {
            launcher: settings.launcher.clone(),
            binding: binding.to_string(),
            extra_args: settings.extra_args.clone(),
        }
    }

    fn command(&self, phase: Phase, workload: &WorkloadSpec) -> Command {
        let mut cmd = Command::new(&self.launcher);
        cmd.arg(phase.name())
            .arg(&self.binding)
            .args(&self.extra_args)
            .arg("-P")
            .arg(&workload.path);
        cmd
    }
}

impl PhaseExecutor for YcsbExecutor {
    fn execute(&self, phase: Phase, workload: &WorkloadSpec) -> Result<PhaseOutput, DeployError> {
        let output = run_checked(&mut self.command(phase, workload))?;
        Ok(PhaseOutput { stdout: output.stdout, elapsed: output.elapsed })
    }
}
