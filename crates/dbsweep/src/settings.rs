//! Settings file support.
//!
//! Settings cover the environment a sweep runs in (directory layout, how to
//! reach Docker, where YCSB lives) rather than the sweep itself. They are
//! read from `dbsweep.toml` in the working directory, or from the file given
//! with `--config` / `DBSWEEP_CONFIG`. Every field is optional.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! templates = "templates"
//! results = "/data/ycsb-results"
//!
//! [deploy]
//! backend = "compose-standalone"
//! sudo = true
//! startup_grace = "10s"
//!
//! [ycsb]
//! launcher = "/opt/ycsb-0.17.0/bin/ycsb.sh"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use dbsweep_deploy::BackendType;
use serde::{Deserialize, Serialize};

use crate::config::StoreKind;
use crate::error::{HarnessError, Result};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "dbsweep.toml";

/// Time bounds applied around deployment bring-up.
pub struct Timeouts;

impl Timeouts {
    /// Wait after `up -d` before touching the storage system
    pub const STARTUP_GRACE: Duration = Duration::from_secs(5);
    /// Total time to wait for the admin endpoint to answer
    pub const ADMIN_READY: Duration = Duration::from_secs(60);
    /// Delay between admin readiness probes
    pub const ADMIN_POLL: Duration = Duration::from_secs(2);
}

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory layout
    pub paths: PathSettings,
    /// Container runtime access
    pub deploy: DeploySettings,
    /// Benchmark tool location
    pub ycsb: YcsbSettings,
}

/// Where templates are read from and artifacts are written to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    pub templates: PathBuf,
    pub deployments: PathBuf,
    pub workloads: PathBuf,
    pub results: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            templates: PathBuf::from("templates"),
            deployments: PathBuf::from("deployments"),
            workloads: PathBuf::from("workloads"),
            results: PathBuf::from("results"),
        }
    }
}

impl PathSettings {
    /// Base Compose template for a kind.
    pub fn descriptor_template(&self, kind: StoreKind) -> PathBuf {
        self.templates.join(kind.name()).join("docker-compose-template.yml")
    }

    /// Shared base YCSB workload.
    pub fn workload_template(&self) -> PathBuf {
        self.templates.join("workloads").join("workload")
    }

    /// Generated Compose file for a kind.
    pub fn descriptor(&self, kind: StoreKind) -> PathBuf {
        self.deployments.join(kind.name()).join("docker-compose.yml")
    }

    /// Resolve relative paths against `base`.
    #[must_use]
    pub fn relative_to(&self, base: &Path) -> Self {
        let join = |p: &PathBuf| if p.is_absolute() { p.clone() } else { base.join(p) };
        Self {
            templates: join(&self.templates),
            deployments: join(&self.deployments),
            workloads: join(&self.workloads),
            results: join(&self.results),
        }
    }
}

/// How deployments are launched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploySettings {
    /// Compose flavour; `None` picks the first one installed
    pub backend: Option<BackendType>,
    /// Run Compose through `sudo`
    pub sudo: bool,
    /// Compose project prefix; the project is `{prefix}-{kind}`
    pub project_prefix: String,
    /// Wait after bring-up before admin steps or benchmarks
    #[serde(with = "humantime_serde")]
    pub startup_grace: Duration,
    /// Budget for the admin endpoint to become reachable
    #[serde(with = "humantime_serde")]
    pub admin_ready_timeout: Duration,
    /// Delay between readiness probes
    #[serde(with = "humantime_serde")]
    pub admin_poll_interval: Duration,
    /// Shell used for MongoDB admin commands inside the container
    pub mongo_shell: String,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            backend: None,
            sudo: false,
            project_prefix: "dbsweep".to_string(),
            startup_grace: Timeouts::STARTUP_GRACE,
            admin_ready_timeout: Timeouts::ADMIN_READY,
            admin_poll_interval: Timeouts::ADMIN_POLL,
            mongo_shell: "mongosh".to_string(),
        }
    }
}

impl DeploySettings {
    /// Compose project name for a kind.
    pub fn project(&self, kind: StoreKind) -> String {
        format!("{}-{}", self.project_prefix, kind.name())
    }
}

/// Location and flags of the YCSB launcher.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct YcsbSettings {
    /// Launcher script
    pub launcher: PathBuf,
    /// Extra arguments passed before `-P <workload>`
    pub extra_args: Vec<String>,
}

impl Default for YcsbSettings {
    fn default() -> Self {
        Self {
            launcher: PathBuf::from("ycsb-0.17.0/bin/ycsb.sh"),
            extra_args: vec!["-s".to_string()],
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// With an explicit `path` the file must exist. Without one,
    /// [`DEFAULT_SETTINGS_FILE`] is read if present, otherwise defaults are
    /// returned.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
        };

        if !path.exists() {
            if required {
                return Err(HarnessError::Settings {
                    path,
                    message: "file does not exist".to_string(),
                });
            }
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| HarnessError::Settings {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml(&content).map_err(|message| HarnessError::Settings {
            path: path.clone(),
            message,
        })?;

        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.message().to_string())
    }
}
