//! One sweep end to end: topology, deployment, workload, iterations, report.

use dbsweep_deploy::{
    first_available_backend, select_backend, AdminClient, ComposeBackend, DeployBackend,
    MongoShell, ReadinessPoll,
};

use crate::bench::{BenchmarkDriver, DriverOutcome, PhaseExecutor, YcsbExecutor};
use crate::config::BenchmarkConfig;
use crate::deploy::DeploymentController;
use crate::error::{HarnessError, Result};
use crate::results::{FailureRecord, ResultCollector, ResultSummary, SweepReport};
use crate::settings::{Settings, YcsbSettings};
use crate::store::{strategy_for, StoreStrategy};
use crate::topology::TopologyGenerator;
use crate::workload::WorkloadParameterizer;

/// Builds the phase executor for a YCSB binding.
pub type ExecutorFactory = Box<dyn Fn(&YcsbSettings, &str) -> Box<dyn PhaseExecutor>>;

/// Wires the sweep components together.
///
/// # Example
///
/// ```ignore
/// let harness = Harness::new(Settings::load(None)?);
/// let report = harness.run(&config)?;
/// ReportPrinter::new(true).print(&report);
/// ```
pub struct Harness {
    settings: Settings,
    backends: Vec<Box<dyn DeployBackend>>,
    admin: Box<dyn AdminClient>,
    executor_factory: ExecutorFactory,
    show_progress: bool,
    color: bool,
}

impl Harness {
    /// Harness using Docker Compose, `mongosh` and the YCSB launcher as
    /// configured in `settings`.
    pub fn new(settings: Settings) -> Self {
        let deploy = &settings.deploy;
        let poll = ReadinessPoll::within(deploy.admin_ready_timeout, deploy.admin_poll_interval);
        let admin = MongoShell::new(poll).with_program(deploy.mongo_shell.clone());
        let backends = ComposeBackend::all(deploy.sudo);

        Self {
            settings,
            backends,
            admin: Box::new(admin),
            executor_factory: Box::new(ycsb_executor),
            show_progress: false,
            color: false,
        }
    }

    /// Replace the deployment backends, in preference order.
    #[must_use]
    pub fn with_backends(mut self, backends: Vec<Box<dyn DeployBackend>>) -> Self {
        self.backends = backends;
        self
    }

    /// Replace the post-bring-up admin client.
    #[must_use]
    pub fn with_admin(mut self, admin: Box<dyn AdminClient>) -> Self {
        self.admin = admin;
        self
    }

    /// Replace how phase executors are built.
    #[must_use]
    pub fn with_executor_factory(
        mut self,
        factory: impl Fn(&YcsbSettings, &str) -> Box<dyn PhaseExecutor> + 'static,
    ) -> Self {
        self.executor_factory = Box::new(factory);
        self
    }

    /// Show a spinner per phase.
    #[must_use]
    pub fn with_progress(mut self, show: bool, color: bool) -> Self {
        self.show_progress = show;
        self.color = color;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn backend(&self) -> Result<&dyn DeployBackend> {
        let backend = match self.settings.deploy.backend {
            Some(backend_type) => select_backend(&self.backends, backend_type)?,
            None => first_available_backend(&self.backends)?,
        };
        tracing::debug!("Using deployment backend {}", backend.name());
        Ok(backend)
    }

    /// Fail with [`HarnessError::MissingTemplate`] before anything is
    /// generated or deployed.
    fn check_templates(&self, config: &BenchmarkConfig) -> Result<()> {
        let paths = &self.settings.paths;
        let mut required = vec![paths.workload_template()];
        if !config.reuse() {
            required.push(paths.descriptor_template(config.kind()));
        }
        match required.into_iter().find(|p| !p.is_file()) {
            Some(missing) => Err(HarnessError::MissingTemplate(missing)),
            None => Ok(()),
        }
    }

    /// Run one sweep.
    ///
    /// Configuration and template problems are returned before any
    /// deployment is touched. Failed phases and a failed replica-set
    /// initiation are recorded in the report instead.
    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(kind = %config.kind(), nodes = config.node_count(), ratios = %config.ratios().label())
    )]
    pub fn run(&self, config: &BenchmarkConfig) -> Result<SweepReport> {
        let strategy = strategy_for(config.kind());
        strategy.nodes(config.node_count())?;
        self.check_templates(config)?;

        let paths = &self.settings.paths;
        let backend = self.backend()?;
        let controller =
            DeploymentController::new(backend, self.admin.as_ref(), &self.settings.deploy, paths);
        let mut failures = Vec::new();

        let handle = if config.reuse() {
            if config.reset() {
                tracing::warn!("Ignoring reset: reusing a running deployment");
            }
            match controller.attached_node_count(strategy.as_ref())? {
                Some(declared) if declared != config.node_count() as usize => tracing::warn!(
                    "Reused deployment declares {} node(s) but results are keyed by {}",
                    declared,
                    config.node_count()
                ),
                Some(declared) => tracing::info!("Reused deployment declares {} node(s)", declared),
                None => tracing::warn!(
                    "No descriptor for the reused deployment, cannot check its node count of {}",
                    config.node_count()
                ),
            }
            controller.attach(config.kind())
        } else {
            if config.reset() {
                controller.reset_state()?;
            }
            let descriptor =
                TopologyGenerator::new(paths).generate(strategy.as_ref(), config.node_count())?;
            let bring_up = controller.bring_up(strategy.as_ref(), &descriptor)?;
            if let Some(e) = &bring_up.admin_failure {
                failures.push(FailureRecord::from_error(e));
            }
            bring_up.handle
        };
        let project = handle.project().to_string();

        let swept = self.sweep(config, strategy.as_ref());

        if config.teardown() {
            tracing::info!("Tearing down {}", project);
            if let Err(e) = controller.tear_down(handle) {
                tracing::error!("Teardown of {} failed: {}", project, e);
                failures.push(FailureRecord {
                    stage: "teardown".to_string(),
                    iteration: None,
                    message: e.to_string(),
                });
            }
        } else {
            tracing::info!("Deployment {} left running ({})", project, handle.descriptor().display());
        }

        let (outcome, results) = swept?;
        failures.extend(outcome.failures.iter().map(FailureRecord::from_error));

        Ok(SweepReport {
            config: config.clone(),
            project,
            results,
            failures,
            stopped: outcome.stopped,
        })
    }

    /// Generate the workload, drive every iteration, and parse what was
    /// persisted.
    fn sweep(
        &self,
        config: &BenchmarkConfig,
        strategy: &dyn StoreStrategy,
    ) -> Result<(DriverOutcome, Vec<ResultSummary>)> {
        let paths = &self.settings.paths;
        let workload = WorkloadParameterizer::new(paths).generate(strategy, config.ratios())?;
        let executor = (self.executor_factory)(&self.settings.ycsb, strategy.binding());
        let collector = ResultCollector::new(&paths.results);

        let outcome = BenchmarkDriver::new(config, executor.as_ref(), &collector)
            .with_progress(self.show_progress, self.color)
            .run(&workload)?;

        let mut results = Vec::with_capacity(outcome.persisted.len());
        for persisted in &outcome.persisted {
            let metrics = collector.parse(&persisted.path)?;
            results.push(ResultSummary {
                key: persisted.key,
                path: persisted.path.clone(),
                elapsed_ms: u64::try_from(persisted.elapsed.as_millis()).unwrap_or(u64::MAX),
                metrics,
            });
        }

        tracing::info!(
            "Sweep finished: {} result(s), {} failure(s)",
            results.len(),
            outcome.failures.len()
        );
        Ok((outcome, results))
    }
}

fn ycsb_executor(ycsb: &YcsbSettings, binding: &str) -> Box<dyn PhaseExecutor> {
    Box::new(YcsbExecutor::new(ycsb, binding))
}
