//! End-to-end sweeps against in-process deployment and benchmark fakes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dbsweep::bench::Phase;
use dbsweep::config::{BenchmarkConfig, FailurePolicy, RatioPair, StoreKind};
use dbsweep::results::FailureRecord;
use dbsweep::settings::PathSettings;
use dbsweep::{Harness, HarnessError, PhaseExecutor, PhaseOutput, Settings, WorkloadSpec};
use dbsweep_deploy::{
    AdminClient, AdminSession, BackendType, CommandOutput, DeployBackend, DeployError,
    DeploymentHandle, Endpoint,
};
use tempfile::TempDir;

const YCSB_OUTPUT: &str = "\
Command line: -db site.ycsb.db.RedisClient -s -P workloads/workload-50-50
YCSB Client 0.17.0
[OVERALL], RunTime(ms), 1500
[OVERALL], Throughput(ops/sec), 666.67
[READ], Operations, 500
[READ], AverageLatency(us), 210.5
[UPDATE], Operations, 500
[UPDATE], AverageLatency(us), 260.1
";

/// Everything the fakes observed.
#[derive(Default)]
struct Recorder {
    deployed: Vec<(String, PathBuf)>,
    torn_down: Vec<String>,
    admin_commands: Vec<(String, String)>,
    phases: Vec<(Phase, PathBuf)>,
}

type Shared = Arc<Mutex<Recorder>>;

struct FakeBackend(Shared);

struct FakeHandle {
    project: String,
    descriptor: PathBuf,
    recorder: Shared,
}

impl DeploymentHandle for FakeHandle {
    fn project(&self) -> &str {
        &self.project
    }

    fn descriptor(&self) -> &Path {
        &self.descriptor
    }

    fn exec(&self, _service: &str, _args: &[String]) -> Result<CommandOutput, DeployError> {
        Err(DeployError::BackendUnavailable("exec is not faked".to_string()))
    }

    fn tear_down(self: Box<Self>) -> Result<(), DeployError> {
        self.recorder.lock().unwrap().torn_down.push(self.project.clone());
        Ok(())
    }
}

impl DeployBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake compose"
    }

    fn id(&self) -> &'static str {
        "compose-plugin"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn unavailable_reason(&self) -> Option<String> {
        None
    }

    fn backend_type(&self) -> BackendType {
        BackendType::ComposePlugin
    }

    fn deploy(&self, project: &str, descriptor: &Path) -> Result<Box<dyn DeploymentHandle>, DeployError> {
        if !descriptor.is_file() {
            return Err(DeployError::DescriptorNotFound(descriptor.to_path_buf()));
        }
        self.0.lock().unwrap().deployed.push((project.to_string(), descriptor.to_path_buf()));
        Ok(self.attach(project, descriptor))
    }

    fn attach(&self, project: &str, descriptor: &Path) -> Box<dyn DeploymentHandle> {
        Box::new(FakeHandle {
            project: project.to_string(),
            descriptor: descriptor.to_path_buf(),
            recorder: Arc::clone(&self.0),
        })
    }
}

struct FakeAdmin {
    recorder: Shared,
    reachable: bool,
}

struct FakeSession {
    recorder: Shared,
    endpoint: Endpoint,
}

impl AdminSession for FakeSession {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn run_admin_command(&self, command: &str) -> Result<String, DeployError> {
        self.recorder
            .lock()
            .unwrap()
            .admin_commands
            .push((self.endpoint.to_string(), command.to_string()));
        Ok("{ ok: 1 }".to_string())
    }
}

impl AdminClient for FakeAdmin {
    fn connect<'a>(
        &self,
        _handle: &'a dyn DeploymentHandle,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn AdminSession + 'a>, DeployError> {
        if !self.reachable {
            return Err(DeployError::AdminUnreachable {
                endpoint: endpoint.to_string(),
                attempts: 3,
                last_error: "connection refused".to_string(),
            });
        }
        Ok(Box::new(FakeSession { recorder: Arc::clone(&self.recorder), endpoint: endpoint.clone() }))
    }
}

struct FakeYcsb {
    recorder: Shared,
    fail_runs: bool,
}

impl PhaseExecutor for FakeYcsb {
    fn execute(&self, phase: Phase, workload: &WorkloadSpec) -> Result<PhaseOutput, DeployError> {
        self.recorder.lock().unwrap().phases.push((phase, workload.path.clone()));
        if self.fail_runs && phase == Phase::Run {
            return Err(DeployError::CommandFailed {
                command: "ycsb.sh run".to_string(),
                code: Some(1),
                stderr: "connection reset".to_string(),
            });
        }
        Ok(PhaseOutput { stdout: YCSB_OUTPUT.to_string(), elapsed: Duration::from_millis(1500) })
    }
}

struct Fixture {
    _temp: TempDir,
    paths: PathSettings,
    recorder: Shared,
}

impl Fixture {
    /// Temporary working tree with the shipped templates.
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let paths = PathSettings::default().relative_to(temp.path());
        let shipped = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates");
        let shipped_paths = PathSettings { templates: shipped, ..PathSettings::default() };

        for kind in StoreKind::all() {
            copy(&shipped_paths.descriptor_template(*kind), &paths.descriptor_template(*kind));
        }
        copy(&shipped_paths.workload_template(), &paths.workload_template());

        Self { _temp: temp, paths, recorder: Shared::default() }
    }

    fn harness(&self, admin_reachable: bool, fail_runs: bool) -> Harness {
        let mut settings = Settings { paths: self.paths.clone(), ..Settings::default() };
        settings.deploy.startup_grace = Duration::ZERO;

        let recorder = Arc::clone(&self.recorder);
        Harness::new(settings)
            .with_backends(vec![Box::new(FakeBackend(Arc::clone(&self.recorder)))])
            .with_admin(Box::new(FakeAdmin {
                recorder: Arc::clone(&self.recorder),
                reachable: admin_reachable,
            }))
            .with_executor_factory(move |_, _| {
                Box::new(FakeYcsb { recorder: Arc::clone(&recorder), fail_runs })
            })
    }

    fn recorded<T>(&self, f: impl FnOnce(&Recorder) -> T) -> T {
        f(&self.recorder.lock().unwrap())
    }
}

fn copy(from: &Path, to: &Path) {
    std::fs::create_dir_all(to.parent().unwrap()).unwrap();
    std::fs::copy(from, to).unwrap();
}

fn config(kind: StoreKind, nodes: u32, read: f64, write: f64) -> BenchmarkConfig {
    BenchmarkConfig::new(kind, nodes, RatioPair::from_values(read, write).unwrap()).unwrap()
}

#[test]
fn redis_three_nodes_end_to_end() {
    let fixture = Fixture::new();
    let report = fixture.harness(true, false).run(&config(StoreKind::Redis, 3, 0.5, 0.5)).unwrap();

    let descriptor = std::fs::read_to_string(fixture.paths.descriptor(StoreKind::Redis)).unwrap();
    assert!(descriptor.contains("redis-master:"));
    assert!(descriptor.contains("redis-replica-1:"));
    assert!(descriptor.contains("redis-replica-2:"));
    assert!(!descriptor.contains("redis-replica-3:"));
    assert!(descriptor.contains("\"6381:6379\""));
    assert_eq!(descriptor.lines().filter(|l| *l == "networks:").count(), 1);

    let workload_path = fixture.paths.workloads.join("workload-50-50");
    let workload = std::fs::read_to_string(&workload_path).unwrap();
    assert!(workload.starts_with("# Base YCSB core workload"));
    assert!(workload.contains("readproportion=0.5\nupdateproportion=0.5\n"));
    assert!(workload.contains("redis.host=127.0.0.1\nredis.port=6379\n"));

    let results = fixture.paths.results.join("redis/3/50-50");
    assert_eq!(std::fs::read_to_string(results.join("load-0.txt")).unwrap(), YCSB_OUTPUT);
    assert_eq!(std::fs::read_to_string(results.join("run-0.txt")).unwrap(), YCSB_OUTPUT);

    assert_eq!(report.project, "dbsweep-redis");
    assert_eq!(report.results.len(), 2);
    assert!(report.failures.is_empty());
    assert_eq!(report.exit_code(), 0);
    let run = &report.results[1];
    assert_eq!(run.key.phase, Phase::Run);
    assert_eq!(run.metrics.number("READ", "AverageLatency(us)"), Some(210.5));
    assert_eq!(run.elapsed_ms, 1500);

    fixture.recorded(|r| {
        assert_eq!(r.deployed.len(), 1);
        assert_eq!(r.deployed[0].0, "dbsweep-redis");
        assert!(r.admin_commands.is_empty());
        assert!(r.torn_down.is_empty());
        assert_eq!(r.phases, [(Phase::Load, workload_path.clone()), (Phase::Run, workload_path.clone())]);
    });
}

#[test]
fn mongodb_replica_set_is_initiated_once() {
    let fixture = Fixture::new();
    let config = config(StoreKind::MongoDb, 3, 0.95, 0.05).with_iterations(2).unwrap();
    let report = fixture.harness(true, false).run(&config).unwrap();

    let descriptor = std::fs::read_to_string(fixture.paths.descriptor(StoreKind::MongoDb)).unwrap();
    assert!(descriptor.contains("command: mongod --bind_ip_all --replSet rs0\n"));
    assert!(descriptor.contains("mongo-secondary-2:"));

    let workload = std::fs::read_to_string(fixture.paths.workloads.join("workload-95-5")).unwrap();
    assert!(workload.contains("readproportion=0.95\nupdateproportion=0.05\n"));
    assert!(!workload.contains("redis."));

    assert_eq!(report.results.len(), 4);
    assert!(fixture.paths.results.join("mongodb/3/95-5/run-1.txt").is_file());
    fixture.recorded(|r| {
        assert_eq!(r.admin_commands.len(), 1);
        let (endpoint, command) = &r.admin_commands[0];
        assert_eq!(endpoint, "mongo-primary:27017");
        assert!(command.contains("_id: \"rs0\""));
        assert!(command.contains("mongo-secondary-1:27017"));
    });
}

#[test]
fn single_node_mongodb_runs_standalone() {
    let fixture = Fixture::new();
    fixture.harness(true, false).run(&config(StoreKind::MongoDb, 1, 0.5, 0.5)).unwrap();

    let descriptor = std::fs::read_to_string(fixture.paths.descriptor(StoreKind::MongoDb)).unwrap();
    assert!(descriptor.contains("command: mongod --bind_ip_all\n"));
    assert!(!descriptor.contains("mongo-secondary"));
    fixture.recorded(|r| assert!(r.admin_commands.is_empty()));
}

#[test]
fn replica_set_failure_is_recorded_and_sweep_continues() {
    let fixture = Fixture::new();
    let report = fixture.harness(false, false).run(&config(StoreKind::MongoDb, 2, 0.5, 0.5)).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, FailureRecord::REPLICA_SET_INIT);
    assert!(report.failures[0].message.contains("connection refused"));
    assert_eq!(report.results.len(), 2);
    fixture.recorded(|r| assert!(r.torn_down.is_empty()));
}

#[test]
fn reuse_attaches_without_deploying() {
    let fixture = Fixture::new();
    let config = config(StoreKind::Redis, 3, 0.5, 0.5).with_reuse(true);
    let report = fixture.harness(true, false).run(&config).unwrap();

    assert!(!fixture.paths.descriptor(StoreKind::Redis).exists());
    assert!(fixture.paths.results.join("redis/3/50-50/run-0.txt").is_file());
    assert_eq!(report.project, "dbsweep-redis");
    fixture.recorded(|r| {
        assert!(r.deployed.is_empty());
        assert_eq!(r.phases.len(), 2);
    });
}

#[test]
fn failed_runs_are_reported_under_continue() {
    let fixture = Fixture::new();
    let config = config(StoreKind::Redis, 1, 0.5, 0.5).with_iterations(2).unwrap();
    let report = fixture.harness(true, true).run(&config).unwrap();

    let stages: Vec<_> = report.failures.iter().map(|f| (f.stage.as_str(), f.iteration)).collect();
    assert_eq!(stages, [("run", Some(0)), ("run", Some(1))]);
    assert_eq!(report.results.len(), 2);
    assert!(!fixture.paths.results.join("redis/1/50-50/run-0.txt").exists());
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn fail_fast_and_teardown() {
    let fixture = Fixture::new();
    let config = config(StoreKind::Redis, 2, 0.5, 0.5)
        .with_iterations(3)
        .unwrap()
        .with_failure_policy(FailurePolicy::FailFast)
        .with_teardown(true);
    let report = fixture.harness(true, true).run(&config).unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.exit_code(), 3);
    fixture.recorded(|r| {
        assert_eq!(r.phases.len(), 2);
        assert_eq!(r.torn_down, ["dbsweep-redis"]);
    });
}

#[test]
fn reset_clears_previous_results() {
    let fixture = Fixture::new();
    let stale = fixture.paths.results.join("redis/5/10-90/run-0.txt");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "old").unwrap();

    let config = config(StoreKind::Redis, 1, 0.5, 0.5).with_reset(true);
    fixture.harness(true, false).run(&config).unwrap();

    assert!(!stale.exists());
    assert!(fixture.paths.results.join("redis/1/50-50/run-0.txt").is_file());
}

#[test]
fn missing_template_aborts_before_deploying() {
    let fixture = Fixture::new();
    std::fs::remove_file(fixture.paths.workload_template()).unwrap();

    let err = fixture.harness(true, false).run(&config(StoreKind::Redis, 2, 0.5, 0.5)).unwrap_err();

    assert!(matches!(err, HarnessError::MissingTemplate(ref p) if p.ends_with("workloads/workload")));
    assert_eq!(err.exit_code(), 2);
    assert!(!fixture.paths.descriptor(StoreKind::Redis).exists());
    fixture.recorded(|r| assert!(r.deployed.is_empty()));
}

#[test]
fn repeated_sweeps_overwrite_artifacts() {
    let fixture = Fixture::new();
    let harness = fixture.harness(true, false);
    harness.run(&config(StoreKind::Redis, 2, 0.5, 0.5)).unwrap();
    let first = std::fs::read_to_string(fixture.paths.descriptor(StoreKind::Redis)).unwrap();
    harness.run(&config(StoreKind::Redis, 2, 0.5, 0.5)).unwrap();
    let second = std::fs::read_to_string(fixture.paths.descriptor(StoreKind::Redis)).unwrap();

    assert_eq!(first, second);
    let files = std::fs::read_dir(fixture.paths.results.join("redis/2/50-50")).unwrap().count();
    assert_eq!(files, 2);
}

#[test]
fn failed_phase_removes_result_from_earlier_sweep() {
    let fixture = Fixture::new();
    let config = config(StoreKind::Redis, 2, 0.5, 0.5);
    let run_result = fixture.paths.results.join("redis/2/50-50/run-0.txt");

    fixture.harness(true, false).run(&config).unwrap();
    assert!(run_result.is_file());

    let report = fixture.harness(true, true).run(&config).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(!run_result.exists());
    assert!(fixture.paths.results.join("redis/2/50-50/load-0.txt").is_file());
    let keys: Vec<_> = report.results.iter().map(|r| r.key.label()).collect();
    assert_eq!(keys, ["load-0"]);
}
