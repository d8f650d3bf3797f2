//! Benchmark sweep harness for replicated storage deployments.
//!
//! One invocation provisions a Redis primary/replica set or a MongoDB
//! replica set with Docker Compose, writes a YCSB workload with the chosen
//! read/update mix, runs load/run iterations against the deployment, and
//! keeps the raw YCSB output for comparison across node counts and mixes:
//!
//! - **Topology**: `deployments/{kind}/docker-compose.yml`, one service per node
//! - **Workload**: `workloads/workload-{read%}-{write%}`
//! - **Results**: `results/{kind}/{nodes}/{read%}-{write%}/{phase}-{iteration}.txt`
//!
//! # Usage
//!
//! ```text
//! dbsweep [OPTIONS] <DB_KIND> <NODE_COUNT> <READ_RATIO> <WRITE_RATIO> [REUSE]
//!
//! Arguments:
//!   <DB_KIND>      redis or mongodb
//!   <NODE_COUNT>   Number of nodes, at least 1
//!   <READ_RATIO>   Read proportion in [0, 1]
//!   <WRITE_RATIO>  Update proportion in [0, 1]
//!   [REUSE]        1 to benchmark the running deployment as is
//!
//! Options:
//!   -c, --config <FILE>          Settings file (or DBSWEEP_CONFIG env)
//!       --profile <PROFILE>      quick, standard, thorough (default: quick)
//!       --iterations <N>         Iterations; overrides --profile
//!       --load-policy <POLICY>   per-iteration or once
//!       --fail-fast              Stop at the first failed phase
//!       --reset                  Delete old workloads and results first
//!       --teardown               Tear the deployment down afterwards
//!       --json <PATH>            Export parsed results as JSON
//!   -v, --verbose                Verbose output
//! ```

pub mod bench;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod orchestrator;
pub mod results;
pub mod settings;
pub mod store;
pub mod topology;
pub mod workload;

pub use bench::{BenchmarkDriver, Phase, PhaseExecutor, PhaseOutput, RunResult, StopReason};
pub use cli::Cli;
pub use config::{BenchmarkConfig, FailurePolicy, LoadPolicy, Ratio, RatioPair, RunProfile, StoreKind};
pub use error::HarnessError;
pub use orchestrator::Harness;
pub use results::{Metrics, ResultCollector, ResultKey, SweepReport};
pub use settings::Settings;
pub use store::{strategy_for, StoreStrategy};
pub use topology::{DeploymentDescriptor, TopologyGenerator};
pub use workload::{WorkloadParameterizer, WorkloadSpec};
