//! Configuration types for a benchmark sweep.
//!
//! A [`BenchmarkConfig`] is built once from validated pieces and then only
//! read. Every constructor here rejects out-of-range input with
//! [`HarnessError::InvalidConfig`].

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{HarnessError, Result};

/// Storage system under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Redis primary with read replicas
    Redis,
    /// MongoDB replica set
    #[serde(rename = "mongodb")]
    MongoDb,
}

impl StoreKind {
    /// Identifier used in paths, project names and the YCSB binding.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Redis => "redis",
            Self::MongoDb => "mongodb",
        }
    }

    /// Name for human-facing output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Redis => "Redis",
            Self::MongoDb => "MongoDB",
        }
    }

    /// Every supported kind.
    pub fn all() -> &'static [StoreKind] {
        &[Self::Redis, Self::MongoDb]
    }
}

impl FromStr for StoreKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "mongodb" | "mongo" | "document-store" => Ok(Self::MongoDb),
            _ => Err(HarnessError::invalid(format!(
                "Unknown database kind: {s}. Valid options: redis, mongodb"
            ))),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An operation proportion in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Ratio(f64);

impl Ratio {
    /// Validate a proportion.
    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(HarnessError::invalid(format!(
                "Ratio must be between 0 and 1, got {value}"
            )))
        }
    }

    /// The raw proportion.
    pub fn value(self) -> f64 {
        self.0
    }

    /// The proportion as a rounded whole percentage, for artifact names.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(self) -> u32 {
        // In range by construction: 0 <= round(r * 100) <= 100
        (self.0 * 100.0).round() as u32
    }
}

impl FromStr for Ratio {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| HarnessError::invalid(format!("Ratio is not a number: {s}")))?;
        Self::new(value)
    }
}

/// Full-precision shortest round-trip rendering, as written into workloads.
impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The read/write operation mix of a sweep.
///
/// The two proportions are independent; they are not required to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioPair {
    /// Read proportion
    pub read: Ratio,
    /// Update proportion
    pub write: Ratio,
}

impl RatioPair {
    /// Pair two validated ratios.
    pub fn new(read: Ratio, write: Ratio) -> Self {
        Self { read, write }
    }

    /// Validate and pair two raw proportions.
    pub fn from_values(read: f64, write: f64) -> Result<Self> {
        Ok(Self::new(Ratio::new(read)?, Ratio::new(write)?))
    }

    /// Percentage label such as `50-50`, used in file and directory names.
    pub fn label(&self) -> String {
        format!("{}-{}", self.read.percent(), self.write.percent())
    }
}

impl fmt::Display for RatioPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "read {} / update {}", self.read, self.write)
    }
}

/// Preset iteration counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunProfile {
    /// Single iteration
    #[default]
    Quick,
    /// Three iterations
    Standard,
    /// Ten iterations
    Thorough,
}

impl RunProfile {
    /// Number of load/run iterations for this profile.
    pub fn iterations(&self) -> u32 {
        match self {
            Self::Quick => 1,
            Self::Standard => 3,
            Self::Thorough => 10,
        }
    }
}

impl FromStr for RunProfile {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "standard" => Ok(Self::Standard),
            "thorough" => Ok(Self::Thorough),
            _ => Err(HarnessError::invalid(format!(
                "Unknown profile: {s}. Valid options: quick, standard, thorough"
            ))),
        }
    }
}

impl fmt::Display for RunProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quick => write!(f, "quick"),
            Self::Standard => write!(f, "standard"),
            Self::Thorough => write!(f, "thorough"),
        }
    }
}

/// When the YCSB `load` phase runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPolicy {
    /// `load` before every `run`
    #[default]
    PerIteration,
    /// `load` only before the first `run`
    Once,
}

impl LoadPolicy {
    /// Whether `load` runs in the given iteration.
    pub fn loads_in(&self, iteration: u32) -> bool {
        match self {
            Self::PerIteration => true,
            Self::Once => iteration == 0,
        }
    }
}

impl FromStr for LoadPolicy {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "per-iteration" | "every" => Ok(Self::PerIteration),
            "once" => Ok(Self::Once),
            _ => Err(HarnessError::invalid(format!(
                "Unknown load policy: {s}. Valid options: per-iteration, once"
            ))),
        }
    }
}

impl fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerIteration => write!(f, "per-iteration"),
            Self::Once => write!(f, "once"),
        }
    }
}

/// What to do after a failed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the failure and keep going
    #[default]
    Continue,
    /// Stop the sweep at the first failure
    FailFast,
}

/// Immutable description of one sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkConfig {
    kind: StoreKind,
    node_count: u32,
    ratios: RatioPair,
    iterations: u32,
    reuse: bool,
    load_policy: LoadPolicy,
    failure_policy: FailurePolicy,
    reset: bool,
    teardown: bool,
}

impl BenchmarkConfig {
    /// Create a configuration with default policies and a single iteration.
    pub fn new(kind: StoreKind, node_count: u32, ratios: RatioPair) -> Result<Self> {
        if node_count == 0 {
            return Err(HarnessError::invalid("Node count must be at least 1"));
        }
        Ok(Self {
            kind,
            node_count,
            ratios,
            iterations: RunProfile::default().iterations(),
            reuse: false,
            load_policy: LoadPolicy::default(),
            failure_policy: FailurePolicy::default(),
            reset: false,
            teardown: false,
        })
    }

    /// Set the number of load/run iterations.
    pub fn with_iterations(mut self, iterations: u32) -> Result<Self> {
        if iterations == 0 {
            return Err(HarnessError::invalid("Iterations must be at least 1"));
        }
        self.iterations = iterations;
        Ok(self)
    }

    /// Benchmark an already-running deployment instead of deploying.
    #[must_use]
    pub fn with_reuse(mut self, reuse: bool) -> Self {
        self.reuse = reuse;
        self
    }

    /// Choose when `load` runs.
    #[must_use]
    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    /// Choose what happens after a failed phase.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Wipe generated workloads and all results before the sweep.
    #[must_use]
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Tear the deployment down after the sweep.
    #[must_use]
    pub fn with_teardown(mut self, teardown: bool) -> Self {
        self.teardown = teardown;
        self
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    pub fn ratios(&self) -> RatioPair {
        self.ratios
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn reuse(&self) -> bool {
        self.reuse
    }

    pub fn load_policy(&self) -> LoadPolicy {
        self.load_policy
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn reset(&self) -> bool {
        self.reset
    }

    pub fn teardown(&self) -> bool {
        self.teardown
    }
}
