//! YCSB workload parameterization.
//!
//! The shared base workload is copied verbatim and the operation mix plus
//! kind-specific connection properties are appended. YCSB reads the file as
//! Java properties, so appended keys override any earlier value in the base.

use std::path::PathBuf;

use crate::config::RatioPair;
use crate::error::Result;
use crate::settings::PathSettings;
use crate::store::StoreStrategy;
use crate::topology::{read_template, write_artifact};

/// A generated workload file.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSpec {
    pub path: PathBuf,
    pub ratios: RatioPair,
}

/// Writes `workload-{read%}-{write%}` files from the base workload.
pub struct WorkloadParameterizer<'a> {
    paths: &'a PathSettings,
}

impl<'a> WorkloadParameterizer<'a> {
    pub fn new(paths: &'a PathSettings) -> Self {
        Self { paths }
    }

    /// Artifact path for a ratio pair; independent of kind and run.
    pub fn artifact_path(&self, ratios: RatioPair) -> PathBuf {
        self.paths.workloads.join(format!("workload-{}", ratios.label()))
    }

    /// Render the workload file contents.
    pub fn render(&self, strategy: &dyn StoreStrategy, ratios: RatioPair) -> Result<String> {
        let mut contents = read_template(&self.paths.workload_template())?;
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }

        contents.push_str(&format!("readproportion={}\n", ratios.read));
        contents.push_str(&format!("updateproportion={}\n", ratios.write));
        for (key, value) in strategy.connection_properties() {
            contents.push_str(&format!("{key}={value}\n"));
        }
        Ok(contents)
    }

    /// Render and overwrite the workload artifact for `ratios`.
    pub fn generate(&self, strategy: &dyn StoreStrategy, ratios: RatioPair) -> Result<WorkloadSpec> {
        let contents = self.render(strategy, ratios)?;
        let path = self.artifact_path(ratios);
        write_artifact(&path, &contents)?;
        tracing::info!("Wrote workload {} ({})", path.display(), ratios);
        Ok(WorkloadSpec { path, ratios })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Ratio;
    use crate::error::HarnessError;
    use crate::store::{MongoStrategy, RedisStrategy};
    use proptest::prelude::*;
    use tempfile::TempDir;

    const BASE: &str = "recordcount=1000\noperationcount=1000\nworkload=site.ycsb.workloads.CoreWorkload\n";

    fn layout() -> (TempDir, PathSettings) {
        let temp = TempDir::new().unwrap();
        let paths = PathSettings::default().relative_to(temp.path());
        let template = paths.workload_template();
        std::fs::create_dir_all(template.parent().unwrap()).unwrap();
        std::fs::write(template, BASE).unwrap();
        (temp, paths)
    }

    fn property<'c>(contents: &'c str, key: &str) -> Option<&'c str> {
        contents
            .lines()
            .rev()
            .find_map(|l| l.strip_prefix(key).and_then(|rest| rest.strip_prefix('=')))
    }

    #[test]
    fn redis_workload_has_connection_properties() {
        let (_temp, paths) = layout();
        let ratios = RatioPair::from_values(0.5, 0.5).unwrap();
        let spec = WorkloadParameterizer::new(&paths).generate(&RedisStrategy, ratios).unwrap();

        assert!(spec.path.ends_with("workloads/workload-50-50"));
        let contents = std::fs::read_to_string(&spec.path).unwrap();
        assert!(contents.starts_with(BASE));
        assert_eq!(property(&contents, "readproportion"), Some("0.5"));
        assert_eq!(property(&contents, "updateproportion"), Some("0.5"));
        assert_eq!(property(&contents, "redis.host"), Some("127.0.0.1"));
        assert_eq!(property(&contents, "redis.port"), Some("6379"));
    }

    #[test]
    fn mongo_workload_needs_no_connection_properties() {
        let (_temp, paths) = layout();
        let ratios = RatioPair::from_values(0.95, 0.05).unwrap();
        let contents = WorkloadParameterizer::new(&paths)
            .render(&MongoStrategy::default(), ratios)
            .unwrap();
        assert!(!contents.contains("redis."));
        assert!(contents.ends_with("readproportion=0.95\nupdateproportion=0.05\n"));
    }

    #[test]
    fn proportions_need_not_sum_to_one() {
        let (_temp, paths) = layout();
        let ratios = RatioPair::from_values(0.2, 0.3).unwrap();
        let spec = WorkloadParameterizer::new(&paths).generate(&RedisStrategy, ratios).unwrap();
        assert!(spec.path.ends_with("workload-20-30"));
    }

    #[test]
    fn missing_base_workload() {
        let temp = TempDir::new().unwrap();
        let paths = PathSettings::default().relative_to(temp.path());
        let ratios = RatioPair::from_values(0.5, 0.5).unwrap();
        let err = WorkloadParameterizer::new(&paths).generate(&RedisStrategy, ratios).unwrap_err();
        assert!(matches!(err, HarnessError::MissingTemplate(_)));
        assert!(!paths.workloads.exists());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn embedded_proportions_are_exact(r in 0.0f64..=1.0, w in 0.0f64..=1.0) {
            let (_temp, paths) = layout();
            let ratios = RatioPair::new(Ratio::new(r).unwrap(), Ratio::new(w).unwrap());
            let parameterizer = WorkloadParameterizer::new(&paths);
            let spec = parameterizer.generate(&RedisStrategy, ratios).unwrap();
            let contents = std::fs::read_to_string(&spec.path).unwrap();

            prop_assert_eq!(property(&contents, "readproportion").unwrap().parse::<f64>().unwrap(), r);
            prop_assert_eq!(property(&contents, "updateproportion").unwrap().parse::<f64>().unwrap(), w);

            let name = spec.path.file_name().unwrap().to_string_lossy().into_owned();
            let expected = format!("workload-{}-{}", (r * 100.0).round(), (w * 100.0).round());
            prop_assert_eq!(name, expected);
        }
    }
}
