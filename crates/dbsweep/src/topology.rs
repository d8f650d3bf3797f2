//! Deployment descriptor generation.
//!
//! The base template for a kind declares the primary service and must end
//! inside the top-level `services:` mapping; secondaries are appended after
//! it, followed by the single shared network definition. The template must
//! therefore not declare `networks:` at the top level itself.

use std::path::PathBuf;

use crate::config::StoreKind;
use crate::error::{HarnessError, Result};
use crate::settings::PathSettings;
use crate::store::{NodeRole, NodeSpec, StoreStrategy};

/// A generated Compose file and the topology it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    /// Where the file was written
    pub path: PathBuf,
    pub kind: StoreKind,
    /// Primary first, then secondaries in index order
    pub nodes: Vec<NodeSpec>,
    /// Shared network name
    pub network: String,
    /// Exact file contents
    pub contents: String,
}

impl DeploymentDescriptor {
    /// The node the benchmark connects to.
    pub fn primary(&self) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.role == NodeRole::Primary)
    }
}

/// Builds Compose files from per-kind templates.
pub struct TopologyGenerator<'a> {
    paths: &'a PathSettings,
}

impl<'a> TopologyGenerator<'a> {
    pub fn new(paths: &'a PathSettings) -> Self {
        Self { paths }
    }

    /// Render the descriptor for `node_count` nodes without writing it.
    ///
    /// Validation happens before the template is read.
    pub fn render(&self, strategy: &dyn StoreStrategy, node_count: u32) -> Result<DeploymentDescriptor> {
        let nodes = strategy.nodes(node_count)?;
        let kind = strategy.kind();

        let template_path = self.paths.descriptor_template(kind);
        let template = read_template(&template_path)?;
        if template.lines().any(|l| l.starts_with("networks:")) {
            return Err(HarnessError::invalid(format!(
                "{} must not define top-level networks; they are generated",
                template_path.display()
            )));
        }

        let mut contents = template;
        for (name, value) in strategy.template_values(node_count) {
            contents = contents.replace(&format!("{{{{{name}}}}}"), &value);
        }
        if !contents.ends_with('\n') {
            contents.push('\n');
        }

        for node in nodes.iter().filter(|n| n.role == NodeRole::Secondary) {
            contents.push_str(&strategy.render_secondary(node));
        }

        let network = strategy.network();
        contents.push_str(&format!("\nnetworks:\n  {network}:\n    driver: bridge\n"));

        Ok(DeploymentDescriptor {
            path: self.paths.descriptor(kind),
            kind,
            nodes,
            network: network.to_string(),
            contents,
        })
    }

    /// Render the descriptor and overwrite the kind's live Compose file.
    pub fn generate(&self, strategy: &dyn StoreStrategy, node_count: u32) -> Result<DeploymentDescriptor> {
        let descriptor = self.render(strategy, node_count)?;
        write_artifact(&descriptor.path, &descriptor.contents)?;
        tracing::info!(
            "Wrote {} descriptor with {} node(s) to {}",
            descriptor.kind.display_name(),
            descriptor.nodes.len(),
            descriptor.path.display()
        );
        Ok(descriptor)
    }
}

/// Count the store nodes declared in a Compose file written for `strategy`.
///
/// Only top-level service keys are considered: the primary service and
/// numbered secondaries.
pub fn declared_node_count(strategy: &dyn StoreStrategy, contents: &str) -> usize {
    let secondary = format!("{}-", strategy.secondary_prefix());
    contents
        .lines()
        .filter_map(|line| line.strip_prefix("  "))
        .filter(|line| !line.starts_with(' '))
        .filter_map(|line| line.trim_end().strip_suffix(':'))
        .filter(|name| {
            *name == strategy.primary_service()
                || name.strip_prefix(&secondary).is_some_and(|i| i.parse::<u32>().is_ok())
        })
        .count()
}

/// Read a template, mapping absence to [`HarnessError::MissingTemplate`].
pub(crate) fn read_template(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            HarnessError::MissingTemplate(path.to_path_buf())
        } else {
            HarnessError::Io { path: path.to_path_buf(), source: e }
        }
    })
}

/// Write a generated file, creating parent directories.
pub(crate) fn write_artifact(path: &std::path::Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(HarnessError::io(parent))?;
    }
    std::fs::write(path, contents).map_err(HarnessError::io(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{strategy_for, MongoStrategy, RedisStrategy};
    use proptest::prelude::*;
    use tempfile::TempDir;

    const REDIS_TEMPLATE: &str = "services:
  redis-master:
    image: redis:latest
    command: redis-server --appendonly yes
    ports:
      - \"6379:6379\"
    networks:
      - redis-net
";

    const MONGO_TEMPLATE: &str = "services:
  mongo-primary:
    image: mongo:latest
    command: mongod --bind_ip_all{{replication_flags}}
    ports:
      - \"27017:27017\"
    networks:
      - mongo-net
";

    fn layout() -> (TempDir, PathSettings) {
        let temp = TempDir::new().unwrap();
        let paths = PathSettings::default().relative_to(temp.path());
        for (kind, template) in [(StoreKind::Redis, REDIS_TEMPLATE), (StoreKind::MongoDb, MONGO_TEMPLATE)] {
            let path = paths.descriptor_template(kind);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, template).unwrap();
        }
        (temp, paths)
    }

    fn service_count(contents: &str) -> usize {
        contents.lines().filter(|l| l.trim_start().starts_with("image:")).count()
    }

    fn network_blocks(contents: &str) -> usize {
        contents.lines().filter(|l| *l == "networks:").count()
    }

    #[test]
    fn single_node_has_no_secondaries_but_one_network() {
        let (_temp, paths) = layout();
        let d = TopologyGenerator::new(&paths).generate(&RedisStrategy, 1).unwrap();
        assert_eq!(d.nodes.len(), 1);
        assert_eq!(service_count(&d.contents), 1);
        assert_eq!(network_blocks(&d.contents), 1);
        assert!(d.contents.ends_with("networks:\n  redis-net:\n    driver: bridge\n"));
        assert_eq!(std::fs::read_to_string(&d.path).unwrap(), d.contents);
    }

    #[test]
    fn redis_three_nodes() {
        let (_temp, paths) = layout();
        let d = TopologyGenerator::new(&paths).generate(&RedisStrategy, 3).unwrap();
        assert_eq!(service_count(&d.contents), 3);
        assert!(d.contents.contains("  redis-replica-1:\n"));
        assert!(d.contents.contains("  redis-replica-2:\n"));
        assert!(!d.contents.contains("redis-replica-3"));
        assert!(d.path.ends_with("deployments/redis/docker-compose.yml"));
    }

    #[test]
    fn mongo_flags_follow_node_count() {
        let (_temp, paths) = layout();
        let generator = TopologyGenerator::new(&paths);
        let single = generator.render(&MongoStrategy::default(), 1).unwrap();
        assert!(single.contents.contains("command: mongod --bind_ip_all\n"));
        assert!(!single.contents.contains("{{"));

        let multi = generator.render(&MongoStrategy::default(), 3).unwrap();
        assert!(multi.contents.contains("command: mongod --bind_ip_all --replSet rs0\n"));
        assert_eq!(service_count(&multi.contents), 3);
    }

    #[test]
    fn declared_node_count_reads_generated_descriptor() {
        let (_temp, paths) = layout();
        let generator = TopologyGenerator::new(&paths);
        for (strategy, count) in [
            (strategy_for(StoreKind::Redis), 1),
            (strategy_for(StoreKind::Redis), 4),
            (strategy_for(StoreKind::MongoDb), 3),
        ] {
            let descriptor = generator.render(strategy.as_ref(), count).unwrap();
            assert_eq!(declared_node_count(strategy.as_ref(), &descriptor.contents), count as usize);
        }
        assert_eq!(declared_node_count(&RedisStrategy, "services:\n"), 0);
    }

    #[test]
    fn generation_is_byte_identical() {
        let (_temp, paths) = layout();
        let generator = TopologyGenerator::new(&paths);
        let first = generator.generate(&RedisStrategy, 4).unwrap();
        let bytes = std::fs::read(&first.path).unwrap();
        let second = generator.generate(&RedisStrategy, 4).unwrap();
        assert_eq!(std::fs::read(&second.path).unwrap(), bytes);
    }

    #[test]
    fn zero_nodes_fails_before_reading_template() {
        let temp = TempDir::new().unwrap();
        let paths = PathSettings::default().relative_to(temp.path());
        let err = TopologyGenerator::new(&paths).generate(&RedisStrategy, 0).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidConfig(_)));
    }

    #[test]
    fn missing_template_is_reported() {
        let temp = TempDir::new().unwrap();
        let paths = PathSettings::default().relative_to(temp.path());
        let err = TopologyGenerator::new(&paths).generate(&RedisStrategy, 2).unwrap_err();
        assert!(matches!(err, HarnessError::MissingTemplate(p) if p.ends_with("docker-compose-template.yml")));
        assert!(!paths.deployments.exists());
    }

    #[test]
    fn template_with_networks_is_rejected() {
        let (_temp, paths) = layout();
        let path = paths.descriptor_template(StoreKind::Redis);
        std::fs::write(&path, format!("{REDIS_TEMPLATE}networks:\n  redis-net:\n")).unwrap();
        let err = TopologyGenerator::new(&paths).render(&RedisStrategy, 1).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidConfig(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn descriptor_declares_exactly_n_nodes(count in 1u32..40, mongo in any::<bool>()) {
            let (_temp, paths) = layout();
            let kind = if mongo { StoreKind::MongoDb } else { StoreKind::Redis };
            let d = TopologyGenerator::new(&paths).render(strategy_for(kind).as_ref(), count).unwrap();
            prop_assert_eq!(service_count(&d.contents), count as usize);
            prop_assert_eq!(network_blocks(&d.contents), 1);
        }
    }
}
