//! Per-kind deployment rules.
//!
//! Everything that differs between storage systems lives behind
//! [`StoreStrategy`]: service naming and ports, how a secondary node is
//! declared in the Compose file, which connection properties the YCSB
//! binding needs, and the one-off administration after bring-up.

mod mongodb;
mod redis;

pub use mongodb::MongoStrategy;
pub use redis::RedisStrategy;

use std::fmt;

use dbsweep_deploy::{AdminClient, DeploymentHandle};
use serde::Serialize;

use crate::config::StoreKind;
use crate::error::{HarnessError, Result};
use crate::topology::DeploymentDescriptor;

/// Role of a node in the replicated deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Accepts writes; the benchmark connects here
    Primary,
    /// Replica or replica-set secondary
    Secondary,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// One node of a generated deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSpec {
    /// Compose service name, also the hostname on the deployment network
    pub service: String,
    pub role: NodeRole,
    /// 0 for the primary, 1.. for secondaries
    pub index: u32,
    /// Port published on the host
    pub host_port: u16,
    /// Port the server listens on inside its container
    pub container_port: u16,
}

impl NodeSpec {
    /// `service:port` as seen from inside the deployment network.
    pub fn internal_address(&self) -> String {
        format!("{}:{}", self.service, self.container_port)
    }
}

/// Storage-system specific behavior used by the generators and the
/// deployment controller.
pub trait StoreStrategy: Send + Sync {
    /// Kind this strategy implements
    fn kind(&self) -> StoreKind;

    /// YCSB binding name passed to `ycsb.sh load|run`
    fn binding(&self) -> &'static str {
        self.kind().name()
    }

    /// Name of the Compose network every node joins
    fn network(&self) -> &'static str;

    /// Service name of the primary, as declared by the base template
    fn primary_service(&self) -> &'static str;

    /// Prefix of secondary service names; the node index is appended
    fn secondary_prefix(&self) -> &'static str;

    /// Server port inside each container; host ports count up from here
    fn base_port(&self) -> u16;

    /// Values substituted for `{{name}}` placeholders in the base template
    fn template_values(&self, _node_count: u32) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Compose service block declaring one secondary node
    fn render_secondary(&self, node: &NodeSpec) -> String;

    /// Workload properties the YCSB binding needs to reach the primary
    fn connection_properties(&self) -> Vec<(&'static str, String)>;

    /// One-off administration after bring-up
    ///
    /// The default does nothing.
    fn post_bring_up(
        &self,
        _descriptor: &DeploymentDescriptor,
        _handle: &dyn DeploymentHandle,
        _admin: &dyn AdminClient,
    ) -> Result<()> {
        Ok(())
    }

    /// Primary plus `node_count - 1` secondaries with unique host ports.
    fn nodes(&self, node_count: u32) -> Result<Vec<NodeSpec>> {
        if node_count == 0 {
            return Err(HarnessError::invalid("Node count must be at least 1"));
        }

        let base = self.base_port();
        (0..node_count)
            .map(|index| {
                let host_port = u32::from(base)
                    .checked_add(index)
                    .and_then(|p| u16::try_from(p).ok())
                    .ok_or_else(|| {
                        HarnessError::invalid(format!(
                            "Node count {node_count} exceeds the host port range above {base}"
                        ))
                    })?;
                let (service, role) = if index == 0 {
                    (self.primary_service().to_string(), NodeRole::Primary)
                } else {
                    (format!("{}-{index}", self.secondary_prefix()), NodeRole::Secondary)
                };
                Ok(NodeSpec { service, role, index, host_port, container_port: base })
            })
            .collect()
    }
}

/// Strategy for a storage-system kind.
pub fn strategy_for(kind: StoreKind) -> Box<dyn StoreStrategy> {
    match kind {
        StoreKind::Redis => Box::new(RedisStrategy),
        StoreKind::MongoDb => Box::new(MongoStrategy::default()),
    }
}
