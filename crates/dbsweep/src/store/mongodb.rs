use dbsweep_deploy::{AdminClient, DeploymentHandle, Endpoint};

use crate::config::StoreKind;
use crate::error::{HarnessError, Result};
use crate::topology::DeploymentDescriptor;

use super::{NodeRole, NodeSpec, StoreStrategy};

/// Election priority of the published primary. Secondaries keep the default 1.
const PRIMARY_PRIORITY: u32 = 2;

/// MongoDB: a replica set formed with `rs.initiate` after bring-up.
///
/// A single node runs standalone; the replica set only exists when there is
/// at least one secondary.
#[derive(Debug, Clone)]
pub struct MongoStrategy {
    replica_set: String,
}

impl Default for MongoStrategy {
    fn default() -> Self {
        Self { replica_set: "rs0".to_string() }
    }
}

impl MongoStrategy {
    /// Replica set name passed to every `mongod`.
    pub fn replica_set(&self) -> &str {
        &self.replica_set
    }

    /// `rs.initiate(...)` document naming every member by its network address.
    ///
    /// YCSB only talks to the published primary port, so that member gets a
    /// higher priority and wins the election.
    pub fn initiate_command(&self, nodes: &[NodeSpec]) -> String {
        let members = nodes
            .iter()
            .map(|n| match n.role {
                NodeRole::Primary => format!(
                    "{{ _id: {}, host: \"{}\", priority: {} }}",
                    n.index,
                    n.internal_address(),
                    PRIMARY_PRIORITY
                ),
                NodeRole::Secondary => {
                    format!("{{ _id: {}, host: \"{}\" }}", n.index, n.internal_address())
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("rs.initiate({{ _id: \"{}\", members: [{}] }})", self.replica_set, members)
    }
}

impl StoreStrategy for MongoStrategy {
    fn kind(&self) -> StoreKind {
        StoreKind::MongoDb
    }

    fn network(&self) -> &'static str {
        "mongo-net"
    }

    fn primary_service(&self) -> &'static str {
        "mongo-primary"
    }

    fn secondary_prefix(&self) -> &'static str {
        "mongo-secondary"
    }

    fn base_port(&self) -> u16 {
        27017
    }

    /// `{{replication_flags}}` carries its own leading space so the
    /// single-node command line has no trailing whitespace.
    fn template_values(&self, node_count: u32) -> Vec<(&'static str, String)> {
        let flags = if node_count > 1 {
            format!(" --replSet {}", self.replica_set)
        } else {
            String::new()
        };
        vec![("replication_flags", flags)]
    }

    fn render_secondary(&self, node: &NodeSpec) -> String {
        format!(
            "
  {service}:
    image: mongo:latest
    command: mongod --bind_ip_all --replSet {replica_set}
    ports:
      - \"{host_port}:{port}\"
    depends_on:
      - {primary}
    networks:
      - {network}
",
            service = node.service,
            replica_set = self.replica_set,
            host_port = node.host_port,
            port = node.container_port,
            primary = self.primary_service(),
            network = self.network(),
        )
    }

    fn connection_properties(&self) -> Vec<(&'static str, String)> {
        // The binding's default URL targets localhost:27017, the published
        // primary port.
        Vec::new()
    }

    fn post_bring_up(
        &self,
        descriptor: &DeploymentDescriptor,
        handle: &dyn DeploymentHandle,
        admin: &dyn AdminClient,
    ) -> Result<()> {
        if descriptor.nodes.len() < 2 {
            return Ok(());
        }

        let primary = descriptor
            .primary()
            .ok_or_else(|| HarnessError::ReplicaSetInitFailure("descriptor has no primary".into()))?;
        let endpoint = Endpoint::new(&primary.service, primary.container_port);

        tracing::info!(
            "Initiating replica set {} with {} members",
            self.replica_set,
            descriptor.nodes.len()
        );
        let session = admin
            .connect(handle, &endpoint)
            .map_err(|e| HarnessError::ReplicaSetInitFailure(e.to_string()))?;
        let reply = session
            .run_admin_command(&self.initiate_command(&descriptor.nodes))
            .map_err(|e| HarnessError::ReplicaSetInitFailure(e.to_string()))?;
        tracing::debug!("rs.initiate replied: {}", reply);

        Ok(())
    }
}
