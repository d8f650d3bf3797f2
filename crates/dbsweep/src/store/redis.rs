use crate::config::StoreKind;

use super::{NodeSpec, StoreStrategy};

/// Redis: one master, replicas following it with `--replicaof`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisStrategy;

impl StoreStrategy for RedisStrategy {
    fn kind(&self) -> StoreKind {
        StoreKind::Redis
    }

    fn network(&self) -> &'static str {
        "redis-net"
    }

    fn primary_service(&self) -> &'static str {
        "redis-master"
    }

    fn secondary_prefix(&self) -> &'static str {
        "redis-replica"
    }

    fn base_port(&self) -> u16 {
        6379
    }

    fn render_secondary(&self, node: &NodeSpec) -> String {
        format!(
            "
  {service}:
    image: redis:latest
    command: redis-server --appendonly yes --replicaof {primary} {port}
    ports:
      - \"{host_port}:{port}\"
    depends_on:
      - {primary}
    networks:
      - {network}
",
            service = node.service,
            primary = self.primary_service(),
            port = node.container_port,
            host_port = node.host_port,
            network = self.network(),
        )
    }

    fn connection_properties(&self) -> Vec<(&'static str, String)> {
        vec![
            ("redis.host", "127.0.0.1".to_string()),
            ("redis.port", self.base_port().to_string()),
        ]
    }
}
