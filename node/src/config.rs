use std::{
    fs,
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroUsize,
    path::Path,
    time::Duration,
};

use comms::{RecvWindow, RetryPolicy};
use worker::{DEFAULT_MEM_THRESHOLD, NodeConfig, WorkerErr};

/// Whole-run configuration for a local ring.
///
/// The ring edges are derived, not configured: node `i` listens on
/// `base_port + i` and sends to `base_port + (i + 1) mod num_nodes`, a single
/// directed cycle.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RingConfig {
    pub num_nodes: usize,
    pub host: IpAddr,
    pub base_port: u16,
    pub dim: NonZeroUsize,
    pub rounds: usize,
    pub learning_rate: f32,

    /// Scale of the toy standard-normal gradients.
    pub gradient_scale: f32,
    /// Simulated per-round compute time.
    pub compute_delay: Duration,
    /// Delay between node launches.
    pub start_stagger: Duration,
    /// Memory utilization (percent) above which a node is a straggler.
    pub straggler_mem_threshold: f32,

    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub window: RecvWindow,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            num_nodes: 4,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: 8000,
            dim: NonZeroUsize::new(1000).unwrap(),
            rounds: 5,
            learning_rate: 0.01,
            gradient_scale: 0.01,
            compute_delay: Duration::from_millis(100),
            start_stagger: Duration::from_millis(200),
            straggler_mem_threshold: DEFAULT_MEM_THRESHOLD,
            retry: RetryPolicy::default(),
            window: RecvWindow::default(),
        }
    }
}

impl RingConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Checks the run-level invariants.
    pub fn validate(&self) -> Result<(), WorkerErr> {
        if self.num_nodes == 0 {
            return Err(WorkerErr::InvalidConfig(
                "at least one node is required".into(),
            ));
        }

        if u32::from(self.base_port) + self.num_nodes as u32 > u32::from(u16::MAX) + 1 {
            return Err(WorkerErr::InvalidConfig(format!(
                "port range {}..{}+{} exceeds the valid port space",
                self.base_port, self.base_port, self.num_nodes
            )));
        }

        if !self.learning_rate.is_finite() {
            return Err(WorkerErr::InvalidConfig(format!(
                "learning rate must be finite, got {}",
                self.learning_rate
            )));
        }

        Ok(())
    }

    /// Derives the per-node configurations for the ring.
    pub fn node_configs(&self) -> Vec<NodeConfig> {
        (0..self.num_nodes)
            .map(|i| {
                let port = |n: usize| self.base_port + n as u16;
                NodeConfig {
                    node_id: i,
                    listen_addr: SocketAddr::new(self.host, port(i)),
                    successor_addr: SocketAddr::new(self.host, port((i + 1) % self.num_nodes)),
                    dim: self.dim,
                    rounds: self.rounds,
                    learning_rate: self.learning_rate,
                    retry: self.retry.clone(),
                    window: self.window.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ring_is_a_single_cycle() {
        let cfg = RingConfig::default();
        let nodes = cfg.node_configs();

        assert_eq!(nodes.len(), 4);
        for (i, node) in nodes.iter().enumerate() {
            let successor = &nodes[(i + 1) % nodes.len()];
            assert_eq!(node.successor_addr, successor.listen_addr);
        }

        // Every listen address is exactly one node's successor target.
        for node in &nodes {
            let inbound = nodes
                .iter()
                .filter(|other| other.successor_addr == node.listen_addr)
                .count();
            assert_eq!(inbound, 1);
        }
    }

    #[test]
    fn zero_nodes_is_rejected() {
        let cfg = RingConfig {
            num_nodes: 0,
            ..RingConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(WorkerErr::InvalidConfig(_))));
    }

    #[test]
    fn overflowing_port_range_is_rejected() {
        let cfg = RingConfig {
            num_nodes: 4,
            base_port: 65534,
            ..RingConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(WorkerErr::InvalidConfig(_))));
    }
}
