use std::{net::SocketAddr, num::NonZeroUsize};

use comms::{RecvWindow, RetryPolicy};

use crate::error::{Result, WorkerErr};

/// Immutable per-node configuration for one run.
///
/// The ring is static: the listen address and the successor address are fixed
/// for the run's duration, and every node's listen address is exactly one
/// other node's successor target.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NodeConfig {
    pub node_id: usize,
    /// Address this node accepts its predecessor on.
    pub listen_addr: SocketAddr,
    /// Address of the ring successor this node sends to.
    pub successor_addr: SocketAddr,
    /// Weight / gradient vector dimensionality.
    pub dim: NonZeroUsize,
    /// Number of rounds before the node is done.
    pub rounds: usize,
    pub learning_rate: f32,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub window: RecvWindow,
}

impl NodeConfig {
    /// Checks the configuration invariants that are not already enforced by
    /// the types.
    ///
    /// # Returns
    /// `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() {
            return Err(WorkerErr::InvalidConfig(format!(
                "learning rate must be finite, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}
