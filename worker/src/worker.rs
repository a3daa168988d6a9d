use std::{io, mem, time::Instant};

use comms::{CommsErr, RingReceiver, RingSender};
use log::{debug, info, warn};
use tokio::task;

use crate::{
    config::NodeConfig,
    error::{Result, WorkerErr},
    metrics::WorkerMetrics,
    monitor::TelemetrySink,
    state::NodeState,
};

/// The per-node round loop.
///
/// Drives `Computing -> Exchanging -> Updating -> Reporting` for a fixed
/// number of rounds. Gradient computation is an injected collaborator; the
/// worker owns the weight vector and the exchange.
///
/// Design:
/// - Keeps persistent buffers in `NodeState`.
/// - Computes grads on Tokio's blocking pool; buffers are moved out and back
///   (O(1) moves) to satisfy `'static` without cloning.
/// - Sends and receives concurrently, so the send's retry backoff cannot eat
///   into the receive's accept window. Both complete (or time out) before the
///   update runs — the round barrier, enforced locally.
pub struct Worker<C> {
    cfg: NodeConfig,
    state: NodeState,
    metrics: WorkerMetrics,
    compute: C,
}

impl<C> Worker<C> {
    /// Creates a worker with randomly initialized weights.
    ///
    /// # Arguments
    /// * `cfg` - The node's immutable configuration.
    /// * `compute` - Collaborator that fills the gradient buffer from the
    ///               current weights each round.
    ///
    /// # Returns
    /// A new worker, or `InvalidConfig` if `cfg` is inconsistent.
    pub fn new(cfg: NodeConfig, compute: C) -> Result<Self> {
        cfg.validate()?;
        let state = NodeState::random(cfg.dim);
        Ok(Self {
            cfg,
            state,
            metrics: WorkerMetrics::default(),
            compute,
        })
    }

    /// Creates a worker around explicit initial weights.
    ///
    /// # Arguments
    /// * `cfg` - The node's immutable configuration.
    /// * `weights` - Initial weight vector; length must equal `cfg.dim`.
    /// * `compute` - Gradient collaborator.
    pub fn with_weights(cfg: NodeConfig, weights: Vec<f32>, compute: C) -> Result<Self> {
        cfg.validate()?;
        if weights.len() != cfg.dim.get() {
            return Err(WorkerErr::InvalidConfig(format!(
                "initial weights length {} does not match dim {}",
                weights.len(),
                cfg.dim
            )));
        }

        Ok(Self {
            cfg,
            state: NodeState::from_weights(weights),
            metrics: WorkerMetrics::default(),
            compute,
        })
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn metrics(&self) -> &WorkerMetrics {
        &self.metrics
    }
}

impl<C> Worker<C>
where
    C: Fn(&[f32], &mut [f32]) + Send + Sync + Clone + 'static,
{
    /// Runs the configured number of rounds over the given ring edge.
    ///
    /// Communication failures (exhausted send, absent or malformed receive,
    /// a stalled peer) degrade the affected round and the loop continues;
    /// each round starts its exchange fresh. Only structural errors stop the
    /// node: a received gradient whose length differs from the weight vector
    /// is fatal.
    ///
    /// # Arguments
    /// * `rx` - Inbound edge half, listening for the predecessor.
    /// * `tx` - Outbound edge half, toward the successor.
    /// * `sink` - Telemetry sink, called exactly once per round.
    ///
    /// # Returns
    /// The accumulated run metrics on completion.
    pub async fn run(
        &mut self,
        mut rx: RingReceiver,
        mut tx: RingSender,
        sink: &mut dyn TelemetrySink,
    ) -> Result<WorkerMetrics> {
        let node_id = self.cfg.node_id;
        let learning_rate = self.cfg.learning_rate;

        for round in 0..self.cfg.rounds {
            let started = Instant::now();
            self.state.zero_grads();

            let compute = self.compute.clone();
            let weights = mem::take(&mut self.state.weights);
            let mut grads = mem::take(&mut self.state.grads);

            let (weights, grads) = task::spawn_blocking(move || {
                compute(&weights, &mut grads);
                (weights, grads)
            })
            .await
            .map_err(|e| io::Error::other(format!("compute join error: {e}")))?;

            self.state.weights = weights;
            self.state.grads = grads;
            let t_compute = started.elapsed();

            let exchange = Instant::now();
            let (sent, received) = tokio::join!(tx.send(&self.state.grads), rx.recv());
            let t_comm = exchange.elapsed();

            let mut degraded = false;
            if let Err(e) = sent {
                warn!(node_id = node_id, round = round; "send abandoned: {e}");
                degraded = true;
            }

            match received {
                Ok(Some(gradient)) => {
                    if gradient.len() != self.state.weights.len() {
                        return Err(WorkerErr::DimensionMismatch {
                            node_id,
                            round,
                            got: gradient.len(),
                            expected: self.state.weights.len(),
                        });
                    }

                    self.state.apply_update(learning_rate, &gradient);
                    self.metrics.bump_update();
                }
                Ok(None) => {
                    debug!(node_id = node_id, round = round; "no gradient before the accept deadline");
                    degraded = true;
                }
                Err(e @ CommsErr::MalformedPayload { .. }) => {
                    warn!(node_id = node_id, round = round; "dropping inbound gradient: {e}");
                    degraded = true;
                }
                Err(e) => {
                    warn!(node_id = node_id, round = round; "receive failed: {e}");
                    degraded = true;
                }
            }

            if degraded {
                self.metrics.bump_degraded();
            }

            self.metrics.compute_time += t_compute;
            self.metrics.comm_time += t_comm;
            self.metrics.bump_round();
            self.state.inc_round();

            sink.report(node_id, t_compute, t_comm);
        }

        info!(node_id = node_id, rounds = self.metrics.rounds, updates = self.metrics.updates; "worker finished");
        Ok(self.metrics.clone())
    }
}
