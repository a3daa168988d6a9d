use std::{env, io, time::Duration};

use log::{error, info};
use rand::Rng;
use rand_distr::StandardNormal;
use tokio::{signal, task::JoinSet, time::sleep};

use worker::{NodeConfig, Result as WorkerResult, SystemMonitor, Worker, WorkerMetrics};

mod config;

use config::RingConfig;

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let cfg = match env::args().nth(1) {
        Some(path) => RingConfig::from_file(path)?,
        None => RingConfig::default(),
    };
    cfg.validate().map_err(io::Error::from)?;

    info!(
        num_nodes = cfg.num_nodes,
        dim = cfg.dim.get(),
        rounds = cfg.rounds;
        "starting ring training"
    );

    let mut nodes = JoinSet::new();
    for node_cfg in cfg.node_configs() {
        nodes.spawn(run_node(
            node_cfg,
            cfg.gradient_scale,
            cfg.compute_delay,
            cfg.straggler_mem_threshold,
        ));
        sleep(cfg.start_stagger).await;
    }

    tokio::select! {
        _ = join_all(&mut nodes) => {
            info!("training complete");
        }
        _ = signal::ctrl_c() => {
            info!("received SIGTERM, shutting down");
        }
    }

    Ok(())
}

async fn join_all(nodes: &mut JoinSet<(usize, WorkerResult<WorkerMetrics>)>) {
    while let Some(joined) = nodes.join_next().await {
        match joined {
            Ok((node_id, Ok(metrics))) => info!(
                node_id = node_id,
                updates = metrics.updates,
                degraded = metrics.degraded;
                "node finished"
            ),
            Ok((node_id, Err(e))) => error!(node_id = node_id; "node failed: {e}"),
            Err(e) => error!("node task failed: {e}"),
        }
    }
}

/// Runs one ring node to completion.
///
/// Nodes share nothing: each task owns its worker, buffers, and sockets
/// outright, and coordination happens only over the ring's TCP edges.
async fn run_node(
    cfg: NodeConfig,
    gradient_scale: f32,
    compute_delay: Duration,
    mem_threshold: f32,
) -> (usize, WorkerResult<WorkerMetrics>) {
    let node_id = cfg.node_id;
    let (rx, tx) = comms::edge(
        cfg.listen_addr,
        cfg.successor_addr,
        cfg.retry.clone(),
        cfg.window.clone(),
    );

    // Toy optimization collaborator: a fresh standard-normal gradient each
    // round, with a simulated compute delay. Runs on the blocking pool.
    let compute = move |_weights: &[f32], grads: &mut [f32]| {
        std::thread::sleep(compute_delay);
        let mut rng = rand::rng();
        for g in grads.iter_mut() {
            *g = rng.sample::<f32, _>(StandardNormal) * gradient_scale;
        }
    };

    let mut monitor = SystemMonitor::new(mem_threshold);
    let result = match Worker::new(cfg, compute) {
        Ok(mut node) => node.run(rx, tx, &mut monitor).await,
        Err(e) => Err(e),
    };

    (node_id, result)
}
