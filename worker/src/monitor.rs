//! Per-round telemetry reporting.

use std::time::Duration;

use log::info;
use sysinfo::System;

/// Memory utilization (percent) above which a node is flagged as a straggler.
pub const DEFAULT_MEM_THRESHOLD: f32 = 90.0;

/// One round's observability record for one node.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub node_id: usize,
    pub t_compute: Duration,
    pub t_comm: Duration,
    pub cpu_percent: f32,
    pub mem_percent: f32,
    pub straggler: bool,
}

/// Sink the round loop hands its per-round timing to, exactly once per round.
///
/// Degraded rounds are visible only through these reports; the loop prints no
/// errors of its own for them.
pub trait TelemetrySink: Send {
    fn report(&mut self, node_id: usize, t_compute: Duration, t_comm: Duration);
}

/// Telemetry sink that samples host CPU and memory utilization and logs one
/// line per round.
pub struct SystemMonitor {
    system: System,
    mem_threshold: f32,
}

impl SystemMonitor {
    /// Creates a monitor flagging stragglers above `mem_threshold` percent
    /// memory utilization.
    pub fn new(mem_threshold: f32) -> Self {
        Self {
            system: System::new_all(),
            mem_threshold,
        }
    }

    /// Samples the host and assembles the round's report.
    pub fn observe(&mut self, node_id: usize, t_compute: Duration, t_comm: Duration) -> RoundReport {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu_percent = self.system.global_cpu_usage();
        let total = self.system.total_memory();
        let mem_percent = if total == 0 {
            0.0
        } else {
            self.system.used_memory() as f32 / total as f32 * 100.0
        };

        RoundReport {
            node_id,
            t_compute,
            t_comm,
            cpu_percent,
            mem_percent,
            straggler: is_straggler(mem_percent, self.mem_threshold),
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_MEM_THRESHOLD)
    }
}

impl TelemetrySink for SystemMonitor {
    fn report(&mut self, node_id: usize, t_compute: Duration, t_comm: Duration) {
        let report = self.observe(node_id, t_compute, t_comm);

        info!(
            node_id = report.node_id,
            t_compute_s = report.t_compute.as_secs_f64(),
            t_comm_s = report.t_comm.as_secs_f64(),
            cpu_percent = report.cpu_percent,
            mem_percent = report.mem_percent,
            straggler = report.straggler;
            "round report"
        );
    }
}

#[inline]
fn is_straggler(mem_percent: f32, threshold: f32) -> bool {
    mem_percent > threshold
}
