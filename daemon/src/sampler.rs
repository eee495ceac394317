//! Two-snapshot CPU sampler

use crate::collector::{CpuTimes, ProcessCollector, ProcessSnapshot};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// CPU share of one process over a sampling interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessCpuSample {
    pub pid: u32,
    pub parent_pid: u32,
    pub name: String,
    pub cpu_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuCycle {
    pub overall_cpu_percent: f64,
    pub processes: Vec<ProcessCpuSample>,
}

/// Turns two snapshots into CPU percentages.
///
/// `total_time` is the system-wide user + system + idle delta. Every
/// process listed in `before` is reported; one missing from `after` (exited
/// or unreadable) gets 0%. Per-process shares are scaled by `num_cpus`, so a
/// process saturating two cores reads 200%. If no time elapsed, everything
/// is 0.
pub fn compute_cycle(
    system_before: &CpuTimes,
    system_after: &CpuTimes,
    before: &[ProcessSnapshot],
    after: &HashMap<u32, ProcessSnapshot>,
    num_cpus: u32,
) -> CpuCycle {
    let d_user = system_after.user.saturating_sub(system_before.user);
    let d_system = system_after.system.saturating_sub(system_before.system);
    let d_idle = system_after.idle.saturating_sub(system_before.idle);
    let total_time = (d_user + d_system + d_idle).as_secs_f64();

    let overall_cpu_percent = if total_time > 0.0 {
        100.0 * (d_user + d_system).as_secs_f64() / total_time
    } else {
        0.0
    };

    let processes = before
        .iter()
        .map(|p0| {
            let cpu_percent = match after.get(&p0.pid) {
                Some(p1) if total_time > 0.0 => {
                    let busy = p1.cpu_time().saturating_sub(p0.cpu_time()).as_secs_f64();
                    100.0 * f64::from(num_cpus) * busy / total_time
                }
                _ => 0.0,
            };
            ProcessCpuSample {
                pid: p0.pid,
                parent_pid: p0.parent_pid,
                name: p0.name.clone(),
                cpu_percent,
            }
        })
        .collect();

    CpuCycle {
        overall_cpu_percent,
        processes,
    }
}

pub struct Sampler<C> {
    collector: C,
}

impl<C: ProcessCollector> Sampler<C> {
    pub fn new(collector: C) -> Self {
        Self { collector }
    }

    /// Snapshots, sleeps `interval`, snapshots again and computes the deltas.
    /// If either system snapshot is unreadable, every value is 0.
    pub async fn sample(&self, interval: Duration) -> CpuCycle {
        let system_before = self.collector.cpu_times();
        let before = self.collector.list_processes();

        tokio::time::sleep(interval).await;

        let (Some(system_before), Some(system_after)) = (system_before, self.collector.cpu_times())
        else {
            warn!("system CPU times unavailable, reporting an empty cycle");
            let zero = CpuTimes::default();
            return compute_cycle(&zero, &zero, &before, &HashMap::new(), self.collector.num_cpus());
        };
        let after: HashMap<u32, ProcessSnapshot> = before
            .iter()
            .filter_map(|p| self.collector.get_process(p.pid))
            .map(|p| (p.pid, p))
            .collect();

        compute_cycle(
            &system_before,
            &system_after,
            &before,
            &after,
            self.collector.num_cpus(),
        )
    }
}
