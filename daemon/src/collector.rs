//! Process and host counter collection (reads /proc on Linux)

mod linux;

pub use linux::{
    parse_meminfo, parse_pid_stat, parse_processes_counter, parse_stat_cpu, LinuxProcessCollector,
};

use std::time::Duration;

/// Cumulative CPU time of one process at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub parent_pid: u32,
    pub name: String,
    pub cpu_time_user: Duration,
    pub cpu_time_system: Duration,
}

impl ProcessSnapshot {
    pub fn cpu_time(&self) -> Duration {
        self.cpu_time_user + self.cpu_time_system
    }
}

/// Cumulative system-wide CPU time, from the aggregate `cpu` line of /proc/stat.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub user: Duration,
    pub nice: Duration,
    pub system: Duration,
    pub idle: Duration,
    pub iowait: Duration,
    pub irq: Duration,
    pub softirq: Duration,
    pub steal: Duration,
}

impl CpuTimes {
    /// Sum of every tracked state.
    pub fn total(&self) -> Duration {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Percentage of the time between `earlier` and `self` spent idle.
    /// Zero when no time elapsed.
    pub fn idle_percent_since(&self, earlier: &CpuTimes) -> f64 {
        let total = self.total().saturating_sub(earlier.total()).as_secs_f64();
        if total <= 0.0 {
            return 0.0;
        }
        let idle = self.idle.saturating_sub(earlier.idle).as_secs_f64();
        100.0 * idle / total
    }
}

/// Memory counters from /proc/meminfo, in kilobytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub available_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
}

impl MemInfo {
    pub fn used_percent(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        let used = self.total_kb.saturating_sub(self.available_kb);
        100.0 * used as f64 / self.total_kb as f64
    }
}

pub trait ProcessCollector: Send + Sync {
    fn cpu_times(&self) -> Option<CpuTimes>;
    fn list_processes(&self) -> Vec<ProcessSnapshot>;
    fn get_process(&self, pid: u32) -> Option<ProcessSnapshot>;
    fn num_cpus(&self) -> u32;
}

/// Static host counters read once per observation window.
pub trait HostCounters: Send + Sync {
    /// Total processes created since boot.
    fn processes_created(&self) -> Option<u64>;
    fn meminfo(&self) -> Option<MemInfo>;
    fn process_exists(&self, pid: u32) -> bool;
}
