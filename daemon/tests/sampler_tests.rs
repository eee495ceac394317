use minewatch_daemon::collector::{CpuTimes, LinuxProcessCollector, ProcessCollector, ProcessSnapshot};
use minewatch_daemon::sampler::{compute_cycle, Sampler};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

fn cpu(user_ms: u64, system_ms: u64, idle_ms: u64) -> CpuTimes {
    CpuTimes {
        user: Duration::from_millis(user_ms),
        system: Duration::from_millis(system_ms),
        idle: Duration::from_millis(idle_ms),
        ..CpuTimes::default()
    }
}

fn snap(pid: u32, parent_pid: u32, user_ms: u64, system_ms: u64) -> ProcessSnapshot {
    ProcessSnapshot {
        pid,
        parent_pid,
        name: format!("proc{}", pid),
        cpu_time_user: Duration::from_millis(user_ms),
        cpu_time_system: Duration::from_millis(system_ms),
    }
}

fn by_pid(snaps: Vec<ProcessSnapshot>) -> HashMap<u32, ProcessSnapshot> {
    snaps.into_iter().map(|p| (p.pid, p)).collect()
}

/// Test overall and per-process CPU percentages
#[test]
fn test_overall_and_per_process_percentages() {
    let before = vec![snap(10, 1, 0, 0), snap(11, 1, 100, 100)];
    let after = by_pid(vec![snap(10, 1, 300, 100), snap(11, 1, 100, 100)]);
    // 2 cpus, 2000ms of system time: 1200 busy + 800 idle.
    let cycle = compute_cycle(&cpu(0, 0, 0), &cpu(1000, 200, 800), &before, &after, 2);

    assert!((cycle.overall_cpu_percent - 60.0).abs() < 1e-9);
    assert_eq!(cycle.processes.len(), 2);
    // 400ms of 2000ms on a 2-cpu box.
    assert!((cycle.processes[0].cpu_percent - 40.0).abs() < 1e-9);
    assert_eq!(cycle.processes[1].cpu_percent, 0.0);
    assert_eq!(cycle.processes[0].parent_pid, 1);
    assert_eq!(cycle.processes[0].name, "proc10");
}

/// Test that zero elapsed time yields zeros
#[test]
fn test_zero_elapsed_time_yields_zeros() {
    let before = vec![snap(10, 1, 0, 0)];
    let after = by_pid(vec![snap(10, 1, 500, 500)]);
    let same = cpu(1000, 1000, 1000);
    let cycle = compute_cycle(&same, &same, &before, &after, 8);
    assert_eq!(cycle.overall_cpu_percent, 0.0);
    assert!(cycle.processes.iter().all(|p| p.cpu_percent == 0.0));

    // A clock that went backwards is treated the same way.
    let cycle = compute_cycle(&cpu(2000, 2000, 2000), &same, &before, &after, 8);
    assert_eq!(cycle.overall_cpu_percent, 0.0);
    assert!(cycle.processes.iter().all(|p| p.cpu_percent == 0.0));
}

/// Test that a process gone at the second snapshot reads 0%
#[test]
fn test_process_gone_at_second_snapshot_reads_zero() {
    let before = vec![snap(10, 1, 0, 0), snap(11, 1, 0, 0)];
    let after = by_pid(vec![snap(10, 1, 500, 0)]);
    let cycle = compute_cycle(&cpu(0, 0, 0), &cpu(500, 0, 500), &before, &after, 1);

    assert_eq!(cycle.processes.len(), 2);
    let gone = cycle.processes.iter().find(|p| p.pid == 11).unwrap();
    assert_eq!(gone.cpu_percent, 0.0);
    let alive = cycle.processes.iter().find(|p| p.pid == 10).unwrap();
    assert!((alive.cpu_percent - 50.0).abs() < 1e-9);
}

/// Test that a process born mid-cycle is not reported
#[test]
fn test_new_process_at_second_snapshot_is_not_reported() {
    let before = vec![snap(10, 1, 0, 0)];
    let after = by_pid(vec![snap(10, 1, 0, 0), snap(12, 1, 900, 0)]);
    let cycle = compute_cycle(&cpu(0, 0, 0), &cpu(500, 0, 500), &before, &after, 1);
    assert_eq!(cycle.processes.len(), 1);
    assert_eq!(cycle.processes[0].pid, 10);
}

/// Test that a counter going backwards clamps to 0%
#[test]
fn test_counter_going_backwards_clamps_to_zero() {
    let before = vec![snap(10, 1, 900, 0)];
    let after = by_pid(vec![snap(10, 1, 100, 0)]);
    let cycle = compute_cycle(&cpu(0, 0, 0), &cpu(500, 0, 500), &before, &after, 1);
    assert_eq!(cycle.processes[0].cpu_percent, 0.0);
}

/// Test that a live sample includes the test process
#[tokio::test]
async fn test_live_sample_includes_current_process() {
    let sampler = Sampler::new(LinuxProcessCollector::new());
    let cycle = sampler.sample(Duration::from_millis(200)).await;

    assert!(cycle.overall_cpu_percent >= 0.0);
    assert!(cycle.overall_cpu_percent <= 100.0);
    let me = std::process::id();
    assert!(cycle.processes.iter().any(|p| p.pid == me));
    assert!(cycle.processes.iter().all(|p| p.cpu_percent >= 0.0));
}

/// /proc/stat is unreadable at the first snapshot and readable at the second.
#[derive(Default)]
struct FlakyStat {
    calls: AtomicU64,
}

impl ProcessCollector for FlakyStat {
    fn cpu_times(&self) -> Option<CpuTimes> {
        match self.calls.fetch_add(1, Ordering::SeqCst) {
            0 => None,
            _ => Some(cpu(900_000, 100_000, 5_000_000)),
        }
    }

    fn list_processes(&self) -> Vec<ProcessSnapshot> {
        vec![snap(10, 1, 0, 0)]
    }

    fn get_process(&self, pid: u32) -> Option<ProcessSnapshot> {
        (pid == 10).then(|| snap(10, 1, 400_000, 0))
    }

    fn num_cpus(&self) -> u32 {
        1
    }
}

/// Test that a missing system snapshot yields a zero cycle instead of a since-boot delta
#[tokio::test]
async fn test_unreadable_first_snapshot_yields_zeros() {
    let sampler = Sampler::new(FlakyStat::default());
    let cycle = sampler.sample(Duration::from_millis(10)).await;

    assert_eq!(cycle.overall_cpu_percent, 0.0);
    assert_eq!(cycle.processes.len(), 1);
    assert_eq!(cycle.processes[0].pid, 10);
    assert_eq!(cycle.processes[0].cpu_percent, 0.0);
}
