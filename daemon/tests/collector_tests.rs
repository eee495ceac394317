use minewatch_daemon::collector::{
    parse_meminfo, parse_pid_stat, parse_processes_counter, parse_stat_cpu, CpuTimes,
    HostCounters, LinuxProcessCollector, MemInfo, ProcessCollector,
};
use std::time::Duration;

/// Test that the process listing includes the test process
#[test]
fn test_list_processes_returns_current_process() {
    let collector = LinuxProcessCollector::new();
    let processes = collector.list_processes();
    let current_pid = std::process::id();
    let found = processes.iter().any(|p| p.pid == current_pid);
    assert!(found, "Current process should be in the list");
}

/// Test that the test process can be looked up by pid
#[test]
fn test_get_process_returns_current_process() {
    let collector = LinuxProcessCollector::new();
    let current_pid = std::process::id();
    let process = collector.get_process(current_pid);
    assert!(process.is_some(), "Should find current process");
    let p = process.unwrap();
    assert_eq!(p.pid, current_pid);
    assert!(!p.name.is_empty());
    assert_ne!(p.parent_pid, 0);
}

/// Test that an unknown pid yields nothing
#[test]
fn test_get_process_returns_none_for_invalid_pid() {
    let collector = LinuxProcessCollector::new();
    let process = collector.get_process(999999999);
    assert!(process.is_none());
}

/// Test that fork counter and meminfo are readable on this host
#[test]
fn test_host_counters_are_readable() {
    let collector = LinuxProcessCollector::new();
    assert!(collector.num_cpus() >= 1);
    assert!(collector.cpu_times().is_some());
    assert!(collector.processes_created().unwrap() > 0);
    assert!(collector.meminfo().unwrap().total_kb > 0);
    assert!(collector.process_exists(std::process::id()));
    assert!(!collector.process_exists(999999999));
    assert!(!collector.process_exists(0));
}

/// Test that a command name with spaces and parentheses parses
#[test]
fn test_parse_pid_stat_with_awkward_name() {
    let stat = "4242 (tmux: server (1)) S 17 4242 4242 0 -1 4194560 1190 0 0 0 250 75 0 0 20 0 1 0 123 0 0";
    let p = parse_pid_stat(4242, stat, 100).unwrap();
    assert_eq!(p.pid, 4242);
    assert_eq!(p.parent_pid, 17);
    assert_eq!(p.name, "tmux: server (1)");
    assert_eq!(p.cpu_time_user, Duration::from_millis(2500));
    assert_eq!(p.cpu_time_system, Duration::from_millis(750));
    assert_eq!(p.cpu_time(), Duration::from_millis(3250));
}

/// Test that a truncated stat line is rejected
#[test]
fn test_parse_pid_stat_rejects_truncated_line() {
    assert!(parse_pid_stat(1, "1 (init) S 0 1", 100).is_none());
    assert!(parse_pid_stat(1, "garbage", 100).is_none());
}

/// Test parsing of the aggregate cpu line and processes counter
#[test]
fn test_parse_stat_cpu_and_process_counter() {
    let stat = "cpu  100 5 50 800 10 0 3 2 0 0\ncpu0 50 2 25 400 5 0 1 1 0 0\nprocesses 123456\nprocs_running 2\n";
    let cpu = parse_stat_cpu(stat, 100).unwrap();
    assert_eq!(cpu.user, Duration::from_secs(1));
    assert_eq!(cpu.system, Duration::from_millis(500));
    assert_eq!(cpu.idle, Duration::from_secs(8));
    assert_eq!(cpu.total(), Duration::from_millis(9700));
    assert_eq!(parse_processes_counter(stat), Some(123456));
    assert_eq!(parse_processes_counter("cpu 1 2 3 4\n"), None);
}

/// Test that meminfo picks the four fields it needs
#[test]
fn test_parse_meminfo() {
    let content = "MemTotal:       16000000 kB\nMemFree:         1000000 kB\nMemAvailable:    4000000 kB\nBuffers:          204800 kB\nCached:          2048000 kB\nbogus line\n";
    let info = parse_meminfo(content);
    assert_eq!(
        info,
        MemInfo {
            total_kb: 16_000_000,
            available_kb: 4_000_000,
            buffers_kb: 204_800,
            cached_kb: 2_048_000,
        }
    );
    assert!((info.used_percent() - 75.0).abs() < 1e-9);
    assert_eq!(MemInfo::default().used_percent(), 0.0);
}

/// Test idle share between two cpu readings
#[test]
fn test_idle_percent_since() {
    let before = CpuTimes::default();
    let after = CpuTimes {
        user: Duration::from_secs(1),
        idle: Duration::from_secs(3),
        ..CpuTimes::default()
    };
    assert!((after.idle_percent_since(&before) - 75.0).abs() < 1e-9);
    assert_eq!(before.idle_percent_since(&before), 0.0);
}
