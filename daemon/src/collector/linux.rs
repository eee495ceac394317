use super::{CpuTimes, HostCounters, MemInfo, ProcessCollector, ProcessSnapshot};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub struct LinuxProcessCollector {
    clock_ticks: u64,
    num_cpus: u32,
}

impl LinuxProcessCollector {
    pub fn new() -> Self {
        let clock_ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        let num_cpus = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        Self {
            clock_ticks: if clock_ticks > 0 { clock_ticks as u64 } else { 100 },
            num_cpus: num_cpus.max(1) as u32,
        }
    }

    fn parse_process(&self, pid: u32) -> Option<ProcessSnapshot> {
        let stat_content = fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        parse_pid_stat(pid, &stat_content, self.clock_ticks)
    }
}

impl Default for LinuxProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector for LinuxProcessCollector {
    fn cpu_times(&self) -> Option<CpuTimes> {
        let stat = fs::read_to_string("/proc/stat").ok()?;
        parse_stat_cpu(&stat, self.clock_ticks)
    }

    fn list_processes(&self) -> Vec<ProcessSnapshot> {
        let mut processes = Vec::new();
        if let Ok(entries) = fs::read_dir("/proc") {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Ok(pid) = name.parse::<u32>() {
                        // Raced with exit or unreadable: leave it out of this listing.
                        if let Some(info) = self.parse_process(pid) {
                            processes.push(info);
                        }
                    }
                }
            }
        }
        processes
    }

    fn get_process(&self, pid: u32) -> Option<ProcessSnapshot> {
        self.parse_process(pid)
    }

    fn num_cpus(&self) -> u32 {
        self.num_cpus
    }
}

impl HostCounters for LinuxProcessCollector {
    fn processes_created(&self) -> Option<u64> {
        let stat = fs::read_to_string("/proc/stat").ok()?;
        parse_processes_counter(&stat)
    }

    fn meminfo(&self) -> Option<MemInfo> {
        let content = fs::read_to_string("/proc/meminfo").ok()?;
        Some(parse_meminfo(&content))
    }

    fn process_exists(&self, pid: u32) -> bool {
        pid != 0 && Path::new(&format!("/proc/{}", pid)).exists()
    }
}

fn ticks_to_duration(ticks: u64, clock_ticks: u64) -> Duration {
    let clock_ticks = clock_ticks.max(1);
    let secs = ticks / clock_ticks;
    let rem = ticks % clock_ticks;
    Duration::from_secs(secs) + Duration::from_nanos(rem * 1_000_000_000 / clock_ticks)
}

/// Parses the aggregate `cpu` line of /proc/stat.
pub fn parse_stat_cpu(stat: &str, clock_ticks: u64) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse().unwrap_or(0))
        .collect();
    if fields.len() < 4 {
        return None;
    }
    let at = |i: usize| ticks_to_duration(fields.get(i).copied().unwrap_or(0), clock_ticks);
    Some(CpuTimes {
        user: at(0),
        nice: at(1),
        system: at(2),
        idle: at(3),
        iowait: at(4),
        irq: at(5),
        softirq: at(6),
        steal: at(7),
    })
}

/// Reads the `processes` line of /proc/stat (forks since boot).
pub fn parse_processes_counter(stat: &str) -> Option<u64> {
    stat.lines()
        .find_map(|line| line.strip_prefix("processes "))
        .and_then(|rest| rest.trim().parse().ok())
}

pub fn parse_meminfo(content: &str) -> MemInfo {
    let mut info = MemInfo::default();
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(value) = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };
        match key {
            "MemTotal" => info.total_kb = value,
            "MemAvailable" => info.available_kb = value,
            "Buffers" => info.buffers_kb = value,
            "Cached" => info.cached_kb = value,
            _ => {}
        }
    }
    info
}

/// Parses `/proc/<pid>/stat`. The command name sits between the first `(`
/// and the last `)` and may itself contain spaces or parentheses.
pub fn parse_pid_stat(pid: u32, content: &str, clock_ticks: u64) -> Option<ProcessSnapshot> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close < open {
        return None;
    }
    let name = content[open + 1..close].to_string();
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    // state ppid pgrp session tty_nr tpgid flags minflt cminflt majflt cmajflt utime stime
    if rest.len() < 13 {
        return None;
    }
    let parent_pid: u32 = rest[1].parse().ok()?;
    let utime: u64 = rest[11].parse().ok()?;
    let stime: u64 = rest[12].parse().ok()?;

    Some(ProcessSnapshot {
        pid,
        parent_pid,
        name,
        cpu_time_user: ticks_to_duration(utime, clock_ticks),
        cpu_time_system: ticks_to_duration(stime, clock_ticks),
    })
}
