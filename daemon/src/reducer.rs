//! Reduction of an observation window into a flat metrics report

use crate::collector::MemInfo;
use crate::probe::{BindSnoop, BioPattern, CacheStat, TcpConnect};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::time::Duration;

pub const CACHE_HITS: &str = "cache hits";
pub const CACHE_BUFFERS_MB: &str = "cache buffers(MB)";
pub const CACHE_CACHED_MB: &str = "cache cached(MB)";
pub const PROCESS_CREATION_RATE: &str = "process-creation rate (per second)";
pub const IO_RANDOM_PERCENT: &str = "I/O random%";
pub const IO_SEQUENTIAL_PERCENT: &str = "I/O sequential%";
pub const IO_OP_COUNT: &str = "I/O op count";
pub const IO_KBYTES: &str = "I/O KB";
pub const CPU_UNCLAIMED_PERCENT: &str = "CPU-unclaimed(%)";
pub const RAM_USED_PERCENT: &str = "RAM-used(%)";
pub const NEW_TCP_CONNECTIONS: &str = "new TCP connections";
pub const TCP_BINDS: &str = "TCP binds";
pub const UDP_BINDS: &str = "UDP binds";

/// Report keys in print order.
pub const REPORT_KEYS: [&str; 13] = [
    CACHE_HITS,
    CACHE_BUFFERS_MB,
    CACHE_CACHED_MB,
    PROCESS_CREATION_RATE,
    IO_RANDOM_PERCENT,
    IO_SEQUENTIAL_PERCENT,
    IO_OP_COUNT,
    IO_KBYTES,
    CPU_UNCLAIMED_PERCENT,
    RAM_USED_PERCENT,
    NEW_TCP_CONNECTIONS,
    TCP_BINDS,
    UDP_BINDS,
];

/// Everything gathered during one observation window.
#[derive(Debug, Clone, Default)]
pub struct ObservationWindow {
    pub cache: CacheStat,
    pub bio: BioPattern,
    pub binds: BindSnoop,
    pub connects: TcpConnect,
    pub meminfo: MemInfo,
    pub start_process_count: u64,
    pub end_process_count: u64,
    pub duration: Duration,
    pub cpu_idle_samples: Vec<f64>,
    pub ram_used_samples: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Count(u64),
    Ratio(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            MetricValue::Count(n) => n as f64,
            MetricValue::Ratio(x) => x,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{}", n),
            MetricValue::Ratio(x) => write!(f, "{:.2}", x),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            MetricValue::Count(n) => serializer.serialize_u64(n),
            MetricValue::Ratio(x) => serializer.serialize_f64(x),
        }
    }
}

/// Ordered name → value mapping, written once per window.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    entries: Vec<(&'static str, MetricValue)>,
}

impl MetricsReport {
    pub fn get(&self, key: &str) -> Option<MetricValue> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, MetricValue)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{}: {}", key, value)?;
        }
        Ok(())
    }
}

impl Serialize for MetricsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn kb_to_mb(kb: u64) -> f64 {
    kb as f64 / 1024.0
}

/// Forks per second over the window; 0 for an empty window.
pub fn process_creation_rate(start: u64, end: u64, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    end.saturating_sub(start) as f64 / secs
}

pub fn reduce(window: &ObservationWindow) -> MetricsReport {
    use MetricValue::{Count, Ratio};

    let entries = vec![
        (CACHE_HITS, Count(window.cache.total_hits)),
        (CACHE_BUFFERS_MB, Ratio(kb_to_mb(window.meminfo.buffers_kb))),
        (CACHE_CACHED_MB, Ratio(kb_to_mb(window.meminfo.cached_kb))),
        (
            PROCESS_CREATION_RATE,
            Ratio(process_creation_rate(
                window.start_process_count,
                window.end_process_count,
                window.duration,
            )),
        ),
        (IO_RANDOM_PERCENT, Ratio(window.bio.avg_random_percent())),
        (IO_SEQUENTIAL_PERCENT, Ratio(window.bio.avg_sequential_percent())),
        (IO_OP_COUNT, Count(window.bio.total_count)),
        (IO_KBYTES, Count(window.bio.total_kbytes)),
        (CPU_UNCLAIMED_PERCENT, Ratio(mean(&window.cpu_idle_samples))),
        (RAM_USED_PERCENT, Ratio(mean(&window.ram_used_samples))),
        (NEW_TCP_CONNECTIONS, Count(window.connects.connections)),
        (TCP_BINDS, Count(window.binds.tcp_binds)),
        (UDP_BINDS, Count(window.binds.udp_binds)),
    ];
    MetricsReport { entries }
}
