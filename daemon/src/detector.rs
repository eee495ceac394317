//! Process-tree anomaly detection

use crate::config::TreeRule;
use crate::sampler::ProcessCpuSample;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Pid used by processes without a parent (e.g. init, kthreadd).
pub const NO_PARENT: u32 = 0;

/// Name reported for a parent that was not itself sampled.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A parent whose direct children together burn more CPU than allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct AbnormalParent {
    pub pid: u32,
    pub name: String,
    pub total_child_cpu_percent: f64,
    pub child_count: usize,
}

impl fmt::Display for AbnormalParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PID: {}, name: {}, total CPU: {:.2}%, child count: {}",
            self.pid, self.name, self.total_child_cpu_percent, self.child_count
        )
    }
}

pub trait Detector: Send + Sync {
    fn detect(&self, samples: &[ProcessCpuSample]) -> Vec<AbnormalParent>;
}

pub struct ProcessTreeDetector {
    rule: TreeRule,
}

impl ProcessTreeDetector {
    pub fn new(rule: TreeRule) -> Self {
        Self { rule }
    }
}

impl Detector for ProcessTreeDetector {
    fn detect(&self, samples: &[ProcessCpuSample]) -> Vec<AbnormalParent> {
        detect_abnormal_trees(samples, &self.rule)
    }
}

/// Sums the CPU of each parent's direct children and keeps parents with
/// `total > cpu_threshold_percent` and `count >= min_children`.
///
/// Grandchildren are not rolled up. A parent that was not sampled itself is
/// named [`UNKNOWN_NAME`]. Output currently comes back sorted by pid, but
/// callers must not rely on any order.
pub fn detect_abnormal_trees(samples: &[ProcessCpuSample], rule: &TreeRule) -> Vec<AbnormalParent> {
    let names: HashMap<u32, &str> = samples.iter().map(|s| (s.pid, s.name.as_str())).collect();

    let mut children: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for sample in samples {
        if sample.parent_pid == NO_PARENT {
            continue;
        }
        let entry = children.entry(sample.parent_pid).or_insert((0.0, 0));
        entry.0 += sample.cpu_percent;
        entry.1 += 1;
    }

    children
        .into_iter()
        .filter(|(_, (total, count))| {
            *total > rule.cpu_threshold_percent && *count >= rule.min_children
        })
        .map(|(pid, (total, count))| AbnormalParent {
            pid,
            name: names.get(&pid).copied().unwrap_or(UNKNOWN_NAME).to_string(),
            total_child_cpu_percent: total,
            child_count: count,
        })
        .collect()
}

/// Outcome of one detector cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub overall_cpu_percent: f64,
    pub abnormal_parents: Vec<AbnormalParent>,
    pub triggered: bool,
}

impl CycleReport {
    /// Triggered when overall CPU is strictly above `trigger_cpu_percent` and
    /// at least one abnormal tree was found.
    pub fn new(
        overall_cpu_percent: f64,
        abnormal_parents: Vec<AbnormalParent>,
        trigger_cpu_percent: f64,
    ) -> Self {
        let triggered = overall_cpu_percent > trigger_cpu_percent && !abnormal_parents.is_empty();
        Self {
            overall_cpu_percent,
            abnormal_parents,
            triggered,
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "overall CPU: {:.2}%", self.overall_cpu_percent)?;
        writeln!(f, "abnormal process trees:")?;
        for parent in &self.abnormal_parents {
            writeln!(f, "{}", parent)?;
        }
        write!(f, "triggered: {}", if self.triggered { "yes" } else { "no" })
    }
}
