//! Configuration management (TOML)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Placeholder in probe arguments replaced by the profiled pid.
pub const PID_PLACEHOLDER: &str = "{pid}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub profiler: ProfilerConfig,
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Gap between the two CPU snapshots of one cycle.
    pub sample_interval_ms: u64,
    /// Sleep between cycles.
    pub cycle_delay_secs: u64,
    /// How often the consumer polls the handoff.
    pub poll_interval_ms: u64,
    /// Overall CPU above which abnormal trees raise the trigger.
    pub trigger_cpu_percent: f64,
    pub tree: TreeRule,
}

/// Thresholds a parent's children must exceed to be reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeRule {
    pub cpu_threshold_percent: f64,
    pub min_children: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    pub backoff_ms: u64,
    pub terminate_grace_ms: u64,
    pub host_sample_interval_ms: u64,
    pub probes: ProbeCommands,
}

/// Program and arguments for each external probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeCommands {
    pub cachestat: Vec<String>,
    pub biopattern: Vec<String>,
    pub bindsnoop: Vec<String>,
    pub tcpconnect: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            sample_interval_ms: 1000,
            cycle_delay_secs: 5,
            poll_interval_ms: 1000,
            trigger_cpu_percent: 80.0,
            tree: TreeRule::default(),
        }
    }
}

impl Default for TreeRule {
    fn default() -> Self {
        TreeRule {
            cpu_threshold_percent: 100.0,
            min_children: 3,
        }
    }
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        ProfilerConfig {
            backoff_ms: 100,
            terminate_grace_ms: 500,
            host_sample_interval_ms: 1000,
            probes: ProbeCommands::default(),
        }
    }
}

impl Default for ProbeCommands {
    fn default() -> Self {
        fn argv(parts: &[&str]) -> Vec<String> {
            parts.iter().map(|s| s.to_string()).collect()
        }
        ProbeCommands {
            cachestat: argv(&["cachestat", "1"]),
            biopattern: argv(&["biopattern", "1"]),
            bindsnoop: argv(&["bindsnoop", "-p", PID_PLACEHOLDER]),
            tcpconnect: argv(&["tcpconnect", "-p", PID_PLACEHOLDER]),
        }
    }
}

impl DetectorConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs(self.cycle_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl ProfilerConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms.max(1))
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    pub fn host_sample_interval(&self) -> Duration {
        Duration::from_millis(self.host_sample_interval_ms.max(1))
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let percents = [
            ("detector.tree.cpu_threshold_percent", self.detector.tree.cpu_threshold_percent),
            ("detector.trigger_cpu_percent", self.detector.trigger_cpu_percent),
        ];
        for (key, value) in percents {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!("{} must be a non-negative number", key)));
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "minewatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Loads `path` (or the default location), falling back to defaults when
    /// the file is missing or unreadable.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Config::default();
        }
        Config::load(&path).unwrap_or_else(|e| {
            warn!("Failed to load config {:?}: {}, using defaults", path, e);
            Config::default()
        })
    }
}
