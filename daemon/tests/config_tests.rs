use minewatch_daemon::config::{Config, PID_PLACEHOLDER};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Test default config values
#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.detector.cycle_delay(), Duration::from_secs(5));
    assert_eq!(config.detector.poll_interval(), Duration::from_secs(1));
    assert_eq!(config.detector.sample_interval(), Duration::from_secs(1));
    assert_eq!(config.detector.tree.cpu_threshold_percent, 100.0);
    assert_eq!(config.detector.tree.min_children, 3);
    assert_eq!(config.detector.trigger_cpu_percent, 80.0);
    assert_eq!(config.profiler.backoff(), Duration::from_millis(100));
    assert_eq!(config.profiler.probes.cachestat, vec!["cachestat", "1"]);
    assert_eq!(config.profiler.probes.bindsnoop[2], PID_PLACEHOLDER);
    assert!(!config.notification.enabled);
}

/// Test that a partial TOML file overrides only what it names
#[test]
fn test_load_from_toml() {
    let toml_content = r#"
[detector]
cycle_delay_secs = 2
trigger_cpu_percent = 60.0

[detector.tree]
cpu_threshold_percent = 150.0
min_children = 5

[profiler]
backoff_ms = 50

[profiler.probes]
tcpconnect = ["/usr/share/bcc/tools/tcpconnect", "-p", "{pid}"]

[notification]
enabled = true
"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml_content.as_bytes()).unwrap();
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.detector.cycle_delay_secs, 2);
    assert_eq!(config.detector.trigger_cpu_percent, 60.0);
    assert_eq!(config.detector.tree.cpu_threshold_percent, 150.0);
    assert_eq!(config.detector.tree.min_children, 5);
    // Unset keys keep their defaults.
    assert_eq!(config.detector.sample_interval_ms, 1000);
    assert_eq!(config.profiler.backoff_ms, 50);
    assert_eq!(config.profiler.terminate_grace_ms, 500);
    assert_eq!(config.profiler.probes.tcpconnect[0], "/usr/share/bcc/tools/tcpconnect");
    assert_eq!(config.profiler.probes.cachestat, vec!["cachestat", "1"]);
    assert!(config.notification.enabled);
}

/// Test that a saved config loads back
#[test]
fn test_save_config() {
    let mut config = Config::default();
    config.detector.tree.min_children = 7;
    let file = NamedTempFile::new().unwrap();
    config.save(file.path()).unwrap();
    let loaded = Config::load(file.path()).unwrap();
    assert_eq!(loaded.detector.tree.min_children, 7);
    assert_eq!(loaded.profiler.probes.biopattern, config.profiler.probes.biopattern);
}

/// Test that malformed TOML is an error
#[test]
fn test_invalid_config_is_an_error() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[detector\ncycle_delay_secs = ").unwrap();
    assert!(Config::load(file.path()).is_err());
}

/// Test that missing or broken files fall back to defaults
#[test]
fn test_load_or_default_falls_back() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"detector = 3").unwrap();
    let config = Config::load_or_default(Some(file.path()));
    assert_eq!(config.detector.tree.min_children, 3);

    let missing = std::env::temp_dir().join("minewatch-does-not-exist.toml");
    let config = Config::load_or_default(Some(&missing));
    assert_eq!(config.detector.cycle_delay_secs, 5);
}

/// Test that a negative threshold fails validation
#[test]
fn test_negative_threshold_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[detector.tree]\ncpu_threshold_percent = -1.0\n").unwrap();
    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("cpu_threshold_percent"));
}
