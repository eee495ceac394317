//! Single-process observation window
//!
//! Starts the four probes and the host sampling loop together, waits for
//! all of them, then hands their owned results to the reducer. Nothing is
//! shared between the tasks while they run.

use crate::collector::{HostCounters, ProcessCollector};
use crate::config::ProfilerConfig;
use crate::error::{Error, Result};
use crate::probe::{
    BindSnoop, BioPattern, CacheStat, ProbeCommand, ProbeGrammar, ProbeRun, ProbeRunner, TcpConnect,
};
use crate::reducer::{reduce, MetricsReport, ObservationWindow};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

/// CPU-idle and RAM-used percentages, one pair per host sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSamples {
    pub cpu_idle: Vec<f64>,
    pub ram_used: Vec<f64>,
}

pub struct Profiler<C> {
    collector: Arc<C>,
    config: ProfilerConfig,
}

impl<C> Profiler<C>
where
    C: ProcessCollector + HostCounters + 'static,
{
    pub fn new(collector: C, config: ProfilerConfig) -> Self {
        Self {
            collector: Arc::new(collector),
            config,
        }
    }

    pub async fn profile(&self, pid: u32, duration: Duration) -> Result<MetricsReport> {
        let window = self.observe(pid, duration).await?;
        Ok(reduce(&window))
    }

    /// Runs the observation window for `pid`. Fails only if `pid` does not
    /// exist at startup; every other fault degrades to zeros.
    pub async fn observe(&self, pid: u32, duration: Duration) -> Result<ObservationWindow> {
        if !self.collector.process_exists(pid) {
            return Err(Error::ProcessNotFound(pid));
        }
        info!(pid, duration_secs = duration.as_secs_f64(), "starting observation window");

        let start_process_count = self.collector.processes_created().unwrap_or(0);

        let runner = ProbeRunner::from_config(&self.config);
        let probes = &self.config.probes;
        let cache = spawn_probe::<CacheStat>(runner, &probes.cachestat, pid, duration);
        let bio = spawn_probe::<BioPattern>(runner, &probes.biopattern, pid, duration);
        let binds = spawn_probe::<BindSnoop>(runner, &probes.bindsnoop, pid, duration);
        let connects = spawn_probe::<TcpConnect>(runner, &probes.tcpconnect, pid, duration);
        let host = tokio::spawn(sample_host(
            Arc::clone(&self.collector),
            duration,
            self.config.host_sample_interval(),
        ));

        let (cache, bio, binds, connects, host) = tokio::join!(cache, bio, binds, connects, host);

        let end_process_count = self.collector.processes_created().unwrap_or(start_process_count);
        let host = host.unwrap_or_else(|e| {
            error!("host sampling task failed: {}", e);
            HostSamples::default()
        });

        Ok(ObservationWindow {
            cache: joined(cache),
            bio: joined(bio),
            binds: joined(binds),
            connects: joined(connects),
            meminfo: self.collector.meminfo().unwrap_or_default(),
            start_process_count,
            end_process_count,
            duration,
            cpu_idle_samples: host.cpu_idle,
            ram_used_samples: host.ram_used,
        })
    }
}

fn spawn_probe<G: ProbeGrammar>(
    runner: ProbeRunner,
    argv: &[String],
    pid: u32,
    duration: Duration,
) -> JoinHandle<ProbeRun<G>> {
    let command = ProbeCommand::from_argv(argv, pid);
    tokio::spawn(async move {
        match command {
            Some(command) => runner.run::<G>(&command, duration).await,
            None => {
                warn!(probe = G::NAME, "no command configured, skipping");
                ProbeRun::empty()
            }
        }
    })
}

fn joined<G: ProbeGrammar>(result: std::result::Result<ProbeRun<G>, JoinError>) -> G {
    match result {
        Ok(run) => run.grammar,
        Err(e) => {
            error!(probe = G::NAME, "probe task failed: {}", e);
            G::default()
        }
    }
}

/// Samples CPU-idle % (over one `interval`) and RAM-used % until `duration` elapses.
pub async fn sample_host<C: ProcessCollector + HostCounters>(
    collector: Arc<C>,
    duration: Duration,
    interval: Duration,
) -> HostSamples {
    let start = Instant::now();
    let mut samples = HostSamples::default();
    while start.elapsed() < duration {
        let before = collector.cpu_times();
        tokio::time::sleep(interval).await;
        let after = collector.cpu_times();

        if let (Some(before), Some(after)) = (before, after) {
            samples.cpu_idle.push(after.idle_percent_since(&before));
        }
        if let Some(mem) = collector.meminfo() {
            samples.ram_used.push(mem.used_percent());
        }
    }
    samples
}
