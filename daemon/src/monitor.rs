//! Background detector cycle

use crate::collector::ProcessCollector;
use crate::config::DetectorConfig;
use crate::detector::{CycleReport, Detector, ProcessTreeDetector};
use crate::handoff::{self, ReportReceiver, ReportSender};
use crate::sampler::Sampler;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct Monitor<C> {
    sampler: Sampler<C>,
    detector: ProcessTreeDetector,
    config: DetectorConfig,
}

impl<C: ProcessCollector + 'static> Monitor<C> {
    pub fn new(collector: C, config: DetectorConfig) -> Self {
        Self {
            sampler: Sampler::new(collector),
            detector: ProcessTreeDetector::new(config.tree),
            config,
        }
    }

    /// Sample, then aggregate.
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle = self.sampler.sample(self.config.sample_interval()).await;
        let abnormal = self.detector.detect(&cycle.processes);
        debug!(
            processes = cycle.processes.len(),
            overall_cpu = cycle.overall_cpu_percent,
            abnormal = abnormal.len(),
            "cycle complete"
        );
        let report = CycleReport::new(
            cycle.overall_cpu_percent,
            abnormal,
            self.config.trigger_cpu_percent,
        );
        if report.triggered {
            warn!(
                overall_cpu = report.overall_cpu_percent,
                trees = report.abnormal_parents.len(),
                "abnormal process trees under high CPU load"
            );
        }
        report
    }

    /// Runs cycles until the consumer drops its receiver.
    pub async fn run(self, sender: ReportSender) {
        loop {
            let report = self.run_cycle().await;
            if !sender.publish(report) {
                info!("Report consumer gone, stopping detector loop");
                return;
            }
            tokio::time::sleep(self.config.cycle_delay()).await;
        }
    }

    /// Starts the loop on its own task and returns the consumer end of the handoff.
    pub fn spawn(self) -> (JoinHandle<()>, ReportReceiver) {
        let (sender, receiver) = handoff::channel();
        let handle = tokio::spawn(self.run(sender));
        (handle, receiver)
    }
}
