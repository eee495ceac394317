//! Desktop notification on triggered reports

use crate::detector::CycleReport;
use notify_rust::Notification;
use tracing::warn;

pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Sends a notification for triggered reports. Returns whether one was sent.
    pub fn notify(&self, report: &CycleReport) -> bool {
        if !self.enabled || !report.triggered {
            return false;
        }
        let body = report
            .abnormal_parents
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let summary = format!("minewatch: CPU {:.2}%", report.overall_cpu_percent);
        match send_notification(&summary, &body) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send notification: {}", e);
                false
            }
        }
    }
}

fn send_notification(summary: &str, body: &str) -> Result<(), notify_rust::error::Error> {
    Notification::new()
        .summary(summary)
        .body(body)
        .appname("minewatch")
        .show()?;
    Ok(())
}
