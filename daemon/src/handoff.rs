//! Latest-value handoff between the detector worker and its consumer

use crate::detector::CycleReport;
use tokio::sync::watch;

/// Creates a single-slot channel. Publishing overwrites any report the
/// consumer has not taken yet.
pub fn channel() -> (ReportSender, ReportReceiver) {
    let (tx, rx) = watch::channel(None);
    (ReportSender { tx }, ReportReceiver { rx })
}

pub struct ReportSender {
    tx: watch::Sender<Option<CycleReport>>,
}

impl ReportSender {
    /// Never blocks. Returns false once the consumer is gone.
    pub fn publish(&self, report: CycleReport) -> bool {
        self.tx.send_replace(Some(report));
        !self.tx.is_closed()
    }
}

pub struct ReportReceiver {
    rx: watch::Receiver<Option<CycleReport>>,
}

impl ReportReceiver {
    /// Returns the newest unseen report, or `None` if nothing new arrived
    /// since the last call. A report is handed out at most once.
    pub fn try_take(&mut self) -> Option<CycleReport> {
        let latest = self.rx.borrow_and_update();
        if latest.has_changed() {
            (*latest).clone()
        } else {
            None
        }
    }

    /// True once the producer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}
