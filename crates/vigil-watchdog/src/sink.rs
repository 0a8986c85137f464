//! Observability sinks
//!
//! Where the scheduler reports watchdogs that exhausted their retry budget.

use crate::region::RegionPath;
use crate::scheduler::WatchdogId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Details of a watchdog that was disabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledReport {
    /// Watchdog id
    pub id: WatchdogId,
    /// Watchdog name
    pub name: String,
    /// Region it repaired
    pub region: RegionPath,
    /// Consecutive failures at the time it was disabled
    pub failures: u32,
    /// Last repair error
    pub last_error: String,
}

/// Receiver of scheduler health signals
pub trait ObservabilitySink: Send + Sync {
    /// A watchdog exhausted its retry budget
    fn watchdog_disabled(&self, report: &DisabledReport);
}

/// Sink that logs through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn watchdog_disabled(&self, report: &DisabledReport) {
        tracing::error!(
            watchdog = %report.name,
            region = %report.region,
            failures = report.failures,
            "watchdog disabled: {}",
            report.last_error
        );
    }
}

/// Sink that keeps every report in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<DisabledReport>>,
}

impl CollectingSink {
    /// Create empty sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports received so far
    #[must_use]
    pub fn reports(&self) -> Vec<DisabledReport> {
        self.reports.lock().clone()
    }
}

impl ObservabilitySink for CollectingSink {
    fn watchdog_disabled(&self, report: &DisabledReport) {
        TracingSink.watchdog_disabled(report);
        self.reports.lock().push(report.clone());
    }
}
