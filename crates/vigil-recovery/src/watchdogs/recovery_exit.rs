use super::WatchdogSettings;
use crate::page::PageState;
use crate::templates::RECOVERY_BANNER_ID;
use std::time::Duration;
use vigil_watchdog::{RegionPath, RepairError, RepairOutcome, Trigger, Watchdog, WatchdogSpec};

/// Leaves recovery mode once the real `ui` module is bound
#[derive(Debug, Clone)]
pub struct RecoveryExitWatchdog {
    spec: WatchdogSpec,
}

impl RecoveryExitWatchdog {
    /// Create timer-driven watchdog, priority 50
    #[must_use]
    pub fn new(settings: &WatchdogSettings) -> Self {
        Self {
            spec: WatchdogSpec::new("recovery-mode-exit", RegionPath::body())
                .with_priority(50)
                .with_interval(settings.poll_interval())
                .with_max_failures(settings.max_consecutive_failures)
                .on(Trigger::Timer),
        }
    }
}

impl Watchdog<PageState> for RecoveryExitWatchdog {
    fn spec(&self) -> &WatchdogSpec {
        &self.spec
    }

    fn detect(&mut self, state: &PageState, _now: Duration) -> bool {
        state.in_recovery() && state.modules.is_real("ui")
    }

    fn repair(&mut self, state: &mut PageState, _now: Duration) -> Result<RepairOutcome, RepairError> {
        let ui = state
            .modules
            .get("ui")
            .ok_or_else(|| RepairError::MissingTarget("ui module".into()))?;

        let doc = state.doc_mut();
        if let Some(banner) = doc.element_by_id(RECOVERY_BANNER_ID) {
            doc.remove(banner).map_err(RepairError::other)?;
        }
        ui.render(doc).map_err(RepairError::other)?;
        state.exit_recovery();
        Ok(RepairOutcome::new("left recovery mode"))
    }
}
