//! Built-in page watchdogs
//!
//! | name | triggers | priority | region |
//! |---|---|---|---|
//! | `dashboard-stall-poll` | timer | 10 | `body/mainContent/tabContent` |
//! | `dashboard-stall-observer` | mutation | 20 | `body/mainContent/tabContent` |
//! | `recovery-mode-exit` | timer | 50 | `body` |
//! | `white-screen` | window load, timer | 100 | `body` |

mod recovery_exit;
mod stall;
mod white_screen;

pub use recovery_exit::RecoveryExitWatchdog;
pub use stall::DashboardStallWatchdog;
pub use white_screen::WhiteScreenWatchdog;

use crate::page::PageState;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vigil_dom::ids::{MAIN_CONTENT, TAB_CONTENT};
use vigil_watchdog::{RegionPath, Watchdog};

/// Settings shared by the built-in watchdogs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogSettings {
    /// How long a loading indicator may persist on the dashboard
    pub stall_threshold_ms: u64,
    /// Classes that mark a loading indicator
    pub loading_classes: Vec<String>,
    /// Below this many visible characters the body counts as blank
    pub white_screen_min_text: usize,
    /// View the stall detectors watch and the shell opens on
    pub dashboard_view: String,
    /// Timer interval of the polling watchdogs
    pub poll_interval_ms: u64,
    /// Consecutive failures before a built-in watchdog is disabled
    pub max_consecutive_failures: u32,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            stall_threshold_ms: 5000,
            loading_classes: vec!["loading".into(), "spinner".into(), "loading-indicator".into()],
            white_screen_min_text: 20,
            dashboard_view: "dashboard".into(),
            poll_interval_ms: 1000,
            max_consecutive_failures: 3,
        }
    }
}

impl WatchdogSettings {
    /// Stall threshold as a duration
    #[inline]
    #[must_use]
    pub fn stall_threshold(&self) -> Duration {
        Duration::from_millis(self.stall_threshold_ms)
    }

    /// Poll interval as a duration
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `body/mainContent/tabContent`
#[must_use]
pub fn tab_content_region() -> RegionPath {
    RegionPath::body()
        .child(MAIN_CONTENT)
        .and_then(|r| r.child(TAB_CONTENT))
        .unwrap_or_else(|_| RegionPath::body())
}

/// All built-in watchdogs, ready to register
#[must_use]
pub fn builtin_watchdogs(settings: &WatchdogSettings) -> Vec<Box<dyn Watchdog<PageState>>> {
    vec![
        Box::new(DashboardStallWatchdog::poll(settings)),
        Box::new(DashboardStallWatchdog::observer(settings)),
        Box::new(RecoveryExitWatchdog::new(settings)),
        Box::new(WhiteScreenWatchdog::new(settings)),
    ]
}
