//! Watchdog trait and descriptors
//!
//! A watchdog is a named detect-and-repair routine bound to one region.
//! [`Watchdog::detect`] must be side-effect free with respect to the shared
//! state; [`Watchdog::repair`] runs to completion in one call.

use crate::region::RegionPath;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Default polling interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Default number of consecutive failed repairs before a watchdog is disabled
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// What caused a detection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// `DOMContentLoaded`
    DomReady,
    /// Window `load`
    WindowLoad,
    /// Periodic timer tick
    Timer,
    /// Observed DOM mutation batch
    Mutation,
    /// Uncaught global error
    GlobalError,
}

impl Display for Trigger {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DomReady => "dom-ready",
            Self::WindowLoad => "window-load",
            Self::Timer => "timer",
            Self::Mutation => "mutation",
            Self::GlobalError => "global-error",
        };
        f.write_str(name)
    }
}

/// Set of triggers a watchdog subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct TriggerSet {
    /// Run on `DOMContentLoaded`
    pub on_dom_ready: bool,
    /// Run on window `load`
    pub on_window_load: bool,
    /// Run on timer ticks (subject to the watchdog interval)
    pub on_timer: bool,
    /// Run on mutation batches
    pub on_mutation: bool,
    /// Run on uncaught errors
    pub on_global_error: bool,
}

impl TriggerSet {
    /// Empty set
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Every trigger
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self {
            on_dom_ready: true,
            on_window_load: true,
            on_timer: true,
            on_mutation: true,
            on_global_error: true,
        }
    }

    /// Add a trigger
    #[must_use]
    pub fn with(mut self, trigger: Trigger) -> Self {
        match trigger {
            Trigger::DomReady => self.on_dom_ready = true,
            Trigger::WindowLoad => self.on_window_load = true,
            Trigger::Timer => self.on_timer = true,
            Trigger::Mutation => self.on_mutation = true,
            Trigger::GlobalError => self.on_global_error = true,
        }
        self
    }

    /// Check membership
    #[must_use]
    pub fn contains(&self, trigger: Trigger) -> bool {
        match trigger {
            Trigger::DomReady => self.on_dom_ready,
            Trigger::WindowLoad => self.on_window_load,
            Trigger::Timer => self.on_timer,
            Trigger::Mutation => self.on_mutation,
            Trigger::GlobalError => self.on_global_error,
        }
    }

    /// Check if no trigger is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::none()
    }
}

impl FromIterator<Trigger> for TriggerSet {
    fn from_iter<I: IntoIterator<Item = Trigger>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

/// Static description of a watchdog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogSpec {
    /// Unique name
    pub name: String,
    /// Region the repair writes to
    pub region: RegionPath,
    /// Higher wins when several watchdogs detect on conflicting regions
    pub priority: i32,
    /// Minimum time between timer-driven checks
    pub interval: Duration,
    /// Subscribed triggers
    pub triggers: TriggerSet,
    /// Consecutive failed repairs tolerated before disabling
    pub max_consecutive_failures: u32,
}

impl WatchdogSpec {
    /// Create a spec with default interval, priority 0 and no triggers
    #[must_use]
    pub fn new(name: impl Into<String>, region: RegionPath) -> Self {
        Self {
            name: name.into(),
            region,
            priority: 0,
            interval: DEFAULT_INTERVAL,
            triggers: TriggerSet::none(),
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }

    /// With priority
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// With polling interval
    #[inline]
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Subscribe to a trigger
    #[inline]
    #[must_use]
    pub fn on(mut self, trigger: Trigger) -> Self {
        self.triggers = self.triggers.with(trigger);
        self
    }

    /// With retry budget
    #[inline]
    #[must_use]
    pub fn with_max_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }
}

/// Result of a successful repair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOutcome {
    /// Human-readable summary
    pub summary: String,
}

impl RepairOutcome {
    /// Create outcome
    #[inline]
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

/// Repair failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepairError {
    /// A container the repair needs is missing
    #[error("repair target missing: {0}")]
    MissingTarget(String),

    /// Repair failed for another reason
    #[error("repair failed: {0}")]
    Failed(String),

    /// Repair panicked
    #[error("repair panicked: {0}")]
    Panicked(String),
}

impl RepairError {
    /// Wrap any displayable error
    #[inline]
    pub fn other(error: impl Display) -> Self {
        Self::Failed(error.to_string())
    }
}

/// Detect-and-repair routine over shared state `S`
pub trait Watchdog<S>: Send {
    /// Static description
    fn spec(&self) -> &WatchdogSpec;

    /// Check whether the region needs repair at time `now` (page time)
    fn detect(&mut self, state: &S, now: Duration) -> bool;

    /// Repair the region
    ///
    /// # Errors
    /// Returns [`RepairError`] when the repair could not be completed.
    fn repair(&mut self, state: &mut S, now: Duration) -> Result<RepairOutcome, RepairError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_set_membership() {
        let set: TriggerSet = [Trigger::Timer, Trigger::WindowLoad].into_iter().collect();
        assert!(set.contains(Trigger::Timer));
        assert!(set.contains(Trigger::WindowLoad));
        assert!(!set.contains(Trigger::Mutation));
        assert!(TriggerSet::none().is_empty());
        assert!(!TriggerSet::all().is_empty());
    }

    #[test]
    fn spec_builder() {
        let spec = WatchdogSpec::new("stall", RegionPath::body())
            .with_priority(5)
            .with_interval(Duration::from_millis(250))
            .on(Trigger::Timer)
            .with_max_failures(1);
        assert_eq!(spec.priority, 5);
        assert_eq!(spec.interval, Duration::from_millis(250));
        assert!(spec.triggers.contains(Trigger::Timer));
        assert_eq!(spec.max_consecutive_failures, 1);
    }
}
