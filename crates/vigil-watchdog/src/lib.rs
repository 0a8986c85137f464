//! Vigil Watchdog Scheduler
//!
//! One scheduler for every detect-and-repair routine on a page, replacing
//! independently racing pollers and observers.
//!
//! # Core Concepts
//!
//! - [`Watchdog`]: detect/repair trait over a shared state
//! - [`WatchdogSpec`]: name, [`RegionPath`], priority, interval, triggers, retry budget
//! - [`WatchdogScheduler`]: detection cycles with per-region mutual exclusion
//! - [`RegionLocks`]: in-flight repair tracking with RAII guards
//! - [`ObservabilitySink`]: where disabled watchdogs are reported
//!
//! # Guarantees
//!
//! - At most one repair per region (and its nested regions) per cycle;
//!   the highest-priority detecting watchdog wins, the rest are
//!   [`Outcome::Preempted`]
//! - A repair is never run when its predicate is false
//! - A failing or panicking repair never unregisters the watchdog; it is
//!   disabled only after `max_consecutive_failures` failures in a row
//!
//! # Example
//!
//! ```rust,ignore
//! use vigil_watchdog::{Trigger, WatchdogScheduler};
//!
//! let mut scheduler = WatchdogScheduler::new();
//! let id = scheduler.register(Box::new(my_watchdog))?;
//! let report = scheduler.run_cycle(Trigger::Timer, now, &mut page);
//! for entry in report.repaired() {
//!     println!("{} repaired {}", entry.name, entry.region);
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod lock;
mod region;
mod scheduler;
mod sink;
mod watchdog;

pub use error::WatchdogError;
pub use lock::{RegionGuard, RegionLocks};
pub use region::{RegionError, RegionPath};
pub use scheduler::{
    CycleEntry, CycleReport, Outcome, WatchdogId, WatchdogInfo, WatchdogScheduler, WatchdogStatus,
};
pub use sink::{CollectingSink, DisabledReport, ObservabilitySink, TracingSink};
pub use watchdog::{
    RepairError, RepairOutcome, Trigger, TriggerSet, Watchdog, WatchdogSpec, DEFAULT_INTERVAL,
    DEFAULT_MAX_CONSECUTIVE_FAILURES,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
