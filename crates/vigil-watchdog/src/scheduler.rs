//! Watchdog scheduler
//!
//! Runs every registered watchdog against one shared state and serializes
//! repairs by region:
//!
//! 1. Select active watchdogs subscribed to the cycle's trigger (timer
//!    watchdogs only once their interval has elapsed)
//! 2. Evaluate `detect` for each
//! 3. Order detected candidates by priority (desc), then registration order
//! 4. Run a candidate's repair only if no conflicting region was already
//!    repaired this cycle and no conflicting region lock is held
//!
//! A failing repair counts against the watchdog's retry budget; once
//! exhausted the watchdog is disabled and reported to the
//! [`ObservabilitySink`].

use crate::error::WatchdogError;
use crate::lock::RegionLocks;
use crate::region::RegionPath;
use crate::sink::{DisabledReport, ObservabilitySink, TracingSink};
use crate::watchdog::{RepairError, RepairOutcome, Trigger, Watchdog, WatchdogSpec};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Reverse;
use std::fmt::{self, Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Scheduler-assigned watchdog identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WatchdogId(u64);

impl WatchdogId {
    /// Holder for repairs made outside the scheduler; never assigned by
    /// [`WatchdogScheduler::register`]
    pub const EXTERNAL: Self = Self(0);

    /// Wrap a raw id
    #[inline]
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id
    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl Display for WatchdogId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if *self == Self::EXTERNAL {
            f.write_str("external")
        } else {
            write!(f, "wd-{}", self.0)
        }
    }
}

/// Lifecycle state of a registered watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchdogStatus {
    /// Participates in cycles
    Active,
    /// Retry budget exhausted; skipped until re-enabled
    Disabled,
}

/// What happened to one watchdog during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Predicate was false; nothing to do
    Clean,
    /// Repair ran and succeeded
    Repaired(RepairOutcome),
    /// A higher-priority watchdog repaired a conflicting region this cycle
    Preempted {
        /// Winning watchdog
        by: WatchdogId,
    },
    /// A conflicting region has a repair in flight
    RegionBusy {
        /// Current lock holder
        holder: WatchdogId,
    },
    /// Repair failed; watchdog stays active
    Failed {
        /// Repair error
        error: RepairError,
        /// Consecutive failures so far
        consecutive: u32,
    },
    /// Repair failed and exhausted the retry budget
    Disabled {
        /// Repair error
        error: RepairError,
    },
}

impl Outcome {
    /// Check whether a repair function was executed
    #[inline]
    #[must_use]
    pub fn repair_attempted(&self) -> bool {
        matches!(
            self,
            Self::Repaired(_) | Self::Failed { .. } | Self::Disabled { .. }
        )
    }
}

/// Per-watchdog line of a [`CycleReport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleEntry {
    /// Watchdog id
    pub id: WatchdogId,
    /// Watchdog name
    pub name: String,
    /// Watchdog region
    pub region: RegionPath,
    /// Outcome
    pub outcome: Outcome,
}

/// Result of one detection cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Monotonic cycle number
    pub cycle: u64,
    /// Trigger that started the cycle
    pub trigger: Trigger,
    /// Page time of the cycle
    pub now: Duration,
    /// One entry per evaluated watchdog, in registration order
    pub entries: Vec<CycleEntry>,
}

impl CycleReport {
    /// Outcome for a watchdog, if it was evaluated
    #[must_use]
    pub fn outcome(&self, id: WatchdogId) -> Option<&Outcome> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.outcome)
    }

    /// Entries whose repair ran (successfully or not)
    pub fn attempted(&self) -> impl Iterator<Item = &CycleEntry> {
        self.entries.iter().filter(|e| e.outcome.repair_attempted())
    }

    /// Entries whose repair succeeded
    pub fn repaired(&self) -> impl Iterator<Item = &CycleEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Repaired(_)))
    }

    /// Check whether no repair was attempted
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.attempted().next().is_none()
    }
}

/// Snapshot of a registered watchdog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogInfo {
    /// Watchdog id
    pub id: WatchdogId,
    /// Static description
    pub spec: WatchdogSpec,
    /// Lifecycle state
    pub status: WatchdogStatus,
    /// Current failure streak
    pub consecutive_failures: u32,
    /// Successful repairs
    pub repairs: u64,
    /// Failed repairs
    pub failures: u64,
    /// Page time of the last timer-driven check
    pub last_checked: Option<Duration>,
}

struct Entry<S> {
    id: WatchdogId,
    watchdog: Box<dyn Watchdog<S>>,
    status: WatchdogStatus,
    consecutive_failures: u32,
    repairs: u64,
    failures: u64,
    last_checked: Option<Duration>,
}

impl<S> Entry<S> {
    fn info(&self) -> WatchdogInfo {
        WatchdogInfo {
            id: self.id,
            spec: self.watchdog.spec().clone(),
            status: self.status,
            consecutive_failures: self.consecutive_failures,
            repairs: self.repairs,
            failures: self.failures,
            last_checked: self.last_checked,
        }
    }

    fn line(&self, outcome: Outcome) -> CycleEntry {
        let spec = self.watchdog.spec();
        CycleEntry {
            id: self.id,
            name: spec.name.clone(),
            region: spec.region.clone(),
            outcome,
        }
    }

    fn due(&self, trigger: Trigger, now: Duration) -> bool {
        let spec = self.watchdog.spec();
        if self.status != WatchdogStatus::Active || !spec.triggers.contains(trigger) {
            return false;
        }
        match (trigger, self.last_checked) {
            (Trigger::Timer, Some(last)) => now.saturating_sub(last) >= spec.interval,
            _ => true,
        }
    }
}

/// Single scheduler for every watchdog on a page
pub struct WatchdogScheduler<S> {
    entries: Vec<Entry<S>>,
    next_id: u64,
    cycle: u64,
    locks: Arc<RegionLocks>,
    sink: Arc<dyn ObservabilitySink>,
}

impl<S> std::fmt::Debug for WatchdogScheduler<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchdogScheduler")
            .field("watchdogs", &self.entries.len())
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl<S> Default for WatchdogScheduler<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> WatchdogScheduler<S> {
    /// Create scheduler reporting to [`TracingSink`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Create scheduler with a custom sink
    #[must_use]
    pub fn with_sink(sink: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            cycle: 0,
            locks: RegionLocks::new(),
            sink,
        }
    }

    /// Shared lock table (repairs outside the scheduler should take it too)
    #[inline]
    #[must_use]
    pub fn locks(&self) -> &Arc<RegionLocks> {
        &self.locks
    }

    /// Register a watchdog
    ///
    /// # Errors
    /// - `WatchdogError::DuplicateName` if the name is taken
    /// - `WatchdogError::NoTriggers` if the spec subscribes to nothing
    pub fn register(&mut self, watchdog: Box<dyn Watchdog<S>>) -> Result<WatchdogId, WatchdogError> {
        let spec = watchdog.spec();
        if spec.triggers.is_empty() {
            return Err(WatchdogError::NoTriggers(spec.name.clone()));
        }
        if self.id_of(&spec.name).is_some() {
            return Err(WatchdogError::DuplicateName(spec.name.clone()));
        }
        let id = WatchdogId(self.next_id);
        self.next_id += 1;
        tracing::debug!(
            watchdog = %spec.name,
            region = %spec.region,
            priority = spec.priority,
            "registered watchdog {id}"
        );
        self.entries.push(Entry {
            id,
            watchdog,
            status: WatchdogStatus::Active,
            consecutive_failures: 0,
            repairs: 0,
            failures: 0,
            last_checked: None,
        });
        Ok(id)
    }

    /// Remove a watchdog, returning it
    ///
    /// # Errors
    /// Returns `WatchdogError::NotFound` for unknown ids.
    pub fn unregister(&mut self, id: WatchdogId) -> Result<Box<dyn Watchdog<S>>, WatchdogError> {
        let idx = self.index_of(id).ok_or(WatchdogError::NotFound(id))?;
        let entry = self.entries.remove(idx);
        tracing::debug!(watchdog = %entry.watchdog.spec().name, "unregistered watchdog {id}");
        Ok(entry.watchdog)
    }

    /// Remove every watchdog
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Re-activate a disabled watchdog and reset its failure streak
    ///
    /// # Errors
    /// Returns `WatchdogError::NotFound` for unknown ids.
    pub fn enable(&mut self, id: WatchdogId) -> Result<(), WatchdogError> {
        let idx = self.index_of(id).ok_or(WatchdogError::NotFound(id))?;
        let entry = &mut self.entries[idx];
        entry.status = WatchdogStatus::Active;
        entry.consecutive_failures = 0;
        Ok(())
    }

    /// Look up a watchdog by name
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<WatchdogId> {
        self.entries
            .iter()
            .find(|e| e.watchdog.spec().name == name)
            .map(|e| e.id)
    }

    /// Snapshot of one watchdog
    #[must_use]
    pub fn info(&self, id: WatchdogId) -> Option<WatchdogInfo> {
        self.index_of(id).map(|idx| self.entries[idx].info())
    }

    /// Snapshots of all watchdogs in registration order
    #[must_use]
    pub fn infos(&self) -> Vec<WatchdogInfo> {
        self.entries.iter().map(Entry::info).collect()
    }

    /// Lifecycle state of a watchdog
    #[must_use]
    pub fn status(&self, id: WatchdogId) -> Option<WatchdogStatus> {
        self.index_of(id).map(|idx| self.entries[idx].status)
    }

    /// Number of registered watchdogs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no watchdog is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cycles run so far
    #[inline]
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    fn index_of(&self, id: WatchdogId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Run one detection cycle
    pub fn run_cycle(&mut self, trigger: Trigger, now: Duration, state: &mut S) -> CycleReport {
        self.run_cycle_after(trigger, now, state, &[])
    }

    /// Run one detection cycle after an outside repair of `claimed` regions
    ///
    /// Candidates on a conflicting region are reported as
    /// [`Outcome::Preempted`] by [`WatchdogId::EXTERNAL`].
    pub fn run_cycle_after(
        &mut self,
        trigger: Trigger,
        now: Duration,
        state: &mut S,
        claimed: &[RegionPath],
    ) -> CycleReport {
        self.cycle += 1;
        let mut lines: Vec<(usize, CycleEntry)> = Vec::new();
        let mut candidates: Vec<usize> = Vec::new();

        for (idx, entry) in self.entries.iter_mut().enumerate() {
            if !entry.due(trigger, now) {
                continue;
            }
            if trigger == Trigger::Timer {
                entry.last_checked = Some(now);
            }
            if entry.watchdog.detect(state, now) {
                tracing::debug!(watchdog = %entry.watchdog.spec().name, %trigger, "fault detected");
                candidates.push(idx);
            } else {
                lines.push((idx, entry.line(Outcome::Clean)));
            }
        }

        candidates.sort_by_key(|idx| (Reverse(self.entries[*idx].watchdog.spec().priority), *idx));

        let mut repaired: Vec<(RegionPath, WatchdogId)> =
            claimed.iter().map(|region| (region.clone(), WatchdogId::EXTERNAL)).collect();
        for idx in candidates {
            let id = self.entries[idx].id;
            let region = self.entries[idx].watchdog.spec().region.clone();

            if let Some((_, by)) = repaired.iter().find(|(r, _)| r.conflicts_with(&region)) {
                tracing::info!(
                    watchdog = %self.entries[idx].watchdog.spec().name,
                    %region,
                    "repair skipped: region already repaired this cycle by {by}"
                );
                lines.push((idx, self.entries[idx].line(Outcome::Preempted { by: *by })));
                continue;
            }

            let guard = match self.locks.try_acquire(&region, id) {
                Ok(guard) => guard,
                Err(holder) => {
                    tracing::info!(
                        watchdog = %self.entries[idx].watchdog.spec().name,
                        %region,
                        "repair skipped: region locked by {holder}"
                    );
                    lines.push((idx, self.entries[idx].line(Outcome::RegionBusy { holder })));
                    continue;
                }
            };
            let outcome = self.execute(idx, now, state);
            drop(guard);

            repaired.push((region, id));
            lines.push((idx, self.entries[idx].line(outcome)));
        }

        lines.sort_by_key(|(idx, _)| *idx);
        CycleReport {
            cycle: self.cycle,
            trigger,
            now,
            entries: lines.into_iter().map(|(_, line)| line).collect(),
        }
    }

    /// Run one watchdog's repair outside a cycle
    ///
    /// The predicate is re-evaluated first; when it is false this is a no-op
    /// returning [`Outcome::Clean`].
    ///
    /// # Errors
    /// - `WatchdogError::NotFound` for unknown ids
    /// - `WatchdogError::Disabled` if the retry budget is exhausted
    pub fn repair_now(
        &mut self,
        id: WatchdogId,
        now: Duration,
        state: &mut S,
    ) -> Result<Outcome, WatchdogError> {
        let idx = self.index_of(id).ok_or(WatchdogError::NotFound(id))?;
        if self.entries[idx].status == WatchdogStatus::Disabled {
            return Err(WatchdogError::Disabled(id));
        }
        if !self.entries[idx].watchdog.detect(state, now) {
            return Ok(Outcome::Clean);
        }
        let region = self.entries[idx].watchdog.spec().region.clone();
        let guard = match self.locks.try_acquire(&region, id) {
            Ok(guard) => guard,
            Err(holder) => return Ok(Outcome::RegionBusy { holder }),
        };
        let outcome = self.execute(idx, now, state);
        drop(guard);
        Ok(outcome)
    }

    fn execute(&mut self, idx: usize, now: Duration, state: &mut S) -> Outcome {
        let entry = &mut self.entries[idx];
        let result = catch_unwind(AssertUnwindSafe(|| entry.watchdog.repair(state, now)))
            .unwrap_or_else(|payload| Err(RepairError::Panicked(panic_message(payload.as_ref()))));

        let spec = entry.watchdog.spec();
        match result {
            Ok(outcome) => {
                entry.consecutive_failures = 0;
                entry.repairs += 1;
                tracing::info!(
                    watchdog = %spec.name,
                    region = %spec.region,
                    "repair applied: {}",
                    outcome.summary
                );
                Outcome::Repaired(outcome)
            }
            Err(error) => {
                entry.consecutive_failures += 1;
                entry.failures += 1;
                let budget = spec.max_consecutive_failures;
                if budget > 0 && entry.consecutive_failures >= budget {
                    entry.status = WatchdogStatus::Disabled;
                    let report = DisabledReport {
                        id: entry.id,
                        name: spec.name.clone(),
                        region: spec.region.clone(),
                        failures: entry.consecutive_failures,
                        last_error: error.to_string(),
                    };
                    self.sink.watchdog_disabled(&report);
                    Outcome::Disabled { error }
                } else {
                    tracing::warn!(
                        watchdog = %spec.name,
                        region = %spec.region,
                        consecutive = entry.consecutive_failures,
                        "repair failed: {error}"
                    );
                    Outcome::Failed {
                        error,
                        consecutive: entry.consecutive_failures,
                    }
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::sink::CollectingSink;
    use std::collections::HashMap;

    /// Shared state: region name -> "broken" flag, plus write log
    #[derive(Default)]
    struct Board {
        broken: HashMap<String, bool>,
        writes: Vec<String>,
    }

    struct Fixer {
        spec: WatchdogSpec,
        key: String,
        fail: bool,
    }

    impl Fixer {
        fn boxed(name: &str, region: &str, priority: i32) -> Box<Self> {
            Box::new(Self {
                spec: WatchdogSpec::new(name, region.parse().unwrap())
                    .with_priority(priority)
                    .on(Trigger::Timer)
                    .on(Trigger::Mutation),
                key: region.to_string(),
                fail: false,
            })
        }
    }

    impl Watchdog<Board> for Fixer {
        fn spec(&self) -> &WatchdogSpec {
            &self.spec
        }

        fn detect(&mut self, state: &Board, _now: Duration) -> bool {
            state.broken.get(&self.key).copied().unwrap_or(false)
        }

        fn repair(&mut self, state: &mut Board, _now: Duration) -> Result<RepairOutcome, RepairError> {
            if self.fail {
                return Err(RepairError::Failed("boom".into()));
            }
            state.broken.insert(self.key.clone(), false);
            state.writes.push(self.spec.name.clone());
            Ok(RepairOutcome::new("fixed"))
        }
    }

    fn board(broken: &[&str]) -> Board {
        Board {
            broken: broken.iter().map(|k| ((*k).to_string(), true)).collect(),
            writes: Vec::new(),
        }
    }

    #[test]
    fn register_rejects_duplicates_and_empty_triggers() {
        let mut scheduler = WatchdogScheduler::<Board>::new();
        scheduler.register(Fixer::boxed("a", "body", 0)).unwrap();
        assert_eq!(
            scheduler.register(Fixer::boxed("a", "body", 0)).unwrap_err(),
            WatchdogError::DuplicateName("a".into())
        );

        let mut silent = Fixer::boxed("silent", "body", 0);
        silent.spec.triggers = crate::watchdog::TriggerSet::none();
        assert!(matches!(
            scheduler.register(silent),
            Err(WatchdogError::NoTriggers(_))
        ));
    }

    #[test]
    fn highest_priority_wins_region() {
        let mut scheduler = WatchdogScheduler::<Board>::new();
        let low = scheduler.register(Fixer::boxed("low", "body/main", 1)).unwrap();
        let high = scheduler.register(Fixer::boxed("high", "body/main", 9)).unwrap();
        let mut state = board(&["body/main"]);

        let report = scheduler.run_cycle(Trigger::Timer, Duration::ZERO, &mut state);

        assert_eq!(state.writes, vec!["high".to_string()]);
        assert!(matches!(report.outcome(high), Some(Outcome::Repaired(_))));
        assert_eq!(report.outcome(low), Some(&Outcome::Preempted { by: high }));
    }

    #[test]
    fn disjoint_regions_both_repair() {
        let mut scheduler = WatchdogScheduler::<Board>::new();
        scheduler.register(Fixer::boxed("nav", "body/nav", 0)).unwrap();
        scheduler.register(Fixer::boxed("tabs", "body/tabs", 0)).unwrap();
        let mut state = board(&["body/nav", "body/tabs"]);

        let report = scheduler.run_cycle(Trigger::Mutation, Duration::ZERO, &mut state);
        assert_eq!(report.repaired().count(), 2);
    }

    #[test]
    fn timer_respects_interval() {
        let mut scheduler = WatchdogScheduler::<Board>::new();
        scheduler.register(Fixer::boxed("a", "body", 0)).unwrap();
        let mut state = board(&[]);

        let first = scheduler.run_cycle(Trigger::Timer, Duration::from_millis(0), &mut state);
        assert_eq!(first.entries.len(), 1);
        let early = scheduler.run_cycle(Trigger::Timer, Duration::from_millis(500), &mut state);
        assert!(early.entries.is_empty());
        let due = scheduler.run_cycle(Trigger::Timer, Duration::from_millis(1000), &mut state);
        assert_eq!(due.entries.len(), 1);
    }

    #[test]
    fn unsubscribed_trigger_is_ignored() {
        let mut scheduler = WatchdogScheduler::<Board>::new();
        scheduler.register(Fixer::boxed("a", "body", 0)).unwrap();
        let mut state = board(&["body"]);
        let report = scheduler.run_cycle(Trigger::GlobalError, Duration::ZERO, &mut state);
        assert!(report.entries.is_empty());
        assert!(state.writes.is_empty());
    }

    #[test]
    fn busy_region_is_skipped() {
        let mut scheduler = WatchdogScheduler::<Board>::new();
        let id = scheduler.register(Fixer::boxed("a", "body/main", 0)).unwrap();
        let mut state = board(&["body/main"]);

        let outside = WatchdogId::from_raw(999);
        let guard = scheduler.locks().try_acquire(&RegionPath::body(), outside).unwrap();
        let report = scheduler.run_cycle(Trigger::Timer, Duration::ZERO, &mut state);
        assert_eq!(report.outcome(id), Some(&Outcome::RegionBusy { holder: outside }));
        drop(guard);

        let report = scheduler.run_cycle(Trigger::Mutation, Duration::ZERO, &mut state);
        assert!(matches!(report.outcome(id), Some(Outcome::Repaired(_))));
    }

    #[test]
    fn retry_budget_disables_and_reports() {
        let sink = Arc::new(CollectingSink::new());
        let mut scheduler = WatchdogScheduler::<Board>::with_sink(sink.clone());
        let mut fixer = Fixer::boxed("flaky", "body", 0);
        fixer.fail = true;
        fixer.spec.max_consecutive_failures = 2;
        let id = scheduler.register(fixer).unwrap();
        let mut state = board(&["body"]);

        let first = scheduler.run_cycle(Trigger::Mutation, Duration::ZERO, &mut state);
        assert!(matches!(
            first.outcome(id),
            Some(Outcome::Failed { consecutive: 1, .. })
        ));
        assert_eq!(scheduler.status(id), Some(WatchdogStatus::Active));

        let second = scheduler.run_cycle(Trigger::Mutation, Duration::ZERO, &mut state);
        assert!(matches!(second.outcome(id), Some(Outcome::Disabled { .. })));
        assert_eq!(scheduler.status(id), Some(WatchdogStatus::Disabled));

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].name, "flaky");

        let third = scheduler.run_cycle(Trigger::Mutation, Duration::ZERO, &mut state);
        assert!(third.entries.is_empty());

        scheduler.enable(id).unwrap();
        assert_eq!(scheduler.info(id).unwrap().consecutive_failures, 0);
    }

    #[test]
    fn panicking_repair_counts_as_failure() {
        struct Panicker(WatchdogSpec);
        impl Watchdog<Board> for Panicker {
            fn spec(&self) -> &WatchdogSpec {
                &self.0
            }
            fn detect(&mut self, _: &Board, _: Duration) -> bool {
                true
            }
            fn repair(&mut self, _: &mut Board, _: Duration) -> Result<RepairOutcome, RepairError> {
                panic!("kaboom")
            }
        }

        let mut scheduler = WatchdogScheduler::<Board>::new();
        let id = scheduler
            .register(Box::new(Panicker(
                WatchdogSpec::new("p", RegionPath::body()).on(Trigger::Mutation),
            )))
            .unwrap();
        let mut state = board(&[]);
        let report = scheduler.run_cycle(Trigger::Mutation, Duration::ZERO, &mut state);
        assert!(matches!(
            report.outcome(id),
            Some(Outcome::Failed { error: RepairError::Panicked(msg), .. }) if msg == "kaboom"
        ));
        assert_eq!(scheduler.locks().held_count(), 0);
    }

    #[test]
    fn repair_now_is_noop_when_clean() {
        let mut scheduler = WatchdogScheduler::<Board>::new();
        let id = scheduler.register(Fixer::boxed("a", "body", 0)).unwrap();
        let mut state = board(&["body"]);

        let first = scheduler.repair_now(id, Duration::ZERO, &mut state).unwrap();
        assert!(matches!(first, Outcome::Repaired(_)));
        let second = scheduler.repair_now(id, Duration::ZERO, &mut state).unwrap();
        assert_eq!(second, Outcome::Clean);
        assert_eq!(state.writes.len(), 1);
    }

    #[test]
    fn unregister_removes_watchdog() {
        let mut scheduler = WatchdogScheduler::<Board>::new();
        let id = scheduler.register(Fixer::boxed("a", "body", 0)).unwrap();
        let removed = scheduler.unregister(id).unwrap();
        assert_eq!(removed.spec().name, "a");
        assert!(scheduler.is_empty());
        assert!(matches!(
            scheduler.unregister(id),
            Err(WatchdogError::NotFound(_))
        ));
    }

    #[test]
    fn claimed_regions_preempt_conflicting_repairs() {
        let mut scheduler = WatchdogScheduler::new();
        let inner = scheduler.register(Fixer::boxed("inner", "body/main/tabs", 1000)).unwrap();
        let nav = scheduler.register(Fixer::boxed("nav", "body/nav", 1)).unwrap();
        let mut state = board(&["body/main/tabs", "body/nav"]);
        let claimed = ["body/main".parse().unwrap()];

        let report = scheduler.run_cycle_after(Trigger::Timer, Duration::ZERO, &mut state, &claimed);
        assert_eq!(
            report.outcome(inner),
            Some(&Outcome::Preempted { by: WatchdogId::EXTERNAL })
        );
        assert!(report.outcome(nav).is_some_and(Outcome::repair_attempted));
        assert_eq!(state.writes, vec!["nav".to_string()]);
        assert_eq!(WatchdogId::EXTERNAL.to_string(), "external");
        assert_ne!(inner, WatchdogId::EXTERNAL);
    }
}
