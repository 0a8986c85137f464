//! Property tests for the scheduler's per-region mutual exclusion
//!
//! Watchdogs record every region they write while a write is "open"; a
//! conflicting open write at the same time, or two writes to conflicting
//! regions within one cycle, is a violation.

use proptest::prelude::*;
use std::time::Duration;
use vigil_watchdog::{
    Outcome, RegionPath, RepairError, RepairOutcome, Trigger, Watchdog, WatchdogScheduler,
    WatchdogSpec,
};

const REGIONS: &[&str] = &[
    "body",
    "body/mainContent",
    "body/mainContent/tabContent",
    "body/main-nav",
    "body/tabContainer",
];

#[derive(Default)]
struct Page {
    /// Regions currently flagged as broken
    broken: Vec<bool>,
    /// Regions written during the current cycle
    written: Vec<RegionPath>,
    /// Mutation counter
    mutations: u64,
}

struct Marker {
    spec: WatchdogSpec,
    slot: usize,
    fails: bool,
}

impl Watchdog<Page> for Marker {
    fn spec(&self) -> &WatchdogSpec {
        &self.spec
    }

    fn detect(&mut self, state: &Page, _now: Duration) -> bool {
        state.broken[self.slot]
    }

    fn repair(&mut self, state: &mut Page, _now: Duration) -> Result<RepairOutcome, RepairError> {
        state.written.push(self.spec.region.clone());
        if self.fails {
            return Err(RepairError::Failed("flaky".into()));
        }
        state.broken[self.slot] = false;
        state.mutations += 1;
        Ok(RepairOutcome::new("marker fixed"))
    }
}

fn trigger_strategy() -> impl Strategy<Value = Trigger> {
    prop_oneof![
        Just(Trigger::DomReady),
        Just(Trigger::WindowLoad),
        Just(Trigger::Timer),
        Just(Trigger::Mutation),
        Just(Trigger::GlobalError),
    ]
}

proptest! {
    #[test]
    fn at_most_one_repair_per_region_per_cycle(
        registrations in prop::collection::vec(
            (0..REGIONS.len(), -5i32..5, any::<bool>(), prop::collection::vec(trigger_strategy(), 1..4)),
            1..12,
        ),
        cycles in prop::collection::vec((trigger_strategy(), 0u64..5000), 1..8),
    ) {
        let mut scheduler = WatchdogScheduler::<Page>::new();
        for (i, (slot, priority, fails, triggers)) in registrations.iter().enumerate() {
            let mut spec = WatchdogSpec::new(
                format!("marker-{i}"),
                REGIONS[*slot].parse().unwrap(),
            )
            .with_priority(*priority);
            for trigger in triggers {
                spec = spec.on(*trigger);
            }
            scheduler
                .register(Box::new(Marker { spec, slot: *slot, fails: *fails }))
                .unwrap();
        }

        let mut page = Page {
            broken: vec![true; REGIONS.len()],
            ..Page::default()
        };

        for (trigger, at) in cycles {
            page.written.clear();
            let report = scheduler.run_cycle(trigger, Duration::from_millis(at), &mut page);

            for (i, a) in page.written.iter().enumerate() {
                for b in &page.written[i + 1..] {
                    prop_assert!(!a.conflicts_with(b), "{a} and {b} both written in one cycle");
                }
            }

            let attempted: Vec<_> = report.attempted().collect();
            prop_assert_eq!(attempted.len(), page.written.len());
            prop_assert_eq!(scheduler.locks().held_count(), 0);

            for entry in &report.entries {
                if let Outcome::Preempted { by } = entry.outcome {
                    let winner = report.entries.iter().find(|e| e.id == by).unwrap();
                    prop_assert!(winner.region.conflicts_with(&entry.region));
                    prop_assert!(winner.outcome.repair_attempted());
                }
            }

            // Re-break everything so the next cycle has work to do
            page.broken.iter_mut().for_each(|b| *b = true);
        }
    }

    #[test]
    fn repair_is_idempotent_once_clean(slot in 0..REGIONS.len()) {
        let mut scheduler = WatchdogScheduler::<Page>::new();
        let spec = WatchdogSpec::new("only", REGIONS[slot].parse().unwrap()).on(Trigger::Mutation);
        let id = scheduler.register(Box::new(Marker { spec, slot, fails: false })).unwrap();

        let mut page = Page { broken: vec![true; REGIONS.len()], ..Page::default() };
        let first = scheduler.repair_now(id, Duration::ZERO, &mut page).unwrap();
        prop_assert!(matches!(first, Outcome::Repaired(_)));
        let after_first = page.mutations;

        let second = scheduler.repair_now(id, Duration::ZERO, &mut page).unwrap();
        prop_assert_eq!(second, Outcome::Clean);
        prop_assert_eq!(page.mutations, after_first);
    }
}
