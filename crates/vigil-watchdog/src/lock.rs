//! Region locks
//!
//! [`RegionLocks`] tracks which regions have a repair in flight. A lock is
//! granted only when no conflicting region is held; it is released when the
//! returned [`RegionGuard`] drops.

use crate::region::RegionPath;
use crate::scheduler::WatchdogId;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
struct Held {
    token: u64,
    region: RegionPath,
    holder: WatchdogId,
}

#[derive(Debug, Default)]
struct Table {
    next_token: u64,
    held: Vec<Held>,
}

/// Lock table keyed by region
#[derive(Debug, Default)]
pub struct RegionLocks {
    table: Mutex<Table>,
}

impl RegionLocks {
    /// Create empty lock table
    #[inline]
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Try to lock `region` on behalf of `holder`
    ///
    /// Returns `Err` with the current holder when a conflicting region is
    /// already locked.
    pub fn try_acquire(
        self: &Arc<Self>,
        region: &RegionPath,
        holder: WatchdogId,
    ) -> Result<RegionGuard, WatchdogId> {
        let mut table = self.table.lock();
        if let Some(existing) = table.held.iter().find(|h| h.region.conflicts_with(region)) {
            return Err(existing.holder);
        }
        let token = table.next_token;
        table.next_token += 1;
        table.held.push(Held {
            token,
            region: region.clone(),
            holder,
        });
        Ok(RegionGuard {
            locks: Arc::clone(self),
            token,
            region: region.clone(),
        })
    }

    /// Current holder of a region conflicting with `region`
    #[must_use]
    pub fn holder(&self, region: &RegionPath) -> Option<WatchdogId> {
        self.table
            .lock()
            .held
            .iter()
            .find(|h| h.region.conflicts_with(region))
            .map(|h| h.holder)
    }

    /// Number of regions currently locked
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.table.lock().held.len()
    }

    fn release(&self, token: u64) {
        self.table.lock().held.retain(|h| h.token != token);
    }
}

/// RAII guard for a locked region
#[derive(Debug)]
pub struct RegionGuard {
    locks: Arc<RegionLocks>,
    token: u64,
    region: RegionPath,
}

impl RegionGuard {
    /// Locked region
    #[inline]
    #[must_use]
    pub fn region(&self) -> &RegionPath {
        &self.region
    }
}

impl Drop for RegionGuard {
    fn drop(&mut self) {
        self.locks.release(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(s: &str) -> RegionPath {
        s.parse().unwrap()
    }

    #[test]
    fn conflicting_region_is_refused() {
        let locks = RegionLocks::new();
        let _guard = locks
            .try_acquire(&path("body/mainContent"), WatchdogId::from_raw(1))
            .unwrap();

        let err = locks
            .try_acquire(&path("body/mainContent/tabContent"), WatchdogId::from_raw(2))
            .unwrap_err();
        assert_eq!(err, WatchdogId::from_raw(1));

        assert!(locks
            .try_acquire(&path("body/main-nav"), WatchdogId::from_raw(3))
            .is_ok());
    }

    #[test]
    fn guard_drop_releases() {
        let locks = RegionLocks::new();
        {
            let guard = locks
                .try_acquire(&RegionPath::body(), WatchdogId::from_raw(1))
                .unwrap();
            assert_eq!(guard.region(), &RegionPath::body());
            assert_eq!(locks.held_count(), 1);
        }
        assert_eq!(locks.held_count(), 0);
        assert!(locks.holder(&RegionPath::body()).is_none());
    }
}
