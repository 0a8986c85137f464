//! Log of uncaught page errors

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use vigil_dom::ErrorEvent;
use vigil_recovery::ErrorClass;

/// One uncaught error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// Error message
    pub message: String,
    /// Script URL, if known
    pub source: Option<String>,
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
    /// Wall-clock time of the report
    pub timestamp: DateTime<Utc>,
    /// Page time of the report in milliseconds
    pub page_time_ms: u64,
    /// How the error was classified
    #[serde(flatten)]
    pub class: ErrorClass,
}

impl ErrorRecord {
    /// Record `event` seen at page time `now`
    #[must_use]
    pub fn new(event: &ErrorEvent, class: ErrorClass, now: Duration) -> Self {
        Self {
            message: event.message.clone(),
            source: event.source.clone(),
            line: event.line,
            column: event.column,
            timestamp: Utc::now(),
            page_time_ms: u64::try_from(now.as_millis()).unwrap_or(u64::MAX),
            class,
        }
    }
}

/// Append-only error log, optionally bounded
///
/// When a capacity is set the oldest records are dropped first.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    records: VecDeque<ErrorRecord>,
    capacity: Option<usize>,
    dropped: u64,
}

impl ErrorLog {
    /// Unbounded log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log keeping at most `capacity` records
    #[inline]
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    /// Append a record
    pub fn push(&mut self, record: ErrorRecord) {
        if let Some(cap) = self.capacity {
            while self.records.len() >= cap {
                self.records.pop_front();
                self.dropped += 1;
            }
        }
        self.records.push_back(record);
    }

    /// Records, oldest first
    pub fn records(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter()
    }

    /// Most recent record
    #[must_use]
    pub fn last(&self) -> Option<&ErrorRecord> {
        self.records.back()
    }

    /// Records currently held
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records discarded because of the capacity limit
    #[inline]
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(n: u64) -> ErrorRecord {
        ErrorRecord::new(
            &ErrorEvent::new(format!("error {n}")),
            ErrorClass::RuntimeError,
            Duration::from_millis(n),
        )
    }

    #[test]
    fn unbounded_keeps_everything() {
        let mut log = ErrorLog::new();
        (0..500).for_each(|n| log.push(record(n)));
        assert_eq!(log.len(), 500);
        assert_eq!(log.dropped(), 0);
    }

    #[test]
    fn bounded_drops_oldest() {
        let mut log = ErrorLog::bounded(2);
        (0..5).for_each(|n| log.push(record(n)));
        let kept: Vec<_> = log.records().map(|r| r.page_time_ms).collect();
        assert_eq!(kept, vec![3, 4]);
        assert_eq!(log.dropped(), 3);
        assert_eq!(log.last().unwrap().message, "error 4");
    }

    #[test]
    fn serializes_class_inline() {
        let json = serde_json::to_value(record(7)).unwrap();
        assert_eq!(json["class"], "runtime_error");
        assert_eq!(json["page_time_ms"], 7);
    }
}
