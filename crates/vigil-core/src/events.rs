//! Custom events dispatched by the supervisor
//!
//! Listeners subscribe to an [`EventBus`]; emitting never blocks and never
//! fails when nobody listens.

use crate::settings::AppSettings;
use serde::Serialize;
use tokio::sync::broadcast;
use vigil_recovery::ToastLevel;
use vigil_watchdog::{DisabledReport, ObservabilitySink, TracingSink};

/// Default capacity of the broadcast channel
pub const DEFAULT_BUS_CAPACITY: usize = 128;

/// Event payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "detail", rename_all = "camelCase")]
pub enum VigilEvent {
    /// Settings were saved
    ConfigUpdated(AppSettings),
    /// External tags were given `crossorigin`
    CorsFixes {
        /// URLs of the replaced tags
        urls: Vec<String>,
        /// Opaque script errors counted so far
        script_errors: u64,
    },
    /// A watchdog exhausted its retry budget
    WatchdogDisabled(DisabledReport),
    /// Error-triggered recovery ran
    RecoveryTriggered {
        /// Error message that triggered it
        message: String,
        /// View shown afterwards
        view: String,
        /// Whether navigation succeeded
        navigated: bool,
    },
    /// A toast was shown
    Toast {
        /// Toast element id
        id: String,
        /// Severity
        level: ToastLevel,
        /// Text
        message: String,
    },
    /// A background module load finished
    ModuleLoaded {
        /// Binding name
        name: String,
        /// Whether the real module is now bound
        real: bool,
    },
}

impl VigilEvent {
    /// DOM-style event name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConfigUpdated(_) => "configUpdated",
            Self::CorsFixes { .. } => "corsFixes",
            Self::WatchdogDisabled(_) => "watchdogDisabled",
            Self::RecoveryTriggered { .. } => "recoveryTriggered",
            Self::Toast { .. } => "toast",
            Self::ModuleLoaded { .. } => "moduleLoaded",
        }
    }
}

/// Broadcast bus for [`VigilEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<VigilEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    /// Create bus; slow subscribers lag after `capacity` events
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events emitted from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<VigilEvent> {
        self.sender.subscribe()
    }

    /// Emit an event; returns the number of subscribers reached
    pub fn emit(&self, event: VigilEvent) -> usize {
        tracing::debug!(event = event.name(), "dispatch");
        self.sender.send(event).unwrap_or(0)
    }

    /// Current subscriber count
    #[inline]
    #[must_use]
    pub fn subscribers(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ObservabilitySink for EventBus {
    fn watchdog_disabled(&self, report: &DisabledReport) {
        TracingSink.watchdog_disabled(report);
        self.emit(VigilEvent::WatchdogDisabled(report.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn emit_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        assert_eq!(
            bus.emit(VigilEvent::ModuleLoaded {
                name: "ui".into(),
                real: true
            }),
            0
        );
    }

    #[test]
    fn subscribers_receive_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.emit(VigilEvent::ConfigUpdated(AppSettings::default()));
        bus.emit(VigilEvent::CorsFixes {
            urls: vec!["https://cdn.example/a.js".into()],
            script_errors: 2,
        });
        assert_eq!(rx.try_recv().unwrap().name(), "configUpdated");
        assert_eq!(rx.try_recv().unwrap().name(), "corsFixes");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn serializes_with_dom_names() {
        let json = serde_json::to_value(VigilEvent::CorsFixes {
            urls: vec![],
            script_errors: 1,
        })
        .unwrap();
        assert_eq!(json["event"], "corsFixes");
        assert_eq!(json["detail"]["script_errors"], 1);
    }
}
