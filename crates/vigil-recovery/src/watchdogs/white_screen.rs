use super::WatchdogSettings;
use crate::page::PageState;
use crate::templates::emergency_shell;
use crate::toast::TOAST_CONTAINER_ID;
use std::time::Duration;
use vigil_dom::PagePhase;
use vigil_watchdog::{RegionPath, RepairError, RepairOutcome, Trigger, Watchdog, WatchdogSpec};

/// Injects the emergency shell when the body is effectively blank
#[derive(Debug, Clone)]
pub struct WhiteScreenWatchdog {
    spec: WatchdogSpec,
    min_text: usize,
    view: String,
}

impl WhiteScreenWatchdog {
    /// Create watchdog on window load and timer, priority 100
    #[must_use]
    pub fn new(settings: &WatchdogSettings) -> Self {
        let spec = WatchdogSpec::new("white-screen", RegionPath::body())
            .with_priority(100)
            .with_interval(settings.poll_interval())
            .with_max_failures(settings.max_consecutive_failures)
            .on(Trigger::WindowLoad)
            .on(Trigger::Timer);
        Self {
            spec,
            min_text: settings.white_screen_min_text,
            view: settings.dashboard_view.clone(),
        }
    }
}

impl Watchdog<PageState> for WhiteScreenWatchdog {
    fn spec(&self) -> &WatchdogSpec {
        &self.spec
    }

    fn detect(&mut self, state: &PageState, _now: Duration) -> bool {
        // Scripts may still be building the page
        if state.phase == PagePhase::Loading {
            return false;
        }
        let doc = state.doc();
        let notices = doc
            .element_by_id(TOAST_CONTAINER_ID)
            .map_or(0, |toasts| doc.visible_text_len(toasts));
        doc.visible_text_len(doc.body()).saturating_sub(notices) < self.min_text
    }

    fn repair(&mut self, state: &mut PageState, now: Duration) -> Result<RepairOutcome, RepairError> {
        let doc = state.doc_mut();
        let body = doc.body();
        doc.set_inner_markup(body, &emergency_shell(&self.view)).map_err(RepairError::other)?;
        state.enter_recovery(now);
        Ok(RepairOutcome::new("injected emergency shell"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vigil_dom::{Markup, Page};
    use vigil_modules::ModuleRegistry;

    fn state(phase: PagePhase) -> PageState {
        PageState::new(Page::new(), Arc::new(ModuleRegistry::new())).with_phase(phase)
    }

    #[test]
    fn blank_body_after_load_is_detected() {
        let mut wd = WhiteScreenWatchdog::new(&WatchdogSettings::default());
        assert!(!wd.detect(&state(PagePhase::Loading), Duration::ZERO));
        assert!(wd.detect(&state(PagePhase::Complete), Duration::ZERO));
    }

    #[test]
    fn script_text_does_not_count() {
        let mut wd = WhiteScreenWatchdog::new(&WatchdogSettings::default());
        let mut s = state(PagePhase::Complete);
        let script = s
            .doc_mut()
            .build(&Markup::element("script").with_text("window.app = initEverythingWithAVeryLongName();"));
        let body = s.doc().body();
        s.doc_mut().append_child(body, script).unwrap();
        assert!(wd.detect(&s, Duration::ZERO));
    }

    #[test]
    fn toasts_do_not_count() {
        let mut wd = WhiteScreenWatchdog::new(&WatchdogSettings::default());
        let mut s = state(PagePhase::Complete);
        crate::toast::show_toast(s.doc_mut(), crate::toast::ToastLevel::Error, "orgChart could not be loaded; using a limited version")
            .unwrap();
        assert!(wd.detect(&s, Duration::ZERO));
    }

    #[test]
    fn repair_enters_recovery_mode() {
        let mut wd = WhiteScreenWatchdog::new(&WatchdogSettings::default());
        let mut s = state(PagePhase::Complete);
        wd.repair(&mut s, Duration::from_secs(2)).unwrap();
        assert!(s.in_recovery());
        assert!(!wd.detect(&s, Duration::from_secs(3)));
    }
}
