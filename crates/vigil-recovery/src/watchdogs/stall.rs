use super::{tab_content_region, WatchdogSettings};
use crate::page::PageState;
use crate::templates::dashboard_fallback;
use std::time::Duration;
use vigil_dom::{Document, NodeId};
use vigil_modules::{active_tab, find_panel};
use vigil_watchdog::{RepairError, RepairOutcome, Trigger, Watchdog, WatchdogSpec};

/// Detects a loading indicator stuck on the dashboard view
///
/// Two instances run: a timer-driven poll and a mutation-driven observer.
/// Each tracks independently when it first saw the indicator.
#[derive(Debug, Clone)]
pub struct DashboardStallWatchdog {
    spec: WatchdogSpec,
    threshold: Duration,
    loading_classes: Vec<String>,
    view: String,
    first_seen: Option<Duration>,
}

impl DashboardStallWatchdog {
    fn with_spec(spec: WatchdogSpec, settings: &WatchdogSettings) -> Self {
        Self {
            spec: spec.with_max_failures(settings.max_consecutive_failures),
            threshold: settings.stall_threshold(),
            loading_classes: settings.loading_classes.clone(),
            view: settings.dashboard_view.clone(),
            first_seen: None,
        }
    }

    /// Timer-driven detector, priority 10
    #[must_use]
    pub fn poll(settings: &WatchdogSettings) -> Self {
        let spec = WatchdogSpec::new("dashboard-stall-poll", tab_content_region())
            .with_priority(10)
            .with_interval(settings.poll_interval())
            .on(Trigger::Timer);
        Self::with_spec(spec, settings)
    }

    /// Mutation-driven detector, priority 20
    #[must_use]
    pub fn observer(settings: &WatchdogSettings) -> Self {
        let spec = WatchdogSpec::new("dashboard-stall-observer", tab_content_region())
            .with_priority(20)
            .on(Trigger::Mutation);
        Self::with_spec(spec, settings)
    }

    fn dashboard_panel(&self, doc: &Document) -> Option<NodeId> {
        let panel = find_panel(doc, &self.view)?;
        match active_tab(doc) {
            Some(active) if active != self.view => None,
            _ => Some(panel),
        }
    }

    fn spinner_visible(&self, doc: &Document) -> bool {
        let Some(panel) = self.dashboard_panel(doc) else {
            return false;
        };
        self.loading_classes
            .iter()
            .any(|class| !doc.elements_by_class_within(panel, class).is_empty())
    }
}

impl Watchdog<PageState> for DashboardStallWatchdog {
    fn spec(&self) -> &WatchdogSpec {
        &self.spec
    }

    fn detect(&mut self, state: &PageState, now: Duration) -> bool {
        if !self.spinner_visible(state.doc()) {
            self.first_seen = None;
            return false;
        }
        let since = *self.first_seen.get_or_insert(now);
        let stalled = now.saturating_sub(since) >= self.threshold;
        if stalled {
            tracing::debug!(watchdog = %self.spec.name, stalled_ms = now.saturating_sub(since).as_millis() as u64, "dashboard stalled");
        }
        stalled
    }

    fn repair(&mut self, state: &mut PageState, _now: Duration) -> Result<RepairOutcome, RepairError> {
        let doc = state.doc_mut();
        let panel = find_panel(doc, &self.view)
            .ok_or_else(|| RepairError::MissingTarget(format!("{} panel", self.view)))?;
        doc.set_inner_markup(panel, &dashboard_fallback()).map_err(RepairError::other)?;
        self.first_seen = None;
        Ok(RepairOutcome::new("injected fallback dashboard"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vigil_dom::ids::{MAIN_CONTENT, TAB_ATTR, TAB_CONTENT, TAB_PANEL_CLASS};
    use vigil_dom::{Markup, Page};
    use vigil_modules::ModuleRegistry;

    fn stalled_page(active: &str) -> PageState {
        page_with_panels(
            active,
            vec![Markup::element("div").class("spinner")],
            Vec::new(),
        )
    }

    fn page_with_panels(active: &str, dashboard: Vec<Markup>, org_chart: Vec<Markup>) -> PageState {
        let mut page = Page::new();
        let doc = &mut page.document;
        let main = doc.build(
            &Markup::element("main").id(MAIN_CONTENT).child(
                Markup::element("div").id(TAB_CONTENT).children([
                    Markup::element("section")
                        .class(TAB_PANEL_CLASS)
                        .attr(TAB_ATTR, "dashboard")
                        .children(dashboard),
                    Markup::element("section")
                        .class(TAB_PANEL_CLASS)
                        .attr(TAB_ATTR, "orgChart")
                        .children(org_chart),
                ]),
            ),
        );
        let body = doc.body();
        doc.append_child(body, main).unwrap();
        let mut state = PageState::new(page, Arc::new(ModuleRegistry::new()));
        vigil_modules::activate_tab(state.doc_mut(), active).unwrap();
        state
    }

    #[test]
    fn fires_only_after_threshold() {
        let settings = WatchdogSettings::default();
        let mut wd = DashboardStallWatchdog::poll(&settings);
        let state = stalled_page("dashboard");

        assert!(!wd.detect(&state, Duration::from_millis(1000)));
        assert!(!wd.detect(&state, Duration::from_millis(5999)));
        assert!(wd.detect(&state, Duration::from_millis(6000)));
    }

    #[test]
    fn other_view_is_not_a_stall() {
        let mut wd = DashboardStallWatchdog::poll(&WatchdogSettings::default());
        let state = stalled_page("orgChart");
        assert!(!wd.detect(&state, Duration::ZERO));
        assert!(!wd.detect(&state, Duration::from_secs(60)));
    }

    #[test]
    fn repair_replaces_spinner() {
        let mut wd = DashboardStallWatchdog::observer(&WatchdogSettings::default());
        let mut state = stalled_page("dashboard");
        wd.detect(&state, Duration::ZERO);
        assert!(wd.detect(&state, Duration::from_secs(5)));

        wd.repair(&mut state, Duration::from_secs(5)).unwrap();
        assert!(state.doc().elements_by_class("spinner").is_empty());
        assert!(!wd.detect(&state, Duration::from_secs(20)));
    }

    #[test]
    fn spinner_in_a_hidden_panel_leaves_the_dashboard_alone() {
        let mut wd = DashboardStallWatchdog::poll(&WatchdogSettings::default());
        let mut state = page_with_panels(
            "dashboard",
            vec![Markup::element("h2").with_text("Live figures")],
            vec![Markup::element("div").class("loading-indicator").class("spinner")],
        );
        let before = state.doc().revision();

        for second in 0..30 {
            let now = Duration::from_secs(second);
            if wd.detect(&state, now) {
                wd.repair(&mut state, now).unwrap();
            }
        }

        assert_eq!(state.doc().revision(), before);
        let panel = find_panel(state.doc(), "dashboard").unwrap();
        assert_eq!(state.doc().text_content(panel), "Live figures");
        assert!(state.doc().element_by_id(TAB_CONTENT).is_some());
    }

    #[test]
    fn repeated_stall_repairs_settle() {
        let mut wd = DashboardStallWatchdog::poll(&WatchdogSettings::default());
        let mut state = stalled_page("dashboard");
        let mut repairs = 0;

        for second in 0..30 {
            let now = Duration::from_secs(second);
            if wd.detect(&state, now) {
                wd.repair(&mut state, now).unwrap();
                repairs += 1;
            }
        }
        assert_eq!(repairs, 1);
    }
}
