//! Scripted failure scenarios
//!
//! Each scenario builds a page with one known fault, drives a
//! [`Supervisor`] through it on simulated page time and reports whether the
//! fault was healed.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fmt::{self, Display, Formatter, Write as _};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use vigil_core::{Supervisor, VigilConfig, VigilEvent};
use vigil_dom::ids::{MAIN_CONTENT, MAIN_NAV, TAB_ATTR, TAB_BUTTON_CLASS, TAB_CONTAINER, TAB_CONTENT, TAB_PANEL_CLASS};
use vigil_dom::{Document, ErrorEvent, Markup, Page, PageEvent};
use vigil_modules::{active_tab, Capability, ManifestLoader, PanelModule, CORE_MODULES};
use vigil_recovery::templates::{dashboard_fallback, APP_TITLE, RECOVERY_BANNER_ID, SHELL_TABS};
use vigil_recovery::{toasts, ErrorClass};

const SIM_ORIGIN: &str = "https://qrp.example";

/// Available scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Spinner stuck on the dashboard view
    Stall,
    /// Nothing rendered at all
    WhiteScreen,
    /// Tab switching throws after start-up
    TabError,
    /// Opaque errors from CDN scripts
    Cors,
    /// A module script is missing at its primary path
    ModuleMissing,
}

impl Scenario {
    /// Every scenario, in run order
    pub const ALL: [Self; 5] = [
        Self::Stall,
        Self::WhiteScreen,
        Self::TabError,
        Self::Cors,
        Self::ModuleMissing,
    ];

    /// CLI name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Stall => "stall",
            Self::WhiteScreen => "white-screen",
            Self::TabError => "tab-error",
            Self::Cors => "cors",
            Self::ModuleMissing => "module-missing",
        }
    }
}

impl Display for Scenario {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .with_context(|| format!("unknown scenario '{s}'"))
    }
}

/// Outcome of one scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario
    pub scenario: Scenario,
    /// Whether the fault was healed
    pub passed: bool,
    /// What happened, in order
    pub steps: Vec<String>,
    /// Custom events dispatched
    pub events: Vec<String>,
}

impl ScenarioReport {
    fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            passed: false,
            steps: Vec::new(),
            events: Vec::new(),
        }
    }

    fn step(&mut self, at: Duration, line: impl Into<String>) {
        self.steps.push(format!("{:>6}ms  {}", at.as_millis(), line.into()));
    }

    /// Human readable report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        let verdict = if self.passed { "HEALED" } else { "NOT HEALED" };
        let _ = writeln!(out, "== {} : {verdict}", self.scenario);
        for step in &self.steps {
            let _ = writeln!(out, "  {step}");
        }
        if !self.events.is_empty() {
            let _ = writeln!(out, "  events: {}", self.events.join(", "));
        }
        out
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn dashboard_page(dashboard: &[Markup], active: &str) -> Result<Page> {
    let buttons = SHELL_TABS.iter().map(|(tab, label)| {
        let button = Markup::element("button")
            .class(TAB_BUTTON_CLASS)
            .attr(TAB_ATTR, *tab)
            .with_text(*label);
        if *tab == active {
            button.class("active")
        } else {
            button
        }
    });
    let panels = SHELL_TABS.iter().map(|(tab, _)| {
        let mut panel = Markup::element("section").class(TAB_PANEL_CLASS).attr(TAB_ATTR, *tab);
        if *tab == "dashboard" {
            panel = panel.children(dashboard.iter().cloned());
        }
        if *tab == active {
            panel.class("active")
        } else {
            panel.attr("hidden", "")
        }
    });

    let mut doc = Document::new();
    let body = doc.body();
    for fragment in [
        Markup::element("header").child(Markup::element("h1").with_text(APP_TITLE)),
        Markup::element("nav")
            .id(MAIN_NAV)
            .child(Markup::element("div").id(TAB_CONTAINER).children(buttons)),
        Markup::element("main")
            .id(MAIN_CONTENT)
            .child(Markup::element("div").id(TAB_CONTENT).children(panels)),
    ] {
        let node = doc.build(&fragment);
        doc.append_child(body, node)?;
    }
    Ok(Page::new().with_origin(SIM_ORIGIN).with_document(doc))
}

fn bundled_module(name: &str) -> Arc<dyn Capability> {
    if name == "ui" {
        Arc::new(PanelModule::new("ui").with_panel("dashboard").with_content(dashboard_fallback()))
    } else {
        Arc::new(PanelModule::new(name).with_content([Markup::element("p").with_text(format!("{name} view"))]))
    }
}

/// Serve core modules at `js/<name>.js`, except those listed in `moved`
/// (served at the given path) and `missing` (not served)
fn loader(moved: &[(&str, &str)], missing: &[&str]) -> ManifestLoader {
    CORE_MODULES
        .iter()
        .filter(|name| !missing.contains(*name))
        .fold(ManifestLoader::new(), |loader, name| {
            let path = moved
                .iter()
                .find(|(moved, _)| moved == name)
                .map_or_else(|| format!("js/{name}.js"), |(_, path)| (*path).to_string());
            let owned = (*name).to_string();
            loader.with_module(path, move || bundled_module(&owned))
        })
}

fn drain(events: &mut broadcast::Receiver<VigilEvent>, report: &mut ScenarioReport) {
    while let Ok(event) = events.try_recv() {
        report.events.push(event.name().to_string());
    }
}

fn record_repairs(report: &mut ScenarioReport, cycle: &vigil_watchdog::CycleReport) {
    for entry in cycle.repaired() {
        report.step(cycle.now, format!("{} repaired {}", entry.name, entry.region));
    }
}

/// Run one scenario with `config`
///
/// # Errors
/// Returns an error if the supervisor cannot be built or a step fails
/// unexpectedly; a fault that is not healed is reported, not raised.
pub async fn run(scenario: Scenario, config: &VigilConfig) -> Result<ScenarioReport> {
    tracing::info!(%scenario, "running scenario");
    let mut report = ScenarioReport::new(scenario);
    match scenario {
        Scenario::Stall => stall(config, &mut report).await?,
        Scenario::WhiteScreen => white_screen(config, &mut report).await?,
        Scenario::TabError => tab_error(config, &mut report).await?,
        Scenario::Cors => cors(config, &mut report)?,
        Scenario::ModuleMissing => module_missing(config, &mut report).await?,
    }
    Ok(report)
}

async fn stall(config: &VigilConfig, report: &mut ScenarioReport) -> Result<()> {
    let spinner = [Markup::element("div").class("loading-indicator").class("spinner")];
    let page = dashboard_page(&spinner, "dashboard")?;
    let mut sup = Supervisor::new(config.clone(), page, Arc::new(loader(&[], &[])))?;
    let mut events = sup.bus().subscribe();

    sup.handle_event(PageEvent::DomContentLoaded, ms(0))?;
    sup.wait_for_loads().await;
    report.step(ms(0), "dashboard shows only a spinner");

    let limit = config.watchdogs.stall_threshold_ms + 2 * config.watchdogs.poll_interval_ms;
    let step = config.scheduler.tick_interval_ms;
    let mut now = 0;
    while now <= limit {
        let tick = sup.tick(ms(now))?;
        if let Some(mutation) = &tick.mutation {
            record_repairs(report, mutation);
        }
        record_repairs(report, &tick.timer);
        if sup.doc().elements_by_class("spinner").is_empty() {
            break;
        }
        now += step;
    }

    report.passed = sup.doc().elements_by_class("spinner").is_empty();
    drain(&mut events, report);
    Ok(())
}

async fn white_screen(config: &VigilConfig, report: &mut ScenarioReport) -> Result<()> {
    let mut doc = Document::new();
    let script = doc.build(&Markup::element("script").attr("src", "js/app.js"));
    let body = doc.body();
    doc.append_child(body, script)?;
    let page = Page::new().with_origin(SIM_ORIGIN).with_document(doc);

    let loader = loader(&[], &[]).with_latency(ms(300));
    let mut sup = Supervisor::new(config.clone(), page, Arc::new(loader))?;
    let mut events = sup.bus().subscribe();

    sup.handle_event(PageEvent::DomContentLoaded, ms(0))?;
    report.step(ms(0), "body is empty");
    let outcome = sup.handle_event(PageEvent::Load, ms(100))?;
    record_repairs(report, outcome.cycle());
    if sup.state().in_recovery() {
        report.step(ms(100), "recovery mode entered");
    }

    for (name, outcome) in sup.wait_for_loads().await {
        report.step(ms(400), format!("{name}: {outcome:?}"));
    }
    let tick = sup.tick(ms(400 + 2 * config.watchdogs.poll_interval_ms))?;
    record_repairs(report, &tick.timer);

    report.passed = !sup.state().in_recovery()
        && sup.doc().element_by_id(RECOVERY_BANNER_ID).is_none()
        && sup.doc().element_by_id(TAB_CONTENT).is_some();
    drain(&mut events, report);
    Ok(())
}

async fn tab_error(config: &VigilConfig, report: &mut ScenarioReport) -> Result<()> {
    let page = dashboard_page(&dashboard_fallback(), "orgChart")?;
    let mut sup = Supervisor::new(config.clone(), page, Arc::new(loader(&[], &[])))?;
    let mut events = sup.bus().subscribe();

    sup.handle_event(PageEvent::DomContentLoaded, ms(0))?;
    sup.wait_for_loads().await;

    let error = ErrorEvent::new("TypeError: Cannot read properties of null (reading 'tabContent')").at("js/ui.js", 212, 17);
    let early = config.recovery.arm_delay_ms / 2;
    let late = config.recovery.arm_delay_ms + 500;
    for at in [early, late] {
        let handled = sup.handle_error(&error, ms(at))?;
        report.step(ms(at), format!("{:?}", handled.action));
    }

    report.passed = sup.recoveries() == 1
        && active_tab(sup.doc()).as_deref() == Some(config.recovery.default_view.as_str());
    drain(&mut events, report);
    Ok(())
}

fn cors(config: &VigilConfig, report: &mut ScenarioReport) -> Result<()> {
    let mut page = dashboard_page(&dashboard_fallback(), "dashboard")?;
    let head = page.document.head();
    for tag in [
        Markup::element("link")
            .attr("rel", "stylesheet")
            .attr("href", "https://cdn.example/fonts.css"),
        Markup::element("script").attr("src", "https://cdn.example/chart.min.js"),
        Markup::element("script").attr("src", "js/ui.js"),
    ] {
        let node = page.document.build(&tag);
        page.document.append_child(head, node)?;
    }

    let mut sup = Supervisor::new(config.clone(), page, Arc::new(loader(&[], &[])))?;
    let mut events = sup.bus().subscribe();

    let handled = sup.handle_error(&ErrorEvent::new("Script error."), ms(50))?;
    if handled.class != ErrorClass::OpaqueCrossOrigin {
        bail!("opaque error classified as {:?}", handled.class);
    }
    report.step(ms(50), format!("{:?}", handled.action));

    let doc = sup.doc();
    let external = doc
        .elements_by_tag("script")
        .into_iter()
        .chain(doc.elements_by_tag("link"))
        .filter(|node| {
            doc.attribute(*node, "src")
                .or_else(|| doc.attribute(*node, "href"))
                .is_some_and(|url| url.starts_with("https://cdn.example/"))
        })
        .collect::<Vec<_>>();
    report.passed = external.len() == 2
        && external
            .iter()
            .all(|node| doc.attribute(*node, "crossorigin") == Some("anonymous"));
    drain(&mut events, report);
    Ok(())
}

async fn module_missing(config: &VigilConfig, report: &mut ScenarioReport) -> Result<()> {
    let page = dashboard_page(&dashboard_fallback(), "dashboard")?;
    let loader = loader(&[("orgChart", "js/org-chart.js")], &["raciMatrix"]);
    let mut sup = Supervisor::new(config.clone(), page, Arc::new(loader))?;
    let mut events = sup.bus().subscribe();

    sup.handle_event(PageEvent::DomContentLoaded, ms(0))?;
    for (name, outcome) in sup.wait_for_loads().await {
        report.step(ms(0), format!("{name}: {outcome:?}"));
    }

    let modules = sup.modules();
    let raci_is_stub = modules.get("raciMatrix").is_some_and(|m| m.is_stub());
    report.passed = modules.is_real("orgChart") && raci_is_stub && !toasts(sup.doc()).is_empty();
    if raci_is_stub {
        report.step(ms(0), "raciMatrix kept as stub, user notified");
    }
    drain(&mut events, report);
    Ok(())
}
