//! Markup injected by repairs
//!
//! Content here is synthetic. It exists so the page always shows a usable
//! layout, even when the real modules never render.

use vigil_dom::ids::{MAIN_CONTENT, MAIN_NAV, TAB_ATTR, TAB_BUTTON_CLASS, TAB_CONTAINER, TAB_CONTENT, TAB_PANEL_CLASS};
use vigil_dom::Markup;

/// Id of the banner shown while in recovery mode
pub const RECOVERY_BANNER_ID: &str = "vigil-recovery-banner";

/// Class marking injected fallback content
pub const FALLBACK_CLASS: &str = "vigil-fallback";

/// Page title used in the emergency shell
pub const APP_TITLE: &str = "Quality Re-Org Platform";

/// Tabs of the emergency shell, with button labels
pub const SHELL_TABS: &[(&str, &str)] = &[
    ("dashboard", "Dashboard"),
    ("orgChart", "Org Chart"),
    ("raciMatrix", "RACI Matrix"),
    ("config", "Settings"),
];

fn stat_card(label: &str, value: &str) -> Markup {
    Markup::element("div")
        .class("stat-card")
        .child(Markup::element("span").class("stat-value").with_text(value))
        .child(Markup::element("span").class("stat-label").with_text(label))
}

/// Body of the dashboard panel when the real dashboard stalls
#[must_use]
pub fn dashboard_fallback() -> Vec<Markup> {
    vec![
        Markup::element("div")
            .class(FALLBACK_CLASS)
            .class("dashboard-summary")
            .child(Markup::element("h2").with_text("Dashboard"))
            .child(
                Markup::element("p")
                    .class("fallback-note")
                    .with_text("Live data is still loading. Showing the last known summary."),
            )
            .child(Markup::element("div").class("stat-grid").children([
                stat_card("Teams", "12"),
                stat_card("Open actions", "37"),
                stat_card("Roles mapped", "148"),
                stat_card("Pending reviews", "5"),
            ])),
    ]
}

/// Minimal panel recreated by a content reset
#[must_use]
pub fn default_panel(view: &str) -> Markup {
    Markup::element("section")
        .class(TAB_PANEL_CLASS)
        .class("active")
        .attr(TAB_ATTR, view)
        .child(
            Markup::element("p")
                .class(FALLBACK_CLASS)
                .with_text("Reloading view..."),
        )
}

/// Banner announcing recovery mode
#[must_use]
pub fn recovery_banner() -> Markup {
    Markup::element("div")
        .id(RECOVERY_BANNER_ID)
        .attr("role", "status")
        .with_text("Running in recovery mode. Some features may be unavailable.")
}

/// Complete body used when the page rendered nothing
///
/// Contains the navigation, the tab container and one panel per shell tab,
/// with `default_view` active and pre-filled with the fallback dashboard.
#[must_use]
pub fn emergency_shell(default_view: &str) -> Vec<Markup> {
    let buttons = SHELL_TABS.iter().map(|(tab, label)| {
        let button = Markup::element("button")
            .class(TAB_BUTTON_CLASS)
            .attr(TAB_ATTR, *tab)
            .with_text(*label);
        if *tab == default_view {
            button.class("active")
        } else {
            button
        }
    });

    let panels = SHELL_TABS.iter().map(|(tab, _)| {
        let panel = Markup::element("section").class(TAB_PANEL_CLASS).attr(TAB_ATTR, *tab);
        if *tab == default_view {
            panel.class("active").children(dashboard_fallback())
        } else {
            panel.attr("hidden", "")
        }
    });

    vec![
        recovery_banner(),
        Markup::element("header")
            .class(FALLBACK_CLASS)
            .child(Markup::element("h1").with_text(APP_TITLE)),
        Markup::element("nav")
            .id(MAIN_NAV)
            .child(Markup::element("div").id(TAB_CONTAINER).children(buttons)),
        Markup::element("main")
            .id(MAIN_CONTENT)
            .child(Markup::element("div").id(TAB_CONTENT).children(panels)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_dom::Document;
    use vigil_modules::{active_tab, find_panel};

    #[test]
    fn shell_has_dashboard_contract() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_inner_markup(body, &emergency_shell("dashboard")).unwrap();

        for id in [MAIN_CONTENT, TAB_CONTENT, TAB_CONTAINER, MAIN_NAV, RECOVERY_BANNER_ID] {
            assert!(doc.element_by_id(id).is_some(), "missing #{id}");
        }
        assert_eq!(active_tab(&doc).as_deref(), Some("dashboard"));
        assert!(find_panel(&doc, "raciMatrix").is_some());
        assert!(doc.visible_text_len(body) > 100);
    }
}
