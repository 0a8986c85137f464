//! Testing utilities for the Vigil workspace
//!
//! Fixture pages, loaders and error events shared by integration tests.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;
use vigil_dom::ids::{MAIN_CONTENT, MAIN_NAV, TAB_ATTR, TAB_BUTTON_CLASS, TAB_CONTAINER, TAB_CONTENT, TAB_PANEL_CLASS};
use vigil_dom::{Document, ErrorEvent, Markup, Page};
use vigil_modules::{Capability, ManifestLoader, PanelModule, CORE_MODULES};

pub const ORIGIN: &str = "https://qrp.example";

pub const TABS: &[&str] = &["dashboard", "orgChart", "raciMatrix", "config"];

#[must_use]
pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn dashboard_body() -> Vec<Markup> {
    vec![
        Markup::element("h2").with_text("Re-organisation overview"),
        Markup::element("p").with_text("12 teams, 148 roles, 3 open RACI conflicts"),
    ]
}

fn page_with(dashboard: Vec<Markup>, active: &str) -> Page {
    let buttons = TABS.iter().map(|tab| {
        let button = Markup::element("button")
            .class(TAB_BUTTON_CLASS)
            .attr(TAB_ATTR, *tab)
            .with_text(*tab);
        if *tab == active {
            button.class("active")
        } else {
            button
        }
    });
    let panels = TABS.iter().map(|tab| {
        let panel = Markup::element("section").class(TAB_PANEL_CLASS).attr(TAB_ATTR, *tab);
        let panel = if *tab == "dashboard" {
            panel.children(dashboard.clone())
        } else {
            panel
        };
        if *tab == active {
            panel.class("active")
        } else {
            panel.attr("hidden", "")
        }
    });

    let mut doc = Document::new();
    let body = doc.body();
    for fragment in [
        Markup::element("header").child(Markup::element("h1").with_text("Quality Re-Org Platform")),
        Markup::element("nav")
            .id(MAIN_NAV)
            .child(Markup::element("div").id(TAB_CONTAINER).children(buttons)),
        Markup::element("main")
            .id(MAIN_CONTENT)
            .child(Markup::element("div").id(TAB_CONTENT).children(panels)),
    ] {
        let node = doc.build(&fragment);
        doc.append_child(body, node).unwrap();
    }
    Page::new().with_origin(ORIGIN).with_document(doc)
}

/// Healthy dashboard with the dashboard tab active
#[must_use]
pub fn dashboard_page() -> Page {
    page_with(dashboard_body(), "dashboard")
}

/// Healthy dashboard with `tab` active
#[must_use]
pub fn dashboard_page_on(tab: &str) -> Page {
    page_with(dashboard_body(), tab)
}

/// Dashboard whose dashboard panel shows nothing but a spinner
#[must_use]
pub fn stalled_dashboard_page() -> Page {
    page_with(
        vec![Markup::element("div").class("loading-indicator").class("spinner")],
        "dashboard",
    )
}

/// Body holding only a script tag
#[must_use]
pub fn blank_page() -> Page {
    let mut doc = Document::new();
    let script = doc.build(&Markup::element("script").attr("src", "js/app.js"));
    let body = doc.body();
    doc.append_child(body, script).unwrap();
    Page::new().with_origin(ORIGIN).with_document(doc)
}

/// Dashboard referencing CDN assets plus one same-origin script
#[must_use]
pub fn page_with_external_assets() -> Page {
    let mut page = dashboard_page();
    let doc = &mut page.document;
    let head = doc.head();
    for tag in [
        Markup::element("link")
            .attr("rel", "stylesheet")
            .attr("href", "https://cdn.example/fonts.css"),
        Markup::element("script")
            .attr("src", "https://cdn.example/chart.min.js")
            .attr("defer", "")
            .attr("integrity", "sha384-abc"),
        Markup::element("script").attr("src", "/js/ui.js"),
    ] {
        let node = doc.build(&tag);
        doc.append_child(head, node).unwrap();
    }
    page
}

/// Dashboard with an inline script missing `count` closing braces
#[must_use]
pub fn page_with_broken_inline_script(count: usize) -> Page {
    let mut page = dashboard_page();
    let doc = &mut page.document;
    let text = format!("function boot() {{ {} start(); }}", "{".repeat(count));
    let script = doc.build(&Markup::element("script").with_text(text));
    let body = doc.body();
    doc.append_child(body, script).unwrap();
    page
}

/// Real module for `name` as a bundled page would provide it
#[must_use]
pub fn real_module(name: &str) -> Arc<dyn Capability> {
    match name {
        "ui" => Arc::new(PanelModule::new("ui").with_panel("dashboard").with_content(dashboard_body())),
        other => Arc::new(
            PanelModule::new(other).with_content([Markup::element("p").with_text(format!("{other} view"))]),
        ),
    }
}

/// Loader serving every core module at `js/<name>.js`
#[must_use]
pub fn healthy_loader() -> ManifestLoader {
    CORE_MODULES.iter().fold(ManifestLoader::new(), |loader, name| {
        let name = (*name).to_string();
        loader.with_module(format!("js/{name}.js"), move || real_module(&name))
    })
}

/// Loader serving core modules, except `missing`, which is served only at
/// `alternate`
#[must_use]
pub fn loader_with_alternate(missing: &str, alternate: &str) -> ManifestLoader {
    CORE_MODULES
        .iter()
        .fold(ManifestLoader::new(), |loader, name| {
            let owned = (*name).to_string();
            let path = if *name == missing {
                alternate.to_string()
            } else {
                format!("js/{name}.js")
            };
            loader.with_module(path, move || real_module(&owned))
        })
}

/// Loader that serves nothing
#[must_use]
pub fn empty_loader() -> ManifestLoader {
    ManifestLoader::new()
}

/// Uncaught error naming the tab machinery
#[must_use]
pub fn tab_error() -> ErrorEvent {
    ErrorEvent::new("TypeError: Cannot read properties of undefined (reading 'switchTab')").at("js/ui.js", 120, 9)
}

/// Opaque cross-origin error
#[must_use]
pub fn opaque_error() -> ErrorEvent {
    ErrorEvent::new("Script error.")
}

/// Failed module script load
#[must_use]
pub fn load_error(path: &str) -> ErrorEvent {
    ErrorEvent::new(format!("Failed to load module script: {path}")).at(path, 0, 0)
}
