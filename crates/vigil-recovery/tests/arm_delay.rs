//! Arm delay boundaries and the full recovery path

use pretty_assertions::assert_eq;
use std::time::Duration;
use vigil_dom::ids::{MAIN_CONTENT, TAB_ATTR, TAB_CONTENT, TAB_PANEL_CLASS};
use vigil_dom::{Document, ErrorEvent, Markup};
use vigil_modules::{active_tab, StubModule};
use vigil_recovery::{ErrorTriggeredRecovery, HandleOutcome, IgnoreReason, RecoveryConfig, RecoveryState};

fn broken_page() -> Document {
    let mut doc = Document::new();
    let main = doc.build(
        &Markup::element("main").id(MAIN_CONTENT).child(
            Markup::element("div").id(TAB_CONTENT).child(
                Markup::element("section")
                    .class(TAB_PANEL_CLASS)
                    .class("active")
                    .attr(TAB_ATTR, "orgChart")
                    .with_text("half-rendered org chart"),
            ),
        ),
    );
    let body = doc.body();
    doc.append_child(body, main).unwrap();
    doc
}

fn started() -> ErrorTriggeredRecovery {
    let mut handler = ErrorTriggeredRecovery::new(RecoveryConfig::default());
    handler.start(Duration::ZERO).unwrap();
    handler
}

fn tab_error() -> ErrorEvent {
    ErrorEvent::new("TypeError: Cannot read properties of undefined (reading 'switchTab')").at("js/ui.js", 120, 9)
}

#[test]
fn errors_at_0_and_2999ms_are_ignored() {
    let mut handler = started();
    let mut doc = broken_page();
    let ui = StubModule::new("ui");

    for at in [0, 2999] {
        let outcome = handler
            .handle_error(&tab_error(), Duration::from_millis(at), &mut doc, &ui)
            .unwrap();
        assert_eq!(outcome, HandleOutcome::Ignored(IgnoreReason::NotArmed(RecoveryState::ArmDelay)));
    }
    assert!(doc.text_content(doc.body()).contains("half-rendered"));
}

#[test]
fn matching_error_at_3001ms_recovers() {
    let mut handler = started();
    let mut doc = broken_page();
    let ui = StubModule::new("ui");

    let outcome = handler
        .handle_error(&tab_error(), Duration::from_millis(3001), &mut doc, &ui)
        .unwrap();

    let HandleOutcome::Recovered { reset, view } = outcome else {
        panic!("expected recovery, got {outcome:?}");
    };
    assert_eq!(view, "dashboard");
    assert_eq!(reset.cleared, vec![TAB_CONTENT.to_string()]);
    assert_eq!(active_tab(&doc).as_deref(), Some("dashboard"));
    assert!(!doc.text_content(doc.body()).contains("half-rendered"));
    assert_eq!(handler.state(), RecoveryState::Armed);
    assert_eq!(handler.recoveries(), 1);
}

#[test]
fn error_exactly_at_arm_delay_is_accepted() {
    let mut handler = started();
    let mut doc = broken_page();
    let outcome = handler
        .handle_error(&tab_error(), Duration::from_millis(3000), &mut doc, &StubModule::new("ui"))
        .unwrap();
    assert!(outcome.triggered());
}

#[test]
fn recovers_repeatedly() {
    let mut handler = started();
    let mut doc = broken_page();
    let ui = StubModule::new("ui");
    for i in 0..3u64 {
        let at = Duration::from_millis(4000 + i * 1000);
        let outcome = handler
            .handle_error(&ErrorEvent::new("content container missing"), at, &mut doc, &ui)
            .unwrap();
        assert!(matches!(outcome, HandleOutcome::Recovered { .. }));
    }
    assert_eq!(handler.recoveries(), 3);
    let tab = doc.element_by_id(TAB_CONTENT).unwrap();
    assert_eq!(doc.children(tab).len(), 1);
}
