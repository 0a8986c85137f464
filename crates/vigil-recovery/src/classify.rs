//! Error taxonomy

use serde::{Deserialize, Serialize};
use vigil_dom::ErrorEvent;
use vigil_patch::is_opaque_script_error;

/// How an uncaught error is handled
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ErrorClass {
    /// A script or resource failed to fetch; fall back to a stub and retry
    LoadFailure {
        /// Resource that failed, when known
        resource: Option<String>,
    },
    /// Uncaught runtime error; candidate for keyword-triggered recovery
    RuntimeError,
    /// `"Script error."` without location; a CORS symptom
    OpaqueCrossOrigin,
    /// Inline script with broken bracket structure
    MalformedInlineScript,
}

const LOAD_MARKERS: &[&str] = &[
    "failed to load",
    "failed to fetch",
    "loading chunk",
    "loading css chunk",
    "net::err_",
    "404",
    "networkerror",
];

const SYNTAX_MARKERS: &[&str] = &[
    "unexpected end of input",
    "missing }",
    "missing )",
    "expected '}'",
    "expected ')'",
    "unexpected token '}'",
    "unexpected token ')'",
];

/// Classify an uncaught error event
#[must_use]
pub fn classify_error(event: &ErrorEvent) -> ErrorClass {
    if is_opaque_script_error(event) {
        return ErrorClass::OpaqueCrossOrigin;
    }

    let message = event.message.to_ascii_lowercase();
    if LOAD_MARKERS.iter().any(|m| message.contains(m)) {
        return ErrorClass::LoadFailure {
            resource: event.source.clone(),
        };
    }
    if message.contains("syntaxerror") && SYNTAX_MARKERS.iter().any(|m| message.contains(m)) {
        return ErrorClass::MalformedInlineScript;
    }
    ErrorClass::RuntimeError
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn taxonomy() {
        assert_eq!(classify_error(&ErrorEvent::new("Script error.")), ErrorClass::OpaqueCrossOrigin);
        assert_eq!(
            classify_error(&ErrorEvent::new("Failed to load module script").at("js/orgChart.js", 0, 0)),
            ErrorClass::LoadFailure {
                resource: Some("js/orgChart.js".into())
            }
        );
        assert_eq!(
            classify_error(&ErrorEvent::new("Uncaught SyntaxError: Unexpected end of input").at("index.html", 88, 3)),
            ErrorClass::MalformedInlineScript
        );
        assert_eq!(
            classify_error(&ErrorEvent::new("TypeError: Cannot read properties of null (reading 'tabContent')")),
            ErrorClass::RuntimeError
        );
    }

    #[test]
    fn located_script_error_is_runtime() {
        let event = ErrorEvent::new("Script error.").at("https://cdn.example/x.js", 1, 1);
        assert_eq!(classify_error(&event), ErrorClass::RuntimeError);
    }
}
