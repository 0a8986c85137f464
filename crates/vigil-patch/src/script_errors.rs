//! Opaque script error tracking
//!
//! The counter lives in local storage so it survives reloads, the same way
//! the dashboard keeps its settings.

use vigil_dom::{ErrorEvent, LocalStorage};

/// Storage key for the opaque script error counter
pub const SCRIPT_ERROR_KEY: &str = "vigil.corsScriptErrors";

/// Message browsers report for errors in cross-origin scripts
pub const OPAQUE_SCRIPT_ERROR: &str = "Script error.";

/// Whether `event` is the opaque cross-origin error
///
/// The message must match and no source location may be present.
#[must_use]
pub fn is_opaque_script_error(event: &ErrorEvent) -> bool {
    let message = event.message.trim();
    (message == OPAQUE_SCRIPT_ERROR || message == "Script error") && !event.has_location()
}

/// Current counter value; unreadable values count as zero
#[must_use]
pub fn script_error_count(storage: &LocalStorage) -> u64 {
    storage
        .get_item(SCRIPT_ERROR_KEY)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Increment and persist the counter, returning the new value
pub fn record_script_error(storage: &mut LocalStorage) -> u64 {
    let next = script_error_count(storage).saturating_add(1);
    storage.set_item(SCRIPT_ERROR_KEY, next.to_string());
    tracing::debug!(count = next, "opaque script error recorded");
    next
}

/// Drop the counter
pub fn reset_script_errors(storage: &mut LocalStorage) {
    storage.remove_item(SCRIPT_ERROR_KEY);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_error_requires_missing_location() {
        assert!(is_opaque_script_error(&ErrorEvent::new("Script error.")));
        assert!(!is_opaque_script_error(
            &ErrorEvent::new("Script error.").at("https://cdn.example/x.js", 1, 1)
        ));
        assert!(!is_opaque_script_error(&ErrorEvent::new("TypeError: x is undefined")));
    }

    #[test]
    fn counter_persists_and_tolerates_garbage() {
        let mut storage = LocalStorage::new();
        assert_eq!(record_script_error(&mut storage), 1);
        assert_eq!(record_script_error(&mut storage), 2);
        assert_eq!(storage.get_item(SCRIPT_ERROR_KEY), Some("2"));

        storage.set_item(SCRIPT_ERROR_KEY, "NaN");
        assert_eq!(script_error_count(&storage), 0);
        assert_eq!(record_script_error(&mut storage), 1);

        reset_script_errors(&mut storage);
        assert_eq!(script_error_count(&storage), 0);
    }
}
