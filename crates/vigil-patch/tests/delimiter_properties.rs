//! Properties of the delimiter checker and the legacy balancer

use proptest::prelude::*;
use vigil_patch::{check_delimiters, legacy_balance};

/// Balanced bracket soup built from a nesting plan
fn balanced(plan: &[u8]) -> String {
    let mut out = String::new();
    let mut closers = Vec::new();
    for step in plan {
        match step % 4 {
            0 => {
                out.push('(');
                closers.push(')');
            }
            1 => {
                out.push('[');
                closers.push(']');
            }
            2 => {
                out.push('{');
                closers.push('}');
            }
            _ => {
                if let Some(c) = closers.pop() {
                    out.push(c);
                }
                out.push_str(" x; ");
            }
        }
    }
    while let Some(c) = closers.pop() {
        out.push(c);
    }
    out
}

proptest! {
    #[test]
    fn legacy_balance_appends_exactly_the_missing_braces(
        prefix in "[a-z =;\n]{0,40}",
        n in 0usize..8,
    ) {
        let text = format!("{prefix}function init() {}", "{".repeat(n));
        let fixed = legacy_balance(&text);
        prop_assert!(fixed.starts_with(&text));
        prop_assert_eq!(&fixed[text.len()..], "}".repeat(n));
    }

    #[test]
    fn balanced_nesting_has_no_issues(plan in prop::collection::vec(any::<u8>(), 0..64)) {
        let text = balanced(&plan);
        prop_assert!(check_delimiters(&text).is_balanced(), "{}", text);
    }

    #[test]
    fn delimiters_inside_strings_are_ignored(inner in "[{}()\\[\\]a-z ]{0,24}") {
        let text = format!("let s = \"{inner}\"; let t = '{inner}'; // {inner}\n");
        prop_assert!(check_delimiters(&text).is_balanced());
    }

    #[test]
    fn unmatched_opens_are_all_reported(n in 1usize..6) {
        let text = format!("run({}", "{".repeat(n));
        let report = check_delimiters(&text);
        prop_assert_eq!(report.issues.len(), n + 1);
    }
}

#[test]
fn three_unmatched_braces_get_three_closers() {
    let text = "function a() { if (x) { while (y) { step();";
    assert_eq!(legacy_balance(text), format!("{text}}}}}}}"));
}
