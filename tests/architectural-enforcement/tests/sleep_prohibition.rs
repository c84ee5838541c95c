//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT block a runtime thread with
//! `std::thread::sleep`. Periodic work uses `tokio::time::interval`, and
//! waiting on the chat backend uses `tokio::time::timeout`.

use architectural_enforcement::{scan_production, Rule};

const RULES: &[Rule] = &[
    Rule {
        pattern: "thread::sleep(",
        reason: "Blocking sleep",
    },
    Rule {
        pattern: "use std::thread::sleep",
        reason: "Blocking sleep import",
    },
];

/// Test that production code does not contain blocking sleeps
#[test]
fn test_no_blocking_sleep_in_production_code() {
    let violations = scan_production(RULES);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - tokio::time::interval() for periodic tasks");
        eprintln!("  - tokio::time::timeout() around awaited calls");
        eprintln!("  - Test code after #[cfg(test)]");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
