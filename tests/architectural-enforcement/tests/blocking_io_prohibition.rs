//! Integration Test: Blocking HTTP Prohibition
//!
//! **Policy**: The chat backend and the messaging provider run inside request
//! handlers and the follow-up task. They MUST use the async `reqwest` client.

use architectural_enforcement::{scan_production, Rule};

const RULES: &[Rule] = &[
    Rule {
        pattern: "reqwest::blocking",
        reason: "Blocking HTTP client",
    },
    Rule {
        pattern: "std::net::TcpStream",
        reason: "Blocking network I/O",
    },
    Rule {
        pattern: "std::net::TcpListener",
        reason: "Blocking network I/O",
    },
];

/// Test that production code does not use blocking network clients
#[test]
fn test_no_blocking_http_in_production_code() {
    let violations = scan_production(RULES);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking network calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED:");
        eprintln!("  - reqwest::Client with .await");
        eprintln!("  - tokio::net::TcpListener");

        panic!(
            "\nFound {} blocking network violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
