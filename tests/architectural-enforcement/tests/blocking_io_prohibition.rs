//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async functions in production code MUST NOT use blocking I/O.
//! **Required**: `tokio::fs`, `tokio::net`, async `reqwest`.
//!
//! Blocking calls are fine in plain functions that run before the runtime
//! starts, such as the config loader, and in test code.

use architectural_enforcement::{code_part, is_in_async_fn, is_test_code, production_sources};

/// Test that async production code does not block
#[test]
fn test_no_blocking_io_in_async_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ Blocking I/O found in async production code:\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN in async fn:");
        eprintln!("  - std::fs::*, std::net::*");
        eprintln!("  - std::process::Command");
        eprintln!("  - reqwest::blocking::*");
        eprintln!("\n✅ REQUIRED:");
        eprintln!("  - tokio::fs::read_to_string().await, tokio::fs::write().await");
        eprintln!("  - tokio::net::TcpListener::bind().await");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

/// Test that the HTTP client is never the blocking one, even outside async
#[test]
fn test_no_blocking_http_client() {
    let offenders: Vec<String> = production_sources()
        .iter()
        .filter(|file| file.content.contains("reqwest::blocking"))
        .map(|file| file.path.display().to_string())
        .collect();

    assert!(offenders.is_empty(), "reqwest::blocking used in {offenders:?}");
}

fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = file.lines();
        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line);
            if is_test_code(&lines, idx) || !is_in_async_fn(&lines, idx) {
                continue;
            }

            let kind = if code.contains("std::fs::") {
                "Blocking file I/O"
            } else if code.contains("std::net::") {
                "Blocking network I/O"
            } else if code.contains("std::process::Command") {
                "Blocking process I/O"
            } else if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
                "Blocking stdin/stdout"
            } else {
                continue;
            };

            violations.push(format!(
                "{}:{} - {kind}: {}",
                file.path.display(),
                idx + 1,
                line.trim()
            ));
        }
    }
    violations
}

#[test]
fn test_scanner_sees_the_workspace() {
    let sources = production_sources();
    assert!(sources
        .iter()
        .any(|f| f.path.ends_with("scribe/core/src/streaming/dispatcher.rs")));
    assert!(sources
        .iter()
        .any(|f| f.path.ends_with("scribe/daemon/src/server.rs")));
}
