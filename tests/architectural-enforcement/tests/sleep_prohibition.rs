//! Integration Test: Sleep Prohibition
//!
//! **Policy**: production code MUST NOT sleep. Streams wait on the provider,
//! never on a timer.
//! **Exceptions**: test code.

use architectural_enforcement::{code_part, is_test_code, production_sources};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ Sleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");
        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - Test code (#[cfg(test)] modules, #[test] functions)");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}

fn find_sleep_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = file.lines();
        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line);
            if !(code.contains("::sleep(") || code.contains(".sleep(")) {
                continue;
            }
            if is_test_code(&lines, idx) {
                continue;
            }
            violations.push(format!(
                "{}:{} - {}",
                file.path.display(),
                idx + 1,
                line.trim()
            ));
        }
    }
    violations
}
