//! List rules command implementation.

use erp_lint_core::Config;
use erp_lint_rules::all_rules;

/// Runs the list-rules command.
pub fn run() {
    println!("Available rules:\n");
    println!(
        "{:<8} {:<34} {:<6} {:<8} Description",
        "Code", "Name", "Model", "Severity"
    );
    println!("{}", "-".repeat(100));

    for rule in all_rules(&Config::default()).describe() {
        let isv = if rule.isv_specific { " (ISV)" } else { "" };
        println!(
            "{:<8} {:<34} {:<6} {:<8} {}{}",
            rule.code,
            rule.name,
            rule.target.to_string(),
            rule.severity.to_string(),
            rule.description,
            isv
        );
    }

    println!("\nPresets:");
    println!("  recommended  - EL1027, EL1030, EL1040 (default)");
    println!("  strict       - recommended plus EL1041 as a warning");
    println!("  minimal      - EL1027 only (for gradual adoption)");
    println!("  all          - every rule with default settings");

    println!("\nISV-specific rules run only with --isv or");
    println!("  [framework] isv_specific_analyzers = true");

    println!("\nUse --rules to filter specific rules, e.g.:");
    println!("  erp-lint check --rules dac-forbidden-fields,constructor-in-graph-extension");
    println!("  erp-lint check --rules EL1027,EL1030");
}
