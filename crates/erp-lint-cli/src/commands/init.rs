//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const CONFIG_FILE: &str = "erp-lint.toml";

const DEFAULT_CONFIG: &str = r#"# erp-lint configuration

# Rule preset: "recommended", "strict", "minimal" or "all"
preset = "recommended"

# Lowest severity that makes `erp-lint check` exit with status 1
fail_on = "error"

[analyzer]
# Directory holding symbol snapshot JSON files (default: current directory)
# root = "./snapshots"

# Glob patterns to exclude from analysis
exclude = [
    "**/bin/**",
    "**/obj/**",
]

# Rule-checker threads (default: available parallelism)
# parallelism = 4

# Rule configurations
# Each rule can be enabled/disabled and have its severity overridden

[rules.dac-forbidden-fields]
enabled = true
# extra_forbidden = ["Tstamp"]

[rules.dac-extension-default-attribute]
enabled = true
# severity = "warning"

# [rules.generic-event-signature]
# enabled = false

[framework]
# Enables rule-checkers aimed at ISV solution certification
isv_specific_analyzers = false
# Types marked with this attribute are skipped
# suppression_attribute = "PXSuppressAnalysisAttribute"
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    write_config(Path::new(CONFIG_FILE), force)?;

    println!("Created {CONFIG_FILE}");
    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE} to configure rules");
    println!("  2. Run: erp-lint check <snapshot-dir>");

    Ok(())
}

fn write_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    Ok(())
}
