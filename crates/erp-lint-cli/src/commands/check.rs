//! Check command implementation.

use anyhow::{Context, Result};
use erp_lint_core::{Analyzer, Config, RuleSet};
use erp_lint_rules::{rule_by_name, Preset};
use std::path::Path;

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Command-line options of `erp-lint check`.
#[derive(Debug)]
pub struct CheckOptions {
    /// Output format.
    pub format: OutputFormat,
    /// Comma-separated rule names or codes.
    pub rules: Option<String>,
    /// Preset overriding the configured one.
    pub preset: Option<String>,
    /// Extra exclude globs.
    pub exclude: Vec<String>,
    /// Enables ISV-specific rule-checkers.
    pub isv: bool,
    /// Rule-checker threads.
    pub jobs: Option<usize>,
}

/// Runs the check command.
pub fn run(path: &Path, options: CheckOptions, source: &ConfigSource) -> Result<()> {
    let mut config = source.load()?;
    if options.isv {
        config.framework.isv_specific_analyzers = true;
    }
    let fail_on = config.fail_on_severity().context("Invalid fail_on")?;

    let rules = match options.rules.as_deref() {
        Some(filter) => filter_rules(filter, &config),
        None => select_preset(options.preset.as_deref(), &config)?.rules(&config),
    };

    let mut builder = Analyzer::builder()
        .root(path)
        .rules(rules)
        .excludes(options.exclude)
        .config(config);
    if let Some(jobs) = options.jobs {
        builder = builder.parallelism(jobs);
    }

    let analyzer = builder.build().context("Failed to build analyzer")?;

    tracing::info!("Analyzing {:?} with {} rules", path, analyzer.rule_count());

    let result = analyzer.analyze().context("Analysis failed")?;

    super::output::print(&result, options.format)?;

    if result.has_violations_at(fail_on) {
        std::process::exit(1);
    }

    Ok(())
}

fn select_preset(cli: Option<&str>, config: &Config) -> Result<Preset> {
    match cli.or(config.preset.as_deref()) {
        Some(name) => name.parse().map_err(anyhow::Error::msg),
        None => Ok(Preset::Recommended),
    }
}

fn filter_rules(filter: &str, config: &Config) -> RuleSet {
    let mut rules = RuleSet::new();
    for name in filter.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match rule_by_name(name, config) {
            Some(rule) => rules.extend(rule),
            None => tracing::warn!("Unknown rule: {}", name),
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_precedence() {
        let config = Config::parse("preset = \"minimal\"").unwrap();
        assert_eq!(select_preset(None, &config).unwrap(), Preset::Minimal);
        assert_eq!(select_preset(Some("all"), &config).unwrap(), Preset::All);
        assert_eq!(select_preset(None, &Config::default()).unwrap(), Preset::Recommended);
        assert!(select_preset(Some("bogus"), &config).is_err());
    }

    #[test]
    fn filter_skips_unknown_rules() {
        let rules = filter_rules(
            "EL1027, constructor-in-graph-extension,,nope",
            &Config::default(),
        );
        assert_eq!(rules.len(), 2);
    }
}
