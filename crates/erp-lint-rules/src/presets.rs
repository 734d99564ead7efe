//! Rule presets for common configurations.

use crate::{
    ConstructorInGraphExtension, DacExtensionDefaultAttribute, DacForbiddenFields,
    GenericEventSignature,
};
use erp_lint_core::{Config, RuleSet, Severity};
use std::str::FromStr;

/// Preset configurations for erp-lint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Recommended rules with sensible defaults.
    Recommended,
    /// Strict rules for certification-grade checks.
    Strict,
    /// Minimal rules for gradual adoption.
    Minimal,
    /// Every built-in rule.
    All,
}

impl Preset {
    /// Returns the rules for this preset, with options read from `config`.
    #[must_use]
    pub fn rules(self, config: &Config) -> RuleSet {
        match self {
            Self::Recommended => recommended_rules(config),
            Self::Strict => strict_rules(config),
            Self::Minimal => minimal_rules(config),
            Self::All => all_rules(config),
        }
    }

    /// Preset name as written in configuration.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Recommended => "recommended",
            Self::Strict => "strict",
            Self::Minimal => "minimal",
            Self::All => "all",
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recommended" => Ok(Self::Recommended),
            "strict" => Ok(Self::Strict),
            "minimal" => Ok(Self::Minimal),
            "all" => Ok(Self::All),
            _ => Err(format!("Unknown preset: {s}")),
        }
    }
}

/// Returns the recommended set of rules.
///
/// Includes:
/// - `dac-forbidden-fields` (EL1027)
/// - `dac-extension-default-attribute` (EL1030)
/// - `constructor-in-graph-extension` (EL1040)
#[must_use]
pub fn recommended_rules(config: &Config) -> RuleSet {
    RuleSet::new()
        .dac_rule(DacForbiddenFields::from_config(config))
        .dac_rule(DacExtensionDefaultAttribute::new())
        .graph_rule(ConstructorInGraphExtension::new())
}

/// Returns the strict set of rules.
///
/// Includes all recommended rules plus `generic-event-signature` (EL1041)
/// raised to a warning. That rule still only runs with ISV-specific analysis
/// enabled.
#[must_use]
pub fn strict_rules(config: &Config) -> RuleSet {
    recommended_rules(config).graph_rule(GenericEventSignature::new().severity(Severity::Warning))
}

/// Returns the minimal set of rules.
///
/// For gradual adoption, only includes `dac-forbidden-fields`.
#[must_use]
pub fn minimal_rules(config: &Config) -> RuleSet {
    RuleSet::new().dac_rule(DacForbiddenFields::from_config(config))
}

/// Returns all available rules with default settings.
#[must_use]
pub fn all_rules(config: &Config) -> RuleSet {
    recommended_rules(config).graph_rule(GenericEventSignature::new())
}

/// Builds a single rule by name or code (e.g. `dac-forbidden-fields` or
/// `EL1027`).
#[must_use]
pub fn rule_by_name(name: &str, config: &Config) -> Option<RuleSet> {
    let rules = RuleSet::new();
    match name {
        crate::dac_forbidden_fields::NAME | crate::dac_forbidden_fields::CODE => {
            Some(rules.dac_rule(DacForbiddenFields::from_config(config)))
        }
        crate::dac_extension_default_attribute::NAME
        | crate::dac_extension_default_attribute::CODE => {
            Some(rules.dac_rule(DacExtensionDefaultAttribute::new()))
        }
        crate::constructor_in_graph_extension::NAME
        | crate::constructor_in_graph_extension::CODE => {
            Some(rules.graph_rule(ConstructorInGraphExtension::new()))
        }
        crate::generic_event_signature::NAME | crate::generic_event_signature::CODE => {
            Some(rules.graph_rule(GenericEventSignature::new()))
        }
        _ => None,
    }
}
