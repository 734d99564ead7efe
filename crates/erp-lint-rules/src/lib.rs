//! # erp-lint-rules
//!
//! Built-in rule-checkers for erp-lint.
//!
//! Each rule consumes a semantic model from `erp-lint-core`: graph rules read
//! a [`GraphEventSemanticModel`](erp_lint_core::semantic::GraphEventSemanticModel),
//! DAC rules read a [`DacSemanticModel`](erp_lint_core::semantic::DacSemanticModel).
//!
//! ## Available Rules
//!
//! | Code | Name | Model | Description |
//! |------|------|-------|-------------|
//! | EL1027 | `dac-forbidden-fields` | DAC | Forbids fields reserved by the framework |
//! | EL1030 | `dac-extension-default-attribute` | DAC | Flags defaults that break stored records |
//! | EL1040 | `constructor-in-graph-extension` | Graph | Forbids extension constructors |
//! | EL1041 | `generic-event-signature` | Graph | Suggests generic event handler signatures (ISV) |
//!
//! ## Usage
//!
//! ```ignore
//! use erp_lint_core::{Analyzer, Config};
//! use erp_lint_rules::{ConstructorInGraphExtension, DacForbiddenFields};
//!
//! let analyzer = Analyzer::builder()
//!     .root("./snapshots")
//!     .dac_rule(DacForbiddenFields::new())
//!     .graph_rule(ConstructorInGraphExtension::new())
//!     .build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod constructor_in_graph_extension;
pub mod dac_extension_default_attribute;
pub mod dac_forbidden_fields;
pub mod generic_event_signature;
mod presets;

pub use constructor_in_graph_extension::ConstructorInGraphExtension;
pub use dac_extension_default_attribute::DacExtensionDefaultAttribute;
pub use dac_forbidden_fields::DacForbiddenFields;
pub use generic_event_signature::GenericEventSignature;
pub use presets::{all_rules, minimal_rules, recommended_rules, rule_by_name, strict_rules, Preset};

/// Re-export core types for convenience.
pub use erp_lint_core::{RuleSet, Severity, SymbolRule, Violation};
