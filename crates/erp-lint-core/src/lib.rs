//! # erp-lint-core
//!
//! Semantic model builder and parallel rule aggregation for linting code
//! written against an ERP business-object framework.
//!
//! The engine consumes a typed symbol graph produced by an external front
//! end and provides:
//!
//! - [`SymbolGraph`] as the front-end seam, with [`SymbolSnapshot`] as a
//!   JSON-backed implementation
//! - [`semantic`] models of graphs, graph events and DACs, built by
//!   linearizing hierarchies and resolving override chains
//! - [`SymbolRule`] for rule-checkers and [`RuleAggregator`] to run them
//!   concurrently with cooperative cancellation
//! - [`Analyzer`] for discovering snapshots and producing a [`LintResult`]
//!
//! ## Example
//!
//! ```ignore
//! use erp_lint_core::{Analyzer, Config};
//!
//! let analyzer = Analyzer::builder()
//!     .root("./snapshots")
//!     .config(Config::default())
//!     .dac_rule(MyDacRule::new())
//!     .build()?;
//!
//! let result = analyzer.analyze()?;
//! for violation in &result.violations {
//!     println!("{violation}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod aggregator;
mod analyzer;
mod cancel;
mod config;
mod context;
mod rule;
mod symbols;
mod types;

pub mod semantic;

pub use aggregator::{
    build_pool, AnalyzeError, CheckError, DiagnosticSink, RuleAggregator, SemanticModel,
};
pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError};
pub use cancel::{CancellationToken, Cancelled};
pub use config::{AnalyzerConfig, Config, ConfigError, RuleConfig};
pub use context::{AnalysisContext, FrameworkContext};
pub use rule::{DacRuleBox, GraphRuleBox, RuleInfo, RuleSet, RuleTarget, SymbolRule};
pub use symbols::{
    AttributeApplication, AttributeValue, InitDelegate, Member, MemberKind, MemberRef, Parameter,
    SnapshotError, SymbolGraph, SymbolSnapshot, TypeRef, TypeSymbol,
};
pub use types::{Label, LintResult, Location, Severity, Suggestion, Violation, ViolationDiagnostic};
