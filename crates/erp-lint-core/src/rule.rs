//! Rule-checker traits.

use crate::aggregator::{CheckError, DiagnosticSink};
use crate::context::AnalysisContext;
use crate::semantic::{DacSemanticModel, GraphEventSemanticModel};
use crate::symbols::MemberRef;
use crate::types::{Location, Severity, Violation};

/// A rule-checker run against one semantic model at a time.
///
/// Checkers of one aggregator run concurrently over the same model. They may
/// only report through the sink.
///
/// # Example
///
/// ```ignore
/// use erp_lint_core::{AnalysisContext, CheckError, DiagnosticSink, SymbolRule};
/// use erp_lint_core::semantic::DacSemanticModel;
///
/// pub struct NoEmptyDac;
///
/// impl SymbolRule<DacSemanticModel> for NoEmptyDac {
///     fn name(&self) -> &'static str { "no-empty-dac" }
///     fn code(&self) -> &'static str { "EL9000" }
///
///     fn analyze(
///         &self,
///         _ctx: &AnalysisContext<'_>,
///         dac: &DacSemanticModel,
///         sink: &DiagnosticSink,
///     ) -> Result<(), CheckError> {
///         if dac.properties.is_empty() {
///             sink.report(self.violation(Location::default(), "DAC declares no fields"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait SymbolRule<M>: Send + Sync {
    /// Returns the kebab-case name of this rule (e.g., "dac-forbidden-fields").
    fn name(&self) -> &'static str;

    /// Returns the rule code (e.g., "EL1027").
    fn code(&self) -> &'static str;

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Returns the default severity for violations from this rule.
    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    /// Whether the rule only runs when ISV-specific analysis is enabled.
    fn isv_specific(&self) -> bool {
        false
    }

    /// Cheap pre-check deciding whether [`analyze`](Self::analyze) runs.
    fn should_analyze(&self, _ctx: &AnalysisContext<'_>, _model: &M) -> bool {
        true
    }

    /// Checks one model, reporting violations through `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::Cancelled`] when the shared token is observed,
    /// or another [`CheckError`] when the checker cannot complete.
    fn analyze(
        &self,
        ctx: &AnalysisContext<'_>,
        model: &M,
        sink: &DiagnosticSink,
    ) -> Result<(), CheckError>;

    /// Creates a violation with this rule's identity and default severity.
    fn violation(&self, location: Location, message: impl Into<String>) -> Violation
    where
        Self: Sized,
    {
        Violation::new(
            self.code(),
            self.name(),
            self.default_severity(),
            location,
            message,
        )
    }

    /// Creates a violation located at `member`.
    fn member_violation(&self, member: &MemberRef, message: impl Into<String>) -> Violation
    where
        Self: Sized,
    {
        self.violation(member.location().cloned().unwrap_or_default(), message)
            .with_symbol(member.owner().name.clone())
    }
}

/// Boxed graph rule-checker.
pub type GraphRuleBox = Box<dyn SymbolRule<GraphEventSemanticModel>>;

/// Boxed DAC rule-checker.
pub type DacRuleBox = Box<dyn SymbolRule<DacSemanticModel>>;

/// Model family a rule consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleTarget {
    /// Graphs and graph extensions.
    Graph,
    /// DACs and DAC extensions.
    Dac,
}

impl std::fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Graph => write!(f, "graph"),
            Self::Dac => write!(f, "dac"),
        }
    }
}

/// Metadata of a registered rule.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RuleInfo {
    /// Rule name.
    pub name: &'static str,
    /// Rule code.
    pub code: &'static str,
    /// Description.
    pub description: &'static str,
    /// Default severity.
    pub severity: Severity,
    /// Model family.
    pub target: RuleTarget,
    /// Whether the rule is ISV-specific.
    pub isv_specific: bool,
}

impl RuleInfo {
    fn of<M>(rule: &dyn SymbolRule<M>, target: RuleTarget) -> Self {
        Self {
            name: rule.name(),
            code: rule.code(),
            description: rule.description(),
            severity: rule.default_severity(),
            target,
            isv_specific: rule.isv_specific(),
        }
    }
}

/// Graph and DAC rule-checkers run by one analyzer.
#[derive(Default)]
pub struct RuleSet {
    /// Graph rule-checkers.
    pub graph: Vec<GraphRuleBox>,
    /// DAC rule-checkers.
    pub dac: Vec<DacRuleBox>,
}

impl RuleSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a graph rule-checker.
    #[must_use]
    pub fn graph_rule<R: SymbolRule<GraphEventSemanticModel> + 'static>(mut self, rule: R) -> Self {
        self.graph.push(Box::new(rule));
        self
    }

    /// Adds a DAC rule-checker.
    #[must_use]
    pub fn dac_rule<R: SymbolRule<DacSemanticModel> + 'static>(mut self, rule: R) -> Self {
        self.dac.push(Box::new(rule));
        self
    }

    /// Moves every rule of `other` into this set.
    pub fn extend(&mut self, other: Self) {
        self.graph.extend(other.graph);
        self.dac.extend(other.dac);
    }

    /// Keeps only the rules for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.graph.retain(|r| keep(r.name()));
        self.dac.retain(|r| keep(r.name()));
    }

    /// Total number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.len() + self.dac.len()
    }

    /// Returns `true` if the set has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty() && self.dac.is_empty()
    }

    /// Metadata of every rule, graph rules first.
    #[must_use]
    pub fn describe(&self) -> Vec<RuleInfo> {
        self.graph
            .iter()
            .map(|r| RuleInfo::of(r.as_ref(), RuleTarget::Graph))
            .chain(self.dac.iter().map(|r| RuleInfo::of(r.as_ref(), RuleTarget::Dac)))
            .collect()
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.describe().iter().map(|r| r.name))
            .finish()
    }
}
