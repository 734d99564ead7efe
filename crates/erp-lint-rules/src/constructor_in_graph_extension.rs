//! Rule to forbid instance constructors in graph extensions.
//!
//! # Rationale
//!
//! Graph extensions are created before the graph they extend is fully
//! initialized. Code in an extension constructor observes a half-built graph;
//! initialization belongs in the `Initialize` override, which runs after the
//! graph and all lower extensions are ready.

use erp_lint_core::semantic::GraphEventSemanticModel;
use erp_lint_core::{AnalysisContext, CheckError, DiagnosticSink, Severity, Suggestion, SymbolRule};

/// Rule code for constructor-in-graph-extension.
pub const CODE: &str = "EL1040";

/// Rule name for constructor-in-graph-extension.
pub const NAME: &str = "constructor-in-graph-extension";

/// Forbids instance constructors in graph extensions.
#[derive(Debug, Clone)]
pub struct ConstructorInGraphExtension {
    /// Severity level.
    pub severity: Severity,
}

impl Default for ConstructorInGraphExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructorInGraphExtension {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl SymbolRule<GraphEventSemanticModel> for ConstructorInGraphExtension {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Graph extensions must initialize in Initialize, not in constructors"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn should_analyze(&self, _ctx: &AnalysisContext<'_>, model: &GraphEventSemanticModel) -> bool {
        model.graph().is_extension()
    }

    fn analyze(
        &self,
        ctx: &AnalysisContext<'_>,
        model: &GraphEventSemanticModel,
        sink: &DiagnosticSink,
    ) -> Result<(), CheckError> {
        let graph = model.graph();
        for constructor in &graph.instance_constructors {
            ctx.check_cancelled()?;
            sink.report(
                self.member_violation(
                    constructor,
                    format!(
                        "Graph extension '{}' declares an instance constructor",
                        graph.symbol.name
                    ),
                )
                .with_suggestion(Suggestion::new(
                    "Move the initialization logic into an override of Initialize()",
                )),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_lint_core::{
        CancellationToken, FrameworkContext, Location, Member, MemberKind, SymbolGraph,
        SymbolSnapshot, TypeRef, TypeSymbol, Violation,
    };
    use std::path::PathBuf;

    fn check(types: Vec<TypeSymbol>, analyzed: &str) -> Vec<Violation> {
        let snapshot = SymbolSnapshot::new(types).expect("valid snapshot");
        let framework = FrameworkContext::default();
        let token = CancellationToken::new();
        let ctx = AnalysisContext::new(&snapshot, &framework, &token);
        let symbol = snapshot.type_symbol(analyzed).expect("type exists");
        let rule = ConstructorInGraphExtension::new();
        let sink = DiagnosticSink::new();
        for model in GraphEventSemanticModel::infer_models(&ctx, &symbol).expect("not cancelled") {
            if rule.should_analyze(&ctx, &model) {
                rule.analyze(&ctx, &model, &sink).expect("check succeeds");
            }
        }
        sink.into_violations()
    }

    fn graph() -> TypeSymbol {
        TypeSymbol::new("SOOrderEntry")
            .with_base(TypeRef::generic("PXGraph", vec![TypeRef::new("SOOrderEntry")]))
            .with_member(Member::new(".ctor", MemberKind::Constructor))
    }

    #[test]
    fn test_detects_extension_constructor() {
        let location = Location::new(PathBuf::from("SOOrderEntryExt.cs"), 5, 9);
        let extension = TypeSymbol::new("SOOrderEntryExt")
            .with_base(TypeRef::generic("PXGraphExtension", vec![TypeRef::new("SOOrderEntry")]))
            .with_member(Member::new(".ctor", MemberKind::Constructor).at(location.clone()))
            .with_member(Member::new(".cctor", MemberKind::StaticConstructor));

        let violations = check(vec![graph(), extension], "SOOrderEntryExt");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, CODE);
        assert_eq!(violations[0].location, location);
        assert_eq!(violations[0].symbol.as_deref(), Some("SOOrderEntryExt"));
    }

    #[test]
    fn test_allows_initialize_override() {
        let extension = TypeSymbol::new("SOOrderEntryExt")
            .with_base(TypeRef::generic("PXGraphExtension", vec![TypeRef::new("SOOrderEntry")]))
            .with_member(Member::method("Initialize").overriding());

        assert!(check(vec![graph(), extension], "SOOrderEntryExt").is_empty());
    }

    #[test]
    fn test_allows_graph_constructor() {
        assert!(check(vec![graph()], "SOOrderEntry").is_empty());
    }
}
