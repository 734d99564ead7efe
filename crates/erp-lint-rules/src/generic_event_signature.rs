//! Rule suggesting the generic signature for event handlers.
//!
//! Classic handlers (`SOOrder_RowSelected(PXCache, PXRowSelectedEventArgs)`)
//! rely on a naming convention the compiler cannot verify. The generic form
//! (`_(Events.RowSelected<SOOrder> e)`) is type-checked and overrides the
//! classic handler of the same event across extensions.
//!
//! Only handlers declared in the analyzed type are reported. The rule runs
//! only when ISV-specific analysis is enabled.

use erp_lint_core::semantic::{
    EventCategory, EventHookInfo, GraphEventSemanticModel, SignatureShape,
};
use erp_lint_core::{AnalysisContext, CheckError, DiagnosticSink, Severity, Suggestion, SymbolRule};
use std::sync::Arc;

/// Rule code for generic-event-signature.
pub const CODE: &str = "EL1041";

/// Rule name for generic-event-signature.
pub const NAME: &str = "generic-event-signature";

/// Suggests rewriting classic event handlers to the generic signature.
#[derive(Debug, Clone)]
pub struct GenericEventSignature {
    /// Severity level.
    pub severity: Severity,
}

impl Default for GenericEventSignature {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericEventSignature {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Info,
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

fn generic_signature(hook: &EventHookInfo) -> String {
    let kind = hook.kind();
    match (kind.category(), &hook.dac_name, &hook.field_name) {
        (EventCategory::Field, Some(dac), Some(field)) => {
            format!("Events.{kind}<{dac}.{}>", lower_first(field))
        }
        (_, Some(dac), _) => format!("Events.{kind}<{dac}>"),
        _ => format!("Events.{kind}<...>"),
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

impl SymbolRule<GraphEventSemanticModel> for GenericEventSignature {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Suggests the generic event handler signature over the classic one"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn isv_specific(&self) -> bool {
        true
    }

    fn should_analyze(&self, _ctx: &AnalysisContext<'_>, model: &GraphEventSemanticModel) -> bool {
        model.event_count() > 0
    }

    fn analyze(
        &self,
        ctx: &AnalysisContext<'_>,
        model: &GraphEventSemanticModel,
        sink: &DiagnosticSink,
    ) -> Result<(), CheckError> {
        let symbol = &model.graph().symbol;
        for event in model.all_events() {
            ctx.check_cancelled()?;
            let hook = event.item();
            if hook.descriptor.shape != SignatureShape::Default
                || !Arc::ptr_eq(hook.member.owner(), symbol)
            {
                continue;
            }

            sink.report(
                self.member_violation(
                    &hook.member,
                    format!(
                        "Event handler '{}' uses the classic signature",
                        hook.member.name()
                    ),
                )
                .with_suggestion(Suggestion::new(format!(
                    "Declare it as `_({} e)`",
                    generic_signature(hook)
                ))),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_lint_core::{
        Analyzer, CancellationToken, Config, FrameworkContext, InitDelegate, Member, SymbolGraph,
        SymbolSnapshot, TypeRef, TypeSymbol, Violation,
    };

    fn classic(name: &str, args: &str) -> Member {
        Member::method(name)
            .with_param("cache", TypeRef::new("PXCache"))
            .with_param("e", TypeRef::new(args))
    }

    fn check(types: Vec<TypeSymbol>, analyzed: &str) -> Vec<Violation> {
        let snapshot = SymbolSnapshot::new(types).expect("valid snapshot");
        let framework = FrameworkContext::default();
        let token = CancellationToken::new();
        let ctx = AnalysisContext::new(&snapshot, &framework, &token);
        let symbol = snapshot.type_symbol(analyzed).expect("type exists");
        let rule = GenericEventSignature::new();
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
            .with_member(classic("SOOrder_RowSelected", "PXRowSelectedEventArgs"))
            .with_member(classic("SOOrder_OrderNbr_FieldUpdated", "PXFieldUpdatedEventArgs"))
    }

    #[test]
    fn test_reports_classic_handlers() {
        let mut violations = check(vec![graph()], "SOOrderEntry");
        violations.sort_by(|a, b| a.message.cmp(&b.message));
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.severity == Severity::Info));
        let suggestions: Vec<&str> = violations
            .iter()
            .filter_map(|v| v.suggestion.as_ref().map(|s| s.message.as_str()))
            .collect();
        assert_eq!(
            suggestions,
            vec![
                "Declare it as `_(Events.FieldUpdated<SOOrder.orderNbr> e)`",
                "Declare it as `_(Events.RowSelected<SOOrder> e)`",
            ]
        );
    }

    #[test]
    fn test_ignores_inherited_and_generic_handlers() {
        let extension = TypeSymbol::new("SOOrderEntryExt")
            .with_base(TypeRef::generic("PXGraphExtension", vec![TypeRef::new("SOOrderEntry")]))
            .with_member(Member::method("_").with_param(
                "e",
                TypeRef::generic("Events.RowSelected", vec![TypeRef::new("SOOrder")]),
            ));

        let violations = check(vec![graph(), extension], "SOOrderEntryExt");
        assert!(violations.is_empty());
    }

    #[test]
    fn test_registered_graph_reports_each_handler_once() {
        let registrar = TypeSymbol::new("Registrar").with_init_delegate(InitDelegate {
            graph: "SOOrderEntry".to_string(),
            delegate: "OnOrderEntryCreated".to_string(),
            location: None,
        });
        let snapshot = SymbolSnapshot::new(vec![graph(), registrar]).expect("valid snapshot");
        let config =
            Config::parse("[framework]\nisv_specific_analyzers = true").expect("valid config");
        let analyzer = Analyzer::builder()
            .config(config)
            .graph_rule(GenericEventSignature::new())
            .build()
            .expect("analyzer");

        let result = analyzer.analyze_snapshot(&snapshot).expect("analysis");
        assert_eq!(result.violations.len(), 2);
        let mut messages: Vec<&str> = result
            .violations
            .iter()
            .map(|v| v.message.as_str())
            .collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_is_isv_specific() {
        assert!(SymbolRule::<GraphEventSemanticModel>::isv_specific(&GenericEventSignature::new()));
    }
}
