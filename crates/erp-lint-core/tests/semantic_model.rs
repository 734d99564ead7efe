//! Semantic models built from a JSON snapshot fixture.

use erp_lint_core::semantic::{
    BoundType, DacSemanticModel, EventKind, GraphEventSemanticModel, InitializerKind,
    SignatureShape, TypeKind,
};
use erp_lint_core::{
    AnalysisContext, CancellationToken, FrameworkContext, SymbolGraph, SymbolSnapshot,
};
use std::path::{Path, PathBuf};

fn fixture() -> SymbolSnapshot {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sales_order.json");
    SymbolSnapshot::from_file(&path).expect("fixture loads")
}

#[test]
fn snapshot_source_comes_from_json() {
    let snapshot = fixture();
    assert_eq!(snapshot.source(), Some(Path::new("SalesOrder.cs")));
    assert!(snapshot.type_symbol("SOOrderEntry").is_some());
}

#[test]
fn graph_extension_event_model() {
    let snapshot = fixture();
    let framework = FrameworkContext::default();
    let token = CancellationToken::new();
    let ctx = AnalysisContext::new(&snapshot, &framework, &token);

    let symbol = snapshot.type_symbol("SOOrderEntryExt").expect("type exists");
    let models = GraphEventSemanticModel::infer_models(&ctx, &symbol).expect("not cancelled");
    assert_eq!(models.len(), 1);
    let model = &models[0];

    let graph = model.graph();
    assert_eq!(graph.kind, TypeKind::Extension);
    assert!(graph.views.contains("Document"));
    assert!(graph.actions.contains("Save"));
    assert!(graph.is_active_method.is_some());
    assert_eq!(graph.initializers_of(InitializerKind::InitializeMethod).count(), 0);
    assert_eq!(graph.instance_constructors.len(), 1);

    let selected = model
        .events_by_name(EventKind::RowSelected)
        .and_then(|events| events.get("SOOrder_RowSelected"))
        .expect("row selected hook");
    assert_eq!(selected.item().descriptor.shape, SignatureShape::Generic);
    assert_eq!(selected.chain().len(), 2);

    let verifying: Vec<_> = model.events(EventKind::FieldVerifying).collect();
    assert_eq!(verifying.len(), 1);
    assert_eq!(verifying[0].item().field_name.as_deref(), Some("OrderNbr"));
}

#[test]
fn dac_extension_bound_types() {
    let snapshot = fixture();
    let framework = FrameworkContext::default();
    let token = CancellationToken::new();
    let ctx = AnalysisContext::new(&snapshot, &framework, &token);

    let symbol = snapshot.type_symbol("SOOrderExt").expect("type exists");
    let model = DacSemanticModel::new(&ctx, &symbol).expect("not cancelled");

    assert_eq!(model.kind, TypeKind::Extension);
    assert_eq!(model.bound_type("OrderNbr"), BoundType::DbBound);
    assert_eq!(model.bound_type("CuryTotal"), BoundType::DbBound);
    assert_eq!(model.bound_type("UsrNote"), BoundType::Unbound);
    assert!(model.field_classes.contains("orderNbr"));
    assert_eq!(model.declared_properties().count(), 3);
}

#[test]
fn helper_types_have_no_models() {
    let snapshot = fixture();
    let framework = FrameworkContext::default();
    let token = CancellationToken::new();
    let ctx = AnalysisContext::new(&snapshot, &framework, &token);

    let symbol = snapshot.type_symbol("SOOrderEntryHelper").expect("type exists");
    assert!(GraphEventSemanticModel::infer_models(&ctx, &symbol)
        .expect("not cancelled")
        .is_empty());
    assert!(DacSemanticModel::infer_models(&ctx, &symbol)
        .expect("not cancelled")
        .is_empty());
}

#[test]
fn analyzer_discovers_fixture_and_attributes_violations() {
    use erp_lint_core::{Analyzer, CheckError, DiagnosticSink, Location, SymbolRule};

    struct ExtensionProperties;

    impl SymbolRule<DacSemanticModel> for ExtensionProperties {
        fn name(&self) -> &'static str {
            "extension-properties"
        }
        fn code(&self) -> &'static str {
            "T200"
        }
        fn should_analyze(&self, _ctx: &AnalysisContext<'_>, model: &DacSemanticModel) -> bool {
            model.is_extension()
        }
        fn analyze(
            &self,
            _ctx: &AnalysisContext<'_>,
            model: &DacSemanticModel,
            sink: &DiagnosticSink,
        ) -> Result<(), CheckError> {
            for property in model.declared_properties() {
                sink.report(self.member_violation(&property.item().member, property.name()));
            }
            sink.report(self.violation(Location::default(), "summary"));
            Ok(())
        }
    }

    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::copy(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sales_order.json"),
        dir.path().join("sales_order.json"),
    )
    .expect("copy fixture");
    std::fs::write(dir.path().join("broken.json"), "{ not json").expect("write");

    let analyzer = Analyzer::builder()
        .root(dir.path())
        .dac_rule(ExtensionProperties)
        .build()
        .expect("analyzer");
    let result = analyzer.analyze().expect("analysis");

    assert_eq!(result.snapshots_checked, 1);
    assert_eq!(result.violations.len(), 4);
    let files: Vec<String> = result
        .violations
        .iter()
        .map(|v| v.location.file.display().to_string())
        .collect();
    assert_eq!(
        files,
        vec!["SOOrderExt.cs", "SOOrderExt.cs", "SOOrderExt.cs", "SalesOrder.cs"]
    );

    let strict = Analyzer::builder()
        .root(dir.path())
        .dac_rule(ExtensionProperties)
        .fail_on_invalid_snapshot(true)
        .build()
        .expect("analyzer");
    assert!(strict.analyze().is_err());
}
