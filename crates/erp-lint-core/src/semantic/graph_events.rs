//! Event model of a graph: every classified event hook, grouped by kind.

use crate::cancel::Cancelled;
use crate::context::AnalysisContext;
use crate::semantic::events::{EventHookInfo, EventKind};
use crate::semantic::graph::{layer_members, GraphSemanticModel, InstanceCreatedHandlers};
use crate::semantic::hierarchy::TypeKind;
use crate::semantic::overridable::{CollectionBuilder, OverridableItem, OverridableItemsCollection};
use crate::symbols::TypeSymbol;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A graph model extended with its event hooks.
///
/// Hooks are walked over the same layers as the base model, so a hook in an
/// extension overrides the same-keyed hook of the graph or of a lower
/// extension.
#[derive(Debug, Clone)]
pub struct GraphEventSemanticModel {
    base: GraphSemanticModel,
    events: BTreeMap<EventKind, OverridableItemsCollection<EventHookInfo>>,
}

impl GraphEventSemanticModel {
    /// Classifies the hooks of `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed.
    pub fn new(ctx: &AnalysisContext<'_>, base: GraphSemanticModel) -> Result<Self, Cancelled> {
        if base.kind == TypeKind::None {
            return Ok(Self {
                base,
                events: BTreeMap::new(),
            });
        }

        let mut builders: BTreeMap<EventKind, CollectionBuilder<EventHookInfo>> = BTreeMap::new();
        for layer in &base.layers {
            ctx.check_cancelled()?;
            for member in layer_members(layer) {
                ctx.check_cancelled()?;
                let Some(info) = EventHookInfo::from_member(member, ctx.framework) else {
                    continue;
                };
                builders
                    .entry(info.kind())
                    .or_default()
                    .add(&info.key(), layer.index(), info);
            }
        }

        let events = builders
            .into_iter()
            .map(|(kind, builder)| (kind, builder.finish()))
            .collect();
        Ok(Self { base, events })
    }

    /// Builds event models for every graph model inferred from `symbol`.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed.
    pub fn infer_models(
        ctx: &AnalysisContext<'_>,
        symbol: &Arc<TypeSymbol>,
    ) -> Result<Vec<Self>, Cancelled> {
        GraphSemanticModel::infer_models(ctx, symbol)?
            .into_iter()
            .map(|base| Self::new(ctx, base))
            .collect()
    }

    /// Builds the event model of `symbol` alone, with registered handlers
    /// attached to its graph model.
    ///
    /// Returns `None` for types that are neither graphs nor graph extensions.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed.
    pub fn explicit_model(
        ctx: &AnalysisContext<'_>,
        symbol: &Arc<TypeSymbol>,
        handlers: &InstanceCreatedHandlers,
    ) -> Result<Option<Self>, Cancelled> {
        let base = GraphSemanticModel::with_registered_handlers(ctx, symbol, handlers)?;
        if base.kind == TypeKind::None {
            return Ok(None);
        }
        Self::new(ctx, base).map(Some)
    }

    /// The underlying graph model.
    #[must_use]
    pub fn graph(&self) -> &GraphSemanticModel {
        &self.base
    }

    /// Hooks of `kind` keyed by qualified name.
    #[must_use]
    pub fn events_by_name(
        &self,
        kind: EventKind,
    ) -> Option<&OverridableItemsCollection<EventHookInfo>> {
        self.events.get(&kind)
    }

    /// Hooks of `kind`, unordered.
    pub fn events(&self, kind: EventKind) -> impl Iterator<Item = &OverridableItem<EventHookInfo>> {
        self.events.get(&kind).into_iter().flat_map(OverridableItemsCollection::iter)
    }

    /// All hooks of every kind.
    pub fn all_events(&self) -> impl Iterator<Item = &OverridableItem<EventHookInfo>> {
        self.events.values().flat_map(OverridableItemsCollection::iter)
    }

    /// Number of distinct hooks across all kinds.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.values().map(OverridableItemsCollection::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::context::FrameworkContext;
    use crate::semantic::events::SignatureShape;
    use crate::symbols::{Member, SymbolGraph, SymbolSnapshot, TypeRef};

    fn classic(name: &str, args: &str) -> Member {
        Member::method(name)
            .with_param("cache", TypeRef::new("PXCache"))
            .with_param("e", TypeRef::new(args))
    }

    fn snapshot() -> SymbolSnapshot {
        SymbolSnapshot::new(vec![
            TypeSymbol::new("SOOrderEntry")
                .with_base(TypeRef::generic("PXGraph", vec![TypeRef::new("SOOrderEntry")]))
                .with_member(classic("SOOrder_RowSelected", "PXRowSelectedEventArgs"))
                .with_member(classic("SOOrder_OrderNbr_FieldUpdated", "PXFieldUpdatedEventArgs"))
                .with_member(classic("Helper_Method", "PXRowSelectedEventArgs_"))
                .with_member(Member::method("Refresh")),
            TypeSymbol::new("SOOrderEntryExt")
                .with_base(TypeRef::generic(
                    "PXGraphExtension",
                    vec![TypeRef::new("SOOrderEntry")],
                ))
                .with_member(Member::method("_").with_param(
                    "e",
                    TypeRef::generic("Events.RowSelected", vec![TypeRef::new("SOOrder")]),
                ))
                .with_member(classic("SOOrder_RowInserted", "PXRowInsertedEventArgs")),
        ])
        .expect("valid snapshot")
    }

    fn event_model(name: &str) -> GraphEventSemanticModel {
        let snapshot = snapshot();
        let framework = FrameworkContext::default();
        let token = CancellationToken::new();
        let ctx = AnalysisContext::new(&snapshot, &framework, &token);
        let symbol = snapshot.type_symbol(name).expect("type exists");
        GraphEventSemanticModel::infer_models(&ctx, &symbol)
            .expect("not cancelled")
            .pop()
            .expect("a model")
    }

    #[test]
    fn groups_hooks_by_kind() {
        let model = event_model("SOOrderEntry");
        assert_eq!(model.event_count(), 2);
        assert_eq!(model.events(EventKind::RowSelected).count(), 1);
        assert!(model
            .events_by_name(EventKind::FieldUpdated)
            .is_some_and(|events| events.contains("SOOrder_OrderNbr_FieldUpdated")));
        assert!(model.events_by_name(EventKind::RowDeleted).is_none());
        assert_eq!(model.events(EventKind::RowDeleted).count(), 0);
    }

    #[test]
    fn generic_hook_overrides_classic_hook() {
        let model = event_model("SOOrderEntryExt");
        let selected = model
            .events_by_name(EventKind::RowSelected)
            .and_then(|events| events.get("SOOrder_RowSelected"))
            .expect("hook");

        assert_eq!(selected.item().descriptor.shape, SignatureShape::Generic);
        assert_eq!(selected.item().member.owner().name, "SOOrderEntryExt");
        let overridden: Vec<SignatureShape> = selected
            .just_overridden_items()
            .map(|info| info.descriptor.shape)
            .collect();
        assert_eq!(overridden, vec![SignatureShape::Default]);
        assert_eq!(model.all_events().count(), 3);
    }

    #[test]
    fn non_graph_has_no_events() {
        let snapshot = snapshot();
        let framework = FrameworkContext::default();
        let token = CancellationToken::new();
        let ctx = AnalysisContext::new(&snapshot, &framework, &token);
        let base = GraphSemanticModel::new(&ctx, &Arc::new(TypeSymbol::new("Loose")))
            .expect("not cancelled");
        let model = GraphEventSemanticModel::new(&ctx, base).expect("not cancelled");
        assert_eq!(model.event_count(), 0);
        assert_eq!(model.all_events().count(), 0);
    }
}
