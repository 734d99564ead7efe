//! Graph semantic model.

use crate::cancel::Cancelled;
use crate::context::AnalysisContext;
use crate::semantic::hierarchy::{self, Family, TypeKind, TypeLayer};
use crate::semantic::overridable::OverridableItemsCollection;
use crate::symbols::{InitDelegate, MemberKind, MemberRef, TypeSymbol};
use crate::types::Location;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// How a graph gets initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitializerKind {
    /// Instance constructor of a graph.
    InstanceConstructor,
    /// `Initialize` override of a graph extension.
    InitializeMethod,
    /// Handler registered to run when a graph instance is created.
    InstanceCreatedDelegate,
}

/// One initialization point of a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphInitializer {
    /// Initializer kind.
    pub kind: InitializerKind,
    /// Constructor, method or delegate name.
    pub name: String,
    /// Type declaring the initializer.
    pub declared_in: String,
    /// Source location.
    pub location: Option<Location>,
}

impl GraphInitializer {
    fn from_member(kind: InitializerKind, member: &MemberRef) -> Self {
        Self {
            kind,
            name: member.name().to_string(),
            declared_in: member.owner().name.clone(),
            location: member.location().cloned(),
        }
    }

    fn from_delegate(declared_in: &TypeSymbol, delegate: &InitDelegate) -> Self {
        Self {
            kind: InitializerKind::InstanceCreatedDelegate,
            name: delegate.delegate.clone(),
            declared_in: declared_in.name.clone(),
            location: delegate
                .location
                .clone()
                .or_else(|| declared_in.location.clone()),
        }
    }
}

/// Instance-created handlers of a whole symbol graph, grouped by the graph
/// they are registered for.
#[derive(Debug, Clone, Default)]
pub struct InstanceCreatedHandlers {
    by_graph: HashMap<String, Vec<GraphInitializer>>,
}

impl InstanceCreatedHandlers {
    /// Collects the handlers every type of `ctx.graph` registers.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed.
    pub fn collect(ctx: &AnalysisContext<'_>) -> Result<Self, Cancelled> {
        let mut by_graph: HashMap<String, Vec<GraphInitializer>> = HashMap::new();
        for symbol in ctx.graph.types() {
            ctx.check_cancelled()?;
            for delegate in &symbol.init_delegates {
                by_graph
                    .entry(delegate.graph.clone())
                    .or_default()
                    .push(GraphInitializer::from_delegate(&symbol, delegate));
            }
        }
        Ok(Self { by_graph })
    }

    /// Handlers registered for `graph`, in type order.
    #[must_use]
    pub fn for_graph(&self, graph: &str) -> &[GraphInitializer] {
        self.by_graph.get(graph).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if no type registers a handler.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_graph.is_empty()
    }
}

/// Resolved view of a graph or graph extension.
#[derive(Debug, Clone)]
pub struct GraphSemanticModel {
    /// Role of the analyzed type.
    pub kind: TypeKind,
    /// The analyzed type.
    pub symbol: Arc<TypeSymbol>,
    /// The graph itself, or the graph an extension extends.
    pub graph_symbol: Option<Arc<TypeSymbol>>,
    /// Declaration layers, most-base first.
    pub layers: Vec<TypeLayer>,
    /// Static constructors declared on the analyzed type.
    pub static_constructors: Vec<MemberRef>,
    /// Instance constructors declared on the analyzed type.
    pub instance_constructors: Vec<MemberRef>,
    /// Initialization points in declaration order.
    pub initializers: Vec<GraphInitializer>,
    /// Data views.
    pub views: OverridableItemsCollection<MemberRef>,
    /// Methods named after a data view.
    pub view_delegates: OverridableItemsCollection<MemberRef>,
    /// Actions.
    pub actions: OverridableItemsCollection<MemberRef>,
    /// Methods named after an action.
    pub action_handlers: OverridableItemsCollection<MemberRef>,
    /// `IsActive` predicate of an extension.
    pub is_active_method: Option<MemberRef>,
}

impl GraphSemanticModel {
    /// Builds the model for `symbol`.
    ///
    /// Types that are neither graphs nor graph extensions yield a model of
    /// kind [`TypeKind::None`] with empty collections.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed.
    pub fn new(ctx: &AnalysisContext<'_>, symbol: &Arc<TypeSymbol>) -> Result<Self, Cancelled> {
        let hierarchy = hierarchy::linearize(ctx, symbol, Family::Graph)?;
        let mut model = Self::empty(hierarchy.kind, symbol, hierarchy.target, hierarchy.layers);
        if model.kind == TypeKind::None {
            return Ok(model);
        }

        model.collect_constructors(ctx)?;
        model.collect_members(ctx)?;
        debug!(
            graph = %symbol.name,
            kind = ?model.kind,
            layers = model.layers.len(),
            views = model.views.len(),
            actions = model.actions.len(),
            "Built graph model"
        );
        Ok(model)
    }

    fn empty(
        kind: TypeKind,
        symbol: &Arc<TypeSymbol>,
        graph_symbol: Option<Arc<TypeSymbol>>,
        layers: Vec<TypeLayer>,
    ) -> Self {
        Self {
            kind,
            symbol: Arc::clone(symbol),
            graph_symbol,
            layers,
            static_constructors: Vec::new(),
            instance_constructors: Vec::new(),
            initializers: Vec::new(),
            views: OverridableItemsCollection::default(),
            view_delegates: OverridableItemsCollection::default(),
            actions: OverridableItemsCollection::default(),
            action_handlers: OverridableItemsCollection::default(),
            is_active_method: None,
        }
    }

    /// Builds the explicit model of `symbol` plus implicit models of graphs
    /// that `symbol` registers instance-created handlers for.
    ///
    /// A handler targeting the analyzed graph itself is attached to the
    /// explicit model. Graphs carrying the suppression attribute get no
    /// implicit model. When every type of a symbol graph is visited, use
    /// [`with_registered_handlers`](Self::with_registered_handlers) instead so
    /// each graph is modeled once.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed.
    pub fn infer_models(
        ctx: &AnalysisContext<'_>,
        symbol: &Arc<TypeSymbol>,
    ) -> Result<Vec<Self>, Cancelled> {
        let mut models = Vec::new();
        let explicit = Self::new(ctx, symbol)?;
        if explicit.kind != TypeKind::None {
            models.push(explicit);
        }

        for delegate in &symbol.init_delegates {
            ctx.check_cancelled()?;
            let initializer = GraphInitializer::from_delegate(symbol, delegate);

            if let Some(model) = models
                .iter_mut()
                .find(|m| m.kind == TypeKind::Primary && m.symbol.name == delegate.graph)
            {
                model.initializers.push(initializer);
                continue;
            }

            let Some(target) = ctx.graph.type_symbol(&delegate.graph) else {
                debug!(
                    graph = %delegate.graph,
                    "Instance-created handler targets an unknown graph"
                );
                continue;
            };
            if ctx.framework.is_analysis_suppressed(&target) {
                continue;
            }
            let mut implicit = Self::new(ctx, &target)?;
            if implicit.kind != TypeKind::Primary {
                continue;
            }
            implicit.initializers.push(initializer);
            models.push(implicit);
        }

        Ok(models)
    }

    /// Builds the model of `symbol` alone, with the instance-created
    /// handlers any type registers for it attached as initializers.
    ///
    /// Unlike [`infer_models`](Self::infer_models), no implicit models of
    /// other graphs are produced, so every graph of a symbol graph is modeled
    /// exactly once when each type is visited.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed.
    pub fn with_registered_handlers(
        ctx: &AnalysisContext<'_>,
        symbol: &Arc<TypeSymbol>,
        handlers: &InstanceCreatedHandlers,
    ) -> Result<Self, Cancelled> {
        let mut model = Self::new(ctx, symbol)?;
        if model.kind == TypeKind::Primary {
            model
                .initializers
                .extend(handlers.for_graph(&symbol.name).iter().cloned());
        }
        Ok(model)
    }

    fn collect_constructors(&mut self, ctx: &AnalysisContext<'_>) -> Result<(), Cancelled> {
        let framework = ctx.framework;
        for (index, member) in self.symbol.members.iter().enumerate() {
            ctx.check_cancelled()?;
            let Some(member_ref) = MemberRef::new(Arc::clone(&self.symbol), index) else {
                continue;
            };
            match member.kind {
                MemberKind::StaticConstructor => self.static_constructors.push(member_ref),
                MemberKind::Constructor if !member.is_static => {
                    if self.kind == TypeKind::Primary {
                        self.initializers.push(GraphInitializer::from_member(
                            InitializerKind::InstanceConstructor,
                            &member_ref,
                        ));
                    }
                    self.instance_constructors.push(member_ref);
                }
                MemberKind::Method
                    if self.kind == TypeKind::Extension
                        && member.name == framework.initialize_method
                        && member.parameters.is_empty()
                        && !member.is_static =>
                {
                    self.initializers.push(GraphInitializer::from_member(
                        InitializerKind::InitializeMethod,
                        &member_ref,
                    ));
                }
                MemberKind::Method
                    if self.kind == TypeKind::Extension
                        && member.name == framework.is_active_method
                        && member.parameters.is_empty()
                        && member.is_static =>
                {
                    self.is_active_method = Some(member_ref);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn collect_members(&mut self, ctx: &AnalysisContext<'_>) -> Result<(), Cancelled> {
        let framework = ctx.framework;
        let typed_members = |base: &str| {
            let base = base.to_string();
            move |layer: &TypeLayer| {
                layer_members(layer)
                    .filter(|m| matches!(m.member().kind, MemberKind::Field | MemberKind::Property))
                    .filter(|m| {
                        m.member()
                            .ty
                            .as_ref()
                            .is_some_and(|ty| ctx.derives_from(&ty.name, &base))
                    })
                    .map(|m| (m.name().to_string(), m))
                    .collect::<Vec<_>>()
            }
        };

        self.views =
            OverridableItemsCollection::build(ctx, &self.layers, typed_members(&framework.view))?;
        self.actions =
            OverridableItemsCollection::build(ctx, &self.layers, typed_members(&framework.action))?;
        self.view_delegates = methods_named_after(ctx, &self.layers, &self.views)?;
        self.action_handlers = methods_named_after(ctx, &self.layers, &self.actions)?;
        Ok(())
    }

    /// Returns `true` for graph extensions.
    #[must_use]
    pub fn is_extension(&self) -> bool {
        self.kind == TypeKind::Extension
    }

    /// Initializers of the given kind.
    pub fn initializers_of(
        &self,
        kind: InitializerKind,
    ) -> impl Iterator<Item = &GraphInitializer> {
        self.initializers.iter().filter(move |i| i.kind == kind)
    }
}

/// Member handles of a layer, in declaration order.
pub(crate) fn layer_members(layer: &TypeLayer) -> impl Iterator<Item = MemberRef> + '_ {
    (0..layer.symbol().members.len()).filter_map(|i| MemberRef::new(Arc::clone(layer.symbol()), i))
}

fn methods_named_after(
    ctx: &AnalysisContext<'_>,
    layers: &[TypeLayer],
    targets: &OverridableItemsCollection<MemberRef>,
) -> Result<OverridableItemsCollection<MemberRef>, Cancelled> {
    OverridableItemsCollection::build(ctx, layers, |layer| {
        layer_members(layer)
            .filter(|m| m.member().kind == MemberKind::Method && !m.member().is_static)
            .filter(|m| targets.names().any(|name| name.eq_ignore_ascii_case(m.name())))
            .map(|m| (m.name().to_string(), m))
            .collect::<Vec<_>>()
    })
}
