//! DAC semantic model.

use crate::cancel::Cancelled;
use crate::context::AnalysisContext;
use crate::semantic::attributes::{AttributeInformation, BoundType, HasAttributes};
use crate::semantic::graph::layer_members;
use crate::semantic::hierarchy::{self, Family, TypeKind, TypeLayer};
use crate::semantic::overridable::{OverridableItem, OverridableItemsCollection};
use crate::symbols::{AttributeApplication, MemberKind, MemberRef, TypeSymbol};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A declared DAC property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DacPropertyInfo {
    /// The property.
    pub member: MemberRef,
    /// Bound type decided by this declaration's own attributes.
    pub declared_bound_type: BoundType,
}

impl HasAttributes for DacPropertyInfo {
    fn attributes(&self) -> &[AttributeApplication] {
        &self.member.member().attributes
    }
}

/// Resolved view of a DAC or DAC extension.
#[derive(Debug, Clone)]
pub struct DacSemanticModel {
    /// Role of the analyzed type.
    pub kind: TypeKind,
    /// The analyzed type.
    pub symbol: Arc<TypeSymbol>,
    /// The DAC itself, or the DAC an extension extends.
    pub dac_symbol: Option<Arc<TypeSymbol>>,
    /// Declaration layers, most-base first.
    pub layers: Vec<TypeLayer>,
    /// Declared properties.
    pub properties: OverridableItemsCollection<DacPropertyInfo>,
    /// Nested field marker classes.
    pub field_classes: OverridableItemsCollection<MemberRef>,
    /// Whether the extension is a mapping extension.
    pub is_mapping: bool,
    bound_types: HashMap<String, BoundType>,
}

impl DacSemanticModel {
    /// Builds the model for `symbol`.
    ///
    /// Types that are neither DACs nor DAC extensions yield a model of kind
    /// [`TypeKind::None`] with empty collections.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed.
    pub fn new(ctx: &AnalysisContext<'_>, symbol: &Arc<TypeSymbol>) -> Result<Self, Cancelled> {
        let hierarchy = hierarchy::linearize(ctx, symbol, Family::Dac)?;
        let is_mapping = hierarchy
            .root
            .as_ref()
            .is_some_and(|root| root.name == ctx.framework.mapped_dac_extension);

        let mut model = Self {
            kind: hierarchy.kind,
            symbol: Arc::clone(symbol),
            dac_symbol: hierarchy.target,
            layers: hierarchy.layers,
            properties: OverridableItemsCollection::default(),
            field_classes: OverridableItemsCollection::default(),
            is_mapping,
            bound_types: HashMap::new(),
        };
        if model.kind == TypeKind::None {
            return Ok(model);
        }

        let attributes = AttributeInformation::new(ctx);
        model.properties = OverridableItemsCollection::build(ctx, &model.layers, |layer| {
            layer_members(layer)
                .filter(|m| m.member().kind == MemberKind::Property && !m.member().is_static)
                .map(|member| {
                    let declared_bound_type =
                        attributes.declared_bound_type(&member.member().attributes);
                    (
                        member.name().to_string(),
                        DacPropertyInfo {
                            member,
                            declared_bound_type,
                        },
                    )
                })
                .collect::<Vec<_>>()
        })?;

        model.field_classes = OverridableItemsCollection::build(ctx, &model.layers, |layer| {
            layer_members(layer)
                .filter(|m| m.member().kind == MemberKind::NestedType)
                .filter(|m| {
                    m.member().ty.as_ref().is_some_and(|ty| {
                        ctx.derives_from(&ty.name, &ctx.framework.dac_field)
                            || ctx.implements(&ty.name, &ctx.framework.dac_field)
                    })
                })
                .map(|m| (m.name().to_string(), m))
                .collect::<Vec<_>>()
        })?;

        for property in &model.properties {
            ctx.check_cancelled()?;
            let bound = attributes.resolve_bound_type(model.kind, property);
            model.bound_types.insert(property.name().to_string(), bound);
        }

        debug!(
            dac = %symbol.name,
            kind = ?model.kind,
            properties = model.properties.len(),
            "Built DAC model"
        );
        Ok(model)
    }

    /// Builds the model of `symbol` if it is a DAC or DAC extension.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed.
    pub fn infer_models(
        ctx: &AnalysisContext<'_>,
        symbol: &Arc<TypeSymbol>,
    ) -> Result<Vec<Self>, Cancelled> {
        let model = Self::new(ctx, symbol)?;
        Ok(if model.kind == TypeKind::None {
            Vec::new()
        } else {
            vec![model]
        })
    }

    /// Resolved bound type of a property.
    #[must_use]
    pub fn bound_type(&self, property: &str) -> BoundType {
        self.bound_types.get(property).copied().unwrap_or_default()
    }

    /// Properties declared on the analyzed type itself.
    pub fn declared_properties(&self) -> impl Iterator<Item = &OverridableItem<DacPropertyInfo>> {
        self.properties
            .iter()
            .filter(move |p| Arc::ptr_eq(p.item().member.owner(), &self.symbol))
    }

    /// Returns `true` for DAC extensions.
    #[must_use]
    pub fn is_extension(&self) -> bool {
        self.kind == TypeKind::Extension
    }
}
