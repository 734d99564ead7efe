//! Bound-type and default-value attribute resolution.

use crate::context::AnalysisContext;
use crate::semantic::hierarchy::TypeKind;
use crate::semantic::overridable::OverridableItem;
use crate::symbols::{AttributeApplication, AttributeValue, Member};

/// Storage classification of a data member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoundType {
    /// Held in memory only.
    Unbound,
    /// Backed by a database column.
    DbBound,
    /// No field attribute decides it.
    #[default]
    NotDefined,
}

/// Items that carry attribute applications.
pub trait HasAttributes {
    /// Attribute applications in declaration order.
    fn attributes(&self) -> &[AttributeApplication];
}

impl HasAttributes for Member {
    fn attributes(&self) -> &[AttributeApplication] {
        &self.attributes
    }
}

/// A default-value attribute application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultAttribute<'a> {
    /// The application.
    pub attribute: &'a AttributeApplication,
    /// Whether it carries the "persisting check: nothing" marker.
    pub persisting_check_nothing: bool,
}

/// Why a default-value attribute is unsafe where it is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAttributeIssue<'a> {
    /// Unbound field with a default lacking the "nothing" marker.
    UnboundField(&'a AttributeApplication),
    /// Bound extension field redeclaring a default without the marker while
    /// no overridden declaration opted out of the persisting check.
    BoundExtensionField(&'a AttributeApplication),
}

impl<'a> DefaultAttributeIssue<'a> {
    /// The offending application.
    #[must_use]
    pub fn attribute(&self) -> &'a AttributeApplication {
        match self {
            Self::UnboundField(a) | Self::BoundExtensionField(a) => a,
        }
    }
}

/// Attribute family queries against the framework context.
#[derive(Debug, Clone, Copy)]
pub struct AttributeInformation<'a> {
    ctx: AnalysisContext<'a>,
}

impl<'a> AttributeInformation<'a> {
    /// Creates the helper.
    #[must_use]
    pub fn new(ctx: &AnalysisContext<'a>) -> Self {
        Self { ctx: *ctx }
    }

    fn is_db_field_override(&self, attribute: &AttributeApplication) -> Option<bool> {
        match attribute.named_arg(&self.ctx.framework.is_db_field_argument)? {
            AttributeValue::Bool(value) => Some(*value),
            AttributeValue::Str(value) => value.parse().ok(),
            AttributeValue::Int(_) => None,
        }
    }

    /// Returns `true` if the attribute makes a field database-bound.
    #[must_use]
    pub fn is_bound(&self, attribute: &AttributeApplication) -> bool {
        self.is_db_field_override(attribute).unwrap_or_else(|| {
            self.ctx
                .attribute_derives_from(attribute, &self.ctx.framework.db_field_attribute)
        })
    }

    /// Returns `true` if the attribute makes a field unbound.
    #[must_use]
    pub fn is_unbound(&self, attribute: &AttributeApplication) -> bool {
        self.is_db_field_override(attribute).map_or_else(
            || {
                self.ctx
                    .framework
                    .unbound_field_attributes
                    .iter()
                    .any(|family| self.ctx.attribute_derives_from(attribute, family))
            },
            |bound| !bound,
        )
    }

    /// Classifies one declaration by its own attributes.
    ///
    /// A database-bound attribute wins over an unbound one.
    #[must_use]
    pub fn declared_bound_type(&self, attributes: &[AttributeApplication]) -> BoundType {
        if attributes.iter().any(|a| self.is_bound(a)) {
            BoundType::DbBound
        } else if attributes.iter().any(|a| self.is_unbound(a)) {
            BoundType::Unbound
        } else {
            BoundType::NotDefined
        }
    }

    /// Resolves the effective bound type of a declaration.
    ///
    /// Primary types use their own declaration. Extensions walk the
    /// declaration and its overridden declarations nearest first and take the
    /// first one that decides.
    #[must_use]
    pub fn resolve_bound_type<T: HasAttributes>(
        &self,
        kind: TypeKind,
        item: &OverridableItem<T>,
    ) -> BoundType {
        match kind {
            TypeKind::Primary => self.declared_bound_type(item.item().attributes()),
            TypeKind::Extension => item
                .this_and_overridden_items()
                .map(|declaration| self.declared_bound_type(declaration.attributes()))
                .find(|bound| *bound != BoundType::NotDefined)
                .unwrap_or_default(),
            TypeKind::None => BoundType::NotDefined,
        }
    }

    /// Recognizes a default-value attribute.
    ///
    /// The unbound-default specialization is excluded even though it derives
    /// from the default attribute.
    #[must_use]
    pub fn default_attribute<'b>(
        &self,
        attribute: &'b AttributeApplication,
    ) -> Option<DefaultAttribute<'b>> {
        let framework = self.ctx.framework;
        let is_default = self
            .ctx
            .attribute_derives_from(attribute, &framework.default_attribute)
            && !self
                .ctx
                .attribute_derives_from(attribute, &framework.unbound_default_attribute);
        if !is_default {
            return None;
        }

        let persisting_check = attribute.named_arg(&framework.persisting_check_argument);
        let persisting_check_nothing = match persisting_check {
            Some(AttributeValue::Int(value)) => *value == framework.persisting_check_nothing,
            Some(AttributeValue::Str(value)) => value.rsplit('.').next() == Some("Nothing"),
            _ => false,
        };

        Some(DefaultAttribute {
            attribute,
            persisting_check_nothing,
        })
    }

    /// First default-value attribute among `attributes`.
    #[must_use]
    pub fn find_default_attribute<'b>(
        &self,
        attributes: &'b [AttributeApplication],
    ) -> Option<DefaultAttribute<'b>> {
        attributes.iter().find_map(|a| self.default_attribute(a))
    }

    /// Checks the nearest declaration of `item` for an unsafe default-value
    /// attribute.
    ///
    /// Unbound fields must mark their default with the "nothing" persisting
    /// check. Bound extension fields may redeclare a default only when the
    /// nearest overridden declaration carrying a default already opted out
    /// of the persisting check; older declarations are not consulted.
    #[must_use]
    pub fn default_attribute_issue<'b, T: HasAttributes>(
        &self,
        kind: TypeKind,
        bound: BoundType,
        item: &'b OverridableItem<T>,
    ) -> Option<DefaultAttributeIssue<'b>> {
        let own = self.find_default_attribute(item.item().attributes())?;
        if own.persisting_check_nothing {
            return None;
        }

        match (bound, kind) {
            (BoundType::Unbound, _) => Some(DefaultAttributeIssue::UnboundField(own.attribute)),
            (BoundType::DbBound, TypeKind::Extension) => {
                let base_opted_out = item
                    .just_overridden_items()
                    .find_map(|declaration| self.find_default_attribute(declaration.attributes()))
                    .is_some_and(|base| base.persisting_check_nothing);
                (!base_opted_out)
                    .then_some(DefaultAttributeIssue::BoundExtensionField(own.attribute))
            }
            _ => None,
        }
    }
}
