//! Context values passed into every model-building and rule entry point.

use crate::cancel::{CancellationToken, Cancelled};
use crate::symbols::{AttributeApplication, SymbolGraph, TypeSymbol};
use serde::{Deserialize, Serialize};

/// Well-known framework type and member names.
///
/// Loaded from the `[framework]` section of the configuration; every field
/// falls back to the stock framework name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkContext {
    /// Root of primary graphs.
    pub graph: String,
    /// Root of graph extensions.
    pub graph_extension: String,
    /// Base type of data views.
    pub view: String,
    /// Base type of actions.
    pub action: String,
    /// Cache type taken as the first parameter of classic event hooks.
    pub cache: String,
    /// Prefix of the generic events container (`Events.RowSelected<T>`).
    pub events_prefix: String,
    /// Extension initialization method.
    pub initialize_method: String,
    /// Extension activation predicate.
    pub is_active_method: String,

    /// Marker interface of DACs.
    pub dac: String,
    /// Root of DAC extensions.
    pub dac_extension: String,
    /// Root of mapping DAC extensions.
    pub mapped_dac_extension: String,
    /// Marker interface of DAC field classes.
    pub dac_field: String,

    /// Base of database-bound field attributes.
    pub db_field_attribute: String,
    /// Unbound field attribute catalog.
    pub unbound_field_attributes: Vec<String>,
    /// Default value attribute.
    pub default_attribute: String,
    /// Unbound specialization of the default value attribute.
    pub unbound_default_attribute: String,
    /// Named argument carrying the persisting check.
    pub persisting_check_argument: String,
    /// Numeric value of the "nothing" persisting check.
    pub persisting_check_nothing: i64,
    /// Named argument overriding the bound-ness of a field attribute.
    pub is_db_field_argument: String,

    /// Enables rule-checkers aimed at ISV solution certification.
    pub isv_specific_analyzers: bool,
    /// Types carrying this attribute are skipped.
    pub suppression_attribute: String,
}

impl Default for FrameworkContext {
    fn default() -> Self {
        Self {
            graph: "PXGraph".to_string(),
            graph_extension: "PXGraphExtension".to_string(),
            view: "PXSelectBase".to_string(),
            action: "PXAction".to_string(),
            cache: "PXCache".to_string(),
            events_prefix: "Events.".to_string(),
            initialize_method: "Initialize".to_string(),
            is_active_method: "IsActive".to_string(),
            dac: "IBqlTable".to_string(),
            dac_extension: "PXCacheExtension".to_string(),
            mapped_dac_extension: "PXMappedCacheExtension".to_string(),
            dac_field: "IBqlField".to_string(),
            db_field_attribute: "PXDBFieldAttribute".to_string(),
            unbound_field_attributes: [
                "PXStringAttribute",
                "PXIntAttribute",
                "PXShortAttribute",
                "PXLongAttribute",
                "PXBoolAttribute",
                "PXByteAttribute",
                "PXDecimalAttribute",
                "PXDoubleAttribute",
                "PXFloatAttribute",
                "PXDateAttribute",
                "PXGuidAttribute",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            default_attribute: "PXDefaultAttribute".to_string(),
            unbound_default_attribute: "PXUnboundDefaultAttribute".to_string(),
            persisting_check_argument: "PersistingCheck".to_string(),
            persisting_check_nothing: 2,
            is_db_field_argument: "IsDBField".to_string(),
            isv_specific_analyzers: false,
            suppression_attribute: "PXSuppressAnalysisAttribute".to_string(),
        }
    }
}

impl FrameworkContext {
    /// Returns the classic event-args type name for an event suffix
    /// (`RowSelected` -> `PXRowSelectedEventArgs`).
    #[must_use]
    pub fn event_args_type(&self, event: &str) -> String {
        format!("PX{event}EventArgs")
    }

    /// Returns `true` if the type opted out of analysis.
    #[must_use]
    pub fn is_analysis_suppressed(&self, symbol: &TypeSymbol) -> bool {
        symbol
            .attributes
            .iter()
            .any(|a| a.type_name == self.suppression_attribute)
    }
}

/// Shared inputs of one analysis pass.
///
/// Every component receives the context explicitly; nothing in the engine
/// reads process-wide state.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    /// The symbol graph under analysis.
    pub graph: &'a dyn SymbolGraph,
    /// Framework type names.
    pub framework: &'a FrameworkContext,
    /// Cancellation shared by every model builder and rule-checker.
    pub cancellation: &'a CancellationToken,
}

impl<'a> AnalysisContext<'a> {
    /// Creates a context.
    #[must_use]
    pub fn new(
        graph: &'a dyn SymbolGraph,
        framework: &'a FrameworkContext,
        cancellation: &'a CancellationToken,
    ) -> Self {
        Self {
            graph,
            framework,
            cancellation,
        }
    }

    /// Polls the cancellation token.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<(), Cancelled> {
        self.cancellation.check()
    }

    /// Returns `true` if `type_name` is `base` or derives from it.
    ///
    /// A walk interrupted by cancellation answers `false`; the caller sees the
    /// cancellation at its next [`check_cancelled`](Self::check_cancelled).
    #[must_use]
    pub fn derives_from(&self, type_name: &str, base: &str) -> bool {
        self.graph
            .is_derived_from(type_name, base, self.cancellation)
            .unwrap_or(false)
    }

    /// Returns `true` if `type_name` or one of its bases implements
    /// `interface`.
    ///
    /// Cancellation is handled as in [`derives_from`](Self::derives_from).
    #[must_use]
    pub fn implements(&self, type_name: &str, interface: &str) -> bool {
        self.graph
            .implements(type_name, interface, self.cancellation)
            .unwrap_or(false)
    }

    /// Returns `true` if the attribute type derives from `family`.
    #[must_use]
    pub fn attribute_derives_from(&self, attribute: &AttributeApplication, family: &str) -> bool {
        self.derives_from(&attribute.type_name, family)
    }
}

impl std::fmt::Debug for AnalysisContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("framework", self.framework)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}
