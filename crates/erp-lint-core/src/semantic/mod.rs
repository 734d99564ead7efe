//! Semantic model assembly.
//!
//! A raw [`TypeSymbol`](crate::symbols::TypeSymbol) is linearized into
//! declaration layers, its members are chained across layers by name and
//! classified, and the result is frozen into read-only models that rule
//! checkers share across threads.

pub mod attributes;
pub mod dac;
pub mod events;
pub mod graph;
pub mod graph_events;
pub mod hierarchy;
pub mod overridable;

pub use attributes::{AttributeInformation, BoundType, DefaultAttributeIssue, HasAttributes};
pub use dac::{DacPropertyInfo, DacSemanticModel};
pub use events::{EventCategory, EventHookDescriptor, EventHookInfo, EventKind, SignatureShape};
pub use graph::{GraphInitializer, GraphSemanticModel, InitializerKind, InstanceCreatedHandlers};
pub use graph_events::GraphEventSemanticModel;
pub use hierarchy::{Family, Hierarchy, TypeKind, TypeLayer};
pub use overridable::{CollectionBuilder, Declaration, OverridableItem, OverridableItemsCollection};
