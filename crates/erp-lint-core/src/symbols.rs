//! Symbol graph adapter interface and the JSON-backed reference snapshot.
//!
//! The engine never parses source text. A front end hands it a typed symbol
//! graph: types with their base type and interfaces, members in declaration
//! order, attribute applications and source locations. [`SymbolGraph`] is the
//! seam; [`SymbolSnapshot`] is an in-memory implementation that loads a JSON
//! dump of such a graph.

use crate::cancel::{CancellationToken, Cancelled};
use crate::types::Location;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reference to a (possibly generic) type by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Type name, possibly dotted for nested types (e.g. `SOOrder.orderNbr`).
    pub name: String,
    /// Generic type arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<TypeRef>,
}

impl TypeRef {
    /// Creates a non-generic type reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Creates a generic type reference.
    #[must_use]
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The last dotted segment of the name.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// The name without its last dotted segment, if nested.
    #[must_use]
    pub fn containing_name(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(outer, _)| outer)
    }
}

/// Kind of a declared member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// A method.
    Method,
    /// A property.
    Property,
    /// A field.
    Field,
    /// An instance constructor.
    Constructor,
    /// A static (type) constructor.
    StaticConstructor,
    /// A nested type declaration.
    NestedType,
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Declared parameter type.
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl Parameter {
    /// Creates a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A constant value passed to an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal or enum constant value.
    Int(i64),
    /// String literal, type name or enum member name.
    Str(String),
}

/// An attribute applied to a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeApplication {
    /// Attribute type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Positional constructor arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<AttributeValue>,
    /// Named arguments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub named: BTreeMap<String, AttributeValue>,
    /// Location of the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl AttributeApplication {
    /// Creates an attribute application without arguments.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            args: Vec::new(),
            named: BTreeMap::new(),
            location: None,
        }
    }

    /// Adds a named argument.
    #[must_use]
    pub fn with_named(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.named.insert(name.into(), value);
        self
    }

    /// Sets the application location.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Looks up a named argument.
    #[must_use]
    pub fn named_arg(&self, name: &str) -> Option<&AttributeValue> {
        self.named.get(name)
    }
}

/// A declared member of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member name.
    pub name: String,
    /// Member kind.
    pub kind: MemberKind,
    /// Whether the member is static.
    #[serde(default)]
    pub is_static: bool,
    /// Whether the member overrides a base member.
    #[serde(default)]
    pub is_override: bool,
    /// Declared type (fields, properties, nested types) or return type (methods).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeRef>,
    /// Parameters, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Attribute applications, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeApplication>,
    /// Location of the declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Member {
    /// Creates a member of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_static: false,
            is_override: false,
            ty: None,
            parameters: Vec::new(),
            attributes: Vec::new(),
            location: None,
        }
    }

    /// Creates a method.
    #[must_use]
    pub fn method(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Method)
    }

    /// Creates a property of the given type.
    #[must_use]
    pub fn property(name: impl Into<String>, ty: TypeRef) -> Self {
        Self::new(name, MemberKind::Property).with_type(ty)
    }

    /// Creates a field of the given type.
    #[must_use]
    pub fn field(name: impl Into<String>, ty: TypeRef) -> Self {
        Self::new(name, MemberKind::Field).with_type(ty)
    }

    /// Sets the declared or return type.
    #[must_use]
    pub fn with_type(mut self, ty: TypeRef) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.parameters.push(Parameter::new(name, ty));
        self
    }

    /// Appends an attribute application.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeApplication) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Marks the member static.
    #[must_use]
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Marks the member as an override.
    #[must_use]
    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }

    /// Sets the declaration location.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// An "instance created" handler registration found in a type body.
///
/// The registration attaches `delegate` as an initializer of `graph`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitDelegate {
    /// Name of the graph type the handler is registered for.
    pub graph: String,
    /// Name of the delegate (method name, or a synthetic name for lambdas).
    pub delegate: String,
    /// Location of the delegate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// A type declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSymbol {
    /// Unique type name.
    pub name: String,
    /// Direct base type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<TypeRef>,
    /// Directly implemented interfaces.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<TypeRef>,
    /// Attribute applications on the type declaration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeApplication>,
    /// Declared members in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
    /// Instance-created handler registrations found in this type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_delegates: Vec<InitDelegate>,
    /// Location of the type declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl TypeSymbol {
    /// Creates a type without base or members.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            interfaces: Vec::new(),
            attributes: Vec::new(),
            members: Vec::new(),
            init_delegates: Vec::new(),
            location: None,
        }
    }

    /// Sets the base type.
    #[must_use]
    pub fn with_base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn with_interface(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Applies an attribute to the type declaration.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeApplication) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Appends a member.
    #[must_use]
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Adds an instance-created handler registration.
    #[must_use]
    pub fn with_init_delegate(mut self, delegate: InitDelegate) -> Self {
        self.init_delegates.push(delegate);
        self
    }

    /// Sets the declaration location.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Iterates over members of the given kind.
    pub fn members_of_kind(&self, kind: MemberKind) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(move |m| m.kind == kind)
    }
}

/// Handle to a member of a specific type declaration.
#[derive(Debug, Clone)]
pub struct MemberRef {
    owner: Arc<TypeSymbol>,
    index: usize,
}

impl MemberRef {
    /// Creates a handle, or `None` if `index` is out of range.
    #[must_use]
    pub fn new(owner: Arc<TypeSymbol>, index: usize) -> Option<Self> {
        (index < owner.members.len()).then_some(Self { owner, index })
    }

    /// The declaring type.
    #[must_use]
    pub fn owner(&self) -> &Arc<TypeSymbol> {
        &self.owner
    }

    /// The member itself.
    #[must_use]
    pub fn member(&self) -> &Member {
        &self.owner.members[self.index]
    }

    /// Member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.member().name
    }

    /// Member location, falling back to the declaring type's location.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.member()
            .location
            .as_ref()
            .or(self.owner.location.as_ref())
    }
}

impl PartialEq for MemberRef {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && Arc::ptr_eq(&self.owner, &other.owner)
    }
}

impl Eq for MemberRef {}

/// Read access to a typed symbol graph.
///
/// Implementations must be immutable for the duration of an analysis pass.
pub trait SymbolGraph: Send + Sync {
    /// Looks up a type by name.
    fn type_symbol(&self, name: &str) -> Option<Arc<TypeSymbol>>;

    /// All types in the graph, in a stable order.
    fn types(&self) -> Vec<Arc<TypeSymbol>>;

    /// Returns `true` if `type_name` is `base` or transitively derives from it.
    ///
    /// Types outside the graph terminate the walk; only their name is compared.
    /// The token is polled once per visited type.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed during the walk.
    fn is_derived_from(
        &self,
        type_name: &str,
        base: &str,
        cancellation: &CancellationToken,
    ) -> Result<bool, Cancelled> {
        let mut visited = HashSet::new();
        let mut current = Some(type_name.to_string());

        while let Some(name) = current {
            cancellation.check()?;
            if name == base {
                return Ok(true);
            }
            if !visited.insert(name.clone()) {
                return Ok(false);
            }
            current = self
                .type_symbol(&name)
                .and_then(|t| t.base.as_ref().map(|b| b.name.clone()));
        }

        Ok(false)
    }

    /// Returns `true` if `type_name` or any of its bases implements `interface`.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed during the walk.
    fn implements(
        &self,
        type_name: &str,
        interface: &str,
        cancellation: &CancellationToken,
    ) -> Result<bool, Cancelled> {
        let mut visited = HashSet::new();
        let mut current = self.type_symbol(type_name);

        while let Some(symbol) = current {
            cancellation.check()?;
            if !visited.insert(symbol.name.clone()) {
                return Ok(false);
            }
            for declared in &symbol.interfaces {
                if declared.name == interface
                    || self.is_derived_from(&declared.name, interface, cancellation)?
                {
                    return Ok(true);
                }
            }
            current = symbol
                .base
                .as_ref()
                .and_then(|b| self.type_symbol(&b.name));
        }

        Ok(false)
    }
}

/// Errors loading a symbol snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// IO error reading the snapshot file.
    #[error("Failed to read snapshot {path}: {source}")]
    Io {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// JSON error.
    #[error("Failed to parse snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// Two types share a name.
    #[error("Duplicate type `{0}` in snapshot")]
    DuplicateType(String),
}

#[derive(Deserialize)]
struct SnapshotDto {
    #[serde(default)]
    source: Option<PathBuf>,
    #[serde(default)]
    types: Vec<TypeSymbol>,
}

/// Immutable in-memory symbol graph.
#[derive(Debug, Default, Clone)]
pub struct SymbolSnapshot {
    source: Option<PathBuf>,
    types: Vec<Arc<TypeSymbol>>,
    index: HashMap<String, usize>,
}

impl SymbolSnapshot {
    /// Builds a snapshot from type declarations.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::DuplicateType`] if two types share a name.
    pub fn new(types: Vec<TypeSymbol>) -> Result<Self, SnapshotError> {
        let mut index = HashMap::with_capacity(types.len());
        for (i, ty) in types.iter().enumerate() {
            if index.insert(ty.name.clone(), i).is_some() {
                return Err(SnapshotError::DuplicateType(ty.name.clone()));
            }
        }

        Ok(Self {
            source: None,
            types: types.into_iter().map(Arc::new).collect(),
            index,
        })
    }

    /// Parses a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or type names collide.
    pub fn from_json(content: &str) -> Result<Self, SnapshotError> {
        let dto: SnapshotDto = serde_json::from_str(content)?;
        let mut snapshot = Self::new(dto.types)?;
        snapshot.source = dto.source;
        Ok(snapshot)
    }

    /// Loads a snapshot from a JSON file.
    ///
    /// The file path becomes the snapshot source unless the JSON names one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut snapshot = Self::from_json(&content)?;
        if snapshot.source.is_none() {
            snapshot.source = Some(path.to_path_buf());
        }
        Ok(snapshot)
    }

    /// Source the snapshot was produced from, if known.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Number of types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if the snapshot has no types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl SymbolGraph for SymbolSnapshot {
    fn type_symbol(&self, name: &str) -> Option<Arc<TypeSymbol>> {
        self.index.get(name).map(|&i| Arc::clone(&self.types[i]))
    }

    fn types(&self) -> Vec<Arc<TypeSymbol>> {
        self.types.clone()
    }
}
