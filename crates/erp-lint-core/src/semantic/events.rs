//! Event hook classification.
//!
//! A method is an event hook when its signature matches the generic
//! `Events.<Kind><...>` shape, or the classic `(PXCache, PX<Kind>EventArgs)`
//! shape with a name that follows the underscore convention.

use crate::context::FrameworkContext;
use crate::symbols::{Member, MemberKind, MemberRef, TypeRef};
use std::fmt;

/// Row-level or field-level event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventCategory {
    /// Raised per record.
    Row,
    /// Raised per record field.
    Field,
}

impl EventCategory {
    /// Underscores a classic hook name of this category must contain.
    #[must_use]
    pub fn underscore_count(self) -> usize {
        match self {
            Self::Row => 1,
            Self::Field => 2,
        }
    }
}

/// Recognized framework events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum EventKind {
    RowSelecting,
    RowSelected,
    RowInserting,
    RowInserted,
    RowUpdating,
    RowUpdated,
    RowDeleting,
    RowDeleted,
    RowPersisting,
    RowPersisted,
    FieldSelecting,
    FieldDefaulting,
    FieldVerifying,
    FieldUpdating,
    FieldUpdated,
    CacheAttached,
    CommandPreparing,
    ExceptionHandling,
}

impl EventKind {
    /// The full catalog.
    pub const ALL: [Self; 18] = [
        Self::RowSelecting,
        Self::RowSelected,
        Self::RowInserting,
        Self::RowInserted,
        Self::RowUpdating,
        Self::RowUpdated,
        Self::RowDeleting,
        Self::RowDeleted,
        Self::RowPersisting,
        Self::RowPersisted,
        Self::FieldSelecting,
        Self::FieldDefaulting,
        Self::FieldVerifying,
        Self::FieldUpdating,
        Self::FieldUpdated,
        Self::CacheAttached,
        Self::CommandPreparing,
        Self::ExceptionHandling,
    ];

    /// Event name as used in hook names and event-args types.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::RowSelecting => "RowSelecting",
            Self::RowSelected => "RowSelected",
            Self::RowInserting => "RowInserting",
            Self::RowInserted => "RowInserted",
            Self::RowUpdating => "RowUpdating",
            Self::RowUpdated => "RowUpdated",
            Self::RowDeleting => "RowDeleting",
            Self::RowDeleted => "RowDeleted",
            Self::RowPersisting => "RowPersisting",
            Self::RowPersisted => "RowPersisted",
            Self::FieldSelecting => "FieldSelecting",
            Self::FieldDefaulting => "FieldDefaulting",
            Self::FieldVerifying => "FieldVerifying",
            Self::FieldUpdating => "FieldUpdating",
            Self::FieldUpdated => "FieldUpdated",
            Self::CacheAttached => "CacheAttached",
            Self::CommandPreparing => "CommandPreparing",
            Self::ExceptionHandling => "ExceptionHandling",
        }
    }

    /// Parses an event name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Category of the event.
    #[must_use]
    pub fn category(self) -> EventCategory {
        match self {
            Self::RowSelecting
            | Self::RowSelected
            | Self::RowInserting
            | Self::RowInserted
            | Self::RowUpdating
            | Self::RowUpdated
            | Self::RowDeleting
            | Self::RowDeleted
            | Self::RowPersisting
            | Self::RowPersisted => EventCategory::Row,
            Self::FieldSelecting
            | Self::FieldDefaulting
            | Self::FieldVerifying
            | Self::FieldUpdating
            | Self::FieldUpdated
            | Self::CacheAttached
            | Self::CommandPreparing
            | Self::ExceptionHandling => EventCategory::Field,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Recognized parameter pattern of an event hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureShape {
    /// `(PXCache sender, PX<Kind>EventArgs e)`, or `(PXCache sender)` for
    /// cache-attached hooks.
    Default,
    /// `(Events.<Kind><Dac[, Field]> e)`.
    Generic,
}

/// Classification of an event hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHookDescriptor {
    /// Event raised.
    pub kind: EventKind,
    /// Row or field level.
    pub category: EventCategory,
    /// Signature pattern the hook was recognized by.
    pub shape: SignatureShape,
}

impl EventHookDescriptor {
    fn new(kind: EventKind, shape: SignatureShape) -> Self {
        Self {
            kind,
            category: kind.category(),
            shape,
        }
    }
}

const CACHE_ATTACHED_SUFFIX: &str = "_CacheAttached";

/// Classifies `member` as an event hook.
///
/// Returns `None` for anything that is not a recognized hook: non-methods,
/// static members, more than two parameters, unknown signatures, and classic
/// signatures whose name breaks the underscore convention.
#[must_use]
pub fn classify(member: &Member, framework: &FrameworkContext) -> Option<EventHookDescriptor> {
    if member.kind != MemberKind::Method || member.is_static || member.parameters.len() > 2 {
        return None;
    }

    if let Some(kind) = generic_event_kind(member, framework) {
        return Some(EventHookDescriptor::new(kind, SignatureShape::Generic));
    }

    let kind = default_event_kind(member, framework)?;
    has_valid_event_name(&member.name, kind.category())
        .then(|| EventHookDescriptor::new(kind, SignatureShape::Default))
}

fn generic_event_kind(member: &Member, framework: &FrameworkContext) -> Option<EventKind> {
    let [param] = member.parameters.as_slice() else {
        return None;
    };
    if param.ty.args.is_empty() {
        return None;
    }
    param
        .ty
        .name
        .strip_prefix(framework.events_prefix.as_str())
        .and_then(EventKind::from_name)
}

fn default_event_kind(member: &Member, framework: &FrameworkContext) -> Option<EventKind> {
    match member.parameters.as_slice() {
        [sender]
            if sender.ty.name == framework.cache
                && member.name.ends_with(CACHE_ATTACHED_SUFFIX) =>
        {
            Some(EventKind::CacheAttached)
        }
        [sender, args] if sender.ty.name == framework.cache => EventKind::ALL
            .into_iter()
            .filter(|kind| *kind != EventKind::CacheAttached)
            .find(|kind| args.ty.name == framework.event_args_type(kind.name())),
        _ => None,
    }
}

/// Underscore naming convention of classic hooks: no leading or trailing
/// underscore, one underscore for row hooks (`Dac_Event`) and two for field
/// hooks (`Dac_Field_Event`).
///
/// Names whose DAC or field segment itself contains an underscore are
/// rejected.
#[must_use]
pub fn has_valid_event_name(name: &str, category: EventCategory) -> bool {
    if name.starts_with('_') || name.ends_with('_') {
        return false;
    }
    name.matches('_').count() == category.underscore_count()
}

/// A classified event hook with its DAC and field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHookInfo {
    /// The hook method.
    pub member: MemberRef,
    /// Classification.
    pub descriptor: EventHookDescriptor,
    /// DAC the event is raised for, when it can be determined.
    pub dac_name: Option<String>,
    /// Field the event is raised for (field events only).
    pub field_name: Option<String>,
}

impl EventHookInfo {
    /// Classifies `member` and extracts its DAC and field names.
    #[must_use]
    pub fn from_member(member: MemberRef, framework: &FrameworkContext) -> Option<Self> {
        let descriptor = classify(member.member(), framework)?;
        let (dac_name, field_name) = match descriptor.shape {
            SignatureShape::Generic => {
                let param = &member.member().parameters[0];
                generic_targets(&param.ty, descriptor.category)
            }
            SignatureShape::Default => classic_targets(member.name(), descriptor.category),
        };

        Some(Self {
            member,
            descriptor,
            dac_name,
            field_name,
        })
    }

    /// Key the hook is stored under.
    ///
    /// Classic hooks use their method name. Generic hooks use the name a
    /// classic hook for the same event would have, so both styles override
    /// each other across layers.
    #[must_use]
    pub fn key(&self) -> String {
        match (self.descriptor.shape, &self.dac_name, &self.field_name) {
            (SignatureShape::Default, _, _) => self.member.name().to_string(),
            (SignatureShape::Generic, Some(dac), Some(field)) => {
                format!("{dac}_{}_{}", capitalize(field), self.descriptor.kind)
            }
            (SignatureShape::Generic, Some(dac), None) => {
                format!("{dac}_{}", self.descriptor.kind)
            }
            (SignatureShape::Generic, None, _) => self.member.name().to_string(),
        }
    }

    /// Event kind shortcut.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.descriptor.kind
    }
}

fn generic_targets(ty: &TypeRef, category: EventCategory) -> (Option<String>, Option<String>) {
    match (category, ty.args.as_slice()) {
        (EventCategory::Row, [dac, ..]) => (Some(dac.name.clone()), None),
        (EventCategory::Field, [dac, field]) => {
            (Some(dac.name.clone()), Some(field.simple_name().to_string()))
        }
        (EventCategory::Field, [field]) => (
            field.containing_name().map(str::to_string),
            Some(field.simple_name().to_string()),
        ),
        _ => (None, None),
    }
}

fn classic_targets(name: &str, category: EventCategory) -> (Option<String>, Option<String>) {
    let mut parts = name.split('_');
    match category {
        EventCategory::Row => (parts.next().map(str::to_string), None),
        EventCategory::Field => (
            parts.next().map(str::to_string),
            parts.next().map(str::to_string),
        ),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
