//! Rule to detect default-value attributes that break existing records.
//!
//! # Rationale
//!
//! A default-value attribute without `PersistingCheck = Nothing` makes the
//! framework validate the field on every save. For unbound fields and for
//! fields added through a DAC extension, records stored before the field
//! existed carry no value and become impossible to save.
//!
//! # Detected Patterns
//!
//! - Unbound property with a default-value attribute lacking the marker
//!   (warning on a DAC, error on a DAC extension)
//! - Bound property of a DAC extension redeclaring a default-value attribute
//!   without the marker, unless the nearest overridden default already
//!   carries it
//!
//! The unbound-default attribute is never reported.

use erp_lint_core::semantic::{
    AttributeInformation, BoundType, DacSemanticModel, DefaultAttributeIssue, TypeKind,
};
use erp_lint_core::{
    AnalysisContext, CheckError, DiagnosticSink, Label, Severity, Suggestion, SymbolRule,
};

/// Rule code for dac-extension-default-attribute.
pub const CODE: &str = "EL1030";

/// Rule name for dac-extension-default-attribute.
pub const NAME: &str = "dac-extension-default-attribute";

/// Diagnostic property telling whether the reported field is database-bound.
pub const IS_BOUND_FIELD: &str = "IsBoundField";

/// Flags default-value attributes that fail for pre-existing records.
#[derive(Debug, Clone)]
pub struct DacExtensionDefaultAttribute {
    /// Severity for unbound fields of DAC extensions.
    pub severity: Severity,
}

impl Default for DacExtensionDefaultAttribute {
    fn default() -> Self {
        Self::new()
    }
}

impl DacExtensionDefaultAttribute {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    fn issue_severity(&self, kind: TypeKind, issue: &DefaultAttributeIssue<'_>) -> Severity {
        match (issue, kind) {
            (DefaultAttributeIssue::UnboundField(_), TypeKind::Extension) => self.severity,
            _ => Severity::Warning,
        }
    }
}

impl SymbolRule<DacSemanticModel> for DacExtensionDefaultAttribute {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Default-value attributes on unbound or extension fields need PersistingCheck = Nothing"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn analyze(
        &self,
        ctx: &AnalysisContext<'_>,
        dac: &DacSemanticModel,
        sink: &DiagnosticSink,
    ) -> Result<(), CheckError> {
        let info = AttributeInformation::new(ctx);

        for property in dac.declared_properties() {
            ctx.check_cancelled()?;

            let bound = dac.bound_type(property.name());
            let Some(issue) = info.default_attribute_issue(dac.kind, bound, property) else {
                continue;
            };

            let member = &property.item().member;
            let message = match issue {
                DefaultAttributeIssue::UnboundField(_) => format!(
                    "Unbound field '{}' has a default-value attribute without PersistingCheck = Nothing",
                    member.name()
                ),
                DefaultAttributeIssue::BoundExtensionField(_) => format!(
                    "Extension field '{}' sets a default value that existing records do not have",
                    member.name()
                ),
            };

            let mut violation = self
                .member_violation(member, message)
                .with_property(IS_BOUND_FIELD, (bound == BoundType::DbBound).to_string())
                .with_suggestion(Suggestion::new(
                    "Set PersistingCheck = PXPersistingCheck.Nothing on the attribute",
                ));
            if let Some(location) = issue.attribute().location.clone() {
                let declared_at = std::mem::replace(&mut violation.location, location);
                violation = violation.with_label(Label::new(declared_at, "field declared here"));
            }
            violation.severity = self.issue_severity(dac.kind, &issue);
            sink.report(violation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_lint_core::{
        AttributeApplication, AttributeValue, CancellationToken, FrameworkContext, Location,
        Member, SymbolGraph, SymbolSnapshot, TypeRef, TypeSymbol, Violation,
    };
    use std::path::PathBuf;

    fn default_attr() -> AttributeApplication {
        AttributeApplication::new("PXDefaultAttribute")
    }

    fn nothing() -> AttributeApplication {
        default_attr().with_named("PersistingCheck", AttributeValue::Int(2))
    }

    fn property(name: &str, attributes: Vec<AttributeApplication>) -> Member {
        attributes
            .into_iter()
            .fold(Member::property(name, TypeRef::new("string")), Member::with_attribute)
    }

    fn check(types: Vec<TypeSymbol>, analyzed: &str) -> Vec<Violation> {
        let mut all = vec![
            TypeSymbol::new("PXDBStringAttribute").with_base(TypeRef::new("PXDBFieldAttribute")),
            TypeSymbol::new("PXUnboundDefaultAttribute")
                .with_base(TypeRef::new("PXDefaultAttribute")),
        ];
        all.extend(types);
        let snapshot = SymbolSnapshot::new(all).expect("valid snapshot");
        let framework = FrameworkContext::default();
        let token = CancellationToken::new();
        let ctx = AnalysisContext::new(&snapshot, &framework, &token);
        let symbol = snapshot.type_symbol(analyzed).expect("type exists");
        let model = DacSemanticModel::new(&ctx, &symbol).expect("not cancelled");
        let sink = DiagnosticSink::new();
        DacExtensionDefaultAttribute::new()
            .analyze(&ctx, &model, &sink)
            .expect("check succeeds");
        sink.into_violations()
    }

    fn dac(members: Vec<Member>) -> TypeSymbol {
        members.into_iter().fold(
            TypeSymbol::new("SOOrder").with_interface(TypeRef::new("IBqlTable")),
            TypeSymbol::with_member,
        )
    }

    fn extension(members: Vec<Member>) -> TypeSymbol {
        members.into_iter().fold(
            TypeSymbol::new("SOOrderExt").with_base(TypeRef::generic(
                "PXCacheExtension",
                vec![TypeRef::new("SOOrder")],
            )),
            TypeSymbol::with_member,
        )
    }

    #[test]
    fn test_unbound_field_on_dac_is_warning() {
        let violations = check(
            vec![dac(vec![property(
                "Note",
                vec![AttributeApplication::new("PXStringAttribute"), default_attr()],
            )])],
            "SOOrder",
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(
            violations[0].properties.get(IS_BOUND_FIELD).map(String::as_str),
            Some("false")
        );
    }

    #[test]
    fn test_unbound_field_on_extension_is_error_at_attribute() {
        let location = Location::new(PathBuf::from("SOOrderExt.cs"), 7, 10);
        let violations = check(
            vec![
                dac(vec![]),
                extension(vec![property(
                    "UsrNote",
                    vec![
                        AttributeApplication::new("PXStringAttribute"),
                        default_attr().at(location.clone()),
                    ],
                )]),
            ],
            "SOOrderExt",
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Error);
        assert_eq!(violations[0].location, location);
        assert_eq!(violations[0].labels.len(), 1);
    }

    #[test]
    fn test_marker_and_unbound_default_are_accepted() {
        let violations = check(
            vec![dac(vec![
                property("Note", vec![AttributeApplication::new("PXStringAttribute"), nothing()]),
                property(
                    "Total",
                    vec![
                        AttributeApplication::new("PXStringAttribute"),
                        AttributeApplication::new("PXUnboundDefaultAttribute"),
                    ],
                ),
            ])],
            "SOOrder",
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn test_bound_extension_field_checks_nearest_base_default() {
        let base = dac(vec![
            property(
                "OrderNbr",
                vec![AttributeApplication::new("PXDBStringAttribute"), default_attr()],
            ),
            property(
                "CuryTotal",
                vec![AttributeApplication::new("PXDBStringAttribute"), nothing()],
            ),
            property("Descr", vec![AttributeApplication::new("PXDBStringAttribute")]),
        ]);
        let ext = extension(vec![
            property("OrderNbr", vec![default_attr()]),
            property("CuryTotal", vec![default_attr()]),
            property("Descr", vec![default_attr()]),
        ]);

        let violations = check(vec![base, ext], "SOOrderExt");
        let mut flagged: Vec<&str> = violations
            .iter()
            .map(|v| v.message.split('\'').nth(1).unwrap_or_default())
            .collect();
        flagged.sort_unstable();
        assert_eq!(flagged, vec!["Descr", "OrderNbr"]);
        assert!(violations.iter().all(|v| v.severity == Severity::Warning));
        assert!(violations
            .iter()
            .all(|v| v.properties.get(IS_BOUND_FIELD).map(String::as_str) == Some("true")));
    }

    #[test]
    fn test_bound_fields_of_primary_dac_are_ignored() {
        let violations = check(
            vec![dac(vec![property(
                "OrderNbr",
                vec![AttributeApplication::new("PXDBStringAttribute"), default_attr()],
            )])],
            "SOOrder",
        );
        assert!(violations.is_empty());
    }
}
