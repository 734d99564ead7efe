//! Rule to forbid DAC fields reserved by the framework.
//!
//! # Rationale
//!
//! The platform maintains `CompanyID`, `CompanyMask` and
//! `DeletedDatabaseRecord` columns itself. A DAC that declares them as fields
//! interferes with multi-tenancy and soft deletion.
//!
//! Both the property and its field class are reported; names are compared
//! case-insensitively.
//!
//! # Configuration
//!
//! - `extra_forbidden`: additional reserved field names (default: none)

use erp_lint_core::semantic::DacSemanticModel;
use erp_lint_core::{
    AnalysisContext, CheckError, Config, DiagnosticSink, MemberRef, Severity, Suggestion,
    SymbolRule, Violation,
};
use std::sync::Arc;

/// Rule code for dac-forbidden-fields.
pub const CODE: &str = "EL1027";

/// Rule name for dac-forbidden-fields.
pub const NAME: &str = "dac-forbidden-fields";

/// Field names reserved in every configuration.
pub const RESERVED_FIELDS: [&str; 2] = ["CompanyID", "CompanyMask"];

/// Reserved field that is only an error for ISV solutions.
pub const DELETED_DATABASE_RECORD: &str = "DeletedDatabaseRecord";

/// Forbids reserved field names in DACs and DAC extensions.
#[derive(Debug, Clone)]
pub struct DacForbiddenFields {
    /// Severity level.
    pub severity: Severity,
    /// Additional reserved names.
    pub extra_forbidden: Vec<String>,
}

impl Default for DacForbiddenFields {
    fn default() -> Self {
        Self::new()
    }
}

impl DacForbiddenFields {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
            extra_forbidden: Vec::new(),
        }
    }

    /// Creates the rule with options from `[rules.dac-forbidden-fields]`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let extra = config
            .rules
            .get(NAME)
            .map(|rule| rule.get_str_array("extra_forbidden"))
            .unwrap_or_default();
        Self::new().extra_forbidden(extra)
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Adds reserved names.
    #[must_use]
    pub fn extra_forbidden<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_forbidden.extend(names.into_iter().map(Into::into));
        self
    }

    /// Severity for `name`, or `None` if the name is not reserved.
    fn reserved_severity(&self, ctx: &AnalysisContext<'_>, name: &str) -> Option<Severity> {
        if name.eq_ignore_ascii_case(DELETED_DATABASE_RECORD) {
            return Some(if ctx.framework.isv_specific_analyzers {
                self.severity
            } else {
                Severity::Warning
            });
        }

        RESERVED_FIELDS
            .iter()
            .copied()
            .chain(self.extra_forbidden.iter().map(String::as_str))
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
            .then_some(self.severity)
    }

    fn report(&self, member: &MemberRef, severity: Severity) -> Violation {
        let mut violation = self
            .member_violation(
                member,
                format!(
                    "'{}' is reserved by the framework and must not be declared in a DAC",
                    member.name()
                ),
            )
            .with_suggestion(Suggestion::new("Remove the field declaration"));
        violation.severity = severity;
        violation
    }
}

impl SymbolRule<DacSemanticModel> for DacForbiddenFields {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Forbids DAC fields reserved by the framework"
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
        let field_classes = dac
            .field_classes
            .iter()
            .map(|field| field.item())
            .filter(|member| Arc::ptr_eq(member.owner(), &dac.symbol));
        let properties = dac.declared_properties().map(|property| &property.item().member);

        for member in field_classes.chain(properties) {
            ctx.check_cancelled()?;
            if let Some(severity) = self.reserved_severity(ctx, member.name()) {
                sink.report(self.report(member, severity));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_lint_core::{
        CancellationToken, FrameworkContext, Location, Member, MemberKind, SymbolGraph,
        SymbolSnapshot, TypeRef, TypeSymbol,
    };
    use std::path::PathBuf;

    fn dac_with(fields: &[&str]) -> TypeSymbol {
        let mut dac = TypeSymbol::new("SOOrder").with_interface(TypeRef::new("IBqlTable"));
        for (line, name) in fields.iter().enumerate() {
            dac = dac
                .with_member(
                    Member::new(name.to_lowercase(), MemberKind::NestedType)
                        .with_type(TypeRef::new("IBqlField")),
                )
                .with_member(
                    Member::property(*name, TypeRef::new("int"))
                        .at(Location::new(PathBuf::from("SOOrder.cs"), line + 1, 5)),
                );
        }
        dac
    }

    fn check(
        rule: &DacForbiddenFields,
        framework: &FrameworkContext,
        dac: TypeSymbol,
    ) -> Vec<Violation> {
        let snapshot = SymbolSnapshot::new(vec![dac]).expect("valid snapshot");
        let token = CancellationToken::new();
        let ctx = AnalysisContext::new(&snapshot, framework, &token);
        let symbol = snapshot.type_symbol("SOOrder").expect("type exists");
        let model = DacSemanticModel::new(&ctx, &symbol).expect("not cancelled");
        let sink = DiagnosticSink::new();
        rule.analyze(&ctx, &model, &sink).expect("check succeeds");
        sink.into_violations()
    }

    #[test]
    fn test_detects_reserved_fields() {
        let violations = check(
            &DacForbiddenFields::new(),
            &FrameworkContext::default(),
            dac_with(&["CompanyID", "OrderNbr", "CompanyMask"]),
        );
        assert_eq!(violations.len(), 4);
        assert!(violations.iter().all(|v| v.code == CODE));
        assert!(violations.iter().all(|v| v.severity == Severity::Error));
        assert!(violations.iter().any(|v| v.message.starts_with("'companyid'")));
    }

    #[test]
    fn test_deleted_database_record_depends_on_isv_mode() {
        let violations = check(
            &DacForbiddenFields::new(),
            &FrameworkContext::default(),
            dac_with(&["DeletedDatabaseRecord"]),
        );
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.severity == Severity::Warning));

        let isv = FrameworkContext {
            isv_specific_analyzers: true,
            ..FrameworkContext::default()
        };
        let violations = check(
            &DacForbiddenFields::new(),
            &isv,
            dac_with(&["DeletedDatabaseRecord"]),
        );
        assert!(violations.iter().all(|v| v.severity == Severity::Error));
    }

    #[test]
    fn test_extra_forbidden_from_config() {
        let config = Config::parse("[rules.dac-forbidden-fields]\nextra_forbidden = [\"Tstamp\"]")
            .expect("config");
        let rule = DacForbiddenFields::from_config(&config);
        let violations = check(
            &rule,
            &FrameworkContext::default(),
            dac_with(&["tstamp", "OrderNbr"]),
        );
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_allows_regular_fields() {
        let violations = check(
            &DacForbiddenFields::new(),
            &FrameworkContext::default(),
            dac_with(&["OrderNbr", "CompanyName"]),
        );
        assert!(violations.is_empty());
    }
}
