//! Parallel rule-checker aggregation.
//!
//! A [`RuleAggregator`] fans one semantic model out to all of its checkers on
//! a bounded rayon pool. Diagnostics go to a shared [`DiagnosticSink`] as
//! they are produced. Failures are collected per call and surfaced as one
//! [`AnalyzeError`], with cancellation taking precedence over every other
//! cause.

use crate::cancel::Cancelled;
use crate::context::AnalysisContext;
use crate::rule::SymbolRule;
use crate::semantic::{DacSemanticModel, GraphEventSemanticModel};
use crate::symbols::TypeSymbol;
use crate::types::Violation;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Concurrent append-only diagnostic collector.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    violations: Mutex<Vec<Violation>>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn report(&self, violation: Violation) {
        self.violations.lock().push(violation);
    }

    /// Number of diagnostics reported so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    /// Returns `true` if nothing has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }

    /// Removes and returns everything reported so far.
    #[must_use]
    pub fn drain(&self) -> Vec<Violation> {
        std::mem::take(&mut *self.violations.lock())
    }

    /// Consumes the sink.
    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations.into_inner()
    }
}

/// Failure of a rule-checker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// The checker observed cancellation.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// The checker reported an internal failure.
    #[error("rule `{rule}` failed: {message}")]
    Failed {
        /// Rule name.
        rule: String,
        /// Failure description.
        message: String,
    },

    /// The checker panicked.
    #[error("rule `{rule}` panicked: {message}")]
    Panicked {
        /// Rule name.
        rule: String,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// Several checkers of one call failed.
    #[error("{} rule-checkers failed", .0.len())]
    Batch(Vec<CheckError>),
}

impl CheckError {
    /// Creates a [`CheckError::Failed`].
    #[must_use]
    pub fn failed(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error, or any error it wraps, is a cancellation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled(_) => true,
            Self::Batch(causes) => causes.iter().any(Self::is_cancellation),
            Self::Failed { .. } | Self::Panicked { .. } => false,
        }
    }

    fn flatten_into(self, out: &mut Vec<Self>) {
        match self {
            Self::Batch(causes) => causes.into_iter().for_each(|c| c.flatten_into(out)),
            other => out.push(other),
        }
    }
}

/// Outcome of a failed aggregated call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyzeError {
    /// Cancellation was requested.
    #[error("analysis was cancelled")]
    Cancelled,

    /// A rule-checker failed.
    #[error(transparent)]
    Failed(CheckError),
}

impl AnalyzeError {
    /// Returns `true` for [`AnalyzeError::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<Cancelled> for AnalyzeError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<CheckError> for AnalyzeError {
    /// Unwraps batch containers: any cancellation among the causes wins, a
    /// single cause is surfaced as itself, several causes stay batched.
    fn from(error: CheckError) -> Self {
        if error.is_cancellation() {
            return Self::Cancelled;
        }
        let mut causes = Vec::new();
        error.flatten_into(&mut causes);
        match causes.len() {
            1 => Self::Failed(causes.remove(0)),
            _ => Self::Failed(CheckError::Batch(causes)),
        }
    }
}

/// A semantic model that can be inferred from a type.
pub trait SemanticModel: Sized + Send + Sync {
    /// Builds every model `symbol` contributes.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed.
    fn infer(ctx: &AnalysisContext<'_>, symbol: &Arc<TypeSymbol>) -> Result<Vec<Self>, Cancelled>;

    /// Name of the type the model describes.
    fn symbol_name(&self) -> &str;
}

impl SemanticModel for GraphEventSemanticModel {
    fn infer(ctx: &AnalysisContext<'_>, symbol: &Arc<TypeSymbol>) -> Result<Vec<Self>, Cancelled> {
        Self::infer_models(ctx, symbol)
    }

    fn symbol_name(&self) -> &str {
        &self.graph().symbol.name
    }
}

impl SemanticModel for DacSemanticModel {
    fn infer(ctx: &AnalysisContext<'_>, symbol: &Arc<TypeSymbol>) -> Result<Vec<Self>, Cancelled> {
        Self::infer_models(ctx, symbol)
    }

    fn symbol_name(&self) -> &str {
        &self.symbol.name
    }
}

/// Builds a rayon pool for rule-checkers.
///
/// `None` or `Some(0)` sizes the pool to the available parallelism.
///
/// # Errors
///
/// Returns an error if the pool cannot be created.
pub fn build_pool(
    parallelism: Option<usize>,
) -> Result<Arc<rayon::ThreadPool>, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism.unwrap_or(0))
        .thread_name(|i| format!("erp-lint-{i}"))
        .build()
        .map(Arc::new)
}

/// Runs a fixed set of rule-checkers concurrently against one model.
pub struct RuleAggregator<M> {
    rules: Vec<Box<dyn SymbolRule<M>>>,
    pool: Arc<rayon::ThreadPool>,
}

impl<M: SemanticModel> RuleAggregator<M> {
    /// Creates an aggregator running on `pool`.
    #[must_use]
    pub fn new(rules: Vec<Box<dyn SymbolRule<M>>>, pool: Arc<rayon::ThreadPool>) -> Self {
        Self { rules, pool }
    }

    /// Creates an aggregator with its own pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub fn with_parallelism(
        rules: Vec<Box<dyn SymbolRule<M>>>,
        parallelism: Option<usize>,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        Ok(Self::new(rules, build_pool(parallelism)?))
    }

    /// The aggregated rule-checkers.
    #[must_use]
    pub fn rules(&self) -> &[Box<dyn SymbolRule<M>>] {
        &self.rules
    }

    fn is_enabled(ctx: &AnalysisContext<'_>, rule: &dyn SymbolRule<M>) -> bool {
        !rule.isv_specific() || ctx.framework.isv_specific_analyzers
    }

    /// Runs every applicable checker against `model`.
    ///
    /// All checkers run to completion even when one fails; diagnostics of
    /// successful checkers stay in the sink.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Cancelled`] if cancellation was requested
    /// before or during the call, otherwise [`AnalyzeError::Failed`] with the
    /// failing checkers' errors.
    pub fn run(
        &self,
        ctx: &AnalysisContext<'_>,
        model: &M,
        sink: &DiagnosticSink,
    ) -> Result<(), AnalyzeError> {
        ctx.check_cancelled()?;

        let applicable: Vec<&dyn SymbolRule<M>> = self
            .rules
            .iter()
            .map(|rule| &**rule)
            .filter(|rule| Self::is_enabled(ctx, *rule) && rule.should_analyze(ctx, model))
            .collect();
        if applicable.is_empty() {
            return Ok(());
        }

        debug!(
            symbol = model.symbol_name(),
            rules = applicable.len(),
            "Running rule-checkers"
        );

        let failures: Vec<CheckError> = self.pool.install(|| {
            applicable
                .par_iter()
                .filter_map(|rule| run_checker(*rule, ctx, model, sink).err())
                .collect()
        });

        ctx.check_cancelled()?;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CheckError::Batch(failures).into())
        }
    }

    /// Infers the models of `symbol` and runs every checker against each.
    ///
    /// Returns the number of models analyzed.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn analyze_symbol(
        &self,
        ctx: &AnalysisContext<'_>,
        symbol: &Arc<TypeSymbol>,
        sink: &DiagnosticSink,
    ) -> Result<usize, AnalyzeError> {
        let models = M::infer(ctx, symbol)?;
        self.analyze_models(ctx, &models, sink)
    }

    /// Runs every checker against each of `models` in turn.
    ///
    /// Returns the number of models analyzed.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn analyze_models(
        &self,
        ctx: &AnalysisContext<'_>,
        models: &[M],
        sink: &DiagnosticSink,
    ) -> Result<usize, AnalyzeError> {
        for model in models {
            ctx.check_cancelled()?;
            self.run(ctx, model, sink)?;
        }
        Ok(models.len())
    }
}

fn run_checker<M>(
    rule: &dyn SymbolRule<M>,
    ctx: &AnalysisContext<'_>,
    model: &M,
    sink: &DiagnosticSink,
) -> Result<(), CheckError> {
    ctx.check_cancelled()?;
    match panic::catch_unwind(AssertUnwindSafe(|| rule.analyze(ctx, model, sink))) {
        Ok(result) => result,
        Err(payload) => Err(CheckError::Panicked {
            rule: rule.name().to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl<M> std::fmt::Debug for RuleAggregator<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleAggregator")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::context::FrameworkContext;
    use crate::symbols::{SymbolGraph, SymbolSnapshot, TypeRef};
    use crate::types::Location;

    struct Reporter;

    impl SymbolRule<DacSemanticModel> for Reporter {
        fn name(&self) -> &'static str {
            "reporter"
        }
        fn code(&self) -> &'static str {
            "T001"
        }
        fn analyze(
            &self,
            _ctx: &AnalysisContext<'_>,
            model: &DacSemanticModel,
            sink: &DiagnosticSink,
        ) -> Result<(), CheckError> {
            sink.report(self.violation(Location::default(), model.symbol.name.clone()));
            Ok(())
        }
    }

    struct Failing;

    impl SymbolRule<DacSemanticModel> for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn code(&self) -> &'static str {
            "T002"
        }
        fn analyze(
            &self,
            _ctx: &AnalysisContext<'_>,
            _model: &DacSemanticModel,
            _sink: &DiagnosticSink,
        ) -> Result<(), CheckError> {
            Err(CheckError::failed(self.name(), "boom"))
        }
    }

    struct Panicking;

    impl SymbolRule<DacSemanticModel> for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }
        fn code(&self) -> &'static str {
            "T003"
        }
        fn analyze(
            &self,
            _ctx: &AnalysisContext<'_>,
            _model: &DacSemanticModel,
            _sink: &DiagnosticSink,
        ) -> Result<(), CheckError> {
            panic!("checker bug");
        }
    }

    struct IsvOnly;

    impl SymbolRule<DacSemanticModel> for IsvOnly {
        fn name(&self) -> &'static str {
            "isv-only"
        }
        fn code(&self) -> &'static str {
            "T004"
        }
        fn isv_specific(&self) -> bool {
            true
        }
        fn analyze(
            &self,
            _ctx: &AnalysisContext<'_>,
            _model: &DacSemanticModel,
            sink: &DiagnosticSink,
        ) -> Result<(), CheckError> {
            sink.report(self.violation(Location::default(), "isv"));
            Ok(())
        }
    }

    fn snapshot() -> SymbolSnapshot {
        SymbolSnapshot::new(vec![
            TypeSymbol::new("SOOrder").with_interface(TypeRef::new("IBqlTable"))
        ])
        .expect("valid snapshot")
    }

    fn analyze(
        rules: Vec<Box<dyn SymbolRule<DacSemanticModel>>>,
        framework: &FrameworkContext,
    ) -> (Result<usize, AnalyzeError>, Vec<Violation>) {
        let snapshot = snapshot();
        let token = CancellationToken::new();
        let ctx = AnalysisContext::new(&snapshot, framework, &token);
        let aggregator = RuleAggregator::with_parallelism(rules, Some(2)).expect("pool");
        let sink = DiagnosticSink::new();
        let symbol = snapshot.type_symbol("SOOrder").expect("type exists");
        let result = aggregator.analyze_symbol(&ctx, &symbol, &sink);
        (result, sink.into_violations())
    }

    #[test]
    fn every_checker_contributes() {
        let (result, violations) = analyze(
            vec![Box::new(Reporter), Box::new(Reporter)],
            &FrameworkContext::default(),
        );
        assert_eq!(result, Ok(1));
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn single_failure_is_surfaced_unchanged() {
        let (result, violations) = analyze(
            vec![Box::new(Reporter), Box::new(Failing)],
            &FrameworkContext::default(),
        );
        assert_eq!(
            result,
            Err(AnalyzeError::Failed(CheckError::failed("failing", "boom")))
        );
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn panics_become_failures() {
        let (result, _) = analyze(
            vec![Box::new(Panicking), Box::new(Failing)],
            &FrameworkContext::default(),
        );
        match result {
            Err(AnalyzeError::Failed(CheckError::Batch(causes))) => {
                assert_eq!(causes.len(), 2);
                assert!(causes.iter().any(|c| matches!(
                    c,
                    CheckError::Panicked { message, .. } if message == "checker bug"
                )));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn isv_rules_need_the_flag() {
        let (_, violations) = analyze(vec![Box::new(IsvOnly)], &FrameworkContext::default());
        assert!(violations.is_empty());

        let framework = FrameworkContext {
            isv_specific_analyzers: true,
            ..FrameworkContext::default()
        };
        let (_, violations) = analyze(vec![Box::new(IsvOnly)], &framework);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn nested_cancellation_wins() {
        let error = CheckError::Batch(vec![
            CheckError::failed("a", "x"),
            CheckError::Batch(vec![CheckError::Cancelled(Cancelled)]),
        ]);
        assert!(error.is_cancellation());
        assert_eq!(AnalyzeError::from(error), AnalyzeError::Cancelled);
    }

    #[test]
    fn nested_batches_flatten() {
        let error = CheckError::Batch(vec![
            CheckError::failed("a", "x"),
            CheckError::Batch(vec![CheckError::failed("b", "y")]),
        ]);
        assert_eq!(
            AnalyzeError::from(error),
            AnalyzeError::Failed(CheckError::Batch(vec![
                CheckError::failed("a", "x"),
                CheckError::failed("b", "y"),
            ]))
        );
    }

    #[test]
    fn sink_drains() {
        let sink = DiagnosticSink::new();
        sink.report(Violation::new("T", "t", crate::Severity::Info, Location::default(), "m"));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.is_empty());
    }
}
