//! Analyzer driver: discovers symbol snapshots and runs the rule aggregators.

use crate::aggregator::{build_pool, AnalyzeError, CheckError, DiagnosticSink, RuleAggregator};
use crate::cancel::CancellationToken;
use crate::config::{Config, RuleConfig};
use crate::context::AnalysisContext;
use crate::rule::{RuleInfo, RuleSet, SymbolRule};
use crate::semantic::{DacSemanticModel, GraphEventSemanticModel, InstanceCreatedHandlers};
use crate::symbols::{SnapshotError, SymbolGraph, SymbolSnapshot};
use crate::types::{LintResult, Violation};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// IO error reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot could not be loaded.
    #[error("Invalid snapshot {path}: {source}")]
    Snapshot {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying error.
        source: SnapshotError,
    },

    /// Glob pattern error.
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The rule-checker pool could not be created.
    #[error("Failed to start rule-checker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// Cancellation was requested through the shared token.
    #[error("Analysis was cancelled")]
    Cancelled,

    /// A rule-checker failed while analyzing a type.
    #[error("Rule-checker failure in {symbol}: {source}")]
    Rule {
        /// Analyzed type.
        symbol: String,
        /// Checker failure.
        source: CheckError,
    },
}

impl AnalyzerError {
    fn from_analyze(symbol: &str, error: AnalyzeError) -> Self {
        match error {
            AnalyzeError::Cancelled => Self::Cancelled,
            AnalyzeError::Failed(source) => Self::Rule {
                symbol: symbol.to_string(),
                source,
            },
        }
    }
}

/// Builder for configuring an [`Analyzer`].
#[derive(Default)]
pub struct AnalyzerBuilder {
    root: Option<PathBuf>,
    rules: RuleSet,
    exclude_patterns: Vec<String>,
    config: Option<Config>,
    cancellation: Option<CancellationToken>,
    parallelism: Option<usize>,
    fail_on_invalid_snapshot: bool,
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root directory holding snapshots.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Adds every rule of `rules`.
    #[must_use]
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Adds a graph rule-checker.
    #[must_use]
    pub fn graph_rule<R: SymbolRule<GraphEventSemanticModel> + 'static>(mut self, rule: R) -> Self {
        self.rules.graph.push(Box::new(rule));
        self
    }

    /// Adds a DAC rule-checker.
    #[must_use]
    pub fn dac_rule<R: SymbolRule<DacSemanticModel> + 'static>(mut self, rule: R) -> Self {
        self.rules.dac.push(Box::new(rule));
        self
    }

    /// Adds an exclude glob pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Adds multiple exclude glob patterns.
    #[must_use]
    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Shares a cancellation token with the caller.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Sets the number of rule-checker threads.
    #[must_use]
    pub fn parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    /// Sets whether unreadable snapshots abort the run (default: false).
    #[must_use]
    pub fn fail_on_invalid_snapshot(mut self, fail: bool) -> Self {
        self.fail_on_invalid_snapshot = fail;
        self
    }

    /// Builds the analyzer.
    ///
    /// Rules disabled in the configuration are dropped here.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be resolved or the
    /// rule-checker pool cannot be started.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let config = self.config.unwrap_or_default();
        let root = self.root.unwrap_or_else(|| config.analyzer.root.clone());
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(&root)
        };

        let mut exclude_patterns = self.exclude_patterns;
        exclude_patterns.extend(config.analyzer.exclude.clone());
        if exclude_patterns.is_empty() {
            exclude_patterns.extend(["**/bin/**".to_string(), "**/obj/**".to_string()]);
        }

        let mut rules = self.rules;
        rules.retain(|name| {
            let enabled = config.is_rule_enabled(name);
            if !enabled {
                debug!("Skipping disabled rule: {}", name);
            }
            enabled
        });

        let pool = build_pool(self.parallelism.or(config.analyzer.parallelism))?;
        let rule_info = rules.describe();

        Ok(Analyzer {
            root,
            graph: RuleAggregator::new(rules.graph, pool.clone()),
            dac: RuleAggregator::new(rules.dac, pool),
            rule_info,
            exclude_patterns,
            cancellation: self.cancellation.unwrap_or_default(),
            config,
            fail_on_invalid_snapshot: self.fail_on_invalid_snapshot,
        })
    }
}

/// The main analyzer that orchestrates lint execution.
///
/// Use [`Analyzer::builder()`] to construct an instance.
#[derive(Debug)]
pub struct Analyzer {
    root: PathBuf,
    graph: RuleAggregator<GraphEventSemanticModel>,
    dac: RuleAggregator<DacSemanticModel>,
    rule_info: Vec<RuleInfo>,
    exclude_patterns: Vec<String>,
    cancellation: CancellationToken,
    config: Config,
    fail_on_invalid_snapshot: bool,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Returns the root directory being analyzed.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the number of active rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rule_info.len()
    }

    /// Metadata of the active rules.
    #[must_use]
    pub fn rules(&self) -> &[RuleInfo] {
        &self.rule_info
    }

    /// Token that cancels this analyzer's runs.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Analyzes every snapshot under the root.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails, a rule-checker fails, the run is
    /// cancelled, or (when configured) a snapshot cannot be loaded.
    pub fn analyze(&self) -> Result<LintResult, AnalyzerError> {
        info!("Starting analysis at {:?}", self.root);

        let mut result = LintResult::new();
        let files = self.discover_files()?;

        info!("Found {} snapshots to analyze", files.len());

        for path in &files {
            if self.cancellation.is_cancelled() {
                return Err(AnalyzerError::Cancelled);
            }
            debug!("Loading snapshot: {}", path.display());

            let snapshot = match SymbolSnapshot::from_file(path) {
                Ok(snapshot) => snapshot,
                Err(source) => {
                    warn!("Failed to load {}: {}", path.display(), source);
                    if self.fail_on_invalid_snapshot {
                        return Err(AnalyzerError::Snapshot {
                            path: path.clone(),
                            source,
                        });
                    }
                    continue;
                }
            };

            result.extend(self.analyze_snapshot(&snapshot)?);
        }

        result.sort();

        info!(
            "Analysis complete: {} violations in {} snapshots ({} types)",
            result.violations.len(),
            result.snapshots_checked,
            result.types_checked
        );

        Ok(result)
    }

    /// Analyzes one in-memory snapshot.
    ///
    /// Violations without a file are attributed to the snapshot source.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule-checker fails or the run is cancelled.
    pub fn analyze_snapshot(&self, snapshot: &SymbolSnapshot) -> Result<LintResult, AnalyzerError> {
        let mut result = self.analyze_graph(snapshot)?;
        result.snapshots_checked = 1;

        if let Some(source) = snapshot.source() {
            for violation in &mut result.violations {
                if violation.location.file.as_os_str().is_empty() {
                    violation.location.file = source.to_path_buf();
                }
            }
            result.sort();
        }

        Ok(result)
    }

    /// Analyzes every type of a symbol graph.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule-checker fails or the run is cancelled.
    pub fn analyze_graph(&self, graph: &dyn SymbolGraph) -> Result<LintResult, AnalyzerError> {
        let ctx = AnalysisContext::new(graph, &self.config.framework, &self.cancellation);
        let sink = DiagnosticSink::new();
        let mut result = LintResult::new();
        let handlers =
            InstanceCreatedHandlers::collect(&ctx).map_err(|_| AnalyzerError::Cancelled)?;

        for symbol in graph.types() {
            if ctx.check_cancelled().is_err() {
                return Err(AnalyzerError::Cancelled);
            }
            if self.config.framework.is_analysis_suppressed(&symbol) {
                debug!("Skipping suppressed type: {}", symbol.name);
                continue;
            }

            let graph_models = GraphEventSemanticModel::explicit_model(&ctx, &symbol, &handlers)
                .map_err(AnalyzeError::from)
                .and_then(|model| self.graph.analyze_models(&ctx, model.as_slice(), &sink))
                .map_err(|e| AnalyzerError::from_analyze(&symbol.name, e))?;
            let dac_models = self
                .dac
                .analyze_symbol(&ctx, &symbol, &sink)
                .map_err(|e| AnalyzerError::from_analyze(&symbol.name, e))?;

            if graph_models + dac_models > 0 {
                debug!(
                    "Analyzed {} ({} graph, {} DAC models)",
                    symbol.name, graph_models, dac_models
                );
                result.types_checked += 1;
            }
        }

        result.violations = sink
            .into_violations()
            .into_iter()
            .map(|v| self.apply_severity_override(v))
            .collect();
        result.sort();
        Ok(result)
    }

    /// Applies severity overrides from configuration.
    fn apply_severity_override(&self, mut violation: Violation) -> Violation {
        if let Some(severity) = self.config.rule_severity(&violation.rule) {
            violation.severity = severity;
        }
        violation
    }

    /// Discovers all snapshot files to analyze.
    fn discover_files(&self) -> Result<Vec<PathBuf>, AnalyzerError> {
        let pattern = format!("{}/**/*.json", self.root.display());
        let mut files = Vec::new();

        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(|e| AnalyzerError::Io(e.into_error()))?;

            if self.should_exclude(&path) {
                debug!("Excluding: {}", path.display());
                continue;
            }

            files.push(path);
        }

        Ok(files)
    }

    /// Checks if a path should be excluded.
    fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        for pattern in &self.exclude_patterns {
            if let Ok(glob_pattern) = glob::Pattern::new(pattern) {
                if glob_pattern.matches(&path_str) {
                    return true;
                }
            }

            // "**/obj/**" also matches as a plain "/obj/" substring
            let normalized_pattern = pattern.replace("**", "");
            if !normalized_pattern.is_empty() && path_str.contains(&normalized_pattern) {
                return true;
            }
        }

        false
    }

    /// Gets the rule configuration for a specific rule.
    #[must_use]
    pub fn rule_config(&self, rule_name: &str) -> Option<&RuleConfig> {
        self.config.rules.get(rule_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::InitializerKind;
    use crate::symbols::{AttributeApplication, InitDelegate, TypeRef, TypeSymbol};
    use crate::types::{Location, Severity};

    struct EveryDac;

    impl SymbolRule<DacSemanticModel> for EveryDac {
        fn name(&self) -> &'static str {
            "every-dac"
        }
        fn code(&self) -> &'static str {
            "T100"
        }
        fn default_severity(&self) -> Severity {
            Severity::Info
        }
        fn analyze(
            &self,
            _ctx: &AnalysisContext<'_>,
            model: &DacSemanticModel,
            sink: &DiagnosticSink,
        ) -> Result<(), CheckError> {
            sink.report(
                self.violation(Location::default(), "seen")
                    .with_symbol(model.symbol.name.clone()),
            );
            Ok(())
        }
    }

    struct EveryGraph;

    impl SymbolRule<GraphEventSemanticModel> for EveryGraph {
        fn name(&self) -> &'static str {
            "every-graph"
        }
        fn code(&self) -> &'static str {
            "T200"
        }
        fn default_severity(&self) -> Severity {
            Severity::Info
        }
        fn analyze(
            &self,
            _ctx: &AnalysisContext<'_>,
            model: &GraphEventSemanticModel,
            sink: &DiagnosticSink,
        ) -> Result<(), CheckError> {
            let graph = model.graph();
            let handlers = graph
                .initializers_of(InitializerKind::InstanceCreatedDelegate)
                .count();
            sink.report(
                self.violation(Location::default(), format!("{handlers} handlers"))
                    .with_symbol(graph.symbol.name.clone()),
            );
            Ok(())
        }
    }

    fn registrar_snapshot() -> SymbolSnapshot {
        let graph = |name: &str| {
            TypeSymbol::new(name).with_base(TypeRef::generic("PXGraph", vec![TypeRef::new(name)]))
        };
        let handler = |graph: &str, delegate: &str| InitDelegate {
            graph: graph.to_string(),
            delegate: delegate.to_string(),
            location: None,
        };
        SymbolSnapshot::new(vec![
            graph("SOOrderEntry"),
            graph("ARInvoiceEntry")
                .with_attribute(AttributeApplication::new("PXSuppressAnalysisAttribute")),
            TypeSymbol::new("Registrar")
                .with_init_delegate(handler("SOOrderEntry", "OnOrderEntryCreated"))
                .with_init_delegate(handler("ARInvoiceEntry", "OnInvoiceEntryCreated")),
            graph("SOOrderEntryRegistrar")
                .with_init_delegate(handler("SOOrderEntry", "OnOrderEntryCreatedAgain")),
        ])
        .expect("valid snapshot")
    }

    fn snapshot() -> SymbolSnapshot {
        SymbolSnapshot::new(vec![
            TypeSymbol::new("SOOrder").with_interface(TypeRef::new("IBqlTable")),
            TypeSymbol::new("SOLine").with_interface(TypeRef::new("IBqlTable")),
            TypeSymbol::new("Hidden")
                .with_interface(TypeRef::new("IBqlTable"))
                .with_attribute(AttributeApplication::new("PXSuppressAnalysisAttribute")),
            TypeSymbol::new("Helper"),
        ])
        .expect("valid snapshot")
    }

    #[test]
    fn test_builder() {
        let analyzer = Analyzer::builder()
            .root(".")
            .exclude("**/bin/**")
            .build()
            .expect("Failed to build analyzer");

        assert!(analyzer.root().exists());
        assert_eq!(analyzer.rule_count(), 0);
    }

    #[test]
    fn test_exclude_patterns() {
        let analyzer = Analyzer::builder()
            .root(".")
            .exclude("**/bin/**")
            .exclude("**/obj/**")
            .build()
            .expect("Failed to build analyzer");

        assert!(analyzer.should_exclude(Path::new("/foo/bin/Debug/types.json")));
        assert!(analyzer.should_exclude(Path::new("/foo/obj/types.json")));
        assert!(!analyzer.should_exclude(Path::new("/foo/snapshots/types.json")));
    }

    #[test]
    fn analyzes_every_unsuppressed_type() {
        let analyzer = Analyzer::builder()
            .dac_rule(EveryDac)
            .parallelism(2)
            .build()
            .expect("analyzer");
        let result = analyzer.analyze_snapshot(&snapshot()).expect("analysis");

        assert_eq!(result.types_checked, 2);
        assert_eq!(result.snapshots_checked, 1);
        let symbols: Vec<&str> = result
            .violations
            .iter()
            .filter_map(|v| v.symbol.as_deref())
            .collect();
        assert_eq!(symbols.len(), 2);
        assert!(!symbols.contains(&"Hidden"));
    }

    #[test]
    fn config_disables_and_overrides_rules() {
        let config = Config::parse("[rules.every-dac]\nseverity = \"error\"").expect("config");
        let analyzer = Analyzer::builder()
            .config(config)
            .dac_rule(EveryDac)
            .build()
            .expect("analyzer");
        let result = analyzer.analyze_snapshot(&snapshot()).expect("analysis");
        assert!(result.violations.iter().all(|v| v.severity == Severity::Error));

        let config = Config::parse("[rules.every-dac]\nenabled = false").expect("config");
        let analyzer = Analyzer::builder()
            .config(config)
            .dac_rule(EveryDac)
            .build()
            .expect("analyzer");
        assert_eq!(analyzer.rule_count(), 0);
        assert!(analyzer
            .analyze_snapshot(&snapshot())
            .expect("analysis")
            .violations
            .is_empty());
    }

    #[test]
    fn registered_graphs_are_analyzed_once() {
        let analyzer = Analyzer::builder()
            .graph_rule(EveryGraph)
            .build()
            .expect("analyzer");
        let result = analyzer.analyze_snapshot(&registrar_snapshot()).expect("analysis");

        let mut seen: Vec<(&str, &str)> = result
            .violations
            .iter()
            .map(|v| (v.symbol.as_deref().unwrap_or_default(), v.message.as_str()))
            .collect();
        seen.sort_unstable();
        assert_eq!(
            seen,
            vec![
                ("SOOrderEntry", "2 handlers"),
                ("SOOrderEntryRegistrar", "0 handlers"),
            ]
        );
        assert_eq!(result.types_checked, 2);
    }

    #[test]
    fn cancelled_token_aborts() {
        let token = CancellationToken::new();
        let analyzer = Analyzer::builder()
            .dac_rule(EveryDac)
            .cancellation(token.clone())
            .build()
            .expect("analyzer");
        token.cancel();
        assert!(matches!(
            analyzer.analyze_snapshot(&snapshot()),
            Err(AnalyzerError::Cancelled)
        ));
    }
}
