// ABOUTME: Strategy seam and the two-stage analysis driver.
// ABOUTME: Precise tree-sitter pass under tight limits, pattern fallback under loose ones.

use std::sync::Arc;
use std::time::Instant;

use tracing::{instrument, warn};

use adg_core::{
    AnalysisConfig, AnalysisError, AnalyzerResult, FileIr, Result, SourceFile, StrategyKind,
};

use crate::fallback::PatternFallback;
use crate::guard::{run_guarded, GuardState, Limits};
use crate::languages;
use crate::registry::LanguageRegistry;

/// One way of turning decoded source into IR. Implementations must be cheap
/// to construct; the driver builds one per attempt and moves it onto the
/// blocking pool.
pub trait AnalyzerStrategy {
    fn kind(&self) -> StrategyKind;
    fn analyze(&self, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr>;
}

/// Grammar-backed extraction. Parses with the registered tree-sitter grammar
/// and walks the tree with the per-language collector.
pub struct PreciseStrategy {
    registry: Arc<LanguageRegistry>,
}

impl PreciseStrategy {
    pub fn new(registry: Arc<LanguageRegistry>) -> Self {
        Self { registry }
    }
}

impl AnalyzerStrategy for PreciseStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Precise
    }

    fn analyze(&self, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        let mut parser = self.registry.create_parser(source.language).ok_or_else(|| {
            AnalysisError::UnsupportedLanguage(source.language.as_str().to_string())
        })?;
        let tree = parser.parse(&source.content, None).ok_or_else(|| {
            AnalysisError::Parse(format!(
                "parser produced no tree for {}",
                source.path.display()
            ))
        })?;

        let root = tree.root_node();
        if root.kind() == "ERROR" {
            return Err(AnalysisError::Parse(format!(
                "unparseable source in {}",
                source.path.display()
            )));
        }

        let mut ir = languages::extract_ir(source.language, &tree, source, guard)?;

        // A tree riddled with errors can still walk cleanly and produce
        // nothing. Treat that as a parse failure so the fallback gets a shot
        // at the raw text.
        if ir.is_empty() && root.has_error() {
            return Err(AnalysisError::Parse(format!(
                "syntax errors and no recoverable structure in {}",
                source.path.display()
            )));
        }

        ir.sort_by_line();
        Ok(ir)
    }
}

impl AnalyzerStrategy for PatternFallback {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fallback
    }

    fn analyze(&self, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        PatternFallback::extract(source, guard)
    }
}

/// Drives the strategy cascade for one decoded file.
///
/// Languages with a registered grammar get the precise pass first, under the
/// tight budget. Any failure there, resource breach included, is followed by
/// exactly one fallback attempt under the loose budget. Languages without a
/// grammar skip straight to the fallback. When both attempts fail, the
/// result carries the error of the last attempt.
pub struct FileAnalyzer {
    registry: Arc<LanguageRegistry>,
    config: AnalysisConfig,
}

impl FileAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            registry: Arc::new(LanguageRegistry::new()),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<LanguageRegistry> {
        &self.registry
    }

    #[instrument(skip(self, source), fields(path = %source.path.display(), language = %source.language))]
    pub async fn analyze(&self, source: Arc<SourceFile>) -> AnalyzerResult {
        let started = Instant::now();
        let path = source.path.clone();
        let language = source.language;

        if self.registry.has_grammar(language) {
            let strategy = PreciseStrategy::new(Arc::clone(&self.registry));
            match attempt(strategy, Arc::clone(&source), Limits::tight(&self.config)).await {
                Ok((ir, nodes)) => {
                    return AnalyzerResult::success(
                        path,
                        language,
                        StrategyKind::Precise,
                        ir,
                        started.elapsed(),
                        nodes,
                    );
                }
                Err(e) => {
                    warn!("precise analysis failed, trying fallback: {}", e);
                }
            }
        }

        match attempt(PatternFallback, source, Limits::loose(&self.config)).await {
            Ok((ir, nodes)) => AnalyzerResult::success(
                path,
                language,
                StrategyKind::Fallback,
                ir,
                started.elapsed(),
                nodes,
            ),
            Err(e) => {
                warn!("analysis failed: {}", e);
                AnalyzerResult::failure(path, language, e, started.elapsed(), 0)
            }
        }
    }
}

async fn attempt<S>(
    strategy: S,
    source: Arc<SourceFile>,
    limits: Limits,
) -> Result<(FileIr, u64)>
where
    S: AnalyzerStrategy + Send + 'static,
{
    run_guarded(limits, move |guard| strategy.analyze(&source, guard)).await
}
