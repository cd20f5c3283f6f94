// ABOUTME: End-to-end analysis runs: collect, load, analyze, cache, aggregate, recommend.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use adg_cache::{CacheConfig, CacheStats, IrCache, MemoryIrCache};
use adg_core::{
    AnalyzerResult, Language, ProjectIr, Result, Settings, StrategyKind, MAX_WORKER_COUNT,
};
use adg_detect::{DiagramDetector, DiagramRecommendation};

use crate::classify;
use crate::collect::{self, CollectConfig};
use crate::source;
use crate::strategy::FileAnalyzer;

pub type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Everything one run produces: per-file outcomes in input order, the
/// aggregate IR over the successful ones, ranked diagram recommendations,
/// and the run totals.
#[derive(Debug)]
pub struct AnalysisReport {
    pub results: Vec<AnalyzerResult>,
    pub project: ProjectIr,
    pub recommendations: Vec<DiagramRecommendation>,
    pub summary: AnalysisSummary,
}

#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub from_cache: usize,
    pub fallback_used: usize,
    pub languages: BTreeMap<Language, usize>,
    pub total_classes: usize,
    pub total_functions: usize,
    pub total_imports: usize,
    pub elapsed: Duration,
}

/// Flips the run's cancellation flag. Cloneable and usable from any task;
/// cancelling stops new files from being dispatched while in-flight files
/// run to completion or hit their own budgets.
#[derive(Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Orchestrates a bounded analysis run over many files. Workers are a
/// fixed-size `buffer_unordered` pool; every worker owns its inputs and
/// outputs, and the aggregate IR is folded by the single driver task after
/// the stream drains.
pub struct AnalysisPipeline {
    settings: Settings,
    analyzer: Arc<FileAnalyzer>,
    detector: DiagramDetector,
    cache: Option<Arc<dyn IrCache>>,
    cancel: watch::Sender<bool>,
    progress: Option<Arc<ProgressFn>>,
}

impl AnalysisPipeline {
    pub fn new(settings: Settings) -> Self {
        let cache: Option<Arc<dyn IrCache>> = if settings.cache.enabled {
            Some(Arc::new(MemoryIrCache::new(CacheConfig::from_settings(
                &settings.cache,
            ))))
        } else {
            None
        };
        let (cancel, _) = watch::channel(false);
        Self {
            analyzer: Arc::new(FileAnalyzer::new(settings.analysis.clone())),
            detector: DiagramDetector::new(settings.detector.clone()),
            cache,
            cancel,
            progress: None,
            settings,
        }
    }

    /// Swaps in a different cache implementation.
    pub fn with_cache(mut self, cache: Arc<dyn IrCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Registers a completion callback, called with (done, total) after
    /// every file.
    pub fn with_progress(mut self, progress: Arc<ProgressFn>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel.clone(),
        }
    }

    /// Collects candidate files under `root` and analyzes them.
    pub async fn analyze_directory(&self, root: &Path) -> Result<AnalysisReport> {
        self.analyze_directory_with_config(root, &CollectConfig::default())
            .await
    }

    pub async fn analyze_directory_with_config(
        &self,
        root: &Path,
        config: &CollectConfig,
    ) -> Result<AnalysisReport> {
        let files = collect::collect_source_files_with_config(root, config)?;
        Ok(self
            .analyze_files(files.into_iter().map(|(path, _)| path).collect())
            .await)
    }

    /// Analyzes an explicit file list. Results come back in input order
    /// regardless of completion order; files not dispatched because of
    /// cancellation are absent from `results` but still counted in
    /// `total_files`.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn analyze_files(&self, files: Vec<PathBuf>) -> AnalysisReport {
        let started = Instant::now();
        let total = files.len();
        let workers = effective_worker_count(self.settings.analysis.worker_count);
        info!("analyzing {} files with {} workers", total, workers);

        let cancel_rx = self.cancel.subscribe();
        let max_file_size = self.settings.analysis.max_file_size_bytes;

        let tasks = files.into_iter().enumerate().map(|(idx, path)| {
            let analyzer = Arc::clone(&self.analyzer);
            let cache = self.cache.clone();
            let cancel = cancel_rx.clone();
            async move {
                if *cancel.borrow() {
                    return (idx, None);
                }
                let result = analyze_path(&analyzer, cache.as_deref(), max_file_size, path).await;
                (idx, Some(result))
            }
        });

        let mut buffered = stream::iter(tasks).buffer_unordered(workers);
        let mut indexed: Vec<(usize, AnalyzerResult)> = Vec::with_capacity(total);
        let mut done = 0usize;

        while let Some((idx, outcome)) = buffered.next().await {
            done += 1;
            if let Some(progress) = &self.progress {
                progress(done, total);
            }
            let Some(result) = outcome else {
                continue;
            };
            match &result.error {
                Some(e) => warn!("{}: {}", result.path.display(), e),
                None if result.from_cache => debug!("{}: cache hit", result.path.display()),
                None => debug!(
                    "{}: {} entities via {} in {:?}",
                    result.path.display(),
                    result.ir.as_ref().map(|ir| ir.entity_count()).unwrap_or(0),
                    result.strategy.map(|s| s.to_string()).unwrap_or_default(),
                    result.elapsed
                ),
            }
            indexed.push((idx, result));
        }
        drop(buffered);

        indexed.sort_by_key(|(idx, _)| *idx);
        let results: Vec<AnalyzerResult> = indexed.into_iter().map(|(_, r)| r).collect();

        let mut project = ProjectIr::new();
        for result in &results {
            if let Some(ir) = &result.ir {
                project.push(ir.clone());
            }
        }

        let recommendations = self.detector.detect(&project);

        let summary = AnalysisSummary {
            total_files: total,
            succeeded: results.iter().filter(|r| r.error.is_none()).count(),
            failed: results.iter().filter(|r| r.error.is_some()).count(),
            from_cache: results.iter().filter(|r| r.from_cache).count(),
            fallback_used: results
                .iter()
                .filter(|r| r.strategy == Some(StrategyKind::Fallback))
                .count(),
            languages: project.languages(),
            total_classes: project.total_classes(),
            total_functions: project.total_functions(),
            total_imports: project.total_imports(),
            elapsed: started.elapsed(),
        };
        info!(
            "analysis complete: {}/{} succeeded, {} failed, {} cached, {} via fallback, {:?}",
            summary.succeeded,
            summary.total_files,
            summary.failed,
            summary.from_cache,
            summary.fallback_used,
            summary.elapsed
        );

        AnalysisReport {
            results,
            project,
            recommendations,
            summary,
        }
    }

    /// Analyzes a single file through the same load/cache/strategy path the
    /// batch workers use.
    #[instrument(skip(self))]
    pub async fn analyze_file(&self, path: &Path) -> AnalyzerResult {
        analyze_path(
            &self.analyzer,
            self.cache.as_deref(),
            self.settings.analysis.max_file_size_bytes,
            path.to_path_buf(),
        )
        .await
    }

    /// Drops any cached IR for `path` so the next analysis recomputes it.
    pub async fn invalidate(&self, path: &Path) -> bool {
        match &self.cache {
            Some(cache) => cache.invalidate(path).await,
            None => false,
        }
    }

    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }
}

async fn analyze_path(
    analyzer: &FileAnalyzer,
    cache: Option<&dyn IrCache>,
    max_file_size: u64,
    path: PathBuf,
) -> AnalyzerResult {
    let started = Instant::now();

    let source = match source::load_source(&path, max_file_size).await {
        Ok(source) => Arc::new(source),
        Err(e) => {
            let language = classify::language_for_path(&path);
            return AnalyzerResult::failure(path, language, e, started.elapsed(), 0);
        }
    };

    if let Some(cache) = cache {
        if let Some(hit) = cache.get(&path, &source.hash).await {
            return AnalyzerResult::cached(path, source.language, hit.strategy, hit.ir, started.elapsed());
        }
    }

    let result = analyzer.analyze(Arc::clone(&source)).await;

    if let Some(cache) = cache {
        if let (Some(ir), Some(strategy)) = (result.ir.as_ref(), result.strategy) {
            cache
                .put(&result.path, source.hash.clone(), ir.clone(), strategy)
                .await;
        }
    }
    result
}

fn effective_worker_count(configured: usize) -> usize {
    let count = if configured == 0 {
        num_cpus::get()
    } else {
        configured
    };
    count.clamp(1, MAX_WORKER_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adg_core::AnalysisError;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn worker_count_resolves_auto_and_caps() {
        assert!(effective_worker_count(0) >= 1);
        assert_eq!(effective_worker_count(4), 4);
        assert_eq!(effective_worker_count(10_000), MAX_WORKER_COUNT);
    }

    #[tokio::test]
    async fn oversize_file_fails_without_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "big.py", &"x = 1\n".repeat(100));

        let mut settings = Settings::default();
        settings.analysis.max_file_size_bytes = 16;
        let pipeline = AnalysisPipeline::new(settings);

        let result = pipeline.analyze_file(&path).await;
        assert!(matches!(
            result.error,
            Some(AnalysisError::FileTooLarge { limit: 16, .. })
        ));
        assert!(result.strategy.is_none());
        assert!(result.ir.is_none());
        assert_eq!(result.language, Language::Python);
    }

    #[tokio::test]
    async fn second_analysis_of_unchanged_file_hits_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "svc.py", "class Service:\n    def ping(self):\n        pass\n");
        let pipeline = AnalysisPipeline::new(Settings::default());

        let first = pipeline.analyze_file(&path).await;
        assert!(!first.from_cache);
        assert_eq!(first.strategy, Some(StrategyKind::Precise));

        let second = pipeline.analyze_file(&path).await;
        assert!(second.from_cache);
        assert_eq!(second.strategy, Some(StrategyKind::Precise));
        assert_eq!(first.ir, second.ir);

        assert!(pipeline.invalidate(&path).await);
        let third = pipeline.analyze_file(&path).await;
        assert!(!third.from_cache);
    }

    #[tokio::test]
    async fn disabled_cache_never_serves_hits() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "svc.py", "class Service: pass\n");

        let mut settings = Settings::default();
        settings.cache.enabled = false;
        let pipeline = AnalysisPipeline::new(settings);

        pipeline.analyze_file(&path).await;
        let again = pipeline.analyze_file(&path).await;
        assert!(!again.from_cache);
        assert!(pipeline.cache_stats().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_stops_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..4)
            .map(|i| write(dir.path(), &format!("f{}.py", i), "def f(): pass\n"))
            .collect();

        let pipeline = AnalysisPipeline::new(Settings::default());
        pipeline.cancel_handle().cancel();
        assert!(pipeline.cancel_handle().is_cancelled());

        let report = pipeline.analyze_files(files).await;
        assert_eq!(report.summary.total_files, 4);
        assert!(report.results.is_empty());
        assert_eq!(report.summary.succeeded, 0);
        assert!(report.project.is_empty());
    }

    #[tokio::test]
    async fn progress_callback_sees_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..3)
            .map(|i| write(dir.path(), &format!("f{}.py", i), "def f(): pass\n"))
            .collect();

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let pipeline = AnalysisPipeline::new(Settings::default()).with_progress(Arc::new(
            move |done, total| {
                assert!(done <= total);
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));

        let report = pipeline.analyze_files(files).await;
        assert_eq!(report.summary.succeeded, 3);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
