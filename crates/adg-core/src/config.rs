use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config as cfg;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Hard ceiling on `analysis.worker_count`; the pipeline clamps its pool
/// to this even when validation was skipped.
pub const MAX_WORKER_COUNT: usize = 256;

/// Per-file resource budgets for parsing and traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "AnalysisConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "AnalysisConfig::default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "AnalysisConfig::default_max_nodes")]
    pub max_nodes: u64,
    #[serde(default = "AnalysisConfig::default_max_memory_bytes")]
    pub max_memory_bytes: u64,
    #[serde(default = "AnalysisConfig::default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
    /// 0 means one worker per logical CPU.
    #[serde(default)]
    pub worker_count: usize,
    /// Memory is sampled every this many visited nodes.
    #[serde(default = "AnalysisConfig::default_memory_check_interval")]
    pub memory_check_interval: u64,
    /// The fallback strategy is cheaper per unit of input, so its timeout
    /// and node budgets are the tight budgets times this factor.
    #[serde(default = "AnalysisConfig::default_fallback_multiplier")]
    pub fallback_limit_multiplier: f64,
}

impl AnalysisConfig {
    fn default_timeout_ms() -> u64 {
        5_000
    }

    fn default_max_depth() -> u32 {
        100
    }

    fn default_max_nodes() -> u64 {
        100_000
    }

    fn default_max_memory_bytes() -> u64 {
        500 * 1024 * 1024
    }

    fn default_max_file_size_bytes() -> u64 {
        50 * 1024 * 1024
    }

    fn default_memory_check_interval() -> u64 {
        100
    }

    fn default_fallback_multiplier() -> f64 {
        2.0
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
            max_depth: Self::default_max_depth(),
            max_nodes: Self::default_max_nodes(),
            max_memory_bytes: Self::default_max_memory_bytes(),
            max_file_size_bytes: Self::default_max_file_size_bytes(),
            worker_count: 0,
            memory_check_interval: Self::default_memory_check_interval(),
            fallback_limit_multiplier: Self::default_fallback_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "CacheSettings::default_enabled")]
    pub enabled: bool,
    #[serde(default = "CacheSettings::default_max_entries")]
    pub max_entries: usize,
    /// Entries older than this are treated as misses. 0 disables expiry.
    #[serde(default = "CacheSettings::default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheSettings {
    fn default_enabled() -> bool {
        true
    }

    fn default_max_entries() -> usize {
        10_000
    }

    fn default_ttl_secs() -> u64 {
        24 * 3600
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            max_entries: Self::default_max_entries(),
            ttl_secs: Self::default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Raw trigger sums are clipped here before weighting.
    #[serde(default = "DetectorConfig::default_max_score")]
    pub max_score: f64,
    /// Recommendations at or below this weighted score are dropped.
    #[serde(default)]
    pub min_score: f64,
    /// Per-archetype multipliers keyed by archetype name
    /// (e.g. "classDiagram" = 1.5). Unlisted archetypes weigh 1.0.
    #[serde(default)]
    pub archetype_weights: HashMap<String, f64>,
}

impl DetectorConfig {
    fn default_max_score() -> f64 {
        100.0
    }

    pub fn weight_for(&self, archetype_name: &str) -> f64 {
        self.archetype_weights
            .get(archetype_name)
            .copied()
            .unwrap_or(1.0)
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_score: Self::default_max_score(),
            min_score: 0.0,
            archetype_weights: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub detector: DetectorConfig,
}

impl Settings {
    fn default_env() -> String {
        env::var("ADG_ENV").unwrap_or_else(|_| "development".to_string())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.analysis.timeout_ms > 0, "analysis.timeout_ms must be > 0");
        anyhow::ensure!(self.analysis.max_depth > 0, "analysis.max_depth must be > 0");
        anyhow::ensure!(self.analysis.max_nodes > 0, "analysis.max_nodes must be > 0");
        anyhow::ensure!(
            self.analysis.max_memory_bytes > 0,
            "analysis.max_memory_bytes must be > 0"
        );
        anyhow::ensure!(
            self.analysis.max_file_size_bytes > 0,
            "analysis.max_file_size_bytes must be > 0"
        );
        anyhow::ensure!(
            self.analysis.worker_count <= MAX_WORKER_COUNT,
            "analysis.worker_count must be <= {} (0 = auto)",
            MAX_WORKER_COUNT
        );
        anyhow::ensure!(
            self.analysis.memory_check_interval > 0,
            "analysis.memory_check_interval must be > 0"
        );
        anyhow::ensure!(
            self.analysis.fallback_limit_multiplier >= 1.0,
            "analysis.fallback_limit_multiplier must be >= 1.0"
        );
        anyhow::ensure!(self.detector.max_score > 0.0, "detector.max_score must be > 0");
        anyhow::ensure!(self.detector.min_score >= 0.0, "detector.min_score must be >= 0");
        for (name, weight) in &self.detector.archetype_weights {
            anyhow::ensure!(
                *weight >= 0.0,
                "detector.archetype_weights.{} must be >= 0",
                name
            );
        }
        Ok(())
    }

    /// Layered load: `default.toml`, then `{env}.toml`, then `local.toml`
    /// under `config_dir` (all optional), then `ADG_*` environment
    /// variables (`ADG_ANALYSIS__TIMEOUT_MS` and friends, `__` separating
    /// sections).
    pub fn load_from_dir(config_dir: &Path, env_name: &str) -> Result<Settings> {
        let settings: Settings = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(cfg::Environment::with_prefix("ADG").separator("__"))
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads from `./config` using `ADG_ENV` (default "development").
    pub fn load() -> Result<Settings> {
        let env_name = Self::default_env();
        let config_dir = env::var("ADG_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));
        info!("loading settings from {:?} (env {})", config_dir, env_name);
        Self::load_from_dir(&config_dir, &env_name)
    }
}
