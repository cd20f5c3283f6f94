use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tracing::debug;

use adg_core::{ContentHash, FileIr, StrategyKind};

/// Cache entry metadata alongside the stored IR.
#[derive(Debug, Clone)]
struct CacheEntry {
    hash: ContentHash,
    ir: FileIr,
    strategy: StrategyKind,
    created_at: SystemTime,
    last_accessed: SystemTime,
    access_count: u64,
    ttl: Option<Duration>,
}

impl CacheEntry {
    fn new(hash: ContentHash, ir: FileIr, strategy: StrategyKind, ttl: Option<Duration>) -> Self {
        let now = SystemTime::now();
        Self {
            hash,
            ir,
            strategy,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.created_at.elapsed().unwrap_or(Duration::ZERO) > ttl,
            None => false,
        }
    }

    fn touch(&mut self) {
        self.last_accessed = SystemTime::now();
        self.access_count += 1;
    }
}

/// A cache hit: the stored IR plus the strategy that produced it.
#[derive(Debug, Clone)]
pub struct CachedIr {
    pub ir: FileIr,
    pub strategy: StrategyKind,
}

/// Cache performance counters.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl: Some(Duration::from_secs(24 * 3600)),
        }
    }
}

impl CacheConfig {
    pub fn from_settings(settings: &adg_core::CacheSettings) -> Self {
        Self {
            max_entries: settings.max_entries,
            default_ttl: if settings.ttl_secs == 0 {
                None
            } else {
                Some(Duration::from_secs(settings.ttl_secs))
            },
        }
    }
}

/// Incremental memo of file analyses keyed by path. A lookup succeeds only
/// when the stored content hash equals the queried one; anything else is a
/// miss and the caller re-analyzes. This is what keeps stale results from
/// outliving an edit.
#[async_trait]
pub trait IrCache: Send + Sync {
    /// Returns the stored IR iff `hash` matches the entry byte-for-byte.
    async fn get(&self, path: &Path, hash: &ContentHash) -> Option<CachedIr>;

    /// Stores `ir` for `path`, replacing any previous entry for that path.
    async fn put(&self, path: &Path, hash: ContentHash, ir: FileIr, strategy: StrategyKind);

    /// Drops the entry for `path`. Returns true if one existed.
    async fn invalidate(&self, path: &Path) -> bool;

    async fn clear(&self);

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn stats(&self) -> CacheStats;
}

/// In-memory `IrCache` on a sharded concurrent map. Per-path operations
/// contend only within a shard; different paths never block each other.
pub struct MemoryIrCache {
    entries: DashMap<PathBuf, CacheEntry>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryIrCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Oldest-access eviction once the capacity bound is crossed.
    fn evict_if_over_capacity(&self) {
        while self.entries.len() > self.config.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().last_accessed)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(path) => {
                    if self.entries.remove(&path).is_some() {
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                        debug!("evicted cache entry for {:?}", path);
                    }
                }
                None => break,
            }
        }
    }
}

impl Default for MemoryIrCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[async_trait]
impl IrCache for MemoryIrCache {
    async fn get(&self, path: &Path, hash: &ContentHash) -> Option<CachedIr> {
        let result = match self.entries.get_mut(path) {
            Some(mut entry) => {
                if entry.hash != *hash {
                    None
                } else if entry.is_expired() {
                    None
                } else {
                    entry.touch();
                    Some(CachedIr {
                        ir: entry.ir.clone(),
                        strategy: entry.strategy,
                    })
                }
            }
            None => None,
        };

        match &result {
            Some(_) => self.record_hit(),
            None => self.record_miss(),
        }
        result
    }

    async fn put(&self, path: &Path, hash: ContentHash, ir: FileIr, strategy: StrategyKind) {
        let entry = CacheEntry::new(hash, ir, strategy, self.config.default_ttl);
        self.entries.insert(path.to_path_buf(), entry);
        self.evict_if_over_capacity();
    }

    async fn invalidate(&self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    async fn clear(&self) {
        self.entries.clear();
    }

    async fn len(&self) -> usize {
        self.entries.len()
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adg_core::{ClassEntity, Language};

    fn ir_with_class(path: &str, class: &str) -> FileIr {
        let mut ir = FileIr::new(path, Language::Python);
        ir.classes.push(ClassEntity::new(class, path, 1));
        ir
    }

    #[tokio::test]
    async fn hit_requires_exact_hash_equality() {
        let cache = MemoryIrCache::default();
        let path = Path::new("src/a.py");
        let old_hash = ContentHash::of_bytes(b"version one");
        let new_hash = ContentHash::of_bytes(b"version two");

        cache
            .put(path, old_hash.clone(), ir_with_class("src/a.py", "Old"), StrategyKind::Precise)
            .await;

        let hit = cache.get(path, &old_hash).await.unwrap();
        assert_eq!(hit.ir.classes[0].name, "Old");
        assert_eq!(hit.strategy, StrategyKind::Precise);

        // Changed content means a changed hash means a miss.
        assert!(cache.get(path, &new_hash).await.is_none());
    }

    #[tokio::test]
    async fn put_overwrites_and_old_hash_never_returns_new_ir() {
        let cache = MemoryIrCache::default();
        let path = Path::new("src/a.py");
        let old_hash = ContentHash::of_bytes(b"version one");
        let new_hash = ContentHash::of_bytes(b"version two");

        cache
            .put(path, old_hash.clone(), ir_with_class("src/a.py", "Old"), StrategyKind::Precise)
            .await;
        cache
            .put(path, new_hash.clone(), ir_with_class("src/a.py", "New"), StrategyKind::Fallback)
            .await;

        assert!(cache.get(path, &old_hash).await.is_none());
        let hit = cache.get(path, &new_hash).await.unwrap();
        assert_eq!(hit.ir.classes[0].name, "New");
        assert_eq!(hit.strategy, StrategyKind::Fallback);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = MemoryIrCache::new(CacheConfig {
            max_entries: 16,
            default_ttl: Some(Duration::ZERO),
        });
        let path = Path::new("src/a.py");
        let hash = ContentHash::of_bytes(b"content");
        cache
            .put(path, hash.clone(), ir_with_class("src/a.py", "A"), StrategyKind::Precise)
            .await;
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(path, &hash).await.is_none());
    }

    #[tokio::test]
    async fn capacity_bound_evicts_oldest_access() {
        let cache = MemoryIrCache::new(CacheConfig {
            max_entries: 2,
            default_ttl: None,
        });
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let path = PathBuf::from(format!("src/{}.py", name));
            let hash = ContentHash::of_bytes(name.as_bytes());
            cache
                .put(&path, hash, ir_with_class(&path.to_string_lossy(), "C"), StrategyKind::Precise)
                .await;
            // Make access times strictly ordered.
            if i < 2 {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        assert_eq!(cache.len().await, 2);
        let stats = cache.stats().await;
        assert_eq!(stats.evictions, 1);
        // The first inserted (and never re-accessed) entry went first.
        let gone = ContentHash::of_bytes(b"a");
        assert!(cache.get(Path::new("src/a.py"), &gone).await.is_none());
    }

    #[tokio::test]
    async fn invalidate_supports_force_reanalysis() {
        let cache = MemoryIrCache::default();
        let path = Path::new("src/a.py");
        let hash = ContentHash::of_bytes(b"content");
        cache
            .put(path, hash.clone(), ir_with_class("src/a.py", "A"), StrategyKind::Precise)
            .await;
        assert!(cache.invalidate(path).await);
        assert!(!cache.invalidate(path).await);
        assert!(cache.get(path, &hash).await.is_none());
    }

    #[tokio::test]
    async fn stats_track_hits_and_misses() {
        let cache = MemoryIrCache::default();
        let path = Path::new("src/a.py");
        let hash = ContentHash::of_bytes(b"content");
        assert!(cache.get(path, &hash).await.is_none());
        cache
            .put(path, hash.clone(), ir_with_class("src/a.py", "A"), StrategyKind::Precise)
            .await;
        assert!(cache.get(path, &hash).await.is_some());
        assert!(cache.get(path, &hash).await.is_some());

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
