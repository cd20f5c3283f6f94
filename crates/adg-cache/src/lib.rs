pub mod cache;

pub use cache::{CacheConfig, CacheStats, CachedIr, IrCache, MemoryIrCache};
