pub mod config;
pub mod error;
pub mod ir;
pub mod types;

pub use config::{AnalysisConfig, CacheSettings, DetectorConfig, Settings, MAX_WORKER_COUNT};
pub use error::{AnalysisError, Result};
pub use ir::{ClassEntity, FileIr, FunctionEntity, ImportEdge, ProjectIr};
pub use types::{
    AnalyzerResult, ContentHash, Language, SourceEncoding, SourceFile, StrategyKind,
};
