use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("analysis timed out after {elapsed_ms}ms (budget {budget_ms}ms)")]
    Timeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("recursion depth {depth} exceeds limit {max_depth}")]
    DepthLimitExceeded { depth: u32, max_depth: u32 },

    #[error("visited {count} nodes, limit is {max_nodes}")]
    NodeCountExceeded { count: u64, max_nodes: u64 },

    #[error("process memory {used_bytes}B exceeds limit {max_bytes}B")]
    MemoryLimitExceeded { used_bytes: u64, max_bytes: u64 },

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("file size {size}B exceeds limit {limit}B")]
    FileTooLarge { size: u64, limit: u64 },
}

impl AnalysisError {
    /// Stable label for summaries and per-kind tallies.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Io(_) => "io",
            AnalysisError::Parse(_) => "parse",
            AnalysisError::Timeout { .. } => "timeout",
            AnalysisError::DepthLimitExceeded { .. } => "depth_limit",
            AnalysisError::NodeCountExceeded { .. } => "node_limit",
            AnalysisError::MemoryLimitExceeded { .. } => "memory_limit",
            AnalysisError::UnsupportedLanguage(_) => "unsupported_language",
            AnalysisError::Encoding(_) => "encoding",
            AnalysisError::FileTooLarge { .. } => "file_too_large",
        }
    }

    /// True for errors raised by resource enforcement rather than by the
    /// grammar itself.
    pub fn is_limit_breach(&self) -> bool {
        matches!(
            self,
            AnalysisError::Timeout { .. }
                | AnalysisError::DepthLimitExceeded { .. }
                | AnalysisError::NodeCountExceeded { .. }
                | AnalysisError::MemoryLimitExceeded { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
