use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AnalysisError;
use crate::ir::FileIr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
    Cpp,
    Swift,
    Kotlin,
    CSharp,
    Ruby,
    Php,
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rust" => Ok(Language::Rust),
            "typescript" => Ok(Language::TypeScript),
            "javascript" => Ok(Language::JavaScript),
            "python" => Ok(Language::Python),
            "go" => Ok(Language::Go),
            "java" => Ok(Language::Java),
            "cpp" | "c++" | "c" => Ok(Language::Cpp),
            "swift" => Ok(Language::Swift),
            "kotlin" => Ok(Language::Kotlin),
            "csharp" | "c#" => Ok(Language::CSharp),
            "ruby" => Ok(Language::Ruby),
            "php" => Ok(Language::Php),
            "unknown" => Ok(Language::Unknown),
            other => Err(format!("unrecognized language: {}", other)),
        }
    }
}

/// Which strategy produced a result. Consumers that are precision-sensitive
/// can filter on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    Precise,
    Fallback,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Precise => write!(f, "precise"),
            StrategyKind::Fallback => write!(f, "fallback"),
        }
    }
}

/// Lowercase hex SHA-256 of a file's raw bytes. The cache key component:
/// two hashes compare equal iff the bytes were identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encoding the raw bytes were decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceEncoding {
    Utf8,
    /// UTF-8 with a leading byte order mark, stripped during decode.
    Utf8Bom,
    /// Byte-for-byte Latin-1 recovery after UTF-8 decoding failed.
    Latin1,
}

/// A source file after reading and decoding. Immutable once constructed;
/// the hash covers the raw bytes, not the decoded text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
    pub content: String,
    pub encoding: SourceEncoding,
    pub size_bytes: u64,
    pub hash: ContentHash,
}

/// Outcome of analyzing one file. Exactly one of `ir`/`error` is populated;
/// a successful result always names the strategy that produced it.
#[derive(Debug)]
pub struct AnalyzerResult {
    pub path: PathBuf,
    pub language: Language,
    pub strategy: Option<StrategyKind>,
    pub ir: Option<FileIr>,
    pub error: Option<AnalysisError>,
    pub elapsed: Duration,
    pub nodes_visited: u64,
    pub from_cache: bool,
}

impl AnalyzerResult {
    pub fn success(
        path: PathBuf,
        language: Language,
        strategy: StrategyKind,
        ir: FileIr,
        elapsed: Duration,
        nodes_visited: u64,
    ) -> Self {
        Self {
            path,
            language,
            strategy: Some(strategy),
            ir: Some(ir),
            error: None,
            elapsed,
            nodes_visited,
            from_cache: false,
        }
    }

    pub fn failure(
        path: PathBuf,
        language: Language,
        error: AnalysisError,
        elapsed: Duration,
        nodes_visited: u64,
    ) -> Self {
        Self {
            path,
            language,
            strategy: None,
            ir: None,
            error: Some(error),
            elapsed,
            nodes_visited,
            from_cache: false,
        }
    }

    pub fn cached(
        path: PathBuf,
        language: Language,
        strategy: StrategyKind,
        ir: FileIr,
        elapsed: Duration,
    ) -> Self {
        Self {
            path,
            language,
            strategy: Some(strategy),
            ir: Some(ir),
            error: None,
            elapsed,
            nodes_visited: 0,
            from_cache: true,
        }
    }

    pub fn is_success(&self) -> bool {
        self.ir.is_some()
    }
}
