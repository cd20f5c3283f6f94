// ABOUTME: Language-specific IR collectors sharing one traversal contract.
// ABOUTME: Each collector walks a parsed tree under guard supervision and emits FileIr.

pub mod go;
pub mod java;
pub mod javascript;
pub mod python;
pub mod rust;

use crate::guard::GuardState;
use adg_core::{AnalysisError, FileIr, Language, Result, SourceFile};
use tree_sitter::Tree;

pub use go::GoExtractor;
pub use java::JavaExtractor;
pub use javascript::EcmaExtractor;
pub use python::PythonExtractor;
pub use rust::RustExtractor;

/// Trait for language-specific IR collectors.
///
/// Implementations walk the whole tree exactly once, report every node to
/// the guard, and emit entities in source order. A collector never returns
/// partial IR; a guard breach aborts the file.
pub trait IrExtractor {
    fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr>;
}

/// Dispatch to the collector registered for `language`.
pub fn extract_ir(
    language: Language,
    tree: &Tree,
    source: &SourceFile,
    guard: &mut GuardState,
) -> Result<FileIr> {
    fn run<E: IrExtractor>(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        E::extract(tree, source, guard)
    }

    match language {
        Language::Rust => run::<RustExtractor>(tree, source, guard),
        Language::Python => run::<PythonExtractor>(tree, source, guard),
        Language::JavaScript | Language::TypeScript => run::<EcmaExtractor>(tree, source, guard),
        Language::Go => run::<GoExtractor>(tree, source, guard),
        Language::Java => run::<JavaExtractor>(tree, source, guard),
        other => Err(AnalysisError::UnsupportedLanguage(other.as_str().to_string())),
    }
}
