use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::Language;

/// A class-like declaration: class, struct, trait, interface, enum.
/// Uniqueness key across a project is `(file, name, line)`; names alone may
/// repeat. Base names are opaque strings, never resolved symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntity {
    pub name: String,
    pub file: PathBuf,
    pub line: u32,
    pub methods: Vec<String>,
    pub attributes: Vec<String>,
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
}

impl ClassEntity {
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line,
            methods: Vec::new(),
            attributes: Vec::new(),
            bases: Vec::new(),
            decorators: Vec::new(),
        }
    }

    pub fn with_methods(mut self, methods: Vec<String>) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_bases(mut self, bases: Vec<String>) -> Self {
        self.bases = bases;
        self
    }

    pub fn with_decorators(mut self, decorators: Vec<String>) -> Self {
        self.decorators = decorators;
        self
    }
}

/// A callable declaration. Methods appear here as well as in their class's
/// `methods` list; the class keeps names only, this carries the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntity {
    pub name: String,
    pub file: PathBuf,
    pub line: u32,
    pub params: Vec<String>,
    pub return_type: Option<String>,
    pub is_async: bool,
    pub decorators: Vec<String>,
}

impl FunctionEntity {
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line,
            params: Vec::new(),
            return_type: None,
            is_async: false,
            decorators: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

/// A module reference. Empty `symbols` means the whole module was imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEdge {
    pub file: PathBuf,
    pub module: String,
    pub symbols: Vec<String>,
}

impl ImportEdge {
    pub fn new(file: impl Into<PathBuf>, module: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            module: module.into(),
            symbols: Vec::new(),
        }
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }
}

/// Canonical structural summary of one file. Either fully present (from one
/// successful strategy) or absent; entity order follows source order, which
/// downstream layout depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIr {
    pub path: PathBuf,
    pub language: Language,
    pub classes: Vec<ClassEntity>,
    pub functions: Vec<FunctionEntity>,
    pub imports: Vec<ImportEdge>,
}

impl FileIr {
    pub fn new(path: impl Into<PathBuf>, language: Language) -> Self {
        Self {
            path: path.into(),
            language,
            classes: Vec::new(),
            functions: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.functions.is_empty() && self.imports.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.classes.len() + self.functions.len() + self.imports.len()
    }

    /// Restores ascending line order for classes and functions. Tree walks
    /// already emit in source order; pattern scans run per category and need
    /// the sort. Imports keep scan order, which is source order either way.
    pub fn sort_by_line(&mut self) {
        self.classes.sort_by_key(|c| c.line);
        self.functions.sort_by_key(|f| f.line);
    }
}

/// Aggregate IR for one analysis run: the per-file IRs in aggregation order
/// plus derived tallies. Input to diagram-type detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectIr {
    pub files: Vec<FileIr>,
}

impl ProjectIr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: FileIr) {
        self.files.push(file);
    }

    pub fn is_empty(&self) -> bool {
        self.files.iter().all(|f| f.is_empty())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn total_classes(&self) -> usize {
        self.files.iter().map(|f| f.classes.len()).sum()
    }

    pub fn total_functions(&self) -> usize {
        self.files.iter().map(|f| f.functions.len()).sum()
    }

    pub fn total_imports(&self) -> usize {
        self.files.iter().map(|f| f.imports.len()).sum()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassEntity> {
        self.files.iter().flat_map(|f| f.classes.iter())
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionEntity> {
        self.files.iter().flat_map(|f| f.functions.iter())
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportEdge> {
        self.files.iter().flat_map(|f| f.imports.iter())
    }

    /// Per-language file tally in deterministic (enum) order.
    pub fn languages(&self) -> BTreeMap<Language, usize> {
        let mut tally = BTreeMap::new();
        for file in &self.files {
            *tally.entry(file.language).or_insert(0) += 1;
        }
        tally
    }
}
