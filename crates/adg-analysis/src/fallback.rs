// ABOUTME: Pattern-based fallback extraction for any text the precise pass cannot handle.
// ABOUTME: Line-oriented regex families per language group, with a generic net for unknowns.

use crate::guard::GuardState;
use adg_core::{ClassEntity, FileIr, FunctionEntity, ImportEdge, Language, Result, SourceFile};
use once_cell::sync::Lazy;
use regex::Regex;

static PY_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*class\s+(\w+)(?:\(([^)]*)\))?\s*:").unwrap());
static PY_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(async\s+)?def\s+(\w+)\s*\(([^)]*)").unwrap());
static PY_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*import\s+(.+)$").unwrap());
static PY_FROM_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*from\s+([\w.]+)\s+import\s+(.+)$").unwrap());

static ES_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"class\s+(\w+)(?:\s+extends\s+([\w.]+))?(?:\s+implements\s+([\w.,\s]+))?").unwrap()
});
static ES_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(async\s+)?function\s*\*?\s*(\w+)\s*\(([^)]*)").unwrap());
static ES_ARROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:const|let|var)\s+(\w+)\s*=\s*(async\b)?\s*(?:\(([^)]*)\)|\w+)\s*=>").unwrap()
});
static ES_IMPORT_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\s+[^'"]*?from\s+['"]([^'"]+)['"]"#).unwrap());
static ES_IMPORT_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\s+['"]([^'"]+)['"]"#).unwrap());
static ES_REQUIRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

static JAVA_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:class|interface|enum|record)\s+(\w+)(?:\s+extends\s+([\w.,\s<>]+?))?(?:\s+implements\s+([\w.,\s<>]+))?\s*\{",
    )
    .unwrap()
});
static JAVA_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:public|private|protected)\s+(?:static\s+)?(?:final\s+)?[\w<>\[\],.\s]*?(\w+)\s*\(([^)]*)\)")
        .unwrap()
});
static JAVA_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)\s*;").unwrap());

static GO_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^type\s+(\w+)\s+(struct|interface)\s*\{").unwrap());
static GO_FUNC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^func\s+(?:\([^)]*\)\s+)?(\w+)\s*\(([^)]*)").unwrap());
static GO_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*import\s+"([^"]+)""#).unwrap());
static GO_IMPORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*(?:[\w.]+\s+|_\s+)?"([^"]+)"\s*$"#).unwrap());

static RS_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union)\s+(\w+)").unwrap()
});
static RS_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(async\s+)?(?:unsafe\s+)?fn\s+(\w+)\s*[(<]")
        .unwrap()
});
static RS_USE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([^;]+);").unwrap());

static RB_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:class|module)\s+([A-Z]\w*)(?:\s*<\s*([\w:]+))?").unwrap()
});
static RB_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*def\s+(?:self\.)?([\w?!]+)(?:\s*\(([^)]*)\))?").unwrap());
static RB_REQUIRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*require(?:_relative)?\s+['"]([^'"]+)['"]"#).unwrap());

static PHP_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:class|interface|trait)\s+(\w+)(?:\s+extends\s+([\w\\]+))?(?:\s+implements\s+([\w\\,\s]+))?")
        .unwrap()
});
static PHP_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"function\s+(\w+)\s*\(([^)]*)").unwrap());
static PHP_USE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*use\s+([\w\\]+)").unwrap());
static PHP_REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:require|include)(?:_once)?\s*\(?\s*['"]([^'"]+)['"]"#).unwrap()
});

static CPP_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:class|struct)\s+(\w+)(?:\s*:\s*([^{;]+))?").unwrap());
static CPP_INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*#\s*include\s*[<"]([^>"]+)[>"]"#).unwrap());
static CPP_USING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*using\s+(?:namespace\s+)?([\w:]+)").unwrap());

static SWIFT_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:class|struct|interface|enum|protocol|object)\s+(\w+)(?:\s*:\s*([\w.,\s<>]+))?")
        .unwrap()
});
static SWIFT_FUNC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:func|fun)\s+(\w+)\s*(?:<[^>]*>)?\s*\(([^)]*)").unwrap()
});
static SWIFT_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:import|using)\s+([\w.]+)\s*;?").unwrap());

static GENERIC_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:class|struct|interface|trait|data)\s+(\w+)").unwrap()
});
static GENERIC_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:function|func|def|sub|fn)\s+(\w+)").unwrap());
static GENERIC_C_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[\w:<>,*&\[\]]+\s+)+(\w+)\s*\(([^)]*)\)\s*\{").unwrap());
static GENERIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:import|using|use|require)\s+['"]?([\w./:\\-]+)"#).unwrap()
});

/// Names a C-style call pattern must never claim as a function.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "match", "new", "super", "this", "else",
    "sizeof", "defer",
];

/// The single pattern strategy. One scan pass over the lines, guard-checked
/// per line, emitting whatever structure the family patterns can see.
/// Missing constructs are acceptable here; wrong ones are not, so every
/// pattern is anchored tightly enough to avoid fabricating entities.
pub struct PatternFallback;

impl PatternFallback {
    pub fn extract(source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        let mut ir = FileIr::new(&source.path, source.language);
        let mut scan = Scan {
            source,
            ir: &mut ir,
            in_go_import_block: false,
        };

        for (idx, line) in source.content.lines().enumerate() {
            guard.visit()?;
            let lineno = (idx + 1) as u32;
            match source.language {
                Language::Python => scan.python_line(line, lineno),
                Language::JavaScript | Language::TypeScript => scan.ecma_line(line, lineno),
                Language::Java | Language::CSharp => scan.java_line(line, lineno),
                Language::Go => scan.go_line(line, lineno),
                Language::Rust => scan.rust_line(line, lineno),
                Language::Ruby => scan.ruby_line(line, lineno),
                Language::Php => scan.php_line(line, lineno),
                Language::Cpp => scan.cpp_line(line, lineno),
                Language::Swift | Language::Kotlin => scan.swift_line(line, lineno),
                Language::Unknown => scan.generic_line(line, lineno),
            }
        }

        ir.sort_by_line();
        Ok(ir)
    }
}

struct Scan<'a> {
    source: &'a SourceFile,
    ir: &'a mut FileIr,
    in_go_import_block: bool,
}

impl<'a> Scan<'a> {
    fn python_line(&mut self, line: &str, lineno: u32) {
        if let Some(caps) = PY_CLASS.captures(line) {
            let bases = caps
                .get(2)
                .map(|m| split_names(m.as_str()))
                .unwrap_or_default();
            self.push_class(&caps[1], lineno, bases);
            return;
        }
        if let Some(caps) = PY_DEF.captures(line) {
            let is_async = caps.get(1).is_some();
            let params = caps
                .get(3)
                .map(|m| params_name_first(m.as_str()))
                .unwrap_or_default();
            self.push_function(&caps[2], lineno, params, is_async);
            return;
        }
        if let Some(caps) = PY_FROM_IMPORT.captures(line) {
            let symbols = split_import_names(&caps[2]);
            self.push_import(&caps[1], symbols);
            return;
        }
        if let Some(caps) = PY_IMPORT.captures(line) {
            for module in split_import_names(&caps[1]) {
                self.push_import(&module, Vec::new());
            }
        }
    }

    fn ecma_line(&mut self, line: &str, lineno: u32) {
        if let Some(caps) = ES_CLASS.captures(line) {
            let mut bases = Vec::new();
            if let Some(base) = caps.get(2) {
                bases.push(base.as_str().to_string());
            }
            if let Some(list) = caps.get(3) {
                bases.extend(split_names(list.as_str()));
            }
            self.push_class(&caps[1], lineno, bases);
        }
        if let Some(caps) = ES_FUNCTION.captures(line) {
            let params = params_name_first(caps.get(3).map(|m| m.as_str()).unwrap_or(""));
            self.push_function(&caps[2], lineno, params, caps.get(1).is_some());
        } else if let Some(caps) = ES_ARROW.captures(line) {
            let params = params_name_first(caps.get(3).map(|m| m.as_str()).unwrap_or(""));
            self.push_function(&caps[1], lineno, params, caps.get(2).is_some());
        }
        if let Some(caps) = ES_IMPORT_FROM.captures(line) {
            self.push_import(&caps[1], Vec::new());
        } else if let Some(caps) = ES_IMPORT_BARE.captures(line) {
            self.push_import(&caps[1], Vec::new());
        }
        if let Some(caps) = ES_REQUIRE.captures(line) {
            self.push_import(&caps[1], Vec::new());
        }
    }

    fn java_line(&mut self, line: &str, lineno: u32) {
        if let Some(caps) = JAVA_CLASS.captures(line) {
            let mut bases = Vec::new();
            if let Some(extends) = caps.get(2) {
                bases.extend(split_names(extends.as_str()));
            }
            if let Some(implements) = caps.get(3) {
                bases.extend(split_names(implements.as_str()));
            }
            self.push_class(&caps[1], lineno, bases);
            return;
        }
        if let Some(caps) = JAVA_IMPORT.captures(line) {
            self.push_import(&caps[1], Vec::new());
            return;
        }
        if let Some(caps) = JAVA_METHOD.captures(line) {
            let name = caps[1].to_string();
            if !CONTROL_KEYWORDS.contains(&name.as_str()) {
                self.push_function(&name, lineno, params_name_last(&caps[2]), false);
            }
        }
    }

    fn go_line(&mut self, line: &str, lineno: u32) {
        let trimmed = line.trim();
        if self.in_go_import_block {
            if trimmed.starts_with(')') {
                self.in_go_import_block = false;
            } else if let Some(caps) = GO_IMPORT_LINE.captures(line) {
                self.push_import(&caps[1], Vec::new());
            }
            return;
        }
        if trimmed.starts_with("import (") {
            self.in_go_import_block = true;
            return;
        }
        if let Some(caps) = GO_IMPORT.captures(line) {
            self.push_import(&caps[1], Vec::new());
            return;
        }
        if let Some(caps) = GO_TYPE.captures(line) {
            self.push_class(&caps[1], lineno, Vec::new());
            return;
        }
        if let Some(caps) = GO_FUNC.captures(line) {
            self.push_function(&caps[1], lineno, params_first_word(&caps[2]), false);
        }
    }

    fn rust_line(&mut self, line: &str, lineno: u32) {
        if let Some(caps) = RS_TYPE.captures(line) {
            self.push_class(&caps[1], lineno, Vec::new());
            return;
        }
        if let Some(caps) = RS_FN.captures(line) {
            let params = Vec::new();
            self.push_function(&caps[2], lineno, params, caps.get(1).is_some());
            return;
        }
        if let Some(caps) = RS_USE.captures(line) {
            let (module, symbols) = split_rust_use(&caps[1]);
            if !module.is_empty() {
                self.push_import(&module, symbols);
            }
        }
    }

    fn ruby_line(&mut self, line: &str, lineno: u32) {
        if let Some(caps) = RB_CLASS.captures(line) {
            let bases = caps
                .get(2)
                .map(|m| vec![m.as_str().to_string()])
                .unwrap_or_default();
            self.push_class(&caps[1], lineno, bases);
            return;
        }
        if let Some(caps) = RB_DEF.captures(line) {
            let params = params_name_first(caps.get(2).map(|m| m.as_str()).unwrap_or(""));
            self.push_function(&caps[1], lineno, params, false);
            return;
        }
        if let Some(caps) = RB_REQUIRE.captures(line) {
            self.push_import(&caps[1], Vec::new());
        }
    }

    fn php_line(&mut self, line: &str, lineno: u32) {
        if let Some(caps) = PHP_CLASS.captures(line) {
            let mut bases = Vec::new();
            if let Some(extends) = caps.get(2) {
                bases.push(extends.as_str().to_string());
            }
            if let Some(implements) = caps.get(3) {
                bases.extend(split_names(implements.as_str()));
            }
            self.push_class(&caps[1], lineno, bases);
            return;
        }
        if let Some(caps) = PHP_FUNCTION.captures(line) {
            self.push_function(&caps[1], lineno, params_name_first(&caps[2]), false);
            return;
        }
        if let Some(caps) = PHP_REQUIRE.captures(line) {
            self.push_import(&caps[1], Vec::new());
            return;
        }
        if let Some(caps) = PHP_USE.captures(line) {
            self.push_import(&caps[1], Vec::new());
        }
    }

    fn cpp_line(&mut self, line: &str, lineno: u32) {
        if let Some(caps) = CPP_INCLUDE.captures(line) {
            self.push_import(&caps[1], Vec::new());
            return;
        }
        if let Some(caps) = CPP_USING.captures(line) {
            self.push_import(&caps[1], Vec::new());
            return;
        }
        if let Some(caps) = CPP_TYPE.captures(line) {
            let bases = caps
                .get(2)
                .map(|m| {
                    split_names(m.as_str())
                        .into_iter()
                        .map(|base| strip_access_specifier(&base))
                        .collect()
                })
                .unwrap_or_default();
            self.push_class(&caps[1], lineno, bases);
            return;
        }
        if let Some(caps) = GENERIC_C_STYLE.captures(line) {
            let name = caps[1].to_string();
            if !CONTROL_KEYWORDS.contains(&name.as_str()) {
                self.push_function(&name, lineno, params_name_last(&caps[2]), false);
            }
        }
    }

    fn swift_line(&mut self, line: &str, lineno: u32) {
        if let Some(caps) = SWIFT_IMPORT.captures(line) {
            self.push_import(&caps[1], Vec::new());
            return;
        }
        if let Some(caps) = SWIFT_CLASS.captures(line) {
            let bases = caps
                .get(2)
                .map(|m| split_names(m.as_str()))
                .unwrap_or_default();
            self.push_class(&caps[1], lineno, bases);
        }
        if let Some(caps) = SWIFT_FUNC.captures(line) {
            self.push_function(&caps[1], lineno, params_name_first(&caps[2]), false);
        }
    }

    fn generic_line(&mut self, line: &str, lineno: u32) {
        if let Some(caps) = GENERIC_CLASS.captures(line) {
            self.push_class(&caps[1], lineno, Vec::new());
            return;
        }
        if let Some(caps) = GENERIC_FUNCTION.captures(line) {
            self.push_function(&caps[1], lineno, Vec::new(), false);
        } else if let Some(caps) = GENERIC_C_STYLE.captures(line) {
            let name = caps[1].to_string();
            if !CONTROL_KEYWORDS.contains(&name.as_str()) {
                self.push_function(&name, lineno, params_name_last(&caps[2]), false);
            }
        }
        if let Some(caps) = GENERIC_IMPORT.captures(line) {
            self.push_import(&caps[1], Vec::new());
        }
    }

    fn push_class(&mut self, name: &str, lineno: u32, bases: Vec<String>) {
        self.ir.classes.push(
            ClassEntity::new(name, &self.source.path, lineno).with_bases(bases),
        );
    }

    fn push_function(&mut self, name: &str, lineno: u32, params: Vec<String>, is_async: bool) {
        self.ir.functions.push(
            FunctionEntity::new(name, &self.source.path, lineno)
                .with_params(params)
                .with_async(is_async),
        );
    }

    fn push_import(&mut self, module: &str, symbols: Vec<String>) {
        self.ir.imports.push(
            ImportEdge::new(&self.source.path, module.trim()).with_symbols(symbols),
        );
    }
}

/// Comma-separated names, trimmed, empties dropped.
fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// `a, b=1, *args` style lists where the name leads each entry. Splat and
/// keyword-only entries are dropped, matching the precise collectors.
fn params_name_first(raw: &str) -> Vec<String> {
    let mut params = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() || part.starts_with('*') || part.starts_with("...") {
            if part.starts_with('*') {
                break;
            }
            continue;
        }
        if part.contains('{') || part.contains('[') {
            continue;
        }
        let name = part
            .split([':', '='])
            .next()
            .unwrap_or(part)
            .trim()
            .trim_start_matches(['&', '$']);
        if !name.is_empty() {
            params.push(name.to_string());
        }
    }
    params
}

/// `String id, int... flags` style lists where the name trails each entry.
fn params_name_last(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            part.trim()
                .split_whitespace()
                .last()
                .map(|name| name.trim_start_matches(['*', '&']).to_string())
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// `db *DB, names ...string` style lists where the name leads each entry.
fn params_first_word(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| part.trim().split_whitespace().next())
        .filter(|name| !name.starts_with(['*', '.', '[']))
        .map(|name| name.to_string())
        .collect()
}

/// First identifier of each comma entry, so `numpy as np, os` yields the
/// module names without aliases.
fn split_import_names(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('(')
        .trim_end_matches([')', '\\'])
        .split(',')
        .filter_map(|part| part.trim().split_whitespace().next())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .collect()
}

/// `std::io::Read`, `serde::{A, B}`, `futures::prelude::*`, with optional
/// trailing `as` alias. Returns (module, symbols).
fn split_rust_use(raw: &str) -> (String, Vec<String>) {
    let raw = raw.trim();
    if let Some((module, rest)) = raw.split_once("::{") {
        let inner = rest.trim_end_matches('}');
        return (module.trim().to_string(), split_names(inner));
    }
    let before_alias = raw.split(" as ").next().unwrap_or(raw).trim();
    if let Some(module) = before_alias.strip_suffix("::*") {
        return (module.to_string(), vec!["*".to_string()]);
    }
    (before_alias.to_string(), Vec::new())
}

fn strip_access_specifier(base: &str) -> String {
    base.trim()
        .trim_start_matches("public ")
        .trim_start_matches("protected ")
        .trim_start_matches("private ")
        .trim_start_matches("virtual ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{GuardState, Limits};
    use adg_core::{AnalysisError, ContentHash, SourceEncoding};

    fn source_of(language: Language, name: &str, content: &str) -> SourceFile {
        SourceFile {
            path: name.into(),
            language,
            content: content.to_string(),
            encoding: SourceEncoding::Utf8,
            size_bytes: content.len() as u64,
            hash: ContentHash::of_bytes(content.as_bytes()),
        }
    }

    fn extract(language: Language, name: &str, content: &str) -> FileIr {
        let source = source_of(language, name, content);
        PatternFallback::extract(&source, &mut GuardState::new(Limits::default())).unwrap()
    }

    #[test]
    fn python_patterns_survive_malformed_code() {
        // Unbalanced bracket on line 1 would break a real parser.
        let ir = extract(
            Language::Python,
            "broken.py",
            "data = [1, 2\nclass Loader(Base):\n    async def run(self, queue):\nimport os, sys\nfrom app import models\n",
        );
        assert_eq!(ir.classes.len(), 1);
        assert_eq!(ir.classes[0].name, "Loader");
        assert_eq!(ir.classes[0].bases, vec!["Base"]);
        assert_eq!(ir.classes[0].line, 2);
        assert_eq!(ir.functions[0].name, "run");
        assert!(ir.functions[0].is_async);
        assert_eq!(ir.functions[0].params, vec!["self", "queue"]);
        let modules: Vec<&str> = ir.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["os", "sys", "app"]);
        assert_eq!(ir.imports[2].symbols, vec!["models"]);
    }

    #[test]
    fn ecma_arrows_and_requires() {
        let ir = extract(
            Language::JavaScript,
            "app.js",
            "const load = async (id) => fetch(id);\nfunction render(tree) {}\nimport { h } from 'preact';\nconst fs = require('fs');\n",
        );
        let names: Vec<&str> = ir.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["load", "render"]);
        assert!(ir.functions[0].is_async);
        let modules: Vec<&str> = ir.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["preact", "fs"]);
    }

    #[test]
    fn go_grouped_imports_and_receivers() {
        let ir = extract(
            Language::Go,
            "main.go",
            "package main\n\nimport (\n\t\"fmt\"\n\thttpx \"net/http\"\n)\n\ntype Server struct {\n}\n\nfunc (s *Server) Run(addr string) error {\n\treturn nil\n}\n",
        );
        let modules: Vec<&str> = ir.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["fmt", "net/http"]);
        assert_eq!(ir.classes[0].name, "Server");
        assert_eq!(ir.functions[0].name, "Run");
        assert_eq!(ir.functions[0].params, vec!["addr"]);
    }

    #[test]
    fn rust_use_forms() {
        let ir = extract(
            Language::Rust,
            "lib.rs",
            "use std::io::Read;\nuse serde::{Serialize, Deserialize};\nuse futures::prelude::*;\npub async fn pump() {}\nstruct Buffer;\n",
        );
        let modules: Vec<&str> = ir.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["std::io::Read", "serde", "futures::prelude"]);
        assert_eq!(ir.imports[1].symbols, vec!["Serialize", "Deserialize"]);
        assert_eq!(ir.imports[2].symbols, vec!["*"]);
        assert!(ir.functions[0].is_async);
        assert_eq!(ir.classes[0].name, "Buffer");
    }

    #[test]
    fn unknown_language_still_yields_structure() {
        let ir = extract(
            Language::Unknown,
            "script",
            "class Widget\nsub draw\nimport gfx.core\nwhile (x) {\n",
        );
        assert_eq!(ir.classes[0].name, "Widget");
        assert_eq!(ir.functions[0].name, "draw");
        assert_eq!(ir.imports[0].module, "gfx.core");
        // `while (x) {` must not be mistaken for a function.
        assert_eq!(ir.functions.len(), 1);
    }

    #[test]
    fn plain_prose_yields_empty_ir() {
        let ir = extract(
            Language::Unknown,
            "README",
            "This project renders widgets.\nNothing to see here.\n",
        );
        assert!(ir.is_empty());
    }

    #[test]
    fn line_budget_is_enforced() {
        let content = "x = 1\n".repeat(100);
        let source = source_of(Language::Python, "big.py", &content);
        let limits = Limits {
            max_nodes: 10,
            ..Limits::default()
        };
        let err = PatternFallback::extract(&source, &mut GuardState::new(limits)).unwrap_err();
        assert!(matches!(err, AnalysisError::NodeCountExceeded { .. }));
    }
}
