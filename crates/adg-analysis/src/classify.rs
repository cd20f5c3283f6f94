//! File classification: map paths and content to a [`Language`].

use adg_core::Language;
use std::path::Path;

/// How many leading bytes are inspected when sniffing for binary content.
const BINARY_SNIFF_LEN: usize = 8192;

/// How many leading characters are inspected when sniffing extensionless files.
const CONTENT_SNIFF_LEN: usize = 512;

pub fn language_for_path(path: &Path) -> Language {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        return Language::Unknown;
    };

    match extension.to_lowercase().as_str() {
        "rs" => Language::Rust,
        "ts" | "tsx" => Language::TypeScript,
        "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
        "py" | "pyw" | "pyi" => Language::Python,
        "go" => Language::Go,
        "java" => Language::Java,
        "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "h" | "c" => Language::Cpp,
        "swift" => Language::Swift,
        "kt" | "kts" => Language::Kotlin,
        "cs" => Language::CSharp,
        "rb" | "rake" | "gemspec" => Language::Ruby,
        "php" | "phtml" => Language::Php,
        _ => Language::Unknown,
    }
}

/// Guess the language of an extensionless file from its leading content.
///
/// Only interpreter shebangs and PHP open tags are recognized. Anything
/// else stays [`Language::Unknown`].
pub fn sniff_language(content: &str) -> Language {
    let head: String = content.chars().take(CONTENT_SNIFF_LEN).collect();

    if head.starts_with("<?php") {
        return Language::Php;
    }

    if let Some(first_line) = head.lines().next() {
        if let Some(shebang) = first_line.strip_prefix("#!") {
            if shebang.contains("python") {
                return Language::Python;
            }
            if shebang.contains("node") {
                return Language::JavaScript;
            }
            if shebang.contains("ruby") {
                return Language::Ruby;
            }
            if shebang.contains("php") {
                return Language::Php;
            }
        }
    }

    Language::Unknown
}

/// Classify a file, preferring the extension and falling back to content.
pub fn classify(path: &Path, content: &str) -> Language {
    match language_for_path(path) {
        Language::Unknown => sniff_language(content),
        language => language,
    }
}

/// A NUL byte in the leading window marks the file as binary. Source text
/// in any encoding the loader accepts never contains one.
pub fn is_binary(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    window.contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn extensions_map_to_languages() {
        assert_eq!(language_for_path(Path::new("src/main.rs")), Language::Rust);
        assert_eq!(language_for_path(Path::new("app/Model.PY")), Language::Python);
        assert_eq!(language_for_path(Path::new("ui/view.tsx")), Language::TypeScript);
        assert_eq!(language_for_path(Path::new("lib/util.mjs")), Language::JavaScript);
        assert_eq!(language_for_path(Path::new("cmd/server.go")), Language::Go);
        assert_eq!(language_for_path(Path::new("Service.java")), Language::Java);
        assert_eq!(language_for_path(Path::new("core/engine.hpp")), Language::Cpp);
        assert_eq!(language_for_path(Path::new("tasks.rake")), Language::Ruby);
        assert_eq!(language_for_path(Path::new("notes.txt")), Language::Unknown);
        assert_eq!(language_for_path(Path::new("Makefile")), Language::Unknown);
    }

    #[test]
    fn shebangs_classify_extensionless_scripts() {
        let script = "#!/usr/bin/env python3\nimport os\n";
        assert_eq!(classify(&PathBuf::from("bin/deploy"), script), Language::Python);

        let node = "#!/usr/bin/env node\nconsole.log('hi');\n";
        assert_eq!(classify(&PathBuf::from("bin/cli"), node), Language::JavaScript);

        assert_eq!(classify(&PathBuf::from("bin/run"), "echo hi\n"), Language::Unknown);
    }

    #[test]
    fn php_open_tag_wins_without_extension() {
        assert_eq!(sniff_language("<?php\necho 'x';\n"), Language::Php);
    }

    #[test]
    fn extension_takes_priority_over_content() {
        let script = "#!/usr/bin/env python3\nimport os\n";
        assert_eq!(classify(&PathBuf::from("bin/deploy.rb"), script), Language::Ruby);
    }

    #[test]
    fn nul_byte_marks_binary() {
        assert!(is_binary(b"\x7fELF\x00\x01\x02"));
        assert!(!is_binary(b"fn main() {}\n"));
        assert!(!is_binary(b""));
    }

    #[test]
    fn nul_beyond_sniff_window_is_ignored() {
        let mut bytes = vec![b'a'; BINARY_SNIFF_LEN];
        bytes.push(0);
        assert!(!is_binary(&bytes));
    }
}
