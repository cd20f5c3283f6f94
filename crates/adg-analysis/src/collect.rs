use std::path::{Path, PathBuf};

use ignore::{overrides::OverrideBuilder, WalkBuilder};
use tracing::{debug, info, warn};

use adg_core::{AnalysisError, Language, Result};

use crate::classify;

/// Directories that are build output or tooling state, never source.
const DEFAULT_EXCLUDES: &[&str] = &[
    "!**/target/**",
    "!**/.git/**",
    "!**/node_modules/**",
    "!**/dist/**",
    "!**/build/**",
    "!**/out/**",
    "!**/coverage/**",
    "!**/__pycache__/**",
    "!**/.pytest_cache/**",
    "!**/.mypy_cache/**",
    "!**/.venv/**",
    "!**/venv/**",
    "!**/.idea/**",
    "!**/.vscode/**",
];

#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub recursive: bool,
    /// Empty means every language the classifier knows.
    pub languages: Vec<Language>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            languages: vec![],
            include_patterns: vec![],
            exclude_patterns: vec![],
        }
    }
}

/// Walks `root` and returns candidate source files with their sizes, in
/// path order. Honors gitignore rules plus the default exclusions; a path
/// must map to a known language by extension to be a candidate. Size checks
/// and binary sniffing happen later, at load time.
pub fn collect_source_files(root: &Path) -> Result<Vec<(PathBuf, u64)>> {
    collect_source_files_with_config(root, &CollectConfig::default())
}

pub fn collect_source_files_with_config(
    root: &Path,
    config: &CollectConfig,
) -> Result<Vec<(PathBuf, u64)>> {
    info!("collecting source files from {}", root.display());

    let mut ovr = OverrideBuilder::new(root);
    for exclude in DEFAULT_EXCLUDES {
        let _ = ovr.add(exclude);
    }
    for exclude in &config.exclude_patterns {
        let pattern = if exclude.starts_with('!') {
            exclude.clone()
        } else {
            format!("!{}", exclude)
        };
        match ovr.add(&pattern) {
            Ok(_) => debug!("added exclude pattern: {}", pattern),
            Err(e) => warn!("skipping invalid exclude pattern {:?}: {}", pattern, e),
        }
    }
    // Bare globs act as a whitelist: once present, only matching paths
    // are searched.
    for include in &config.include_patterns {
        match ovr.add(include) {
            Ok(_) => debug!("added include pattern: {}", include),
            Err(e) => warn!("skipping invalid include pattern {:?}: {}", include, e),
        }
    }
    let overrides = ovr
        .build()
        .map_err(|e| AnalysisError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .ignore(true)
        .overrides(overrides);
    if !config.recursive {
        builder.max_depth(Some(1));
    }

    let mut paths = Vec::new();
    let mut seen = 0usize;

    for dent in builder.build() {
        let dent = match dent {
            Ok(d) => d,
            Err(e) => {
                warn!("walker error: {}", e);
                continue;
            }
        };
        let path = dent.path();
        if !path.is_file() {
            continue;
        }
        seen += 1;

        let language = classify::language_for_path(path);
        if language == Language::Unknown {
            continue;
        }
        if !config.languages.is_empty() && !config.languages.contains(&language) {
            continue;
        }

        let size = dent.metadata().map(|m| m.len()).unwrap_or(0);
        paths.push((path.to_path_buf(), size));
    }

    paths.sort();
    info!(
        "collection complete: {} files seen, {} candidates",
        seen,
        paths.len()
    );
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn names(collected: &[(PathBuf, u64)], root: &Path) -> Vec<String> {
        collected
            .iter()
            .map(|(p, _)| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn skips_build_output_and_non_source() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "src/main.rs", "fn main() {}");
        touch(root, "app/models.py", "class User: pass");
        touch(root, "web/index.js", "export default 1;");
        touch(root, "node_modules/pkg/index.js", "module.exports = 1;");
        touch(root, "target/debug/gen.rs", "fn gen() {}");
        touch(root, "__pycache__/models.cpython-311.pyc", "\x00");
        touch(root, "README.md", "# readme");

        let collected = collect_source_files(root).unwrap();
        assert_eq!(
            names(&collected, root),
            vec!["app/models.py", "src/main.rs", "web/index.js"]
        );
        assert!(collected.iter().all(|(_, size)| *size > 0));
    }

    #[test]
    fn language_filter_narrows_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "a.rs", "fn a() {}");
        touch(root, "b.py", "def b(): pass");
        touch(root, "c.go", "func c() {}");

        let config = CollectConfig {
            languages: vec![Language::Python],
            ..CollectConfig::default()
        };
        let collected = collect_source_files_with_config(root, &config).unwrap();
        assert_eq!(names(&collected, root), vec!["b.py"]);
    }

    #[test]
    fn non_recursive_stays_at_the_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "top.rs", "fn top() {}");
        touch(root, "nested/inner.rs", "fn inner() {}");

        let config = CollectConfig {
            recursive: false,
            ..CollectConfig::default()
        };
        let collected = collect_source_files_with_config(root, &config).unwrap();
        assert_eq!(names(&collected, root), vec!["top.rs"]);
    }

    #[test]
    fn include_patterns_whitelist() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "keep/app.py", "def app(): pass");
        touch(root, "drop/app.rs", "fn app() {}");

        let config = CollectConfig {
            include_patterns: vec!["keep/**".to_string()],
            ..CollectConfig::default()
        };
        let collected = collect_source_files_with_config(root, &config).unwrap();
        assert_eq!(names(&collected, root), vec!["keep/app.py"]);
    }

    #[test]
    fn user_excludes_stack_on_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "src/lib.rs", "fn lib() {}");
        touch(root, "generated/schema.rs", "fn schema() {}");

        let config = CollectConfig {
            exclude_patterns: vec!["generated/**".to_string()],
            ..CollectConfig::default()
        };
        let collected = collect_source_files_with_config(root, &config).unwrap();
        assert_eq!(names(&collected, root), vec!["src/lib.rs"]);
    }
}
