// ABOUTME: Maps languages with bundled Tree-sitter grammars to parser factories.
// ABOUTME: Languages absent from the registry are only reachable through the pattern fallback.
use adg_core::Language;
use std::collections::HashMap;
use tree_sitter::Parser;

pub struct GrammarConfig {
    pub grammar: tree_sitter::Language,
    pub file_extensions: Vec<&'static str>,
}

pub struct LanguageRegistry {
    configs: HashMap<Language, GrammarConfig>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut configs = HashMap::new();

        configs.insert(
            Language::Rust,
            GrammarConfig {
                grammar: tree_sitter_rust::LANGUAGE.into(),
                file_extensions: vec!["rs"],
            },
        );

        configs.insert(
            Language::Python,
            GrammarConfig {
                grammar: tree_sitter_python::LANGUAGE.into(),
                file_extensions: vec!["py", "pyw", "pyi"],
            },
        );

        configs.insert(
            Language::JavaScript,
            GrammarConfig {
                grammar: tree_sitter_javascript::LANGUAGE.into(),
                file_extensions: vec!["js", "mjs", "cjs", "jsx"],
            },
        );

        configs.insert(
            Language::TypeScript,
            GrammarConfig {
                grammar: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                file_extensions: vec!["ts", "tsx"],
            },
        );

        configs.insert(
            Language::Go,
            GrammarConfig {
                grammar: tree_sitter_go::LANGUAGE.into(),
                file_extensions: vec!["go"],
            },
        );

        configs.insert(
            Language::Java,
            GrammarConfig {
                grammar: tree_sitter_java::LANGUAGE.into(),
                file_extensions: vec!["java"],
            },
        );

        Self { configs }
    }

    pub fn has_grammar(&self, language: Language) -> bool {
        self.configs.contains_key(&language)
    }

    pub fn get_config(&self, language: Language) -> Option<&GrammarConfig> {
        self.configs.get(&language)
    }

    pub fn create_parser(&self, language: Language) -> Option<Parser> {
        let config = self.get_config(language)?;
        let mut parser = Parser::new();
        parser.set_language(&config.grammar).ok()?;
        Some(parser)
    }

    pub fn supported_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.configs.keys().copied().collect();
        languages.sort();
        languages
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::{LANGUAGE_VERSION, MIN_COMPATIBLE_LANGUAGE_VERSION};

    #[test]
    fn registered_grammars_use_supported_abi_versions() {
        let registry = LanguageRegistry::new();
        for (language, config) in &registry.configs {
            let version = config.grammar.version();
            assert!(
                (MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&version),
                "Language {:?} uses incompatible Tree-sitter version {} (supported {}..={})",
                language,
                version,
                MIN_COMPATIBLE_LANGUAGE_VERSION,
                LANGUAGE_VERSION
            );
        }
    }

    #[test]
    fn every_registered_language_yields_a_parser() {
        let registry = LanguageRegistry::new();
        for language in registry.supported_languages() {
            assert!(
                registry.create_parser(language).is_some(),
                "no parser for {language}"
            );
        }
    }

    #[test]
    fn unregistered_languages_have_no_grammar() {
        let registry = LanguageRegistry::new();
        assert!(!registry.has_grammar(Language::Ruby));
        assert!(!registry.has_grammar(Language::Cpp));
        assert!(registry.create_parser(Language::Php).is_none());
    }
}
