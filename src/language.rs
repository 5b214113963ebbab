//! Language traits
//!
//! The resolution core never branches on a language name. Everything that
//! differs between languages is a flag on `Language`: the namespace
//! delimiter, whether functions can be overloaded, whether default
//! arguments exist, whether functions are first-class values and whether
//! calls through a base type dispatch dynamically.
//!
//! Languages are plain data so they can be overridden from `cpgscope.toml`.

use crate::name::Name;
use crate::types::TypeParser;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Resolution-relevant traits of a source language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Language name (for display and lookup)
    pub name: String,
    /// File extensions handled by this language
    #[serde(default)]
    pub file_extensions: Vec<String>,
    /// Separator between name segments (`::`, `.`)
    #[serde(default = "default_delimiter")]
    pub namespace_delimiter: String,
    /// Several functions may share a name in one scope
    #[serde(default)]
    pub supports_overloading: bool,
    /// Parameters may declare default values
    #[serde(default)]
    pub supports_default_arguments: bool,
    /// Plain references may resolve to functions
    #[serde(default)]
    pub first_class_functions: bool,
    /// Calls through a base type may reach every override
    #[serde(default)]
    pub dynamic_dispatch: bool,
}

fn default_delimiter() -> String {
    "::".to_string()
}

impl Language {
    pub fn cpp() -> Self {
        Self {
            name: "cpp".into(),
            file_extensions: vec!["cpp".into(), "cc".into(), "cxx".into(), "hpp".into(), "h".into()],
            namespace_delimiter: "::".into(),
            supports_overloading: true,
            supports_default_arguments: true,
            first_class_functions: false,
            dynamic_dispatch: true,
        }
    }

    pub fn c() -> Self {
        Self {
            name: "c".into(),
            file_extensions: vec!["c".into()],
            namespace_delimiter: "::".into(),
            supports_overloading: false,
            supports_default_arguments: false,
            first_class_functions: false,
            dynamic_dispatch: false,
        }
    }

    pub fn java() -> Self {
        Self {
            name: "java".into(),
            file_extensions: vec!["java".into()],
            namespace_delimiter: ".".into(),
            supports_overloading: true,
            supports_default_arguments: false,
            first_class_functions: false,
            dynamic_dispatch: true,
        }
    }

    pub fn python() -> Self {
        Self {
            name: "python".into(),
            file_extensions: vec!["py".into()],
            namespace_delimiter: ".".into(),
            supports_overloading: false,
            supports_default_arguments: true,
            first_class_functions: true,
            dynamic_dispatch: true,
        }
    }

    pub fn go() -> Self {
        Self {
            name: "go".into(),
            file_extensions: vec!["go".into()],
            namespace_delimiter: ".".into(),
            supports_overloading: false,
            supports_default_arguments: false,
            first_class_functions: true,
            dynamic_dispatch: true,
        }
    }

    /// Parse a name written in this language
    pub fn parse_name(&self, text: &str) -> Name {
        Name::parse(text, &self.namespace_delimiter)
    }

    /// A declarator parser using this language's delimiter
    pub fn type_parser(&self) -> TypeParser {
        TypeParser::new(self.namespace_delimiter.clone())
    }

    /// Check if this language handles a file
    pub fn can_handle(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.file_extensions.iter().any(|e| e == ext))
    }
}

/// Registry of known languages
#[derive(Debug, Default, Clone)]
pub struct LanguageRegistry {
    languages: Vec<Arc<Language>>,
}

impl LanguageRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a language, replacing one with the same name
    pub fn register(&mut self, language: Language) {
        let language = Arc::new(language);
        match self.languages.iter_mut().find(|l| l.name == language.name) {
            Some(existing) => *existing = language,
            None => self.languages.push(language),
        }
    }

    /// Find a language by name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<Arc<Language>> {
        self.languages
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Find the language handling a source file
    pub fn find_for_path(&self, path: &Path) -> Option<Arc<Language>> {
        self.languages.iter().find(|l| l.can_handle(path)).cloned()
    }

    /// Get all registered languages
    pub fn languages(&self) -> &[Arc<Language>] {
        &self.languages
    }
}

/// Create a default registry with all built-in languages
pub fn default_registry() -> LanguageRegistry {
    let mut registry = LanguageRegistry::new();
    registry.register(Language::cpp());
    registry.register(Language::c());
    registry.register(Language::java());
    registry.register(Language::python());
    registry.register(Language::go());
    registry
}
