use crate::language::{Language, LanguageRegistry, default_registry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CpgscopeConfig {
    /// Tracing filter directive, e.g. `info` or `cpgscope=debug`
    pub log_level: Option<String>,
    /// Worker threads for per-unit processing
    pub workers: Option<usize>,
    /// Languages added to or replacing the built-in ones
    #[serde(default, rename = "language", skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<Language>,
}

impl CpgscopeConfig {
    /// Built-in languages with this config's overrides applied
    pub fn registry(&self) -> LanguageRegistry {
        let mut registry = default_registry();
        for language in &self.languages {
            registry.register(language.clone());
        }
        registry
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("cpgscope.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CpgscopeConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CpgscopeConfig = toml::from_str(&contents)
        .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CpgscopeConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
