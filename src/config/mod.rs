//! Configuration management for the module loader
//!
//! Holds the resolution tables (alias, paths, base directory) the resolver
//! consults, plus logging settings. Loadable from TOML or JSON files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::module::traits::LoaderError;

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "modloader=debug"). RUST_LOG takes precedence.
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,
}

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Identifier -> replacement identifier
    #[serde(default)]
    pub alias: HashMap<String, String>,

    /// Top-level prefix -> replacement path
    #[serde(default)]
    pub paths: HashMap<String, String>,

    /// Directory top-level identifiers resolve against (defaults to `cwd`)
    #[serde(default)]
    pub base: Option<String>,

    /// Working directory locator, ending in `/`
    #[serde(default = "default_cwd")]
    pub cwd: String,

    /// Scheme prepended to `//host/...` locators (defaults to the cwd scheme)
    #[serde(default)]
    pub protocol: Option<String>,

    /// Extension appended by normalization
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

fn default_cwd() -> String {
    match std::env::current_dir() {
        Ok(dir) => {
            let dir = dir.to_string_lossy().replace('\\', "/");
            let dir = dir.trim_end_matches('/');
            if dir.starts_with('/') {
                format!("file://{}/", dir)
            } else {
                format!("file:///{}/", dir)
            }
        }
        Err(_) => String::new(),
    }
}

fn default_extension() -> String {
    ".js".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            alias: HashMap::new(),
            paths: HashMap::new(),
            base: None,
            cwd: default_cwd(),
            protocol: None,
            extension: default_extension(),
            logging: None,
        }
    }
}

impl LoaderConfig {
    /// Load configuration from a file
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LoaderError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents).map_err(|e| LoaderError::Config(e.to_string()))?
        } else {
            Self::from_toml_str(&contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, LoaderError> {
        let config: LoaderConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), LoaderError> {
        if !self.cwd.is_empty() && !self.cwd.ends_with('/') {
            return Err(LoaderError::Config(format!(
                "cwd must end with '/': {}",
                self.cwd
            )));
        }
        if let Some(ref base) = self.base {
            if !base.is_empty() && !base.ends_with('/') {
                return Err(LoaderError::Config(format!(
                    "base must end with '/': {}",
                    base
                )));
            }
        }
        if !self.extension.starts_with('.') {
            return Err(LoaderError::Config(format!(
                "extension must start with '.': {}",
                self.extension
            )));
        }
        Ok(())
    }

    /// Effective base directory
    pub fn base(&self) -> String {
        self.base.clone().unwrap_or_else(|| self.cwd.clone())
    }

    /// Effective protocol for `//host/...` locators
    pub fn protocol(&self) -> String {
        if let Some(ref protocol) = self.protocol {
            return protocol.clone();
        }
        match self.cwd.find("://") {
            Some(idx) => self.cwd[..=idx].to_string(),
            None => "file:".to_string(),
        }
    }

    pub fn with_alias(mut self, id: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.alias.insert(id.into(), replacement.into());
        self
    }

    pub fn with_path(mut self, prefix: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.paths.insert(prefix.into(), replacement.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = cwd.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.extension, ".js");
        assert!(config.cwd.is_empty() || config.cwd.starts_with("file://"));
        assert_eq!(config.base(), config.cwd);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_protocol_derived_from_cwd() {
        let config = LoaderConfig::default().with_cwd("https://example.com/app/");
        assert_eq!(config.protocol(), "https:");

        let config = LoaderConfig::default().with_cwd("");
        assert_eq!(config.protocol(), "file:");
    }

    #[test]
    fn test_from_toml_str() {
        let config = LoaderConfig::from_toml_str(
            r#"
            cwd = "http://h/app/"
            base = "http://h/app/lib/"

            [alias]
            jquery = "vendor/jquery"

            [paths]
            vendor = "http://cdn/vendor"
            "#,
        )
        .unwrap();
        assert_eq!(config.base(), "http://h/app/lib/");
        assert_eq!(config.alias.get("jquery").unwrap(), "vendor/jquery");
        assert_eq!(config.paths.get("vendor").unwrap(), "http://cdn/vendor");
        assert_eq!(config.extension, ".js");
    }

    #[test]
    fn test_validate_rejects_bad_base() {
        let config = LoaderConfig::default().with_base("http://h/lib");
        assert!(matches!(config.validate(), Err(LoaderError::Config(_))));
    }
}
