//! Loader configuration
//!
//! Controls how a library name becomes a list of candidate paths and which
//! registration symbol is called after a library is opened. Defaults follow
//! the platform's shared-library naming rules; a TOML file and the
//! `REFRACT_LIBRARY_PATH` / `REFRACT_ENTRY_SYMBOL` environment variables can
//! override them.
//!
//! ```toml
//! prefixes = ["lib"]
//! suffixes = [".so"]
//! versioned_suffixes = [".so.{version}"]
//! search_paths = ["/opt/app/plugins"]
//! entry_symbol = "refract_register"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable holding extra search directories
pub const LIBRARY_PATH_ENV: &str = "REFRACT_LIBRARY_PATH";

/// Environment variable overriding the entry symbol (empty disables it)
pub const ENTRY_SYMBOL_ENV: &str = "REFRACT_ENTRY_SYMBOL";

/// Symbol called with the registry after a library is opened
pub const DEFAULT_ENTRY_SYMBOL: &str = "refract_register";

/// Placeholder replaced by the requested version in `versioned_suffixes`
const VERSION_PLACEHOLDER: &str = "{version}";

/// Library resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// File name prefixes tried before the bare name (`lib` on Unix)
    pub prefixes: Vec<String>,
    /// Platform suffixes used when no version is requested
    pub suffixes: Vec<String>,
    /// Suffix templates used when a version is requested
    pub versioned_suffixes: Vec<String>,
    /// Directories searched before the system search path
    pub search_paths: Vec<PathBuf>,
    /// Registration entry point; `None` skips the lookup
    pub entry_symbol: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let (prefixes, suffixes, versioned): (&[&str], &[&str], &[&str]) = if cfg!(windows) {
            (&[], &[".dll"], &[".dll"])
        } else if cfg!(target_vendor = "apple") {
            (
                &["lib"],
                &[".bundle", ".dylib"],
                &[".{version}.bundle", ".{version}.dylib"],
            )
        } else {
            (&["lib"], &[".so"], &[".so.{version}"])
        };

        Self {
            prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
            suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
            versioned_suffixes: versioned.iter().map(|s| s.to_string()).collect(),
            search_paths: Vec::new(),
            entry_symbol: Some(DEFAULT_ENTRY_SYMBOL.to_string()),
        }
    }
}

impl LoaderConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `REFRACT_LIBRARY_PATH` and `REFRACT_ENTRY_SYMBOL`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var_os(LIBRARY_PATH_ENV),
            std::env::var(ENTRY_SYMBOL_ENV).ok(),
        )
    }

    fn with_overrides(mut self, library_path: Option<std::ffi::OsString>, entry_symbol: Option<String>) -> Self {
        if let Some(paths) = library_path {
            let extra: Vec<PathBuf> = std::env::split_paths(&paths)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
            log::debug!("Adding {} library search paths from {}", extra.len(), LIBRARY_PATH_ENV);
            // environment directories are searched first
            self.search_paths.splice(0..0, extra);
        }
        if let Some(symbol) = entry_symbol {
            let symbol = symbol.trim();
            self.entry_symbol = (!symbol.is_empty()).then(|| symbol.to_string());
        }
        self
    }

    /// Suffixes to try for `version`
    pub fn suffixes_for(&self, version: Option<&str>) -> Vec<String> {
        match version.filter(|v| !v.is_empty()) {
            Some(version) => self
                .versioned_suffixes
                .iter()
                .map(|template| template.replace(VERSION_PLACEHOLDER, version))
                .collect(),
            None => self.suffixes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LoaderConfig::from_toml_str(r#"search_paths = ["/opt/plugins"]"#).unwrap();
        assert_eq!(config.search_paths, vec![PathBuf::from("/opt/plugins")]);
        assert_eq!(config.entry_symbol.as_deref(), Some(DEFAULT_ENTRY_SYMBOL));
        assert_eq!(config.prefixes, LoaderConfig::default().prefixes);
    }

    #[test]
    fn test_invalid_toml() {
        let result = LoaderConfig::from_toml_str("prefixes = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prefixes = []").unwrap();
        writeln!(file, "entry_symbol = \"plugin_init\"").unwrap();

        let config = LoaderConfig::from_file(file.path()).unwrap();
        assert!(config.prefixes.is_empty());
        assert_eq!(config.entry_symbol.as_deref(), Some("plugin_init"));
    }

    #[test]
    fn test_missing_file() {
        let result = LoaderConfig::from_file("/nonexistent/refract.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_overrides() {
        let joined = std::env::join_paths(["/first", "/second"]).unwrap();
        let config = LoaderConfig {
            search_paths: vec![PathBuf::from("/configured")],
            ..LoaderConfig::default()
        }
        .with_overrides(Some(joined), Some("  ".to_string()));

        assert_eq!(
            config.search_paths,
            vec![
                PathBuf::from("/first"),
                PathBuf::from("/second"),
                PathBuf::from("/configured")
            ]
        );
        assert_eq!(config.entry_symbol, None);
    }

    #[test]
    fn test_versioned_suffixes() {
        let config = LoaderConfig {
            suffixes: vec![".so".into()],
            versioned_suffixes: vec![".so.{version}".into()],
            ..LoaderConfig::default()
        };
        assert_eq!(config.suffixes_for(Some("1.2")), vec![".so.1.2".to_string()]);
        assert_eq!(config.suffixes_for(Some("")), vec![".so".to_string()]);
        assert_eq!(config.suffixes_for(None), vec![".so".to_string()]);
    }
}
