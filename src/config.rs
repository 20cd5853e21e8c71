//! Site configuration module.
//!
//! Handles loading, validating, and merging the `config.toml` at the content
//! root. Stock defaults are the base layer; the user file only overrides the
//! values it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! title = "Documentation"   # Site title shown in the header and <title>
//! exclude = []              # Entry names skipped at every directory level
//!
//! [links]
//! strict = true             # Broken links fail the build
//! max_suggestions = 3       # "Did you mean" entries per broken link
//! min_similarity = 0.6      # Minimum similarity score (0.0-1.0)
//!
//! [serve]
//! interface = "127.0.0.1"   # Address the preview server binds to
//! port = 4000               # First port tried; the next ones if taken
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! [links]
//! strict = false
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::listing::ContentFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up at the content root.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site title.
    pub title: String,
    /// Entry names skipped while scanning, in addition to hidden entries.
    pub exclude: Vec<String>,
    /// Link validation settings.
    pub links: LinksConfig,
    /// Preview server settings.
    pub serve: ServeConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Documentation".to_string(),
            exclude: Vec::new(),
            links: LinksConfig::default(),
            serve: ServeConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.links.min_similarity) {
            return Err(ConfigError::Validation(
                "links.min_similarity must be between 0.0 and 1.0".into(),
            ));
        }
        if self.serve.port == 0 {
            return Err(ConfigError::Validation(
                "serve.port must be non-zero".into(),
            ));
        }
        if self.serve.interface.trim().is_empty() {
            return Err(ConfigError::Validation(
                "serve.interface must not be empty".into(),
            ));
        }
        if let Some(bad) = self
            .exclude
            .iter()
            .find(|e| e.is_empty() || e.contains('/'))
        {
            return Err(ConfigError::Validation(format!(
                "exclude entries must be plain names, got {bad:?}"
            )));
        }
        Ok(())
    }

    /// Entry filter for the scanner and the reverse resolver.
    pub fn content_filter(&self) -> ContentFilter {
        ContentFilter::new(self.exclude.iter().cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinksConfig {
    /// Fail the build on broken links (`false` downgrades them to warnings).
    pub strict: bool,
    pub max_suggestions: usize,
    pub min_similarity: f64,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            strict: true,
            max_suggestions: 3,
            min_similarity: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    pub interface: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: "127.0.0.1".to_string(),
            port: 4000,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Docs Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file at the root of the content directory.
# Unknown keys will cause an error.

# Site title, shown in the page header and the browser tab.
title = "Documentation"

# File or directory names to skip at every level of the content tree.
# Names starting with "." are always skipped.
exclude = []

# ---------------------------------------------------------------------------
# Link validation
# ---------------------------------------------------------------------------
[links]
# Broken internal links fail the build. Set to false to only warn
# (same as passing --lenient).
strict = true

# Maximum number of "did you mean" suggestions per broken link.
max_suggestions = 3

# Minimum similarity (0.0 = anything, 1.0 = exact) for a page to be
# suggested as the intended target of a broken link.
min_similarity = 0.6

# ---------------------------------------------------------------------------
# Preview server
# ---------------------------------------------------------------------------
[serve]
# Address to bind to. Use "0.0.0.0" to expose the preview on your network.
interface = "127.0.0.1"

# First port to try; the next free port is used if it is taken.
port = 4000
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "Documentation");
        assert!(config.exclude.is_empty());
        assert!(config.links.strict);
        assert_eq!(config.links.max_suggestions, 3);
        assert_eq!(config.serve.port, 4000);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[links]
strict = false
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        // Overridden value
        assert!(!config.links.strict);
        // Default values preserved
        assert_eq!(config.links.max_suggestions, 3);
        assert_eq!(config.serve.interface, "127.0.0.1");
    }

    #[test]
    fn content_filter_uses_exclude() {
        let config = SiteConfig {
            exclude: vec!["drafts".into()],
            ..SiteConfig::default()
        };
        let filter = config.content_filter();
        assert!(!filter.admits("drafts"));
        assert!(filter.admits("guides"));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
title = "Handbook"
exclude = ["node_modules"]

[serve]
port = 8080
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.title, "Handbook");
        assert_eq!(config.exclude, vec!["node_modules"]);
        assert_eq!(config.serve.port, 8080);
        // Unspecified values should be defaults
        assert_eq!(config.serve.interface, "127.0.0.1");
        assert!(config.links.strict);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"title = "a""#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"title = "b""#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("title").unwrap().as_str(), Some("b"));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[links]
strict = true
max_suggestions = 3
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[links]
strict = false
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let links = merged.get("links").unwrap();
        assert_eq!(links.get("strict").unwrap().as_bool(), Some(false));
        // max_suggestions preserved from base
        assert_eq!(links.get("max_suggestions").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str(r#"exclude = ["a", "b"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"exclude = ["c"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("exclude").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[links]
stritc = true
"#;
        let result: Result<SiteConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[server]
port = 4000
"#;
        let result: Result<SiteConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "colour = \"red\"\n").unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_similarity_out_of_range() {
        let mut config = SiteConfig::default();
        config.links.min_similarity = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_port_zero() {
        let mut config = SiteConfig::default();
        config.serve.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_exclude_with_slash() {
        let config = SiteConfig {
            exclude: vec!["a/b".into()],
            ..SiteConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[links]\nmin_similarity = -0.1\n",
        )
        .unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value();
        let table = value.as_table().unwrap();
        for key in ["title", "exclude", "links", "serve"] {
            assert!(table.contains_key(key), "missing {key}");
        }
    }
}
