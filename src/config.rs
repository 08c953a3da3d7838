// src/config.rs
//! Configuration file parsing
//!
//! Supports an optional TOML file with two sections:
//! - [conversion] - exclusion mode, METS file name, DIP profile, indentation
//! - [logging] - default log level and optional log file
//!
//! Every key has a default, so an empty file is a valid configuration.
//! Command-line flags override whatever the file sets.

use crate::filter::ExclusionMode;
use crate::mets::{DEFAULT_INDENT, DIP_PROFILE, METS_FILE_NAME};
use crate::package::ConversionOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const MAX_INDENT: usize = 16;

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Conversion settings
    #[serde(default)]
    pub conversion: ConversionSection,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Conversion configuration section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionSection {
    /// Which substructures are left out of the DIP
    #[serde(default)]
    pub mode: ExclusionMode,

    /// File name of the package-root METS document
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,

    /// Profile URI written to the DIP METS root
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Spaces per indentation level in the rewritten METS
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for ConversionSection {
    fn default() -> Self {
        Self {
            mode: ExclusionMode::default(),
            metadata_file: default_metadata_file(),
            profile: default_profile(),
            indent: default_indent(),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Default level when RUST_LOG is not set
    #[serde(default = "default_level")]
    pub level: String,

    /// Append log output to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

fn default_metadata_file() -> String {
    METS_FILE_NAME.to_string()
}

fn default_profile() -> String {
    DIP_PROFILE.to_string()
}

fn default_indent() -> usize {
    DEFAULT_INDENT
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let conversion = &self.conversion;

        if conversion.metadata_file.is_empty()
            || conversion.metadata_file.contains(['/', '\\'])
        {
            anyhow::bail!(
                "conversion.metadata_file must be a plain file name, got '{}'",
                conversion.metadata_file
            );
        }

        if conversion.profile.trim().is_empty() {
            anyhow::bail!("conversion.profile must not be empty");
        }

        if conversion.indent > MAX_INDENT {
            anyhow::bail!(
                "conversion.indent must be at most {}, got {}",
                MAX_INDENT,
                conversion.indent
            );
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            anyhow::bail!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            );
        }

        Ok(())
    }

    /// Conversion options described by this configuration
    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions {
            mode: self.conversion.mode,
            metadata_file: self.conversion.metadata_file.clone(),
            profile: self.conversion.profile.clone(),
            indent: self.conversion.indent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();

        assert_eq!(config.conversion.mode, ExclusionMode::Submission);
        assert_eq!(config.conversion.metadata_file, "METS.xml");
        assert_eq!(config.conversion.profile, DIP_PROFILE);
        assert_eq!(config.conversion.indent, 4);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_full_config() {
        let toml_str = r#"
            [conversion]
            mode = "representation"
            metadata_file = "mets.xml"
            indent = 2

            [logging]
            level = "debug"
            file = "logs/aip2dip.log"
        "#;
        let config = Config::from_toml(toml_str).unwrap();
        let options = config.conversion_options();

        assert_eq!(options.mode, ExclusionMode::Representation);
        assert_eq!(options.metadata_file, "mets.xml");
        assert_eq!(options.indent, 2);
        assert_eq!(config.logging.file, Some(PathBuf::from("logs/aip2dip.log")));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Config::from_toml("[conversion]\nmode = \"everything\"").is_err());
    }

    #[test]
    fn test_rejects_unknown_key() {
        assert!(Config::from_toml("[conversion]\nmodes = \"submission\"").is_err());
    }

    #[test]
    fn test_rejects_nested_metadata_file() {
        let err = Config::from_toml("[conversion]\nmetadata_file = \"a/METS.xml\"").unwrap_err();
        assert!(err.to_string().contains("plain file name"));
    }

    #[test]
    fn test_rejects_bad_level() {
        assert!(Config::from_toml("[logging]\nlevel = \"loud\"").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/aip2dip.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
