//! Runtime configuration
//!
//! Settings come from a TOML file: the path given on the command line, else
//! `qakit.toml` in the working directory, else built-in defaults.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::compression::CompressionFactory;
use crate::errors::{QaError, QaResult};
use crate::raster::attribute_table::{DEFAULT_FIELD, DEFAULT_WIDTH};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "qakit.toml";

/// Settings shared by every command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaConfig {
    /// File receiving log records
    pub log_file: Option<String>,
    /// Name of the label column in attribute tables
    pub attribute_field: String,
    /// Maximum label length
    pub attribute_width: usize,
    /// Compression of extracted rasters: none, deflate or zstd
    pub compression: String,
    /// Draw progress bars while reading rasters
    pub progress: bool,
}

impl Default for QaConfig {
    fn default() -> Self {
        QaConfig {
            log_file: None,
            attribute_field: DEFAULT_FIELD.to_string(),
            attribute_width: DEFAULT_WIDTH,
            compression: "none".to_string(),
            progress: false,
        }
    }
}

impl QaConfig {
    /// Parses configuration from TOML text
    ///
    /// Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> QaResult<Self> {
        let value: toml::Value = content.parse()
            .map_err(|e| QaError::Config(format!("Failed to parse TOML: {}", e)))?;

        let mut config = QaConfig::default();

        if let Some(logging) = value.get("logging").and_then(|v| v.as_table()) {
            if let Some(file) = logging.get("file").and_then(|v| v.as_str()) {
                config.log_file = Some(file.to_string());
            }
        }

        if let Some(attributes) = value.get("attributes").and_then(|v| v.as_table()) {
            if let Some(field) = attributes.get("field").and_then(|v| v.as_str()) {
                config.attribute_field = field.to_string();
            }
            if let Some(width) = attributes.get("width") {
                let width = width.as_integer()
                    .ok_or_else(|| QaError::Config(format!("attributes.width must be an integer, got {}", width)))?;
                if width <= 0 {
                    return Err(QaError::Config(format!("attributes.width must be positive, got {}", width)));
                }
                config.attribute_width = width as usize;
            }
        }

        if let Some(output) = value.get("output").and_then(|v| v.as_table()) {
            if let Some(compression) = output.get("compression").and_then(|v| v.as_str()) {
                config.compression = compression.to_string();
            }
            if let Some(progress) = output.get("progress").and_then(|v| v.as_bool()) {
                config.progress = progress;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`, or from `qakit.toml` when present
    pub fn load(path: Option<&Path>) -> QaResult<Self> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
            None => {
                debug!("No configuration file, using defaults");
                return Ok(QaConfig::default());
            }
        };

        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|e| QaError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Checks values that cannot be expressed in TOML types
    pub fn validate(&self) -> QaResult<()> {
        CompressionFactory::get_handler_by_name(&self.compression)?;

        if self.attribute_width == 0 {
            return Err(QaError::Config("attributes.width must be positive, got 0".to_string()));
        }
        if self.attribute_field.trim().is_empty() {
            return Err(QaError::Config("attributes.field must not be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(QaConfig::from_toml_str("").unwrap(), QaConfig::default());
    }

    #[test]
    fn full_file() {
        let config = QaConfig::from_toml_str(r#"
[logging]
file = "qa.log"

[attributes]
field = "Label"
width = 64

[output]
compression = "zstd"
progress = true
"#).unwrap();

        assert_eq!(config.log_file.as_deref(), Some("qa.log"));
        assert_eq!(config.attribute_field, "Label");
        assert_eq!(config.attribute_width, 64);
        assert_eq!(config.compression, "zstd");
        assert!(config.progress);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(QaConfig::from_toml_str("[output]\ncompression = \"lzw\""), Err(QaError::Config(_))));
        assert!(matches!(QaConfig::from_toml_str("[attributes]\nwidth = 0"), Err(QaError::Config(_))));
        assert!(matches!(QaConfig::from_toml_str("[attributes]\nwidth = \"wide\""), Err(QaError::Config(_))));
        assert!(matches!(QaConfig::from_toml_str("not toml ="), Err(QaError::Config(_))));
    }

    #[test]
    fn loads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[output]\ncompression = \"deflate\"\n").unwrap();

        let config = QaConfig::load(Some(&path)).unwrap();
        assert_eq!(config.compression, "deflate");
        assert!(matches!(QaConfig::load(Some(&dir.path().join("missing.toml"))), Err(QaError::Config(_))));
    }
}
