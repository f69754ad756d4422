//! Configuration schema (cubesext.toml)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema inference options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Column names never mapped (bookkeeping columns)
    pub exclude_columns: Vec<String>,

    /// Tables whose names start with one of these prefixes are skipped
    pub reserved_table_prefixes: Vec<String>,

    /// Column names always turned into dimensions
    pub force_dimensions: Vec<String>,

    /// Restrict the pass to these tables (empty means all tables)
    pub tables: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            exclude_columns: vec!["key".to_string()],
            reserved_table_prefixes: vec!["sqlite_".to_string()],
            force_dimensions: Vec::new(),
            tables: Vec::new(),
        }
    }
}

impl InferenceConfig {
    /// Check if a table name carries a reserved prefix
    pub fn is_reserved_table(&self, table: &str) -> bool {
        self.reserved_table_prefixes
            .iter()
            .any(|prefix| table.starts_with(prefix.as_str()))
    }

    /// Check if a table passes the allow-list
    pub fn is_table_allowed(&self, table: &str) -> bool {
        self.tables.is_empty() || self.tables.iter().any(|t| t == table)
    }

    /// Check if a column is excluded by name
    pub fn is_column_excluded(&self, column: &str) -> bool {
        self.exclude_columns.iter().any(|c| c == column)
    }

    /// Check if a column is forced into a dimension
    pub fn is_forced_dimension(&self, column: &str) -> bool {
        self.force_dimensions.iter().any(|c| c == column)
    }
}

/// Analytic (slicer) server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerSettings {
    /// Executable used to start the server
    pub command: String,

    /// Server log level (workspace section)
    pub log_level: String,

    pub host: String,

    pub port: u16,

    /// Reload the model when it changes
    pub reload: bool,

    /// Pretty-print JSON responses
    pub prettyprint: bool,

    /// Maximum number of records per JSON response
    pub json_record_limit: u32,

    /// Value of the CORS allow-origin header
    pub allow_cors_origin: String,

    /// Number of server processes
    pub processes: u32,

    /// Delay between terminating an old server and starting a new one
    pub restart_grace_ms: u64,
}

impl Default for SlicerSettings {
    fn default() -> Self {
        Self {
            command: "slicer".to_string(),
            log_level: "debug".to_string(),
            host: "localhost".to_string(),
            port: 5000,
            reload: true,
            prettyprint: true,
            json_record_limit: 5000,
            allow_cors_origin: "*".to_string(),
            processes: 6,
            restart_grace_ms: 2000,
        }
    }
}

impl SlicerSettings {
    /// Base URL the server answers on
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Visualization front-end settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub host: String,

    pub port: u16,

    /// Directory holding the viewer's static assets
    pub static_dir: PathBuf,

    /// Open a browser window when serving
    pub open_browser: bool,

    /// URL prefix of the static assets inside a notebook server
    pub static_url_prefix: String,

    /// Delay before an embedded view initializes
    pub embed_delay_ms: u64,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8085,
            static_dir: PathBuf::from("static"),
            open_browser: true,
            static_url_prefix: "/nbextensions/cubesext/static/".to_string(),
            embed_delay_ms: 3000,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Inference options
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Slicer server settings
    #[serde(default)]
    pub slicer: SlicerSettings,

    /// Viewer settings
    #[serde(default)]
    pub viewer: ViewerSettings,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inference: InferenceConfig::default(),
            slicer: SlicerSettings::default(),
            viewer: ViewerSettings::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Resolve the viewer's static directory against the project root
    pub fn static_dir(&self) -> PathBuf {
        if self.viewer.static_dir.is_absolute() {
            self.viewer.static_dir.clone()
        } else {
            self.project_root.join(&self.viewer.static_dir)
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.inference.exclude_columns, vec!["key"]);
        assert_eq!(config.slicer.port, 5000);
        assert_eq!(config.slicer.json_record_limit, 5000);
        assert_eq!(config.viewer.port, 8085);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [inference]
            force_dimensions = ["year"]

            [slicer]
            port = 5100
            "#,
        )
        .unwrap();

        assert_eq!(config.inference.force_dimensions, vec!["year"]);
        assert_eq!(config.inference.exclude_columns, vec!["key"]);
        assert_eq!(config.slicer.port, 5100);
        assert_eq!(config.slicer.host, "localhost");
        assert!(config.viewer.open_browser);
    }

    #[test]
    fn inference_filters() {
        let mut inference = InferenceConfig::default();
        assert!(inference.is_reserved_table("sqlite_sequence"));
        assert!(!inference.is_reserved_table("orders"));
        assert!(inference.is_table_allowed("orders"));
        assert!(inference.is_column_excluded("key"));

        inference.tables = vec!["orders".to_string()];
        assert!(inference.is_table_allowed("orders"));
        assert!(!inference.is_table_allowed("customers"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(config.slicer, parsed.slicer);
        assert_eq!(config.inference, parsed.inference);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = Config::from_toml("[slicer\nport = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
