//! Configuration for the Siphon ingestion server.
//!
//! Maps directly to `siphon.toml`. The declared `[[tables]]` list is the
//! whole schema surface: the registry is built from it at startup and no
//! table discovery happens at runtime.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiphonError};
use crate::registry::ERROR_TABLE;

/// Top-level Siphon configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiphonConfig {
    /// Network listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database and pool settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Declared target tables.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl SiphonConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`SiphonError::Config`] if the TOML is invalid or the
    /// declared tables fail validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| SiphonError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Validate the declared table list.
    ///
    /// # Errors
    /// Returns [`SiphonError::Config`] on duplicate table names, empty
    /// column lists, duplicate column names, or a table that shadows the
    /// reserved error table.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for table in &self.tables {
            let lowered = table.name.to_ascii_lowercase();
            if lowered == ERROR_TABLE {
                return Err(SiphonError::Config(format!(
                    "table name '{}' is reserved for error capture",
                    table.name
                )));
            }
            if !seen.insert(lowered) {
                return Err(SiphonError::Config(format!(
                    "duplicate table name '{}'",
                    table.name
                )));
            }
            if table.columns.is_empty() {
                return Err(SiphonError::Config(format!(
                    "table '{}' declares no columns",
                    table.name
                )));
            }
            let mut cols = std::collections::HashSet::new();
            for column in &table.columns {
                if !cols.insert(column.name.to_ascii_lowercase()) {
                    return Err(SiphonError::Config(format!(
                        "duplicate column '{}' in table '{}'",
                        column.name, table.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// UDP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:9514`.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Largest datagram accepted, in bytes. Larger datagrams are truncated
    /// by the OS receive call and will fail JSON parsing.
    #[serde(default = "default_max_datagram")]
    pub max_datagram_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_datagram_bytes: default_max_datagram(),
        }
    }
}

/// Database and connection pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Number of pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_size: default_pool_size(),
            wal_mode: true,
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// One declared target table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name as it appears in datagram `table` fields (matched
    /// case-insensitively).
    pub name: String,
    /// Ordered column declarations.
    pub columns: Vec<ColumnConfig>,
}

/// One declared column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Column name.
    pub name: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Declared column value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float. Integer payload values are accepted here.
    Real,
    /// UTF-8 text.
    Text,
    /// Boolean, stored as 0/1.
    Bool,
}

impl ColumnType {
    /// SQLite type name used in generated DDL.
    #[must_use]
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer | Self::Bool => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:9514".to_string()
}

fn default_max_datagram() -> usize {
    65_535
}

fn default_db_path() -> String {
    "siphon.db".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_busy_timeout() -> u32 {
    5_000
}

fn default_true() -> bool {
    true
}
