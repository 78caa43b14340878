//! Static table registry.
//!
//! The original ingestion design discovered tables reflectively at runtime;
//! here the full table list is declared in configuration and the registry is
//! built exactly once at startup. Lookups after that are read-only, so
//! workers share the registry without synchronization.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::Connection;

use crate::config::{ColumnType, TableConfig};
use crate::error::{Result, SiphonError};

/// Name of the dedicated error-capture table.
///
/// Reserved: a datagram naming this table resolves to nothing and is routed
/// to the error path like any other unknown name, which keeps a hostile or
/// misconfigured sender from writing forged error rows and prevents
/// recursive failure loops.
pub const ERROR_TABLE: &str = "ingest_errors";

/// One declared column of a target table.
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Declared value type.
    pub column_type: ColumnType,
}

/// A resolved persistence destination: table name plus ordered columns.
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Table name as declared in configuration.
    pub name: String,
    /// Ordered column declarations.
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Find a declared column by name (case-insensitive).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    #[must_use]
    pub fn ddl(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.column_type.sql_type()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            columns.join(", ")
        )
    }
}

/// Registry of all declared target tables, keyed case-insensitively.
///
/// Built once at startup; never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<String, Arc<TableSchema>>,
}

impl TableRegistry {
    /// Build a registry from declared table configuration.
    ///
    /// # Errors
    /// Returns [`SiphonError::Config`] if a declared table shadows the
    /// reserved error table. Other structural validation (duplicates, empty
    /// column lists) happens at config load.
    pub fn from_config(tables: &[TableConfig]) -> Result<Self> {
        let mut map = HashMap::with_capacity(tables.len());
        for table in tables {
            let key = table.name.to_ascii_lowercase();
            if key == ERROR_TABLE {
                return Err(SiphonError::Config(format!(
                    "table '{}' is reserved for error capture",
                    table.name
                )));
            }
            let schema = TableSchema {
                name: table.name.clone(),
                columns: table
                    .columns
                    .iter()
                    .map(|c| Column {
                        name: c.name.clone(),
                        column_type: c.column_type,
                    })
                    .collect(),
            };
            map.insert(key, Arc::new(schema));
        }
        Ok(Self { tables: map })
    }

    /// Resolve a table name to its schema. Case-insensitive; the reserved
    /// error table never resolves.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Arc<TableSchema>> {
        self.tables.get(&name.to_ascii_lowercase())
    }

    /// Number of declared tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the registry has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Apply DDL for every declared table plus the error table.
    ///
    /// Idempotent; called once at startup on a single pool connection so a
    /// fresh database is usable immediately.
    ///
    /// # Errors
    /// Returns [`SiphonError::Database`] on SQLite failures.
    pub fn apply_schema(&self, conn: &Connection) -> Result<()> {
        for schema in self.tables.values() {
            conn.execute_batch(&schema.ddl())?;
        }
        conn.execute_batch(&error_table_ddl())?;
        Ok(())
    }
}

/// DDL for the error-capture table.
///
/// Layout contract: timestamp, origin address, failing table name, error
/// class, description, and raw payload text.
#[must_use]
pub fn error_table_ddl() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {ERROR_TABLE} (
            received_at TEXT NOT NULL,
            origin      TEXT,
            table_name  TEXT,
            error_class TEXT NOT NULL,
            description TEXT NOT NULL,
            payload     TEXT NOT NULL
        )"
    )
}
