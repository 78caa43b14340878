//! Row persistence with error capture.
//!
//! [`ingest`] is the complete per-datagram path: decode, resolve, insert.
//! Any failure along the way is captured as a row in the `ingest_errors`
//! table instead of propagating, so one bad datagram can never take a
//! worker (or the listener behind it) down. If even the error-row insert
//! fails, the failure is logged to the process error stream and the record
//! is dropped — the only case where a datagram leaves no row behind.

use std::net::SocketAddr;

use chrono::Utc;
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use tracing::{debug, error, warn};

use crate::config::ColumnType;
use crate::error::{Result, SiphonError};
use crate::record::{FieldValue, Record, payload_text};
use crate::registry::{ERROR_TABLE, TableRegistry, TableSchema};

/// What became of one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The row was committed to its target table.
    Stored {
        /// Declared table name the row landed in.
        table: String,
    },
    /// The record failed and an error row was committed instead.
    Captured {
        /// Error class recorded in the error row.
        class: &'static str,
    },
    /// Double-fault: the error row itself could not be written. The record
    /// is gone; the failure was logged.
    Lost {
        /// Error class of the original failure.
        class: &'static str,
    },
}

/// Process one datagram end to end: parse, resolve, persist, or capture.
///
/// Exactly one row is committed per call — to the target table on success,
/// to [`ERROR_TABLE`] on failure — except the double-fault case, which
/// commits nothing and returns [`IngestOutcome::Lost`]. This function never
/// returns an error; failures are data.
pub fn ingest(
    conn: &mut Connection,
    registry: &TableRegistry,
    payload: &[u8],
    origin: Option<SocketAddr>,
) -> IngestOutcome {
    let (failure, table_name) = match Record::parse(payload) {
        Ok(record) => {
            let Some(schema) = registry.resolve(&record.table) else {
                let err = SiphonError::UnknownTable(record.table.clone());
                return capture(conn, origin, Some(record.table.as_str()), &err, payload);
            };
            match persist_record(conn, schema, &record) {
                Ok(()) => {
                    debug!(table = %schema.name, fields = record.fields.len(), "Row stored");
                    return IngestOutcome::Stored {
                        table: schema.name.clone(),
                    };
                }
                Err(err) => (err, Some(record.table)),
            }
        }
        Err(err) => (err, None),
    };
    capture(conn, origin, table_name.as_deref(), &failure, payload)
}

/// Insert one record into its resolved table inside a transaction.
///
/// The transaction rolls back entirely on any failure, so a rejected record
/// leaves no partial row behind.
///
/// # Errors
/// Returns [`SiphonError::ColumnMismatch`] if a payload field names an
/// undeclared column or its value does not fit the declared type, or
/// [`SiphonError::Database`] on SQLite failures.
pub fn persist_record(
    conn: &mut Connection,
    schema: &TableSchema,
    record: &Record,
) -> Result<()> {
    let tx = conn.transaction()?;
    let mut columns = Vec::with_capacity(record.fields.len());
    let mut values: Vec<SqlValue> = Vec::with_capacity(record.fields.len());

    for (name, value) in &record.fields {
        let Some(column) = schema.column(name) else {
            return Err(SiphonError::ColumnMismatch {
                table: schema.name.clone(),
                column: name.clone(),
                detail: "no such column".to_string(),
            });
        };
        values.push(bind_value(schema, column.name.as_str(), column.column_type, value)?);
        columns.push(column.name.as_str());
    }

    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", schema.name)
    } else {
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.name,
            columns.join(", "),
            placeholders.join(", ")
        )
    };

    tx.execute(&sql, rusqlite::params_from_iter(values))?;
    tx.commit()?;
    Ok(())
}

/// Convert a payload value for binding, checking it against the declared
/// column type. Pass-through semantics: the only cross-type acceptance is
/// an integer payload value for a `real` column.
fn bind_value(
    schema: &TableSchema,
    column: &str,
    declared: ColumnType,
    value: &FieldValue,
) -> Result<SqlValue> {
    let mismatch = |got: &str| SiphonError::ColumnMismatch {
        table: schema.name.clone(),
        column: column.to_string(),
        detail: format!("declared {declared:?}, got {got}"),
    };
    match (declared, value) {
        (_, FieldValue::Null) => Ok(SqlValue::Null),
        (ColumnType::Integer, FieldValue::Integer(i)) => Ok(SqlValue::Integer(*i)),
        (ColumnType::Real, FieldValue::Real(f)) => Ok(SqlValue::Real(*f)),
        #[allow(clippy::cast_precision_loss)]
        (ColumnType::Real, FieldValue::Integer(i)) => Ok(SqlValue::Real(*i as f64)),
        (ColumnType::Text, FieldValue::Text(s)) => Ok(SqlValue::Text(s.clone())),
        (ColumnType::Bool, FieldValue::Bool(b)) => Ok(SqlValue::Integer(i64::from(*b))),
        (_, FieldValue::Integer(_)) => Err(mismatch("integer")),
        (_, FieldValue::Real(_)) => Err(mismatch("real")),
        (_, FieldValue::Text(_)) => Err(mismatch("text")),
        (_, FieldValue::Bool(_)) => Err(mismatch("bool")),
    }
}

/// Write an error row for a failed record.
///
/// Returns [`IngestOutcome::Captured`] when the error row commits, or
/// [`IngestOutcome::Lost`] (after logging) when even that insert fails.
fn capture(
    conn: &Connection,
    origin: Option<SocketAddr>,
    table_name: Option<&str>,
    failure: &SiphonError,
    payload: &[u8],
) -> IngestOutcome {
    let class = failure.class();
    match insert_error_row(conn, origin, table_name, failure, payload) {
        Ok(()) => {
            warn!(
                class,
                table = table_name.unwrap_or("<none>"),
                error = %failure,
                "Record captured as error row"
            );
            IngestOutcome::Captured { class }
        }
        Err(db_err) => {
            // Last-resort path: nothing persisted, record is lost.
            error!(
                class,
                table = table_name.unwrap_or("<none>"),
                original = %failure,
                error = %db_err,
                "Error row insert failed, record dropped"
            );
            IngestOutcome::Lost { class }
        }
    }
}

/// Insert one row into the error table.
///
/// # Errors
/// Returns [`SiphonError::Database`] on SQLite failures (including a
/// missing error table).
fn insert_error_row(
    conn: &Connection,
    origin: Option<SocketAddr>,
    table_name: Option<&str>,
    failure: &SiphonError,
    payload: &[u8],
) -> Result<()> {
    let mut stmt = conn.prepare_cached(&format!(
        "INSERT INTO {ERROR_TABLE}
         (received_at, origin, table_name, error_class, description, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    ))?;
    stmt.execute(rusqlite::params![
        Utc::now().to_rfc3339(),
        origin.map(|a| a.to_string()),
        table_name,
        failure.class(),
        failure.to_string(),
        payload_text(payload),
    ])?;
    Ok(())
}
