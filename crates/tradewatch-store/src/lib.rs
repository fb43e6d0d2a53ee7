//! Durable alert storage.
//!
//! One SQLite table keyed by the source message id, with a store-assigned
//! monotonic `seq` used as the change-detection cursor. The schema carries one
//! column per configured strategy field, so the field set is fixed for the
//! lifetime of the store; changing it is a schema migration, not handled here.

pub mod error;

#[cfg(test)]
mod tests;

use rusqlite::{Connection, ToSql, params};
use std::path::Path;
use std::sync::Mutex;

use error::{Result, StoreError};
use tradewatch_common::types::{AlertRecord, FieldSet, NewAlert};

const DB_FILE: &str = "alerts.db";

/// Column names the schema claims for itself; a configured field may not
/// shadow them.
const RESERVED_COLUMNS: [&str; 4] = ["seq", "message_id", "msg_timestamp", "alert"];

/// Persistent alert store.
///
/// Writes (fetcher) and reads (change detector) run on different tasks; the
/// single connection behind a `Mutex` serializes them, and WAL mode keeps the
/// file safe against a crash mid-write.
pub struct AlertStore {
    conn: Mutex<Connection>,
    fields: FieldSet,
}

impl AlertStore {
    /// Opens (creating if needed) the alert database under `data_dir` and
    /// ensures the schema matches the configured field set. Idempotent.
    pub fn open(data_dir: &Path, fields: FieldSet) -> Result<Self> {
        for column in fields.columns() {
            if RESERVED_COLUMNS.contains(&column.as_str()) {
                return Err(StoreError::InvalidFields(format!(
                    "field name '{column}' collides with a reserved column"
                )));
            }
        }
        std::fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join(DB_FILE))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(&schema_sql(&fields))?;
        Ok(Self {
            conn: Mutex::new(conn),
            fields,
        })
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Cheap existence probe by message id, used by the fetcher to skip
    /// downloading message content it has already ingested.
    pub fn contains(&self, message_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM alerts WHERE message_id = ?1",
            params![message_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Inserts the alert unless a row with the same `message_id` already
    /// exists. Returns `true` when a row was actually written. Safe to call
    /// repeatedly for the same message.
    pub fn insert_if_absent(&self, alert: &NewAlert) -> Result<bool> {
        if alert.fields.len() != self.fields.len() {
            return Err(StoreError::InvalidFields(format!(
                "expected {} field values, got {}",
                self.fields.len(),
                alert.fields.len()
            )));
        }

        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM alerts WHERE message_id = ?1",
            params![alert.message_id],
            |row| row.get(0),
        )?;
        if exists {
            return Ok(false);
        }

        let columns = self.column_list();
        let placeholders = (1..=3 + self.fields.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("INSERT INTO alerts ({columns}) VALUES ({placeholders})");

        let mut values: Vec<&dyn ToSql> =
            vec![&alert.message_id, &alert.timestamp, &alert.alert_name];
        for value in &alert.fields {
            values.push(value);
        }
        conn.execute(&sql, &values[..])?;
        Ok(true)
    }

    /// All records with `seq` strictly greater than `cursor`, in ascending
    /// `seq` order. A caller that always advances its cursor to the last
    /// returned `seq` never sees a record twice.
    pub fn select_after(&self, cursor: i64) -> Result<Vec<AlertRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT seq, {} FROM alerts WHERE seq > ?1 ORDER BY seq ASC",
            self.column_list()
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let field_count = self.fields.len();
        let rows = stmt.query_map(params![cursor], |row| {
            let mut fields = Vec::with_capacity(field_count);
            for i in 0..field_count {
                fields.push(row.get::<_, Option<String>>(4 + i)?);
            }
            Ok(AlertRecord {
                seq: row.get(0)?,
                message_id: row.get(1)?,
                timestamp: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                alert_name: row.get(3)?,
                fields,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }

    fn column_list(&self) -> String {
        let mut columns = vec![
            "message_id".to_string(),
            "msg_timestamp".to_string(),
            "alert".to_string(),
        ];
        columns.extend(self.fields.columns());
        columns.join(", ")
    }
}

/// Builds the `CREATE TABLE` statement for the configured field set. Field
/// columns are TEXT except those whose name contains "timestamp", which get
/// SQLite's DATETIME affinity like the header timestamp column.
fn schema_sql(fields: &FieldSet) -> String {
    let mut field_columns = String::new();
    for col in fields.columns() {
        let col_type = if col.contains("timestamp") {
            "DATETIME"
        } else {
            "TEXT"
        };
        field_columns.push_str(&format!(",\n    {col} {col_type}"));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS alerts (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id TEXT NOT NULL UNIQUE,
    msg_timestamp DATETIME,
    alert TEXT NOT NULL{field_columns}
);"
    )
}
