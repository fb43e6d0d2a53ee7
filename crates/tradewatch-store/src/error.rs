/// Errors from the persistent alert store.
///
/// Transient conditions are not retried here; retry policy belongs to the
/// caller (the fetcher retries its whole cycle, the change detector treats a
/// failed read as "nothing new").
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying SQLite error (schema, query, or constraint failure).
    #[error("Store: sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error while preparing the database location.
    #[error("Store: io error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured field set cannot back a valid schema.
    #[error("Store: invalid field set: {0}")]
    InvalidFields(String),
}

/// Convenience `Result` alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
