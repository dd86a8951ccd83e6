//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── UniqueViolation on <series>.code ─┐                          │
//! │       ├── StorageUnavailable ───────────────┤ retried by the persister │
//! │       │                                     ▼                          │
//! │       │                        PersistenceExhausted (budget used up)   │
//! │       │                                                                 │
//! │       ├── Core(CodeSpaceExhausted) ← fatal, never retried              │
//! │       └── everything else ← propagated unchanged                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tally_core::{CoreError, ValidationError};
use thiserror::Error;

/// SQLite primary result codes that mean "try again later".
///
/// 5 = SQLITE_BUSY, 6 = SQLITE_LOCKED; the extended codes keep the primary
/// code in their low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate document code (`purchase.code`, `sale.code`, ...)
    /// - Duplicate item code
    /// - Any UNIQUE index violation
    ///
    /// `field` is `<table>.<column>` as reported by SQLite.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - A line item references an item that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. a non-positive line quantity).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// The store could not complete the operation right now.
    ///
    /// ## When This Occurs
    /// - SQLITE_BUSY / SQLITE_LOCKED after the busy timeout
    /// - No pooled connection became available in time
    /// - I/O error talking to the database file
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Every save attempt hit a code conflict (or an unavailable store).
    ///
    /// Surfaced to the caller as a conflict-class error. `last` is the cause
    /// of the final attempt.
    #[error("Could not persist {series} after {attempts} attempts: {last}")]
    PersistenceExhausted {
        series: String,
        attempts: u32,
        #[source]
        last: Box<DbError>,
    },

    /// A domain rule failed (invalid input, exhausted code space).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether this is a unique violation on exactly `target`
    /// (`"<table>.<column>"`).
    pub fn is_unique_violation_on(&self, target: &str) -> bool {
        match self {
            DbError::UniqueViolation { field, .. } => field
                .split(',')
                .map(str::trim)
                .any(|column| column == target),
            _ => false,
        }
    }

    /// Whether the failure is transient and the operation may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::StorageUnavailable(_))
    }

    /// Whether the series ran out of codes.
    pub fn is_code_space_exhausted(&self) -> bool {
        matches!(self, DbError::Core(CoreError::CodeSpaceExhausted { .. }))
    }
}

fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound          → DbError::NotFound
/// sqlx::Error::Database (busy)      → DbError::StorageUnavailable
/// sqlx::Error::Database (UNIQUE)    → DbError::UniqueViolation
/// sqlx::Error::Database (FK/CHECK)  → DbError::ForeignKeyViolation / CheckViolation
/// sqlx::Error::PoolTimedOut / Io    → DbError::StorageUnavailable
/// Other                             → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if is_busy_code(db_err.code().as_deref())
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::StorageUnavailable(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    // "UNIQUE constraint failed: <table>.<column>"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => {
                DbError::StorageUnavailable("connection pool timed out".to_string())
            }

            sqlx::Error::Io(io) => DbError::StorageUnavailable(io.to_string()),

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(err.into())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_target_matching() {
        let err = DbError::duplicate("purchase.code", "PU24000001");
        assert!(err.is_unique_violation_on("purchase.code"));
        assert!(!err.is_unique_violation_on("sale.code"));
        assert!(!err.is_unique_violation_on("purchase.id"));

        let composite = DbError::duplicate("code_sequences.series, code_sequences.period", "x");
        assert!(composite.is_unique_violation_on("code_sequences.period"));
    }

    #[test]
    fn test_busy_codes() {
        assert!(is_busy_code(Some("5")));
        assert!(is_busy_code(Some("6")));
        // SQLITE_BUSY_SNAPSHOT
        assert!(is_busy_code(Some("517")));
        // SQLITE_CONSTRAINT_UNIQUE
        assert!(!is_busy_code(Some("2067")));
        assert!(!is_busy_code(None));
    }

    #[test]
    fn test_transient_classification() {
        assert!(DbError::StorageUnavailable("locked".into()).is_transient());
        assert!(!DbError::duplicate("purchase.code", "x").is_transient());
    }

    #[test]
    fn test_exhausted_keeps_cause() {
        let err = DbError::PersistenceExhausted {
            series: "purchase".to_string(),
            attempts: 3,
            last: Box::new(DbError::duplicate("purchase.code", "PU24000009")),
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("Duplicate purchase.code: 'PU24000009' already exists")
        );
    }
}
