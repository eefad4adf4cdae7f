//! # Database Errors
//!
//! `DbError` classifies sqlx failures so callers can tell a constraint
//! decision (duplicate redemption, unknown coupon) from the database being
//! unavailable.
//!
//! ```text
//! sqlx::Error
//!     │
//!     ├── RowNotFound ─────────────────────► NotFound
//!     ├── Database "UNIQUE constraint" ────► UniqueViolation { constraint }
//!     ├── Database "FOREIGN KEY constraint"► ForeignKeyViolation
//!     ├── Database SQLITE_BUSY / LOCKED ───► Busy
//!     ├── PoolTimedOut ────────────────────► PoolExhausted
//!     ├── PoolClosed ──────────────────────► ConnectionFailed
//!     ├── ColumnDecode / Decode ───────────► InvalidData
//!     └── anything else ───────────────────► QueryFailed
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A unique index rejected the write.
    ///
    /// Raised for a duplicate coupon code, a second redemption of a
    /// single-use coupon by the same user, and a second active tax
    /// configuration. `constraint` is SQLite's `table.column` list.
    #[error("Unique constraint failed: {constraint}")]
    UniqueViolation { constraint: String },

    /// A usage row for a missing coupon, or deleting a coupon with history.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// SQLite's lock was held past the busy timeout.
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value could not be turned back into a domain value.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when the same statement could succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_) | DbError::PoolExhausted | DbError::ConnectionFailed(_)
        )
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // Primary result codes: 5 = SQLITE_BUSY, 6 = SQLITE_LOCKED.
                // Extended codes keep the primary code in the low byte.
                let primary = db_err
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff);

                if let Some(constraint) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        constraint: constraint.to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if matches!(primary, Some(5) | Some(6)) {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DbError::InvalidData(err.to_string())
            }

            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
