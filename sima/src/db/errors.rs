use thiserror::Error;

/// Unified error type for database operations that application code can handle.
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation: {message}")]
    UniqueViolation { message: String },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Not-null constraint violation (a required field slipped past validation)
    #[error("Not-null constraint violation: {message}")]
    NotNullViolation { message: String },

    /// Check constraint violation
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using sqlx's error categorization. SQLite does
/// not report constraint or table names, so only the engine message is kept;
/// the API boundary pattern-matches on it to produce user-facing text.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => DbError::UniqueViolation { message },
                    sqlx::error::ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    sqlx::error::ErrorKind::NotNullViolation => DbError::NotNullViolation { message },
                    sqlx::error::ErrorKind::CheckViolation => DbError::CheckViolation { message },
                    // All other database errors are non-recoverable
                    _ => DbError::Other(anyhow::Error::from(err)),
                }
            }
            // All other sqlx errors are non-recoverable
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
