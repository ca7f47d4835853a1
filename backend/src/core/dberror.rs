use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    ConnectionFailed(sqlx::Error),

    #[error("Database operation failed: {0}")]
    OperationFailed(sqlx::Error),

    #[error("Row not found: {0}")]
    RowNotFound(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::RowNotFound(error),
            e if is_connection_failure(&e) => Self::ConnectionFailed(e),
            e => Self::OperationFailed(e),
        }
    }
}

/// True when the error means the database could not be reached or refused us,
/// as opposed to a statement that reached the server and failed there.
///
/// SQLSTATE classes: `08` connection exception, `28` invalid authorization,
/// `3D000` unknown database, `57P03` server starting up.
#[must_use]
pub fn is_connection_failure(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            code.starts_with("08") || code.starts_with("28") || code == "3D000" || code == "57P03"
        }),
        _ => false,
    }
}
