use domain::StoreError;
use thiserror::Error;

/// Errors raised while connecting to or preparing the database.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The pool could not be created.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Maps a driver error to the port-level storage error.
pub(crate) fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Maps a driver error, turning a primary key violation into `Duplicate`.
pub(crate) fn insert_error(entity: &'static str, id: impl ToString, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StoreError::Duplicate {
            entity,
            id: id.to_string(),
        };
    }
    unavailable(err)
}

/// Converts a stored integer column into a count, rejecting negatives.
pub(crate) fn count_column(entity: &'static str, column: &str, value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt {
        entity,
        reason: format!("{column} out of range: {value}"),
    })
}
