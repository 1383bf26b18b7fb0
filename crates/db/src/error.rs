/// Errors raised by a [`RecordStore`](crate::RecordStore) implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying database rejected or failed the query.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store cannot be reached at all.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
