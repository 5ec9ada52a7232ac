use thiserror::Error;

use crate::{db_types::OrderId, traits::StoreError};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Concurrent modification of order {0}")]
    VersionConflict(OrderId),
    #[error("Transaction reference {0} has already been issued")]
    DuplicateReference(String),
    #[error("Stored record is corrupt: {0}")]
    CorruptRecord(String),
}

impl From<SqliteDatabaseError> for StoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::OrderNotFound(id) => StoreError::OrderNotFound(id),
            SqliteDatabaseError::VersionConflict(_) => StoreError::VersionConflict,
            SqliteDatabaseError::DuplicateReference(r) => StoreError::DuplicateReference(r),
            SqliteDatabaseError::CorruptRecord(s) => StoreError::CorruptRecord(s),
            e => StoreError::DatabaseError(e.to_string()),
        }
    }
}
