use common::CommandId;
use domain::UnknownStatus;
use thiserror::Error;

/// Errors that can occur when interacting with the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The command id collided with an already-committed command.
    /// Callers resolve this by re-reading the existing record.
    #[error("command {0} was already processed")]
    DuplicateCommand(CommandId),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted order row carried a status this build does not know.
    #[error("corrupt order row: {0}")]
    InvalidStatus(#[from] UnknownStatus),

    /// The store could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
