use std::time::Duration;

use common::CommandId;
use domain::OrderError;
use ledger::LedgerError;
use thiserror::Error;

/// Errors surfaced to command callers.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command payload failed validation. Not retryable without
    /// changing the input; nothing was written.
    #[error("invalid order: {0}")]
    Validation(#[from] OrderError),

    /// The ledger could not complete the transaction. The whole command
    /// failed atomically, so retrying it is safe.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A command id collided at commit time but the winning record could
    /// not be read back afterwards. Callers may retry the command.
    #[error("command {0} conflicted but no processed record was found")]
    UnresolvedConflict(CommandId),
}

/// Errors returned by a message-bus publisher.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The bus could not be reached.
    #[error("message bus unavailable: {0}")]
    Unavailable(String),

    /// The bus refused the message.
    #[error("message bus rejected the event: {0}")]
    Rejected(String),

    /// No acknowledgment arrived within the configured bound.
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),
}
