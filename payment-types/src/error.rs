//! Error types for the payment ledger.

use crate::domain::UserId;

/// Store-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Malformed record at {key}: {reason}")]
    Decode { key: String, reason: String },
}

/// Ledger errors: business rule violations and the store failures behind them.
///
/// The `Display` strings end up verbatim in `PaymentFailed::reason`.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("User: {0} not found!")]
    NotFound(UserId),

    #[error(
        "User: {user_id} does not have enough credit (available {available}, requested {requested})"
    )]
    InsufficientFunds {
        user_id: UserId,
        available: i64,
        requested: i64,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("Malformed record at {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error("DB error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Decode { key, reason } => LedgerError::Decode { key, reason },
            other => LedgerError::Store(other),
        }
    }
}

/// Broker-level errors.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker connection error: {0}")]
    Connection(String),

    #[error("Failed to declare queue {queue}: {reason}")]
    Declare { queue: String, reason: String },

    #[error("Failed to publish to {queue}: {reason}")]
    Publish { queue: String, reason: String },

    #[error("Failed to receive message: {0}")]
    Receive(String),

    #[error("Failed to settle delivery: {0}")]
    Settle(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Application-level errors (for HTTP responses).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InsufficientFunds(String),

    #[error("{0}")]
    Store(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(_) => AppError::NotFound(err.to_string()),
            LedgerError::InsufficientFunds { .. } => AppError::InsufficientFunds(err.to_string()),
            LedgerError::InvalidAmount(_) => AppError::BadRequest(err.to_string()),
            LedgerError::Decode { .. } | LedgerError::Store(_) => AppError::Store(err.to_string()),
        }
    }
}
