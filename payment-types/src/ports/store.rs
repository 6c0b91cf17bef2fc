//! Ledger store port trait.
//!
//! Adapters (Redis, in-memory) implement this trait. The record encoding is
//! private to each adapter.

use crate::domain::{UserAccount, UserId};
use crate::error::StoreError;

/// Result of an atomic conditional credit update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditAdjustment {
    /// The delta was applied; `credit` is the new balance.
    Applied { credit: i64 },
    /// No record exists for the id. Nothing was written.
    NotFound,
    /// The delta would take the balance below zero. Nothing was written.
    WouldGoNegative { available: i64 },
    /// The delta would overflow the balance. Nothing was written.
    Overflow,
}

/// Key-value access to user records.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Fetches and decodes a single record.
    async fn get(&self, id: &UserId) -> Result<Option<UserAccount>, StoreError>;

    /// Writes a single record, replacing any previous value.
    async fn set(&self, account: &UserAccount) -> Result<(), StoreError>;

    /// Writes many records in one round trip.
    async fn set_many(&self, accounts: &[UserAccount]) -> Result<(), StoreError>;

    /// Lists every record.
    async fn list(&self) -> Result<Vec<UserAccount>, StoreError>;

    /// Adds `delta` to the balance in a single atomic step.
    ///
    /// MUST NOT write when the record is missing or when the result would be
    /// negative, and no other writer may interleave between the floor check
    /// and the write.
    async fn adjust_credit(&self, id: &UserId, delta: i64)
    -> Result<CreditAdjustment, StoreError>;
}
