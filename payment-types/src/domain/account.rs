//! User account domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Opaque identifier of a user account.
///
/// Accounts created one at a time get a random UUID; batch initialization
/// uses the decimal indices `"0"`, `"1"`, ... so load generators can address
/// them without a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new random UserId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user's credit balance.
///
/// `credit` is never negative once a write has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Unique identifier
    #[serde(rename = "user_id")]
    pub id: UserId,
    /// Available credit in the smallest unit
    pub credit: i64,
}

impl UserAccount {
    /// Opens an account with the given starting credit.
    ///
    /// # Validation
    /// - Starting credit cannot be negative
    pub fn open(id: UserId, starting_credit: i64) -> Result<Self, LedgerError> {
        if starting_credit < 0 {
            return Err(LedgerError::InvalidAmount(starting_credit));
        }
        Ok(Self {
            id,
            credit: starting_credit,
        })
    }
}
