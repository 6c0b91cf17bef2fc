//! In-memory ledger store adapter.
//!
//! Used by the test suites and for running the service without Redis.
//! Records are kept in their encoded form so malformed data can be
//! injected and observed the same way as with the Redis adapter.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use payment_types::{CreditAdjustment, LedgerStore, StoreError, UserAccount, UserId};

use crate::codec;

/// `DashMap`-backed store. Balance updates hold the entry lock for the
/// whole check-and-write.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    records: DashMap<UserId, String>,
    unavailable: AtomicBool,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw bytes for `id`, bypassing the encoder.
    pub fn insert_raw(&self, id: UserId, raw: impl Into<String>) {
        self.records.insert(id, raw.into());
    }

    /// Makes every operation fail with a connection error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get(&self, id: &UserId) -> Result<Option<UserAccount>, StoreError> {
        self.check_available()?;
        let Some(raw) = self.records.get(id) else {
            return Ok(None);
        };
        let credit = codec::decode(id.as_str(), raw.as_bytes())?;
        Ok(Some(UserAccount {
            id: id.clone(),
            credit,
        }))
    }

    async fn set(&self, account: &UserAccount) -> Result<(), StoreError> {
        self.check_available()?;
        self.records
            .insert(account.id.clone(), codec::encode(account.credit));
        Ok(())
    }

    async fn set_many(&self, accounts: &[UserAccount]) -> Result<(), StoreError> {
        self.check_available()?;
        for account in accounts {
            self.records
                .insert(account.id.clone(), codec::encode(account.credit));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UserAccount>, StoreError> {
        self.check_available()?;
        self.records
            .iter()
            .map(|entry| -> Result<UserAccount, StoreError> {
                Ok(UserAccount {
                    id: entry.key().clone(),
                    credit: codec::decode(entry.key().as_str(), entry.value().as_bytes())?,
                })
            })
            .collect()
    }

    async fn adjust_credit(
        &self,
        id: &UserId,
        delta: i64,
    ) -> Result<CreditAdjustment, StoreError> {
        self.check_available()?;
        let Some(mut entry) = self.records.get_mut(id) else {
            return Ok(CreditAdjustment::NotFound);
        };

        let balance = codec::decode(id.as_str(), entry.value().as_bytes())?;
        let Some(next) = balance.checked_add(delta) else {
            return Ok(CreditAdjustment::Overflow);
        };
        if next < 0 {
            return Ok(CreditAdjustment::WouldGoNegative { available: balance });
        }

        *entry.value_mut() = codec::encode(next);
        Ok(CreditAdjustment::Applied { credit: next })
    }
}
