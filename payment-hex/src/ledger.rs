//! Credit Ledger
//!
//! Balance rules on top of the store port. Every balance change is a single
//! atomic conditional update in the store, so concurrent HTTP calls and saga
//! debits cannot interleave between the floor check and the write.

use payment_types::{CreditAdjustment, LedgerError, LedgerStore, UserAccount, UserId};

/// Application service for user credit.
///
/// Generic over `S: LedgerStore` - the adapter is injected at compile time.
pub struct CreditLedger<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> CreditLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a user with a fresh id and the given starting credit.
    pub async fn create_account(&self, starting_credit: i64) -> Result<UserId, LedgerError> {
        let account = UserAccount::open(UserId::generate(), starting_credit)?;
        self.store.set(&account).await?;

        tracing::debug!(user_id = %account.id, credit = account.credit, "Created user");
        Ok(account.id)
    }

    pub async fn get_account(&self, id: &UserId) -> Result<UserAccount, LedgerError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(id.clone()))
    }

    pub async fn list_accounts(&self) -> Result<Vec<UserAccount>, LedgerError> {
        Ok(self.store.list().await?)
    }

    /// Writes users `"0"` to `"{n-1}"` with `starting_credit` in one batch,
    /// overwriting any existing records with those ids.
    pub async fn batch_init(&self, n: u64, starting_credit: i64) -> Result<(), LedgerError> {
        let accounts = (0..n)
            .map(|i| UserAccount::open(UserId::from(i.to_string()), starting_credit))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.set_many(&accounts).await?;

        tracing::info!(count = n, starting_credit, "Batch initialized users");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Balance changes
    // ─────────────────────────────────────────────────────────────────────────────

    /// Adds `amount` to the user's credit and returns the new balance.
    pub async fn credit(&self, id: &UserId, amount: i64) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.adjust(id, amount).await
    }

    /// Removes `amount` from the user's credit and returns the new balance.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] without writing when the
    /// balance is lower than `amount`.
    pub async fn debit(&self, id: &UserId, amount: i64) -> Result<i64, LedgerError> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.adjust(id, -amount).await
    }

    async fn adjust(&self, id: &UserId, delta: i64) -> Result<i64, LedgerError> {
        match self.store.adjust_credit(id, delta).await? {
            CreditAdjustment::Applied { credit } => {
                tracing::debug!(user_id = %id, delta, credit, "Credit updated");
                Ok(credit)
            }
            CreditAdjustment::NotFound => Err(LedgerError::NotFound(id.clone())),
            CreditAdjustment::WouldGoNegative { available } => {
                Err(LedgerError::InsufficientFunds {
                    user_id: id.clone(),
                    available,
                    requested: delta.saturating_neg(),
                })
            }
            CreditAdjustment::Overflow => Err(LedgerError::InvalidAmount(delta)),
        }
    }
}
