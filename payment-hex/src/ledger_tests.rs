//! CreditLedger unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use payment_store::InMemoryLedgerStore;
    use payment_types::{LedgerError, LedgerStore, UserAccount, UserId};

    use crate::CreditLedger;

    async fn ledger_with(accounts: &[(&str, i64)]) -> CreditLedger<InMemoryLedgerStore> {
        let store = InMemoryLedgerStore::new();
        for (id, credit) in accounts {
            store
                .set(&UserAccount {
                    id: UserId::from(*id),
                    credit: *credit,
                })
                .await
                .unwrap();
        }
        CreditLedger::new(store)
    }

    #[tokio::test]
    async fn test_create_account_starts_at_zero() {
        let ledger = ledger_with(&[]).await;

        let id = ledger.create_account(0).await.unwrap();

        let account = ledger.get_account(&id).await.unwrap();
        assert_eq!(account.credit, 0);
    }

    #[tokio::test]
    async fn test_create_account_rejects_negative_start() {
        let ledger = ledger_with(&[]).await;

        let result = ledger.create_account(-1).await;

        assert!(matches!(result, Err(LedgerError::InvalidAmount(-1))));
        assert!(ledger.store().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_account() {
        let ledger = ledger_with(&[]).await;

        let result = ledger.get_account(&UserId::from("ghost")).await;

        assert!(matches!(result, Err(LedgerError::NotFound(id)) if id.as_str() == "ghost"));
    }

    #[tokio::test]
    async fn test_get_malformed_record_is_decode_error() {
        let ledger = ledger_with(&[]).await;
        ledger.store().insert_raw(UserId::from("bad"), "\x00\x01");

        let result = ledger.get_account(&UserId::from("bad")).await;

        assert!(matches!(result, Err(LedgerError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_credit_then_debit() {
        let ledger = ledger_with(&[("u1", 0)]).await;
        let id = UserId::from("u1");

        assert_eq!(ledger.credit(&id, 100).await.unwrap(), 100);
        assert_eq!(ledger.debit(&id, 30).await.unwrap(), 70);
        assert_eq!(ledger.get_account(&id).await.unwrap().credit, 70);
    }

    #[tokio::test]
    async fn test_credit_requires_positive_amount() {
        let ledger = ledger_with(&[("u1", 5)]).await;
        let id = UserId::from("u1");

        assert!(matches!(
            ledger.credit(&id, 0).await,
            Err(LedgerError::InvalidAmount(0))
        ));
        assert!(matches!(
            ledger.credit(&id, -5).await,
            Err(LedgerError::InvalidAmount(-5))
        ));
        assert_eq!(ledger.get_account(&id).await.unwrap().credit, 5);
    }

    #[tokio::test]
    async fn test_debit_rejects_negative_amount() {
        let ledger = ledger_with(&[("u1", 5)]).await;

        let result = ledger.debit(&UserId::from("u1"), -1).await;

        assert!(matches!(result, Err(LedgerError::InvalidAmount(-1))));
    }

    #[tokio::test]
    async fn test_debit_of_zero_is_allowed() {
        let ledger = ledger_with(&[("u1", 5)]).await;

        assert_eq!(ledger.debit(&UserId::from("u1"), 0).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_overdraft_leaves_balance_unchanged() {
        let ledger = ledger_with(&[("u1", 10)]).await;
        let id = UserId::from("u1");

        let result = ledger.debit(&id, 50).await;

        match result {
            Err(LedgerError::InsufficientFunds {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 10);
                assert_eq!(requested, 50);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        assert_eq!(ledger.get_account(&id).await.unwrap().credit, 10);
    }

    #[tokio::test]
    async fn test_debit_exact_balance_reaches_zero() {
        let ledger = ledger_with(&[("u1", 10)]).await;

        assert_eq!(ledger.debit(&UserId::from("u1"), 10).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_balance_change_on_missing_user_creates_nothing() {
        let ledger = ledger_with(&[]).await;
        let ghost = UserId::from("ghost");

        assert!(matches!(
            ledger.debit(&ghost, 1).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            ledger.credit(&ghost, 1).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(ledger.store().is_empty());
    }

    #[tokio::test]
    async fn test_credit_overflow_is_rejected() {
        let ledger = ledger_with(&[("u1", i64::MAX - 1)]).await;

        let result = ledger.credit(&UserId::from("u1"), 2).await;

        assert!(matches!(result, Err(LedgerError::InvalidAmount(2))));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_store_error() {
        let ledger = ledger_with(&[("u1", 10)]).await;
        ledger.store().set_unavailable(true);

        let result = ledger.debit(&UserId::from("u1"), 1).await;

        assert!(matches!(result, Err(LedgerError::Store(_))));
        assert!(result.unwrap_err().to_string().starts_with("DB error"));
    }

    #[tokio::test]
    async fn test_batch_init_writes_sequential_ids() {
        let ledger = ledger_with(&[]).await;

        ledger.batch_init(1000, 0).await.unwrap();

        assert_eq!(ledger.store().len(), 1000);
        for i in [0_u64, 1, 500, 999] {
            let account = ledger.get_account(&UserId::from(i.to_string())).await.unwrap();
            assert_eq!(account.credit, 0);
        }
        assert!(matches!(
            ledger.get_account(&UserId::from("1000")).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_init_overwrites_existing_ids() {
        let ledger = ledger_with(&[("0", 999)]).await;

        ledger.batch_init(2, 50).await.unwrap();

        let account = ledger.get_account(&UserId::from("0")).await.unwrap();
        assert_eq!(account.credit, 50);
    }

    #[tokio::test]
    async fn test_batch_init_of_zero_users_is_noop() {
        let ledger = ledger_with(&[]).await;

        ledger.batch_init(0, 10).await.unwrap();

        assert!(ledger.list_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_accounts() {
        let ledger = ledger_with(&[("a", 1), ("b", 2)]).await;

        let mut accounts = ledger.list_accounts().await.unwrap();
        accounts.sort_by(|x, y| x.id.cmp(&y.id));

        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].credit, 1);
        assert_eq!(accounts[1].credit, 2);
    }

    #[tokio::test]
    async fn test_concurrent_debits_keep_balance_non_negative() {
        let ledger = Arc::new(ledger_with(&[("u1", 100)]).await);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.debit(&UserId::from("u1"), 7).await.is_ok()
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }

        // 100 / 7 = 14 debits fit, leaving 2.
        assert_eq!(succeeded, 14);
        let account = ledger.get_account(&UserId::from("u1")).await.unwrap();
        assert_eq!(account.credit, 2);
    }
}
