//! Redis adapter tests against a live server.
//!
//! Run with `REDIS_URL=redis://127.0.0.1:6379/15 cargo test -- --ignored`.
//! They write under random ids, so a shared database is safe.

#[cfg(test)]
mod tests {
    use payment_types::{CreditAdjustment, LedgerStore, StoreError, UserAccount, UserId};

    use redis::{ConnectionAddr, IntoConnectionInfo};

    use crate::{RedisEndpoint, RedisLedgerStore};

    async fn setup_store() -> RedisLedgerStore {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
        RedisLedgerStore::connect(url.as_str()).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_and_get() {
        let store = setup_store().await;
        let account = UserAccount::open(UserId::generate(), 100).unwrap();

        store.set(&account).await.unwrap();

        let fetched = store.get(&account.id).await.unwrap().unwrap();
        assert_eq!(fetched, account);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_adjust_credit_applies_and_enforces_floor() {
        let store = setup_store().await;
        let account = UserAccount::open(UserId::generate(), 100).unwrap();
        store.set(&account).await.unwrap();

        let debit = store.adjust_credit(&account.id, -30).await.unwrap();
        assert_eq!(debit, CreditAdjustment::Applied { credit: 70 });

        let overdraft = store.adjust_credit(&account.id, -71).await.unwrap();
        assert_eq!(overdraft, CreditAdjustment::WouldGoNegative { available: 70 });

        let fetched = store.get(&account.id).await.unwrap().unwrap();
        assert_eq!(fetched.credit, 70);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_floor_is_exact_above_double_precision() {
        let store = setup_store().await;
        let account = UserAccount::open(UserId::generate(), 9_007_199_254_740_992).unwrap();
        store.set(&account).await.unwrap();

        let overdraft = store
            .adjust_credit(&account.id, -9_007_199_254_740_993)
            .await
            .unwrap();
        assert_eq!(
            overdraft,
            CreditAdjustment::WouldGoNegative {
                available: 9_007_199_254_740_992
            }
        );
        let fetched = store.get(&account.id).await.unwrap().unwrap();
        assert_eq!(fetched.credit, 9_007_199_254_740_992);

        let debit = store
            .adjust_credit(&account.id, -9_007_199_254_740_991)
            .await
            .unwrap();
        assert_eq!(debit, CreditAdjustment::Applied { credit: 1 });
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_adjust_credit_overflow() {
        let store = setup_store().await;
        let account = UserAccount::open(UserId::generate(), i64::MAX - 1).unwrap();
        store.set(&account).await.unwrap();

        let result = store.adjust_credit(&account.id, 2).await.unwrap();

        assert_eq!(result, CreditAdjustment::Overflow);
        let fetched = store.get(&account.id).await.unwrap().unwrap();
        assert_eq!(fetched.credit, i64::MAX - 1);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_adjust_credit_missing_user() {
        let store = setup_store().await;
        let id = UserId::generate();

        let result = store.adjust_credit(&id, -1).await.unwrap();

        assert_eq!(result, CreditAdjustment::NotFound);
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_many_then_list() {
        let store = setup_store().await;
        let accounts: Vec<UserAccount> = (0..25)
            .map(|_| UserAccount::open(UserId::generate(), 0).unwrap())
            .collect();

        store.set_many(&accounts).await.unwrap();

        let listed = store.list().await.unwrap();
        for account in &accounts {
            assert!(listed.contains(account));
        }
    }

    #[test]
    fn test_endpoint_keeps_reserved_password_characters() {
        let endpoint = RedisEndpoint {
            host: "redis".to_string(),
            port: 6379,
            password: Some("p@ss/w#rd".to_string()),
            db: 3,
        };

        let info = endpoint.connection_info().into_connection_info().unwrap();

        assert!(matches!(&info.addr, ConnectionAddr::Tcp(host, 6379) if host == "redis"));
        assert_eq!(info.redis.password.as_deref(), Some("p@ss/w#rd"));
        assert_eq!(info.redis.db, 3);
        assert!(redis::Client::open(endpoint.connection_info()).is_ok());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_unreachable_server_fails_immediately() {
        let result = RedisLedgerStore::connect("redis://127.0.0.1:1/0").await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
