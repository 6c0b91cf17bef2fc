//! Redis ledger store adapter.
//!
//! Records live under `user:{id}` as a decimal credit string, so `INCRBY`
//! can update them server-side. Balance changes go through a Lua script that
//! performs the existence check, the floor check and the increment as one
//! atomic step.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{
    AsyncCommands, Client, ConnectionAddr, ConnectionInfo, IntoConnectionInfo,
    RedisConnectionInfo, Script,
};

use payment_types::{CreditAdjustment, LedgerStore, StoreError, UserAccount, UserId};

use crate::codec;

const KEY_PREFIX: &str = "user:";
const SCAN_COUNT: usize = 500;
const WRITE_CHUNK: usize = 1_000;

/// Returns `{status, value}`:
/// `{0, "0"}` missing, `{-1, balance}` floor violated, `{-2, "0"}` malformed,
/// `{-3, "0"}` overflow, `{1, new_balance}` applied.
///
/// Balances travel as strings and the floor is checked on the `INCRBY`
/// reply, so no arithmetic happens in Lua numbers. A negative result is
/// rolled back to the exact previous value.
const ADJUST_CREDIT_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
if not current then
  return {0, '0'}
end
if not string.match(current, '^%-?%d+$') then
  return {-2, '0'}
end
local updated = redis.pcall('INCRBY', KEYS[1], ARGV[1])
if type(updated) == 'table' and updated.err then
  return {-3, '0'}
end
if updated < 0 then
  redis.call('SET', KEYS[1], current)
  return {-1, current}
end
return {1, redis.call('GET', KEYS[1])}
";

/// Where the ledger's Redis lives.
///
/// Turned into a [`ConnectionInfo`] field by field, so a password is used
/// verbatim and never has to survive URL parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisEndpoint {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
}

impl RedisEndpoint {
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                password: self.password.clone(),
                ..RedisConnectionInfo::default()
            },
        }
    }
}

/// Redis repository implementation.
///
/// Holds one multiplexed connection, opened once and cloned per call.
#[derive(Clone)]
pub struct RedisLedgerStore {
    conn: ConnectionManager,
    adjust_credit: Script,
}

impl RedisLedgerStore {
    /// Connects to Redis.
    ///
    /// Accepts a [`RedisEndpoint::connection_info`] or a
    /// `redis://[:password@]host[:port][/database]` URL.
    ///
    /// Fails immediately when the server is unreachable; the store is a hard
    /// startup dependency.
    pub async fn connect(target: impl IntoConnectionInfo) -> Result<Self, StoreError> {
        let client = Client::open(target)
            .map_err(|e| StoreError::Connection(format!("Invalid Redis connection info: {e}")))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to Redis: {e}")))?;

        tracing::info!("Redis ledger store connected");

        Ok(Self::from_manager(conn))
    }

    /// Wraps an existing connection manager.
    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self {
            conn,
            adjust_credit: Script::new(ADJUST_CREDIT_SCRIPT),
        }
    }

    fn user_key(id: &UserId) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    async fn scan_user_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{KEY_PREFIX}*");
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(store_error)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }
}

fn store_error(err: redis::RedisError) -> StoreError {
    StoreError::Connection(err.to_string())
}

#[async_trait]
impl LedgerStore for RedisLedgerStore {
    async fn get(&self, id: &UserId) -> Result<Option<UserAccount>, StoreError> {
        let mut conn = self.conn.clone();
        let key = Self::user_key(id);

        let raw: Option<Vec<u8>> = conn.get(&key).await.map_err(store_error)?;

        raw.map(|bytes| {
            codec::decode(&key, &bytes).map(|credit| UserAccount {
                id: id.clone(),
                credit,
            })
        })
        .transpose()
    }

    async fn set(&self, account: &UserAccount) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(Self::user_key(&account.id), codec::encode(account.credit))
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn set_many(&self, accounts: &[UserAccount]) -> Result<(), StoreError> {
        if accounts.is_empty() {
            return Ok(());
        }

        let pairs: Vec<(String, String)> = accounts
            .iter()
            .map(|a| (Self::user_key(&a.id), codec::encode(a.credit)))
            .collect();

        let mut pipe = redis::pipe();
        for chunk in pairs.chunks(WRITE_CHUNK) {
            pipe.mset(chunk).ignore();
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await.map_err(store_error)?;

        tracing::debug!(count = accounts.len(), "Batch-wrote user records");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UserAccount>, StoreError> {
        let keys = self.scan_user_keys().await?;
        let mut conn = self.conn.clone();
        let mut accounts = Vec::with_capacity(keys.len());

        for chunk in keys.chunks(WRITE_CHUNK) {
            let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
                .arg(chunk)
                .query_async(&mut conn)
                .await
                .map_err(store_error)?;

            for (key, value) in chunk.iter().zip(values) {
                // Key can disappear between SCAN and MGET.
                let Some(bytes) = value else { continue };
                let id = key.strip_prefix(KEY_PREFIX).unwrap_or(key);
                accounts.push(UserAccount {
                    id: UserId::from(id),
                    credit: codec::decode(key, &bytes)?,
                });
            }
        }

        Ok(accounts)
    }

    async fn adjust_credit(
        &self,
        id: &UserId,
        delta: i64,
    ) -> Result<CreditAdjustment, StoreError> {
        let mut conn = self.conn.clone();
        let key = Self::user_key(id);

        let (status, value): (i64, i64) = self
            .adjust_credit
            .key(&key)
            .arg(delta)
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;

        match status {
            0 => Ok(CreditAdjustment::NotFound),
            -1 => Ok(CreditAdjustment::WouldGoNegative { available: value }),
            -2 => Err(StoreError::Decode {
                key,
                reason: "expected an integer credit".to_string(),
            }),
            -3 => Ok(CreditAdjustment::Overflow),
            _ => Ok(CreditAdjustment::Applied { credit: value }),
        }
    }
}
