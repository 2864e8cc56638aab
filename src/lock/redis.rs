//! Redis lease lock using a bb8 connection pool.
//!
//! Acquisition is `SET key token NX PX lease`. While held, a keep-alive task
//! extends the lease; release and renewal only touch the key if it still
//! carries this handle's token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError, Script};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::settings::{LockConfig, RedisLockConfig};
use crate::jobs::{JobError, JobResult};
use crate::lock::{JobLock, LockManager};

type RedisPool = Pool<Client>;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const RENEW_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

/// Lock manager backed by a shared Redis instance.
#[derive(Clone)]
pub struct RedisLockManager {
    pool: RedisPool,
    key_prefix: String,
    lease: Duration,
}

impl RedisLockManager {
    pub async fn new(config: &LockConfig) -> Result<Self, JobError> {
        let pool = build_pool(&config.redis).await?;

        Ok(Self {
            pool,
            key_prefix: config.redis.key_prefix.clone(),
            lease: Duration::from_millis(config.lease_ms),
        })
    }

    fn lock_key(&self, job_name: &str) -> String {
        format!("{}:lock:{}", self.key_prefix, job_name)
    }
}

async fn build_pool(config: &RedisLockConfig) -> Result<RedisPool, JobError> {
    let client = Client::open(config.url.as_str()).map_err(|e| JobError::Lock(e.to_string()))?;

    Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(Duration::from_secs(config.connection_timeout))
        .build(client)
        .await
        .map_err(|e| JobError::Lock(e.to_string()))
}

impl LockManager for RedisLockManager {
    fn acquire_handle(&self, job_name: &str) -> Arc<dyn JobLock> {
        Arc::new(RedisLock {
            pool: self.pool.clone(),
            job_name: job_name.to_string(),
            key: self.lock_key(job_name),
            token: Uuid::new_v4().to_string(),
            lease: self.lease,
            keep_alive: Mutex::new(None),
        })
    }
}

struct RedisLock {
    pool: RedisPool,
    job_name: String,
    key: String,
    token: String,
    lease: Duration,
    /// Present while the lock is held; cancelling it stops lease renewal.
    keep_alive: Mutex<Option<CancellationToken>>,
}

impl RedisLock {
    async fn get_conn(&self) -> JobResult<PooledConnection<'_, Client>> {
        self.pool
            .get()
            .await
            .map_err(|e| JobError::Lock(e.to_string()))
    }
}

#[async_trait]
impl JobLock for RedisLock {
    async fn try_lock(&self) -> JobResult<()> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let acquired: Option<String> = redis::cmd("SET")
            .arg(&self.key)
            .arg(&self.token)
            .arg("NX")
            .arg("PX")
            .arg(lease_millis(self.lease))
            .query_async(conn_ref)
            .await
            .map_err(|e: RedisError| JobError::Lock(e.to_string()))?;

        if acquired.is_none() {
            return Err(JobError::LockAlreadyHeld(self.job_name.clone()));
        }

        let stop = CancellationToken::new();
        tokio::spawn(keep_alive(
            self.pool.clone(),
            self.key.clone(),
            self.token.clone(),
            self.lease,
            stop.clone(),
        ));
        *self.keep_alive.lock().await = Some(stop);

        Ok(())
    }

    async fn unlock(&self) {
        let Some(stop) = self.keep_alive.lock().await.take() else {
            return;
        };
        stop.cancel();

        let mut conn = match self.get_conn().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(job_name = %self.job_name, error = %e, "Failed to release lock, lease will expire");
                return;
            }
        };
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let released: Result<i64, RedisError> = Script::new(RELEASE_SCRIPT)
            .key(&self.key)
            .arg(&self.token)
            .invoke_async(conn_ref)
            .await;

        match released {
            Ok(0) => tracing::debug!(job_name = %self.job_name, "Lock lease had already expired"),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(job_name = %self.job_name, error = %e, "Failed to release lock, lease will expire")
            }
        }
    }
}

/// Renew the lease every third of its length until stopped or lost.
async fn keep_alive(
    pool: RedisPool,
    key: String,
    token: String,
    lease: Duration,
    stop: CancellationToken,
) {
    let period = (lease / 3).max(Duration::from_millis(10));

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }

        let mut conn = match pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Lock renewal failed to get connection");
                continue;
            }
        };
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let renewed: Result<i64, RedisError> = Script::new(RENEW_SCRIPT)
            .key(&key)
            .arg(&token)
            .arg(lease_millis(lease))
            .invoke_async(conn_ref)
            .await;

        match renewed {
            Ok(0) => {
                tracing::warn!(key = %key, "Lock lease lost before release");
                break;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "Lock renewal failed"),
        }
    }
}

fn lease_millis(lease: Duration) -> u64 {
    u64::try_from(lease.as_millis()).unwrap_or(u64::MAX).max(1)
}
