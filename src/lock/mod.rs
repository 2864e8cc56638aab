//! Distributed job locks.
//!
//! Every run of a job first takes the job's lock so that only one worker in
//! the fleet executes a given due time. Two backends are available:
//! - Memory (single process, also used by tests)
//! - Redis (shared across workers, lease-based)
//!
//! # Configuration
//!
//! ```toml
//! [lock]
//! backend = "redis"  # or "memory"
//! lease_ms = 5000
//!
//! [lock.redis]
//! url = "redis://127.0.0.1:6379"
//! pool_size = 4
//! connection_timeout = 5
//! key_prefix = "fleetcron"
//! ```

mod guard;
mod memory;
mod redis;
mod traits;

use std::sync::Arc;

pub use guard::ScopedLock;
pub use memory::MemoryLockManager;
pub use self::redis::RedisLockManager;
pub use traits::{JobLock, LockManager};

pub use crate::config::settings::{LockBackend, LockConfig, RedisLockConfig};
use crate::jobs::JobError;

/// Build the lock manager selected by `config.backend`.
pub async fn build_lock_manager(config: &LockConfig) -> Result<Arc<dyn LockManager>, JobError> {
    let manager: Arc<dyn LockManager> = match config.backend {
        LockBackend::Memory => Arc::new(MemoryLockManager::new()),
        LockBackend::Redis => Arc::new(RedisLockManager::new(config).await?),
    };
    Ok(manager)
}
