//! In-process lock backend for single-node deployments and tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::jobs::{JobError, JobResult};
use crate::lock::{JobLock, LockManager};

type Holders = Arc<DashMap<String, Uuid>>;

/// Lock manager whose holders live in a shared map.
#[derive(Clone, Default)]
pub struct MemoryLockManager {
    holders: Holders,
}

impl MemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any handle currently holds the lock for `job_name`.
    pub fn is_locked(&self, job_name: &str) -> bool {
        self.holders.contains_key(job_name)
    }
}

impl LockManager for MemoryLockManager {
    fn acquire_handle(&self, job_name: &str) -> Arc<dyn JobLock> {
        Arc::new(MemoryLock {
            holders: Arc::clone(&self.holders),
            job_name: job_name.to_string(),
            token: Uuid::new_v4(),
            held: AtomicBool::new(false),
        })
    }
}

struct MemoryLock {
    holders: Holders,
    job_name: String,
    token: Uuid,
    held: AtomicBool,
}

#[async_trait]
impl JobLock for MemoryLock {
    async fn try_lock(&self) -> JobResult<()> {
        match self.holders.entry(self.job_name.clone()) {
            Entry::Occupied(_) => Err(JobError::LockAlreadyHeld(self.job_name.clone())),
            Entry::Vacant(slot) => {
                slot.insert(self.token);
                self.held.store(true, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn unlock(&self) {
        if self.held.swap(false, Ordering::SeqCst) {
            self.holders
                .remove_if(&self.job_name, |_, holder| *holder == self.token);
        }
    }
}
