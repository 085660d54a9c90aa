//! Optional per-namespace serialization of descriptor updates.
//!
//! In [`LockingMode::Namespace`] a request holds its namespace's lock from
//! descriptor load until the delivery body has finished and the ledger has
//! saved, so a limited password can never be spent twice. In
//! [`LockingMode::None`] no lock is taken.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::LockingMode;

/// Guard held for the duration of one locked request.
pub type NamespaceGuard = OwnedMutexGuard<()>;

/// Lazily created async mutexes keyed by namespace root.
#[derive(Debug, Default)]
pub struct NamespaceLocks {
    mode: LockingMode,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl NamespaceLocks {
    pub fn new(mode: LockingMode) -> Self {
        Self {
            mode,
            locks: DashMap::new(),
        }
    }

    pub fn mode(&self) -> LockingMode {
        self.mode
    }

    /// Acquires the lock for `root`, or returns `None` when locking is off.
    pub async fn acquire(&self, root: &Path) -> Option<NamespaceGuard> {
        if self.mode == LockingMode::None {
            return None;
        }

        let lock = self
            .locks
            .entry(root.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        Some(lock.lock_owned().await)
    }
}
