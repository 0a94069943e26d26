//! Per-game single-writer serialization.
//!
//! Every command that reads-modifies-writes a session's `GameState` runs
//! under that game's own lock, so two commands for the same game never
//! interleave their store round-trip even when they arrive on different
//! connections or different server processes racing the same key. Commands
//! for different games never contend with each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::model::GameId;

#[derive(Clone, Default)]
pub struct GameExecutor {
    locks: Arc<RwLock<HashMap<GameId, Arc<Mutex<()>>>>>,
}

impl GameExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_for(&self, id: &GameId) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(id) {
            return lock.clone();
        }
        let mut locks = self.locks.write().await;
        locks.entry(id.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Run `f` with exclusive access to `id`'s slot. `f` is only constructed
    /// once the lock is held, so any state it captures reflects a fresh read.
    pub async fn run<F, Fut, T>(&self, id: &GameId, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;
        f().await
    }

    /// Drop the lock slot for a finished/removed game so the map doesn't
    /// grow unbounded over a long-lived process.
    pub async fn forget(&self, id: &GameId) {
        self.locks.write().await.remove(id);
    }
}
