use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::dao::{
    leaderboard_store::LeaderboardStore,
    models::LeaderboardTableEntity,
    storage::{StorageError, StorageResult},
};

/// Leaderboard held in memory; reads, writes or both can be told to fail.
#[derive(Clone, Default)]
pub struct MemoryLeaderboardStore {
    table: Arc<Mutex<LeaderboardTableEntity>>,
    failing_loads: Arc<AtomicBool>,
    failing_saves: Arc<AtomicBool>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryLeaderboardStore {
    pub fn new(modules: Vec<String>) -> Self {
        Self {
            table: Arc::new(Mutex::new(LeaderboardTableEntity {
                modules,
                rows: Vec::new(),
            })),
            ..Self::default()
        }
    }

    /// Make every following operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.set_failing_loads(failing);
        self.set_failing_saves(failing);
        self.unreachable.store(failing, Ordering::SeqCst);
    }

    /// Fail loads only.
    pub fn set_failing_loads(&self, failing: bool) {
        self.failing_loads.store(failing, Ordering::SeqCst);
    }

    /// Fail saves only; health checks keep succeeding.
    pub fn set_failing_saves(&self, failing: bool) {
        self.failing_saves.store(failing, Ordering::SeqCst);
    }

    /// Copy of the last saved table.
    pub async fn snapshot(&self) -> LeaderboardTableEntity {
        self.table.lock().await.clone()
    }

    fn check(flag: &AtomicBool, what: &str) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                format!("memory store set to fail {what}"),
                std::io::Error::other("simulated failure"),
            ));
        }
        Ok(())
    }
}

impl LeaderboardStore for MemoryLeaderboardStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<LeaderboardTableEntity>> {
        let store = self.clone();
        Box::pin(async move {
            Self::check(&store.failing_loads, "loads")?;
            Ok(store.table.lock().await.clone())
        })
    }

    fn save(&self, table: LeaderboardTableEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            Self::check(&store.failing_saves, "saves")?;
            *store.table.lock().await = table;
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Self::check(&store.unreachable, "health checks") })
    }
}
