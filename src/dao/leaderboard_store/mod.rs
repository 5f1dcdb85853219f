/// Leaderboard persisted as a CSV file.
pub mod file;
/// In-process leaderboard, used to exercise the services without touching disk.
pub mod memory;

use crate::dao::{models::LeaderboardTableEntity, storage::StorageResult};
use futures::future::BoxFuture;

/// Abstraction over where the leaderboard table is kept.
pub trait LeaderboardStore: Send + Sync {
    /// Read the whole table; a missing table is created empty.
    fn load(&self) -> BoxFuture<'static, StorageResult<LeaderboardTableEntity>>;
    /// Replace the whole table.
    fn save(&self, table: LeaderboardTableEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Check the backing medium is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
