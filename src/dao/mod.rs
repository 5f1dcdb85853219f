/// Leaderboard persistence backends.
pub mod leaderboard_store;
/// On-disk record definitions.
pub mod models;
/// Reference table loaders.
pub mod reference;
/// Error types shared by the data access layer.
pub mod storage;
