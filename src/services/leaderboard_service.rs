use tracing::info;

use crate::{
    dto::leaderboard::LeaderboardResponse,
    state::{
        SharedState,
        leaderboard::now_timestamp,
        session::{PlayerIdentity, ScoreUpdate},
    },
};

/// Apply one finished round to the leaderboard and persist it.
///
/// Returns whether the write reached the store; the in-memory board is updated either way.
pub async fn record_score(
    state: &SharedState,
    identity: &PlayerIdentity,
    update: ScoreUpdate,
) -> bool {
    let mut board = state.leaderboard().lock().await;
    board.add_score(
        &identity.class,
        &identity.name,
        update.module,
        update.success,
        update.attempts,
        now_timestamp(),
    );
    info!(
        class = %identity.class,
        name = %identity.name,
        module = %update.module,
        success = update.success,
        attempts = update.attempts,
        "round recorded"
    );
    state.persist_leaderboard(&board).await
}

/// Record `update` when present, for callers holding an optional identity.
pub async fn record_optional(
    state: &SharedState,
    identity: Option<&PlayerIdentity>,
    update: Option<ScoreUpdate>,
) -> Option<bool> {
    match (identity, update) {
        (Some(identity), Some(update)) => Some(record_score(state, identity, update).await),
        _ => None,
    }
}

/// Return one 1-indexed page of the ranking.
pub async fn get_page(state: &SharedState, page: Option<usize>) -> LeaderboardResponse {
    let board = state.leaderboard().lock().await;
    board.page(page.unwrap_or(1)).into()
}
