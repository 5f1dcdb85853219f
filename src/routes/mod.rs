use axum::Router;

use crate::state::SharedState;

pub mod catalog;
pub mod docs;
pub mod game;
pub mod health;
pub mod leaderboard;
pub mod session;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(session::router())
        .merge(game::router())
        .merge(leaderboard::router())
        .merge(catalog::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
