use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the leaderboard store is writable and every reference table loaded.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if !state.probe_store().await {
        warn!("leaderboard store unavailable (degraded mode)");
    }

    let missing: Vec<String> = state
        .catalog()
        .missing_tables()
        .into_iter()
        .map(str::to_owned)
        .collect();
    if !missing.is_empty() {
        warn!(tables = ?missing, "reference tables missing");
    }

    let sessions = state.session_count();
    if state.is_degraded() || !missing.is_empty() {
        HealthResponse::degraded(missing, sessions)
    } else {
        HealthResponse::ok(sessions)
    }
}
