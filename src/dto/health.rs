use serde::Serialize;
use utoipa::ToSchema;

/// Body of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the leaderboard store or a reference table is unavailable.
    pub status: String,
    /// Reference tables that could not be loaded.
    pub missing_tables: Vec<String>,
    /// Player sessions currently held in memory.
    pub active_sessions: usize,
}

impl HealthResponse {
    pub fn ok(active_sessions: usize) -> Self {
        Self {
            status: "ok".into(),
            missing_tables: Vec::new(),
            active_sessions,
        }
    }

    pub fn degraded(missing_tables: Vec<String>, active_sessions: usize) -> Self {
        Self {
            status: "degraded".into(),
            missing_tables,
            active_sessions,
        }
    }
}
