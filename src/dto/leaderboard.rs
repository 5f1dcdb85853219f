use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::state::leaderboard::{LeaderboardPage, RankedEntry};

/// Query parameters of `GET /leaderboard`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaderboardQuery {
    /// 1-indexed page, defaults to the first one.
    pub page: Option<usize>,
}

/// Counters of one module.
#[derive(Debug, Serialize, ToSchema, Clone, Copy)]
pub struct ModuleScoreDto {
    pub passed: u32,
    pub attempts: u32,
}

/// One ranked player.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub class: String,
    pub name: String,
    pub passed: u32,
    /// Attempts per passed metro or photo round; `0` when none was passed.
    pub average_attempts: f64,
    pub modules: IndexMap<String, ModuleScoreDto>,
    pub updated_at: String,
}

impl From<&RankedEntry<'_>> for LeaderboardRow {
    fn from(ranked: &RankedEntry<'_>) -> Self {
        Self {
            rank: ranked.rank,
            class: ranked.entry.class.clone(),
            name: ranked.entry.name.clone(),
            passed: ranked.standing.passed,
            average_attempts: (ranked.standing.average_attempts * 100.0).round() / 100.0,
            modules: ranked
                .entry
                .scores
                .iter()
                .map(|(module, score)| {
                    (
                        module.key(),
                        ModuleScoreDto {
                            passed: score.passed,
                            attempts: score.attempts,
                        },
                    )
                })
                .collect(),
            updated_at: ranked.entry.timestamp.clone(),
        }
    }
}

/// One page of the leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub page: usize,
    pub total_pages: usize,
    pub total_entries: usize,
    pub entries: Vec<LeaderboardRow>,
}

impl From<LeaderboardPage<'_>> for LeaderboardResponse {
    fn from(page: LeaderboardPage<'_>) -> Self {
        Self {
            page: page.page,
            total_pages: page.total_pages,
            total_entries: page.total_entries,
            entries: page.entries.iter().map(LeaderboardRow::from).collect(),
        }
    }
}
