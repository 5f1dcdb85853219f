use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{
        session::{GridView, SessionView},
        validation::validate_not_blank,
    },
    state::{
        grid::{PlacementOutcome, PlacementRejection},
        scoring::{CountryComparison, StationComparison},
        session::{GuessOutcome, RoundOutcome},
    },
};

/// Whether a start request opened a round.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StartStatus {
    Started,
    /// The game was lost just before; return to the menu first.
    Wait,
}

/// Response of `POST /games/{kind}/start`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartGameResponse {
    pub status: StartStatus,
    pub session: SessionView,
}

/// A free-text guess (station name or country name in any supported script).
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GuessRequest {
    #[validate(length(max = 128), custom(function = "validate_not_blank"))]
    pub guess: String,
}

/// Result of a station or country guess.
#[derive(Debug, Serialize, ToSchema)]
pub struct GuessResponse<T> {
    /// Feedback on the guess, absent when the round was already over.
    pub result: Option<T>,
    pub attempts_left: u32,
    pub game_over: bool,
    /// Set once the round is over.
    pub outcome: Option<RoundOutcome>,
    /// Secret answer, only revealed after a loss.
    pub answer: Option<String>,
    pub streak: u32,
    /// Present when the round ended: whether the leaderboard write succeeded.
    pub leaderboard_saved: Option<bool>,
}

impl<T> GuessResponse<T> {
    /// Build from a session outcome and the result of the leaderboard write.
    pub fn from_outcome(outcome: GuessOutcome<T>, leaderboard_saved: Option<bool>) -> Self {
        Self {
            result: Some(outcome.comparison),
            attempts_left: outcome.attempts_left,
            game_over: outcome.outcome.is_some(),
            outcome: outcome.outcome,
            answer: outcome.revealed_answer,
            streak: outcome.streak,
            leaderboard_saved,
        }
    }

    /// No-op answer for a guess sent after the round ended.
    pub fn already_over(streak: u32) -> Self {
        Self {
            result: None,
            attempts_left: 0,
            game_over: true,
            outcome: None,
            answer: None,
            streak,
            leaderboard_saved: None,
        }
    }
}

/// Placement request for the country grid.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GridSelectRequest {
    #[validate(range(max = 2))]
    pub row: usize,
    #[validate(range(max = 2))]
    pub col: usize,
    #[validate(length(max = 128), custom(function = "validate_not_blank"))]
    pub nation: String,
}

/// Result of a grid placement.
#[derive(Debug, Serialize, ToSchema)]
pub struct GridMoveResponse {
    pub accepted: bool,
    pub rejection: Option<PlacementRejection>,
    /// Player-facing explanation of a rejection.
    pub message: Option<String>,
    /// Current board; after a solved problem this is the next, empty, problem.
    pub grid: Option<GridView>,
    pub solved: bool,
    pub game_over: bool,
    pub outcome: Option<RoundOutcome>,
    /// Index of the problem loaded after a solve.
    pub next_problem: Option<usize>,
    pub leaderboard_saved: Option<bool>,
}

impl GridMoveResponse {
    pub fn new(
        placement: PlacementOutcome,
        grid: GridView,
        outcome: Option<RoundOutcome>,
        next_problem: Option<usize>,
        leaderboard_saved: Option<bool>,
    ) -> Self {
        let rejection = match placement {
            PlacementOutcome::Rejected { reason, .. } => Some(reason),
            PlacementOutcome::Placed | PlacementOutcome::Solved => None,
        };
        Self {
            accepted: rejection.is_none(),
            rejection,
            message: rejection.map(|reason| reason.message().to_owned()),
            grid: Some(grid),
            solved: placement == PlacementOutcome::Solved,
            game_over: outcome.is_some(),
            outcome,
            next_problem,
            leaderboard_saved,
        }
    }

    /// No-op answer for a placement sent after the grid game ended.
    pub fn already_over() -> Self {
        Self {
            accepted: false,
            rejection: None,
            message: None,
            grid: None,
            solved: false,
            game_over: true,
            outcome: None,
            next_problem: None,
            leaderboard_saved: None,
        }
    }
}

/// Response of `POST /games/metro/guess`.
pub type StationGuessResponse = GuessResponse<StationComparison>;
/// Response of `POST /games/photo/guess`.
pub type CountryGuessResponse = GuessResponse<CountryComparison>;
