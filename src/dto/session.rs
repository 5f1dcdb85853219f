use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{phase::VisiblePhase, validation::validate_not_blank},
    state::{
        catalog::GridProblem,
        grid::GridPuzzleState,
        scoring::{CountryComparison, StationComparison},
        session::{GameKind, PlayerSession, Round, RoundOutcome, SessionPhase},
    },
};

/// Identity registration payload.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[serde(alias = "class_name")]
    #[validate(length(max = 64), custom(function = "validate_not_blank"))]
    pub class: String,
    #[serde(alias = "student_name")]
    #[validate(length(max = 64), custom(function = "validate_not_blank"))]
    pub name: String,
}

/// Board state of the running grid problem.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq)]
pub struct GridView {
    /// 0-based index of the problem in the problem list.
    pub problem_index: usize,
    pub problem_id: Option<u32>,
    pub title: Option<String>,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// Canonical names, `null` for empty cells, indexed `[row][col]`.
    pub cells: Vec<Vec<Option<String>>>,
    pub errors: u32,
    /// `null` when errors are unlimited.
    pub errors_left: Option<u32>,
}

impl GridView {
    pub fn new(puzzle: &GridPuzzleState, problem: Option<&GridProblem>) -> Self {
        Self {
            problem_index: puzzle.problem_index(),
            problem_id: problem.map(|problem| problem.id),
            title: problem.map(|problem| problem.title.clone()),
            rows: problem.map(|problem| problem.rows.to_vec()).unwrap_or_default(),
            columns: problem
                .map(|problem| problem.columns.to_vec())
                .unwrap_or_default(),
            cells: puzzle.cells().iter().map(|row| row.to_vec()).collect(),
            errors: puzzle.errors(),
            errors_left: puzzle.errors_left(),
        }
    }
}

/// The current round, tagged by game.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum RoundView {
    MetroGuess {
        guesses: Vec<StationComparison>,
        attempts_left: u32,
    },
    CountryPhoto {
        problem_id: u32,
        image: String,
        guesses: Vec<CountryComparison>,
        attempts_left: u32,
    },
    CountryGrid(GridView),
}

/// Everything a client needs to render a session.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq)]
pub struct SessionView {
    pub logged_in: bool,
    pub class: Option<String>,
    pub name: Option<String>,
    pub phase: VisiblePhase,
    /// Game the phase refers to, absent in `idle` and `menu`.
    pub game: Option<GameKind>,
    /// Set in the `over` phase.
    pub outcome: Option<RoundOutcome>,
    pub streak: u32,
    pub locked_out: Vec<GameKind>,
    pub round: Option<RoundView>,
}

impl SessionView {
    /// Render `session`; grid titles and criteria come from `grid_problems`.
    pub fn new(session: &PlayerSession, grid_problems: &[GridProblem], max_attempts: u32) -> Self {
        let phase = session.phase();
        let (game, outcome) = match phase {
            SessionPhase::Idle | SessionPhase::Menu => (None, None),
            SessionPhase::InProgress(kind) | SessionPhase::LockedOut(kind) => (Some(kind), None),
            SessionPhase::Over { kind, outcome } => (Some(kind), Some(outcome)),
        };
        let identity = session.identity();

        Self {
            logged_in: identity.is_some(),
            class: identity.map(|identity| identity.class.clone()),
            name: identity.map(|identity| identity.name.clone()),
            phase: phase.into(),
            game,
            outcome,
            streak: session.streak(),
            locked_out: session.lockouts().collect(),
            round: session
                .round()
                .map(|round| round_view(round, grid_problems, max_attempts)),
        }
    }
}

fn round_view(round: &Round, grid_problems: &[GridProblem], max_attempts: u32) -> RoundView {
    match round {
        Round::Metro(metro) => RoundView::MetroGuess {
            guesses: metro.guesses().to_vec(),
            attempts_left: max_attempts.saturating_sub(metro.guesses().len() as u32),
        },
        Round::Photo(photo) => RoundView::CountryPhoto {
            problem_id: photo.problem().id,
            image: photo.problem().image.clone(),
            guesses: photo.guesses().to_vec(),
            attempts_left: max_attempts.saturating_sub(photo.guesses().len() as u32),
        },
        Round::Grid(puzzle) => RoundView::CountryGrid(GridView::new(
            puzzle,
            grid_problems.get(puzzle.problem_index()),
        )),
    }
}
