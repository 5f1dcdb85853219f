use dashmap::mapref::one::RefMut;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::{
        game::{
            CountryGuessResponse, GridMoveResponse, GridSelectRequest, GuessResponse,
            StartGameResponse, StartStatus, StationGuessResponse,
        },
        session::{GridView, SessionView},
    },
    error::ServiceError,
    services::{leaderboard_service, session_service},
    state::{
        SharedState,
        grid::GridPuzzleState,
        session::{GameKind, PlayerSession, Round, SessionError, StartOutcome},
    },
};

/// Session behind `session_id`, refused when the caller never logged in.
fn require_session(
    state: &SharedState,
    session_id: Option<Uuid>,
) -> Result<RefMut<'_, Uuid, PlayerSession>, ServiceError> {
    let session = session_id
        .and_then(|id| state.session_mut(id))
        .ok_or_else(|| ServiceError::Unauthorized("login required".into()))?;
    if session.identity().is_none() {
        return Err(ServiceError::Unauthorized("login required".into()));
    }
    Ok(session)
}

/// Start a round of `kind`, or report that the player must go back to the menu first.
pub fn start_game(
    state: &SharedState,
    session_id: Option<Uuid>,
    kind: GameKind,
) -> Result<StartGameResponse, ServiceError> {
    let mut session = require_session(state, session_id)?;
    let outcome = session.start_game(kind, state.catalog(), &mut rand::rng())?;

    let status = match outcome {
        StartOutcome::Started => {
            info!(game = kind.as_str(), "round started");
            StartStatus::Started
        }
        StartOutcome::Wait => {
            debug!(game = kind.as_str(), "start refused while locked out");
            StartStatus::Wait
        }
    };

    Ok(StartGameResponse {
        status,
        session: session_service::render(state, &session),
    })
}

/// Score a station guess; a finished round records its result on the leaderboard.
pub async fn submit_station_guess(
    state: &SharedState,
    session_id: Option<Uuid>,
    guess: &str,
) -> Result<StationGuessResponse, ServiceError> {
    let (outcome, identity) = {
        let mut session = require_session(state, session_id)?;
        match session.submit_station_guess(&state.catalog().stations, guess) {
            Ok(outcome) => (outcome, session.identity().cloned()),
            Err(SessionError::AlreadyTerminal) => {
                return Ok(GuessResponse::already_over(session.streak()));
            }
            Err(err) => return Err(err.into()),
        }
    };

    let saved =
        leaderboard_service::record_optional(state, identity.as_ref(), outcome.score).await;
    Ok(GuessResponse::from_outcome(outcome, saved))
}

/// Score a country guess on the running photo round.
pub async fn submit_country_guess(
    state: &SharedState,
    session_id: Option<Uuid>,
    guess: &str,
) -> Result<CountryGuessResponse, ServiceError> {
    let (outcome, identity) = {
        let mut session = require_session(state, session_id)?;
        match session.submit_country_guess(&state.catalog().nations, guess) {
            Ok(outcome) => (outcome, session.identity().cloned()),
            Err(SessionError::AlreadyTerminal) => {
                return Ok(GuessResponse::already_over(session.streak()));
            }
            Err(err) => return Err(err.into()),
        }
    };

    let saved =
        leaderboard_service::record_optional(state, identity.as_ref(), outcome.score).await;
    Ok(GuessResponse::from_outcome(outcome, saved))
}

/// Place a country on the grid; every solved or lost problem is recorded.
pub async fn select_grid_cell(
    state: &SharedState,
    session_id: Option<Uuid>,
    request: &GridSelectRequest,
) -> Result<GridMoveResponse, ServiceError> {
    let problems = &state.catalog().grid_problems;
    let (outcome, identity, grid) = {
        let mut session = require_session(state, session_id)?;
        let outcome = match session.select_grid_cell(
            &state.catalog().nations,
            problems,
            request.row,
            request.col,
            &request.nation,
        ) {
            Ok(outcome) => outcome,
            Err(SessionError::AlreadyTerminal) => return Ok(GridMoveResponse::already_over()),
            Err(err) => return Err(err.into()),
        };
        let Some(Round::Grid(puzzle)) = session.round() else {
            return Err(SessionError::NotInGame(GameKind::CountryGrid).into());
        };
        let grid = grid_view(state, puzzle);
        (outcome, session.identity().cloned(), grid)
    };

    let saved =
        leaderboard_service::record_optional(state, identity.as_ref(), outcome.score).await;
    Ok(GridMoveResponse::new(
        outcome.placement,
        grid,
        outcome.outcome,
        outcome.next_problem,
        saved,
    ))
}

/// Empty the running grid, keeping its error count.
pub fn reset_grid(state: &SharedState, session_id: Option<Uuid>) -> Result<GridView, ServiceError> {
    let mut session = require_session(state, session_id)?;
    let puzzle = session.reset_grid()?;
    Ok(grid_view(state, puzzle))
}

/// Leave the current game and go back to the menu.
pub fn end_game(state: &SharedState, session_id: Option<Uuid>) -> Result<SessionView, ServiceError> {
    let mut session = require_session(state, session_id)?;
    session.end_game()?;
    Ok(session_service::render(state, &session))
}

fn grid_view(state: &SharedState, puzzle: &GridPuzzleState) -> GridView {
    GridView::new(
        puzzle,
        state.catalog().grid_problems.get(puzzle.problem_index()),
    )
}
