use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_extra::extract::CookieJar;
use validator::Validate;

use crate::{
    dto::{
        game::{
            CountryGuessResponse, GridMoveResponse, GridSelectRequest, GuessRequest,
            StartGameResponse, StationGuessResponse,
        },
        session::{GridView, SessionView},
    },
    error::AppError,
    routes::session::session_id,
    services::game_service,
    state::{SharedState, session::GameKind},
};

/// Round lifecycle routes for the three mini-games.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{kind}/start", post(start_game))
        .route("/games/metro/guess", post(metro_guess))
        .route("/games/photo/guess", post(photo_guess))
        .route("/games/grid/select", post(grid_select))
        .route("/games/grid/reset", post(grid_reset))
        .route("/games/end", post(end_game))
}

#[utoipa::path(
    post,
    path = "/games/{kind}/start",
    tag = "game",
    params(("kind" = GameKind, Path, description = "metro_guess, country_photo or country_grid")),
    responses(
        (status = 200, description = "Round started, or `wait` after a loss", body = StartGameResponse),
        (status = 401, description = "Not logged in"),
        (status = 409, description = "A round is already running or every grid problem is solved"),
        (status = 503, description = "Reference data unavailable")
    )
)]
/// Start a round of the given game.
pub async fn start_game(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(kind): Path<GameKind>,
) -> Result<Json<StartGameResponse>, AppError> {
    let payload = game_service::start_game(&state, session_id(&jar), kind)?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/games/metro/guess",
    tag = "game",
    request_body = GuessRequest,
    responses(
        (status = 200, description = "Guess feedback", body = StationGuessResponse),
        (status = 404, description = "Unknown station"),
        (status = 409, description = "No metro round running")
    )
)]
/// Guess the secret station.
pub async fn metro_guess(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(payload): Json<GuessRequest>,
) -> Result<Json<StationGuessResponse>, AppError> {
    payload.validate()?;
    let response =
        game_service::submit_station_guess(&state, session_id(&jar), &payload.guess).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/games/photo/guess",
    tag = "game",
    request_body = GuessRequest,
    responses(
        (status = 200, description = "Guess feedback", body = CountryGuessResponse),
        (status = 404, description = "Unknown country"),
        (status = 409, description = "No photo round running")
    )
)]
/// Guess the country the photo was taken in.
pub async fn photo_guess(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(payload): Json<GuessRequest>,
) -> Result<Json<CountryGuessResponse>, AppError> {
    payload.validate()?;
    let response =
        game_service::submit_country_guess(&state, session_id(&jar), &payload.guess).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/games/grid/select",
    tag = "game",
    request_body = GridSelectRequest,
    responses(
        (status = 200, description = "Placement accepted or rejected", body = GridMoveResponse),
        (status = 400, description = "Cell outside the grid"),
        (status = 404, description = "Unknown country")
    )
)]
/// Place a country in a grid cell.
pub async fn grid_select(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(payload): Json<GridSelectRequest>,
) -> Result<Json<GridMoveResponse>, AppError> {
    payload.validate()?;
    let response = game_service::select_grid_cell(&state, session_id(&jar), &payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/games/grid/reset",
    tag = "game",
    responses((status = 200, description = "Grid emptied, errors kept", body = GridView))
)]
/// Empty every cell of the running grid.
pub async fn grid_reset(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Json<GridView>, AppError> {
    let grid = game_service::reset_grid(&state, session_id(&jar))?;
    Ok(Json(grid))
}

#[utoipa::path(
    post,
    path = "/games/end",
    tag = "game",
    responses((status = 200, description = "Back on the menu", body = SessionView))
)]
/// Leave the current game; also clears a pending lockout.
pub async fn end_game(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Json<SessionView>, AppError> {
    let session = game_service::end_game(&state, session_id(&jar))?;
    Ok(Json(session))
}
