use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the GeoQuiz backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::login,
        crate::routes::session::get_session,
        crate::routes::game::start_game,
        crate::routes::game::metro_guess,
        crate::routes::game::photo_guess,
        crate::routes::game::grid_select,
        crate::routes::game::grid_reset,
        crate::routes::game::end_game,
        crate::routes::leaderboard::get_leaderboard,
        crate::routes::catalog::list_stations,
        crate::routes::catalog::get_station,
        crate::routes::catalog::list_nation_names,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::LoginRequest,
            crate::dto::session::SessionView,
            crate::dto::session::RoundView,
            crate::dto::session::GridView,
            crate::dto::phase::VisiblePhase,
            crate::dto::game::StartGameResponse,
            crate::dto::game::StartStatus,
            crate::dto::game::GuessRequest,
            crate::dto::game::GridSelectRequest,
            crate::dto::game::GridMoveResponse,
            crate::dto::leaderboard::LeaderboardResponse,
            crate::dto::leaderboard::LeaderboardRow,
            crate::dto::leaderboard::ModuleScoreDto,
            crate::dto::catalog::StationNamesResponse,
            crate::dto::catalog::StationDetail,
            crate::dto::catalog::NationNamesResponse,
            crate::state::session::GameKind,
            crate::state::session::RoundOutcome,
            crate::state::scoring::StationComparison,
            crate::state::scoring::CountryComparison,
            crate::state::grid::PlacementRejection,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Player identity and session state"),
        (name = "game", description = "Metro guess, photo guess and country grid rounds"),
        (name = "leaderboard", description = "Per-player ranking"),
        (name = "catalog", description = "Reference data for pickers"),
    )
)]
pub struct ApiDoc;
