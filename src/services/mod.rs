/// Station and nation lookups for pickers.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Round lifecycle: start, guesses, grid moves and leaving a game.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Score recording and ranking pages.
pub mod leaderboard_service;
/// Identity registration and session rendering.
pub mod session_service;
