use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::catalog::{NationNamesResponse, StationDetail, StationNamesResponse},
    error::AppError,
    services::catalog_service,
    state::SharedState,
};

/// Read-only reference data for pickers.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/stations", get(list_stations))
        .route("/stations/{name}", get(get_station))
        .route("/nations/names", get(list_nation_names))
}

#[utoipa::path(
    get,
    path = "/stations",
    tag = "catalog",
    responses((status = 200, description = "Every station name", body = StationNamesResponse))
)]
/// List every station name.
pub async fn list_stations(State(state): State<SharedState>) -> Json<StationNamesResponse> {
    Json(catalog_service::station_names(&state))
}

#[utoipa::path(
    get,
    path = "/stations/{name}",
    tag = "catalog",
    params(("name" = String, Path, description = "Exact station name")),
    responses(
        (status = 200, description = "Station attributes", body = StationDetail),
        (status = 404, description = "Unknown station")
    )
)]
/// Return the public attributes of one station.
pub async fn get_station(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<StationDetail>, AppError> {
    let detail = catalog_service::station_detail(&state, &name)?;
    Ok(Json(detail))
}

#[utoipa::path(
    get,
    path = "/nations/names",
    tag = "catalog",
    responses((status = 200, description = "Every accepted country name", body = NationNamesResponse))
)]
/// List every accepted country name, in all scripts.
pub async fn list_nation_names(State(state): State<SharedState>) -> Json<NationNamesResponse> {
    Json(catalog_service::nation_names(&state))
}
