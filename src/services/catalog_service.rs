use crate::{
    dto::catalog::{NationNamesResponse, StationDetail, StationNamesResponse},
    error::ServiceError,
    state::SharedState,
};

/// Every station name in sorted order.
pub fn station_names(state: &SharedState) -> StationNamesResponse {
    StationNamesResponse {
        stations: state
            .catalog()
            .stations
            .names()
            .map(str::to_owned)
            .collect(),
    }
}

/// Public attributes of one station.
pub fn station_detail(state: &SharedState, name: &str) -> Result<StationDetail, ServiceError> {
    state
        .catalog()
        .stations
        .lookup(name.trim())
        .map(StationDetail::from)
        .ok_or_else(|| ServiceError::NotFound(format!("station `{name}`")))
}

/// Every accepted country name.
pub fn nation_names(state: &SharedState) -> NationNamesResponse {
    NationNamesResponse {
        names: state.catalog().nations.all_names(),
    }
}
