use serde::Serialize;
use utoipa::ToSchema;

use crate::state::directory::Station;

/// Every station name, sorted, for pickers.
#[derive(Debug, Serialize, ToSchema)]
pub struct StationNamesResponse {
    pub stations: Vec<String>,
}

/// Public attributes of one station.
#[derive(Debug, Serialize, ToSchema)]
pub struct StationDetail {
    pub name: String,
    pub district: String,
    pub lines: Vec<String>,
    /// `0` when unknown.
    pub opening_year: u32,
}

impl From<&Station> for StationDetail {
    fn from(station: &Station) -> Self {
        Self {
            name: station.name.clone(),
            district: station.district.clone(),
            lines: station.lines.iter().cloned().collect(),
            opening_year: station.opening_year,
        }
    }
}

/// Every accepted country name in any script, sorted and deduplicated.
#[derive(Debug, Serialize, ToSchema)]
pub struct NationNamesResponse {
    pub names: Vec<String>,
}
