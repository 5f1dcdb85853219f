use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Row of the station table; both English and Chinese column headers are accepted.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StationRecord {
    #[serde(alias = "站名")]
    pub name: String,
    #[serde(alias = "区县", default)]
    pub district: String,
    #[serde(alias = "线路1", default)]
    pub line1: Option<String>,
    #[serde(alias = "线路2", default)]
    pub line2: Option<String>,
    #[serde(alias = "线路3", default)]
    pub line3: Option<String>,
    #[serde(alias = "线路4", default)]
    pub line4: Option<String>,
    #[serde(alias = "线路5", default)]
    pub line5: Option<String>,
    /// Kept as text: some tables carry `1995.0` or blanks.
    #[serde(alias = "开通年份", default)]
    pub opening_year: Option<String>,
}

impl StationRecord {
    /// Non-blank line columns, in column order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        [
            &self.line1,
            &self.line2,
            &self.line3,
            &self.line4,
            &self.line5,
        ]
        .into_iter()
        .filter_map(|line| line.as_deref())
        .map(str::trim)
        .filter(|line| !line.is_empty())
    }

    /// Opening year, `0` when blank or not a number.
    pub fn year(&self) -> u32 {
        self.opening_year
            .as_deref()
            .map(str::trim)
            .and_then(|raw| {
                raw.parse::<u32>()
                    .ok()
                    .or_else(|| raw.parse::<f64>().ok().map(|year| year as u32))
            })
            .unwrap_or(0)
    }
}

/// Entry of the nation table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NationRecord {
    pub canonical: String,
    /// Alternative names grouped by script or language, e.g. `{"en": ["China"]}`.
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
    /// `[latitude, longitude]`.
    pub coordinates: [f64; 2],
}

/// Entry of the photo problem table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PhotoProblemRecord {
    pub id: u32,
    /// Any name of the country, resolved against the nation table.
    pub nation: String,
    pub image: String,
    /// `[latitude, longitude]` where the photo was taken.
    pub coordinates: [f64; 2],
}

/// Entry of the grid problem table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GridProblemRecord {
    pub id: u32,
    #[serde(default)]
    pub title: String,
    pub rows: [String; 3],
    pub columns: [String; 3],
    /// Allowed countries keyed by `"row,col"`.
    pub cell_options: BTreeMap<String, Vec<String>>,
}

/// Pass/attempt counters of one module as stored in the leaderboard file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterEntity {
    pub success: u32,
    pub attempts: u32,
}

/// One leaderboard row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardRowEntity {
    pub timestamp: String,
    pub class: String,
    pub name: String,
    /// Counters keyed by module column prefix, e.g. `metro-guess`.
    pub counters: IndexMap<String, CounterEntity>,
}

/// Whole leaderboard file: the module column set and every row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardTableEntity {
    pub modules: Vec<String>,
    pub rows: Vec<LeaderboardRowEntity>,
}
