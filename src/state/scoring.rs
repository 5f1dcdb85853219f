//! Guess feedback: how close a guessed station or country is to the secret answer.
//!
//! Scoring is pure; the session decides what to do with the produced records.

use std::{cmp::Ordering, collections::BTreeSet};

use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{
    directory::{Coordinates, NationDirectory, StationDirectory},
    session::SessionError,
};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// How the guessed station's lines relate to the answer's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LinesMatch {
    /// Same set of lines.
    Perfect,
    /// At least one line in common, sets differ.
    Partial,
    /// No line in common.
    None,
}

impl LinesMatch {
    fn between(guess: &BTreeSet<String>, answer: &BTreeSet<String>) -> Self {
        if guess == answer {
            LinesMatch::Perfect
        } else if !guess.is_disjoint(answer) {
            LinesMatch::Partial
        } else {
            LinesMatch::None
        }
    }
}

/// Opening year of the guess relative to the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum YearRelation {
    /// Both opened the same year.
    Same,
    /// The guess opened before the answer.
    Earlier,
    /// The guess opened after the answer.
    Later,
}

/// Feedback produced for one station guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StationComparison {
    pub guess: String,
    pub district: String,
    pub district_match: bool,
    pub lines: Vec<String>,
    pub lines_match: LinesMatch,
    pub opening_year: u32,
    pub year_relation: YearRelation,
    pub min_stops: u32,
    pub min_transfers: u32,
    pub is_correct: bool,
}

/// Compare a guessed station against the secret one.
pub fn score_station(
    stations: &StationDirectory,
    guess: &str,
    answer: &str,
) -> Result<StationComparison, SessionError> {
    let guessed = stations
        .lookup(guess)
        .ok_or_else(|| SessionError::EntityNotFound(guess.to_owned()))?;
    let secret = stations
        .lookup(answer)
        .ok_or_else(|| SessionError::EntityNotFound(answer.to_owned()))?;

    let year_relation = match guessed.opening_year.cmp(&secret.opening_year) {
        Ordering::Less => YearRelation::Earlier,
        Ordering::Equal => YearRelation::Same,
        Ordering::Greater => YearRelation::Later,
    };
    let metric = stations.metric(&guessed.name, &secret.name);

    Ok(StationComparison {
        guess: guessed.name.clone(),
        district: guessed.district.clone(),
        district_match: guessed.district == secret.district,
        lines: guessed.lines.iter().cloned().collect(),
        lines_match: LinesMatch::between(&guessed.lines, &secret.lines),
        opening_year: guessed.opening_year,
        year_relation,
        min_stops: metric.min_stops,
        min_transfers: metric.min_transfers,
        is_correct: guessed.name == secret.name,
    })
}

/// One of the eight compass arrows shown as a direction hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Arrow {
    /// Bearing within 22.5° of 0°.
    North,
    /// Around 45°.
    NorthEast,
    /// Around 90°.
    East,
    /// Around 135°.
    SouthEast,
    /// Around 180°.
    South,
    /// Around 225°.
    SouthWest,
    /// Around 270°.
    West,
    /// Around 315°.
    NorthWest,
}

const ARROWS: [Arrow; 8] = [
    Arrow::North,
    Arrow::NorthEast,
    Arrow::East,
    Arrow::SouthEast,
    Arrow::South,
    Arrow::SouthWest,
    Arrow::West,
    Arrow::NorthWest,
];

impl Arrow {
    /// Map a bearing in degrees onto the 45° sector centred on each direction.
    pub fn from_bearing(degrees: f64) -> Self {
        let normalized = degrees.rem_euclid(360.0);
        let index = (normalized / 45.0).round_ties_even() as usize % ARROWS.len();
        ARROWS[index]
    }

    /// Position of the arrow clockwise from north.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Emoji rendering used by the web client.
    pub fn symbol(self) -> &'static str {
        match self {
            Arrow::North => "⬆️",
            Arrow::NorthEast => "↗️",
            Arrow::East => "➡️",
            Arrow::SouthEast => "↘️",
            Arrow::South => "⬇️",
            Arrow::SouthWest => "↙️",
            Arrow::West => "⬅️",
            Arrow::NorthWest => "↖️",
        }
    }
}

/// Great-circle distance computed from the chord between both points on the unit sphere.
pub fn great_circle_km(from: Coordinates, to: Coordinates) -> f64 {
    let a = unit_vector(from);
    let b = unit_vector(to);
    let chord_sq = (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2);
    let angle = ((2.0 - chord_sq) / 2.0).clamp(-1.0, 1.0).acos();
    EARTH_RADIUS_KM * angle
}

fn unit_vector(point: Coordinates) -> [f64; 3] {
    let lat = point.lat.to_radians();
    let lon = point.lon.to_radians();
    [lon.cos() * lat.cos(), lon.sin() * lat.cos(), lat.sin()]
}

/// Round a distance to the coarse "temperature" bucket shown to players.
///
/// Above 100 km the value snaps to the nearest 100 km, otherwise to the nearest 10 km.
/// Halves round to even.
pub fn bucket_distance(km: f64) -> u32 {
    if km > 100.0 {
        ((km / 100.0).round_ties_even() * 100.0) as u32
    } else {
        ((km / 10.0).round_ties_even() * 10.0) as u32
    }
}

/// Initial bearing of the great-circle path, in degrees clockwise from north.
pub fn initial_bearing(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lon = to.lon.to_radians() - from.lon.to_radians();
    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Bearing on the flat latitude/longitude plane, using the shortest longitude wrap.
pub fn planar_bearing(from: Coordinates, to: Coordinates) -> f64 {
    let delta_lat = to.lat - from.lat;
    let raw = to.lon - from.lon;
    let delta_lon = [raw, raw + 360.0, raw - 360.0]
        .into_iter()
        .min_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(raw);
    (delta_lon.atan2(delta_lat).to_degrees() + 360.0) % 360.0
}

/// Feedback produced for one country guess.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CountryComparison {
    /// Canonical name of the guessed country.
    pub guess: String,
    /// Bucketed distance to the answer.
    pub distance_km: u32,
    /// True initial bearing, rounded to two decimals.
    pub bearing: f64,
    /// Arrow derived from the true bearing.
    pub arrow: Arrow,
    /// Arrow derived from the planar bearing.
    pub planar_arrow: Arrow,
    pub is_correct: bool,
}

/// Compare free-text country input against the secret country and its photo position.
pub fn score_country(
    nations: &NationDirectory,
    input: &str,
    answer: &str,
    target: Coordinates,
) -> Result<CountryComparison, SessionError> {
    let guessed = nations
        .resolve(input)
        .ok_or_else(|| SessionError::EntityNotFound(input.trim().to_owned()))?;

    let bearing = initial_bearing(guessed.coordinates, target);
    let planar = planar_bearing(guessed.coordinates, target);

    Ok(CountryComparison {
        guess: guessed.canonical.clone(),
        distance_km: bucket_distance(great_circle_km(guessed.coordinates, target)),
        bearing: (bearing * 100.0).round() / 100.0,
        arrow: Arrow::from_bearing(bearing),
        planar_arrow: Arrow::from_bearing(planar),
        is_correct: guessed.canonical == answer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::directory::fixtures;

    #[test]
    fn lines_match_partitions_set_relations() {
        let directory = fixtures::stations();
        let perfect = score_station(&directory, "人民广场", "人民广场").unwrap();
        assert_eq!(perfect.lines_match, LinesMatch::Perfect);

        let partial = score_station(&directory, "西藏北路", "人民广场").unwrap();
        assert_eq!(partial.lines_match, LinesMatch::Partial);

        let none = score_station(&directory, "西藏北路", "陆家嘴").unwrap();
        assert_eq!(none.lines_match, LinesMatch::None);
    }

    #[test]
    fn station_feedback_fields() {
        let directory = fixtures::stations();
        let result = score_station(&directory, "徐家汇", "陆家嘴").unwrap();

        assert!(!result.district_match);
        assert_eq!(result.year_relation, YearRelation::Earlier);
        assert_eq!(result.min_stops, 7);
        assert_eq!(result.min_transfers, 1);
        assert!(!result.is_correct);

        let later = score_station(&directory, "西藏北路", "人民广场").unwrap();
        assert_eq!(later.year_relation, YearRelation::Later);
    }

    #[test]
    fn correct_station_guess_is_zero_apart() {
        let directory = fixtures::stations();
        let result = score_station(&directory, "人民广场", "人民广场").unwrap();
        assert!(result.is_correct);
        assert!(result.district_match);
        assert_eq!(result.year_relation, YearRelation::Same);
        assert_eq!((result.min_stops, result.min_transfers), (0, 0));
    }

    #[test]
    fn unknown_station_is_reported() {
        let directory = fixtures::stations();
        let err = score_station(&directory, "火星站", "人民广场").unwrap_err();
        assert!(matches!(err, SessionError::EntityNotFound(name) if name == "火星站"));
    }

    #[test]
    fn distance_buckets() {
        assert_eq!(bucket_distance(37.0), 40);
        assert_eq!(bucket_distance(640.0), 600);
        assert_eq!(bucket_distance(0.0), 0);
        assert_eq!(bucket_distance(100.0), 100);
        assert_eq!(bucket_distance(149.0), 100);
        assert_eq!(bucket_distance(4.0), 0);
    }

    #[test]
    fn arrow_sectors() {
        assert_eq!(Arrow::from_bearing(0.0).index(), 0);
        assert_eq!(Arrow::from_bearing(44.0), Arrow::NorthEast);
        assert_eq!(Arrow::from_bearing(359.0), Arrow::North);
        assert_eq!(Arrow::from_bearing(180.0), Arrow::South);
        assert_eq!(Arrow::from_bearing(-90.0), Arrow::West);
        assert_eq!(Arrow::South.symbol(), "⬇️");
    }

    #[test]
    fn great_circle_matches_known_distance() {
        let paris = Coordinates::new(48.8566, 2.3522);
        let london = Coordinates::new(51.5074, -0.1278);
        let km = great_circle_km(paris, london);
        assert!((km - 343.5).abs() < 2.0, "got {km}");
        assert_eq!(great_circle_km(paris, paris), 0.0);
    }

    #[test]
    fn bearings_point_the_right_way() {
        let origin = Coordinates::new(0.0, 0.0);
        let east = Coordinates::new(0.0, 10.0);
        assert!((initial_bearing(origin, east) - 90.0).abs() < 1e-9);
        assert!((planar_bearing(origin, Coordinates::new(-10.0, 0.0)) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn planar_bearing_takes_the_short_way_around() {
        let fiji = Coordinates::new(-18.0, 178.0);
        let samoa = Coordinates::new(-14.0, -172.0);
        let planar = planar_bearing(fiji, samoa);
        assert_eq!(Arrow::from_bearing(planar), Arrow::East);
    }

    #[test]
    fn country_guess_resolves_aliases() {
        let nations = fixtures::nations();
        let target = Coordinates::new(35.0, 103.0);

        let hit = score_country(&nations, "china", "中国", target).unwrap();
        assert!(hit.is_correct);
        assert_eq!(hit.distance_km, 0);

        let miss = score_country(&nations, "Japan", "中国", target).unwrap();
        assert_eq!(miss.guess, "日本");
        assert!(!miss.is_correct);
        assert_eq!(miss.arrow, Arrow::West);

        let err = score_country(&nations, "Narnia", "中国", target).unwrap_err();
        assert!(matches!(err, SessionError::EntityNotFound(_)));
    }
}
