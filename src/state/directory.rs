//! Immutable reference directories shared by every player session.
//!
//! Directories are built once during startup and then only read, so they are handed
//! around behind an `Arc` without any locking.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::dao::storage::{DirectoryError, DirectoryResult};

/// Stop count reported when a station pair is missing from the precomputed table.
pub const FALLBACK_STOPS: u32 = 100;
/// Transfer count reported when a station pair is missing from the precomputed table.
pub const FALLBACK_TRANSFERS: u32 = 10;

/// A metro station as loaded from the station table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    /// Unique station name.
    pub name: String,
    /// Administrative district the station belongs to.
    pub district: String,
    /// Lines serving the station.
    pub lines: BTreeSet<String>,
    /// Opening year, `0` when unknown.
    pub opening_year: u32,
}

/// Minimum stops and transfers between two stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationPairMetric {
    /// Minimum number of stops between the two stations.
    pub min_stops: u32,
    /// Minimum number of line changes between the two stations.
    pub min_transfers: u32,
}

/// Dense square matrix of integers keyed by station name on both axes.
#[derive(Debug, Clone, Default)]
pub struct PairMatrix {
    index: HashMap<String, usize>,
    cells: Vec<Option<u32>>,
}

impl PairMatrix {
    /// Build an empty matrix over `names`; duplicated names keep their first position.
    pub fn with_stations<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = HashMap::new();
        for name in names {
            let next = index.len();
            index.entry(name.into()).or_insert(next);
        }
        let size = index.len();
        Self {
            index,
            cells: vec![None; size * size],
        }
    }

    /// Number of stations on each axis.
    pub fn size(&self) -> usize {
        self.index.len()
    }

    /// Store `value` for the ordered pair; returns `false` when either station is unknown.
    pub fn set(&mut self, from: &str, to: &str, value: u32) -> bool {
        match self.offset(from, to) {
            Some(offset) => {
                self.cells[offset] = Some(value);
                true
            }
            None => false,
        }
    }

    /// Station names in axis order.
    pub fn stations(&self) -> Vec<&str> {
        let mut names = vec![""; self.size()];
        for (name, &position) in &self.index {
            names[position] = name.as_str();
        }
        names
    }

    /// Value stored for the ordered pair, if any.
    pub fn get(&self, from: &str, to: &str) -> Option<u32> {
        self.offset(from, to).and_then(|offset| self.cells[offset])
    }

    fn offset(&self, from: &str, to: &str) -> Option<usize> {
        let row = *self.index.get(from)?;
        let column = *self.index.get(to)?;
        Some(row * self.size() + column)
    }
}

/// Lookup of stations and of the precomputed pairwise metrics between them.
#[derive(Debug, Clone, Default)]
pub struct StationDirectory {
    stations: BTreeMap<String, Station>,
    stops: PairMatrix,
    transfers: PairMatrix,
}

impl StationDirectory {
    /// Assemble a directory from loaded stations and the two metric matrices.
    pub fn new(stations: Vec<Station>, stops: PairMatrix, transfers: PairMatrix) -> Self {
        let stations = stations
            .into_iter()
            .map(|station| (station.name.clone(), station))
            .collect();
        Self {
            stations,
            stops,
            transfers,
        }
    }

    /// Find a station by its exact name.
    pub fn lookup(&self, name: &str) -> Option<&Station> {
        self.stations.get(name)
    }

    /// Station names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stations.keys().map(String::as_str)
    }

    /// Number of known stations.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// True when no station could be loaded.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Minimum stops between two stations; identical stations are always `0` apart.
    pub fn min_stops(&self, from: &str, to: &str) -> u32 {
        if from == to {
            return 0;
        }
        self.stops.get(from, to).unwrap_or(FALLBACK_STOPS)
    }

    /// Minimum transfers between two stations; identical stations need none.
    pub fn min_transfers(&self, from: &str, to: &str) -> u32 {
        if from == to {
            return 0;
        }
        self.transfers.get(from, to).unwrap_or(FALLBACK_TRANSFERS)
    }

    /// Both metrics for the ordered pair.
    pub fn metric(&self, from: &str, to: &str) -> StationPairMetric {
        StationPairMetric {
            min_stops: self.min_stops(from, to),
            min_transfers: self.min_transfers(from, to),
        }
    }
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude, positive north.
    pub lat: f64,
    /// Longitude, positive east.
    pub lon: f64,
}

impl Coordinates {
    /// Build coordinates from a latitude/longitude pair.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A country with every name players may type for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Nation {
    /// Canonical display name, used for answers, grids and comparisons.
    pub canonical: String,
    /// Alternative spellings in any script, canonical name excluded.
    pub aliases: Vec<String>,
    /// Reference position of the country.
    pub coordinates: Coordinates,
}

/// Case-insensitive alias lookup resolving free text to a canonical nation.
#[derive(Debug, Clone, Default)]
pub struct NationDirectory {
    nations: Vec<Nation>,
    by_alias: HashMap<String, usize>,
}

impl NationDirectory {
    /// Index every canonical name and alias, refusing aliases shared by two nations.
    pub fn new(nations: Vec<Nation>) -> DirectoryResult<Self> {
        let mut by_alias: HashMap<String, usize> = HashMap::new();

        for (position, nation) in nations.iter().enumerate() {
            let names = std::iter::once(&nation.canonical).chain(nation.aliases.iter());
            for name in names {
                let key = normalize_alias(name);
                if key.is_empty() {
                    continue;
                }
                match by_alias.get(&key) {
                    Some(&existing) if nations[existing].canonical != nation.canonical => {
                        return Err(DirectoryError::AliasConflict {
                            alias: name.clone(),
                            first: nations[existing].canonical.clone(),
                            second: nation.canonical.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        by_alias.insert(key, position);
                    }
                }
            }
        }

        Ok(Self { nations, by_alias })
    }

    /// Resolve player input (any script, any case) to a nation.
    pub fn resolve(&self, input: &str) -> Option<&Nation> {
        self.by_alias
            .get(&normalize_alias(input))
            .map(|&position| &self.nations[position])
    }

    /// Every typeable name, deduplicated and sorted, for pickers.
    pub fn all_names(&self) -> Vec<String> {
        self.nations
            .iter()
            .flat_map(|nation| std::iter::once(&nation.canonical).chain(nation.aliases.iter()))
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of nations.
    pub fn len(&self) -> usize {
        self.nations.len()
    }

    /// True when no nation could be loaded.
    pub fn is_empty(&self) -> bool {
        self.nations.is_empty()
    }
}

fn normalize_alias(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    fn station(name: &str, district: &str, lines: &[&str], year: u32) -> Station {
        Station {
            name: name.into(),
            district: district.into(),
            lines: lines.iter().map(|line| line.to_string()).collect(),
            opening_year: year,
        }
    }

    /// Four stations on lines 1/2/8 with hand-written metrics.
    pub fn stations() -> StationDirectory {
        let names = ["人民广场", "徐家汇", "陆家嘴", "西藏北路"];
        let mut stops = PairMatrix::with_stations(names);
        let mut transfers = PairMatrix::with_stations(names);
        let table = [
            ("人民广场", "徐家汇", 5, 0),
            ("人民广场", "陆家嘴", 2, 0),
            ("人民广场", "西藏北路", 2, 0),
            ("徐家汇", "陆家嘴", 7, 1),
            ("徐家汇", "西藏北路", 7, 1),
            ("陆家嘴", "西藏北路", 4, 1),
        ];
        for (a, b, s, t) in table {
            stops.set(a, b, s);
            stops.set(b, a, s);
            transfers.set(a, b, t);
            transfers.set(b, a, t);
        }
        // Stale diagonal entry, as found in generated tables.
        stops.set("人民广场", "人民广场", 3);

        StationDirectory::new(
            vec![
                station("人民广场", "黄浦区", &["1号线", "2号线", "8号线"], 1995),
                station("徐家汇", "徐汇区", &["1号线", "9号线", "11号线"], 1996),
                station("陆家嘴", "浦东新区", &["2号线", "14号线"], 1999),
                station("西藏北路", "静安区", &["8号线"], 2007),
            ],
            stops,
            transfers,
        )
    }

    /// Nine nations with English/Chinese/Japanese aliases.
    pub fn nations() -> NationDirectory {
        NationDirectory::new(vec![
            Nation {
                canonical: "中国".into(),
                aliases: vec!["China".into(), "中华人民共和国".into()],
                coordinates: Coordinates::new(35.0, 103.0),
            },
            Nation {
                canonical: "日本".into(),
                aliases: vec!["Japan".into(), "にほん".into()],
                coordinates: Coordinates::new(36.0, 138.0),
            },
            Nation {
                canonical: "法国".into(),
                aliases: vec!["France".into()],
                coordinates: Coordinates::new(46.0, 2.0),
            },
            Nation {
                canonical: "德国".into(),
                aliases: vec!["Germany".into()],
                coordinates: Coordinates::new(51.0, 9.0),
            },
            Nation {
                canonical: "英国".into(),
                aliases: vec!["United Kingdom".into(), "UK".into()],
                coordinates: Coordinates::new(54.0, -2.0),
            },
            Nation {
                canonical: "美国".into(),
                aliases: vec!["United States".into(), "USA".into()],
                coordinates: Coordinates::new(38.0, -97.0),
            },
            Nation {
                canonical: "巴西".into(),
                aliases: vec!["Brazil".into()],
                coordinates: Coordinates::new(-10.0, -55.0),
            },
            Nation {
                canonical: "印度".into(),
                aliases: vec!["India".into()],
                coordinates: Coordinates::new(21.0, 78.0),
            },
            Nation {
                canonical: "埃及".into(),
                aliases: vec!["Egypt".into()],
                coordinates: Coordinates::new(27.0, 30.0),
            },
        ])
        .expect("fixture aliases are unique")
    }
}
