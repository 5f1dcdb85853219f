//! Loaders for the read-only reference tables: stations, metrics, nations and problems.

use std::{
    collections::BTreeSet,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use crate::{
    config::DataPaths,
    dao::{
        models::{GridProblemRecord, NationRecord, PhotoProblemRecord, StationRecord},
        storage::{DirectoryError, DirectoryResult},
    },
    state::{
        catalog::{GRID_SIZE, GameCatalog, GridProblem, PhotoProblem},
        directory::{Coordinates, Nation, NationDirectory, PairMatrix, Station, StationDirectory},
        network::MetroLine,
    },
};

/// Read the station table.
pub fn load_stations(path: &Path) -> DirectoryResult<Vec<Station>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| csv_error(path, source))?;

    let mut stations = Vec::new();
    for record in reader.deserialize::<StationRecord>() {
        let record = record.map_err(|source| csv_error(path, source))?;
        if record.name.is_empty() {
            continue;
        }
        stations.push(Station {
            lines: record.lines().map(str::to_owned).collect::<BTreeSet<_>>(),
            opening_year: record.year(),
            district: record.district,
            name: record.name,
        });
    }
    Ok(stations)
}

/// Read a square matrix whose first row and first column carry station names.
///
/// Blank or non-numeric cells are left empty so lookups fall back to defaults.
pub fn load_matrix(path: &Path) -> DirectoryResult<PairMatrix> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| csv_error(path, source))?;

    let mut records = reader.records();
    let header = records
        .next()
        .ok_or_else(|| matrix_error(path, "file is empty"))?
        .map_err(|source| csv_error(path, source))?;
    let columns: Vec<String> = header.iter().skip(1).map(str::to_owned).collect();
    let mut matrix = PairMatrix::with_stations(columns.iter().cloned());

    for record in records {
        let record = record.map_err(|source| csv_error(path, source))?;
        let mut fields = record.iter();
        let Some(from) = fields.next() else {
            continue;
        };
        for (to, raw) in columns.iter().zip(fields) {
            if let Ok(value) = raw.parse::<u32>() {
                matrix.set(from, to, value);
            }
        }
    }
    Ok(matrix)
}

/// Write a matrix in the layout read by [`load_matrix`]; unreachable pairs are left blank.
pub fn write_matrix(path: &Path, matrix: &PairMatrix) -> DirectoryResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| csv_error(path, source))?;
    let names = matrix.stations();

    let header = std::iter::once("").chain(names.iter().copied());
    writer
        .write_record(header)
        .map_err(|source| csv_error(path, source))?;
    for from in &names {
        let row = std::iter::once(from.to_string()).chain(
            names
                .iter()
                .map(|to| matrix.get(from, to).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer
            .write_record(row)
            .map_err(|source| csv_error(path, source))?;
    }
    writer.flush().map_err(|source| DirectoryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the nation table and index its aliases.
pub fn load_nations(path: &Path) -> DirectoryResult<NationDirectory> {
    let records: Vec<NationRecord> = read_json(path)?;
    let nations = records
        .into_iter()
        .map(|record| Nation {
            canonical: record.canonical.trim().to_owned(),
            aliases: record.aliases.into_values().flatten().collect(),
            coordinates: Coordinates::new(record.coordinates[0], record.coordinates[1]),
        })
        .collect();
    NationDirectory::new(nations)
}

/// Read the photo problems, resolving each answer to its canonical nation.
pub fn load_photo_problems(
    path: &Path,
    nations: &NationDirectory,
) -> DirectoryResult<Vec<PhotoProblem>> {
    let records: Vec<PhotoProblemRecord> = read_json(path)?;
    let mut problems = Vec::with_capacity(records.len());
    for record in records {
        let Some(nation) = nations.resolve(&record.nation) else {
            warn!(
                id = record.id,
                nation = %record.nation,
                "photo problem answer is not a known nation; skipping"
            );
            continue;
        };
        problems.push(PhotoProblem {
            id: record.id,
            nation: nation.canonical.clone(),
            image: record.image,
            target: Coordinates::new(record.coordinates[0], record.coordinates[1]),
        });
    }
    Ok(problems)
}

/// Read the grid problems, in file order.
pub fn load_grid_problems(
    path: &Path,
    nations: &NationDirectory,
) -> DirectoryResult<Vec<GridProblem>> {
    let records: Vec<GridProblemRecord> = read_json(path)?;
    records
        .into_iter()
        .map(|record| grid_problem(record, nations))
        .collect()
}

/// Read a metro line listing, as consumed by the table generator.
pub fn load_lines(path: &Path) -> DirectoryResult<Vec<MetroLine>> {
    read_json(path)
}

/// Build the whole catalog; a table that fails to load is logged and left empty.
pub fn load_catalog(paths: &DataPaths) -> GameCatalog {
    let nations = or_empty("nations", &paths.nations, load_nations(&paths.nations));
    let stations = or_empty("stations", &paths.stations, load_stations(&paths.stations));
    let stops = or_empty("min_stops", &paths.min_stops, load_matrix(&paths.min_stops));
    let transfers = or_empty(
        "min_transfers",
        &paths.min_transfers,
        load_matrix(&paths.min_transfers),
    );
    let photo_problems = or_empty(
        "photo_problems",
        &paths.photo_problems,
        load_photo_problems(&paths.photo_problems, &nations),
    );
    let grid_problems = or_empty(
        "grid_problems",
        &paths.grid_problems,
        load_grid_problems(&paths.grid_problems, &nations),
    );

    let catalog = GameCatalog {
        stations: StationDirectory::new(stations, stops, transfers),
        nations,
        photo_problems,
        grid_problems,
    };
    info!(
        stations = catalog.stations.len(),
        nations = catalog.nations.len(),
        photo_problems = catalog.photo_problems.len(),
        grid_problems = catalog.grid_problems.len(),
        "reference data loaded"
    );
    catalog
}

fn grid_problem(record: GridProblemRecord, nations: &NationDirectory) -> DirectoryResult<GridProblem> {
    let mut allow_lists: [[BTreeSet<String>; GRID_SIZE]; GRID_SIZE] = Default::default();

    for (key, names) in &record.cell_options {
        let (row, col) = parse_cell_key(key).ok_or_else(|| {
            DirectoryError::Problem(format!("grid problem {}: bad cell key `{key}`", record.id))
        })?;
        for name in names {
            // Allow-lists hold canonical names so placements can be compared directly.
            let canonical = match nations.resolve(name) {
                Some(nation) => nation.canonical.clone(),
                None => {
                    warn!(id = record.id, %name, "grid allow-list entry is not a known nation");
                    name.trim().to_owned()
                }
            };
            allow_lists[row][col].insert(canonical);
        }
    }

    Ok(GridProblem {
        id: record.id,
        title: record.title,
        rows: record.rows,
        columns: record.columns,
        allow_lists,
    })
}

fn parse_cell_key(key: &str) -> Option<(usize, usize)> {
    let (row, col) = key.split_once(',')?;
    let row = row.trim().parse::<usize>().ok()?;
    let col = col.trim().parse::<usize>().ok()?;
    (row < GRID_SIZE && col < GRID_SIZE).then_some((row, col))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> DirectoryResult<T> {
    let file = File::open(path).map_err(|source| DirectoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| DirectoryError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn or_empty<T: Default>(table: &str, path: &Path, result: DirectoryResult<T>) -> T {
    result.unwrap_or_else(|err| {
        error!(table, path = %path.display(), error = %err, "failed to load reference table");
        T::default()
    })
}

fn csv_error(path: &Path, source: csv::Error) -> DirectoryError {
    DirectoryError::Csv {
        path: PathBuf::from(path),
        source,
    }
}

fn matrix_error(path: &Path, message: &str) -> DirectoryError {
    DirectoryError::Matrix {
        path: PathBuf::from(path),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::state::directory::fixtures;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn stations_accept_chinese_headers() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "stations.csv",
            "站名,区县,线路1,线路2,线路3,线路4,线路5,开通年份\n\
             人民广场,黄浦区,1号线,2号线,8号线,,,1995\n\
             徐家汇,徐汇区,1号线,9号线,11号线,,,1996.0\n",
        );

        let stations = load_stations(&path).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "人民广场");
        assert_eq!(stations[0].lines.len(), 3);
        assert_eq!(stations[1].opening_year, 1996);
    }

    #[test]
    fn stations_accept_english_headers() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "stations.csv",
            "name,district,line1,opening_year\n陆家嘴,浦东新区,2号线,unknown\n",
        );
        let stations = load_stations(&path).unwrap();
        assert_eq!(stations[0].district, "浦东新区");
        assert_eq!(stations[0].opening_year, 0);
    }

    #[test]
    fn matrix_skips_blank_cells() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "stops.csv", ",A,B\nA,0,3\nB,3,\n");
        let matrix = load_matrix(&path).unwrap();
        assert_eq!(matrix.get("A", "B"), Some(3));
        assert_eq!(matrix.get("B", "B"), None);
    }

    #[test]
    fn matrix_written_then_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut matrix = PairMatrix::with_stations(["A", "B"]);
        matrix.set("A", "B", 4);
        write_matrix(&path, &matrix).unwrap();

        let loaded = load_matrix(&path).unwrap();
        assert_eq!(loaded.get("A", "B"), Some(4));
        assert_eq!(loaded.get("B", "A"), None);
    }

    #[test]
    fn nations_flatten_alias_groups() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "nations.json",
            r#"[{"canonical": "中国", "aliases": {"en": ["China"], "ja": ["中国"]}, "coordinates": [35.0, 103.0]}]"#,
        );
        let nations = load_nations(&path).unwrap();
        assert_eq!(nations.resolve("china").map(|n| n.canonical.as_str()), Some("中国"));
    }

    #[test]
    fn grid_allow_lists_are_canonicalized() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "grid.json",
            r#"[{
                "id": 1, "title": "Asia",
                "rows": ["a", "b", "c"], "columns": ["d", "e", "f"],
                "cell_options": {"0,0": ["Japan", "China"], "2,2": ["Egypt"]}
            }]"#,
        );
        let problems = load_grid_problems(&path, &fixtures::nations()).unwrap();
        assert!(problems[0].allows(0, 0, "日本"));
        assert!(problems[0].allows(2, 2, "埃及"));
        assert!(!problems[0].allows(1, 1, "日本"));
    }

    #[test]
    fn grid_rejects_cells_outside_the_board() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "grid.json",
            r#"[{"id": 1, "rows": ["a", "b", "c"], "columns": ["d", "e", "f"], "cell_options": {"3,0": []}}]"#,
        );
        assert!(matches!(
            load_grid_problems(&path, &fixtures::nations()),
            Err(DirectoryError::Problem(_))
        ));
    }

    #[test]
    fn photo_problems_with_unknown_nation_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "photos.json",
            r#"[
                {"id": 1, "nation": "China", "image": "a.jpg", "coordinates": [40.0, 116.0]},
                {"id": 2, "nation": "Atlantis", "image": "b.jpg", "coordinates": [0.0, 0.0]}
            ]"#,
        );
        let problems = load_photo_problems(&path, &fixtures::nations()).unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].nation, "中国");
    }

    #[test]
    fn missing_tables_yield_an_empty_catalog() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths {
            stations: dir.path().join("none.csv"),
            min_stops: dir.path().join("none.csv"),
            min_transfers: dir.path().join("none.csv"),
            nations: dir.path().join("none.json"),
            photo_problems: dir.path().join("none.json"),
            grid_problems: dir.path().join("none.json"),
            leaderboard: dir.path().join("board.csv"),
        };
        let catalog = load_catalog(&paths);
        assert_eq!(catalog.missing_tables().len(), 4);
    }
}
