use std::collections::BTreeSet;

use crate::state::directory::{Coordinates, NationDirectory, StationDirectory};

/// Side length of the country grid.
pub const GRID_SIZE: usize = 3;

/// A "guess the country from this photo" problem.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoProblem {
    /// Identifier of the problem in the source table.
    pub id: u32,
    /// Canonical name of the country shown in the photo.
    pub nation: String,
    /// Image reference served by the web client.
    pub image: String,
    /// Where the photo was taken; distance and bearings aim here.
    pub target: Coordinates,
}

/// A "fill the grid with countries" problem with one allow-list per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridProblem {
    /// Identifier of the problem in the source table.
    pub id: u32,
    /// Short description shown above the grid.
    pub title: String,
    /// Row criteria, top to bottom.
    pub rows: [String; GRID_SIZE],
    /// Column criteria, left to right.
    pub columns: [String; GRID_SIZE],
    /// Canonical country names accepted in each cell, indexed `[row][col]`.
    pub allow_lists: [[BTreeSet<String>; GRID_SIZE]; GRID_SIZE],
}

impl GridProblem {
    /// True when `nation` is accepted at `(row, col)`.
    pub fn allows(&self, row: usize, col: usize, nation: &str) -> bool {
        self.allow_lists
            .get(row)
            .and_then(|cells| cells.get(col))
            .is_some_and(|allowed| allowed.contains(nation))
    }
}

/// Everything a round may draw from, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct GameCatalog {
    pub stations: StationDirectory,
    pub nations: NationDirectory,
    pub photo_problems: Vec<PhotoProblem>,
    pub grid_problems: Vec<GridProblem>,
}

impl GameCatalog {
    /// Reference tables that are empty, for health reporting.
    pub fn missing_tables(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.stations.is_empty() {
            missing.push("stations");
        }
        if self.nations.is_empty() {
            missing.push("nations");
        }
        if self.photo_problems.is_empty() {
            missing.push("photo_problems");
        }
        if self.grid_problems.is_empty() {
            missing.push("grid_problems");
        }
        missing
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::state::directory::fixtures as directories;

    fn cell(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn labels(values: [&str; GRID_SIZE]) -> [String; GRID_SIZE] {
        values.map(str::to_owned)
    }

    /// Grid where every cell only accepts one country, except the top-left one.
    pub fn grid_problem(id: u32) -> GridProblem {
        let names = [
            "中国", "日本", "法国", "德国", "英国", "美国", "巴西", "印度", "埃及",
        ];
        let mut allow_lists: [[BTreeSet<String>; GRID_SIZE]; GRID_SIZE] = Default::default();
        for (position, name) in names.iter().enumerate() {
            allow_lists[position / GRID_SIZE][position % GRID_SIZE] = cell(&[name]);
        }
        allow_lists[0][0].insert("日本".into());

        GridProblem {
            id,
            title: format!("problem {id}"),
            rows: labels(["r1", "r2", "r3"]),
            columns: labels(["c1", "c2", "c3"]),
            allow_lists,
        }
    }

    pub fn catalog() -> GameCatalog {
        GameCatalog {
            stations: directories::stations(),
            nations: directories::nations(),
            photo_problems: vec![PhotoProblem {
                id: 1,
                nation: "中国".into(),
                image: "great-wall.jpg".into(),
                target: Coordinates::new(40.4, 116.6),
            }],
            grid_problems: vec![grid_problem(1), grid_problem(2)],
        }
    }
}
