//! Placement rules for the 3×3 country grid.

use serde::Serialize;
use utoipa::ToSchema;

use crate::state::catalog::{GRID_SIZE, GridProblem};

/// Grid contents, indexed `[row][col]`.
pub type Grid = [[Option<String>; GRID_SIZE]; GRID_SIZE];

/// Why a placement was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlacementRejection {
    /// The country already sits somewhere in the grid.
    Duplicate,
    /// The country is not accepted by the chosen cell.
    NotAllowed,
    /// The grid became inconsistent once the country was written; the cell was emptied.
    Inconsistent,
}

impl PlacementRejection {
    /// Player-facing explanation.
    pub fn message(self) -> &'static str {
        match self {
            PlacementRejection::Duplicate => {
                "this country is already in the grid, pick another one"
            }
            PlacementRejection::NotAllowed => "this country does not fit the cell's criteria",
            PlacementRejection::Inconsistent => "the grid does not satisfy the problem",
        }
    }
}

/// Result of one placement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Cell left untouched (or rolled back) and one error counted.
    Rejected {
        reason: PlacementRejection,
        budget_exhausted: bool,
    },
    /// Country written, grid not complete yet.
    Placed,
    /// Country written and every cell is filled with a valid country.
    Solved,
}

/// Whole-grid check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridValidation {
    /// All nine cells are occupied.
    pub is_finished: bool,
    /// No duplicate and every occupied cell honours its allow-list.
    pub is_valid: bool,
}

/// Progress on a single grid problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPuzzleState {
    cells: Grid,
    problem_index: usize,
    errors: u32,
    budget: Option<u32>,
}

impl GridPuzzleState {
    /// Fresh empty grid for `problem_index`; `budget` of `None` means unlimited errors.
    pub fn new(problem_index: usize, budget: Option<u32>) -> Self {
        Self {
            cells: Grid::default(),
            problem_index,
            errors: 0,
            budget,
        }
    }

    pub fn cells(&self) -> &Grid {
        &self.cells
    }

    pub fn problem_index(&self) -> usize {
        self.problem_index
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn budget(&self) -> Option<u32> {
        self.budget
    }

    /// Errors still allowed before the problem is lost, `None` when unlimited.
    pub fn errors_left(&self) -> Option<u32> {
        self.budget.map(|budget| budget.saturating_sub(self.errors))
    }

    /// True once the error counter reached the budget.
    pub fn is_exhausted(&self) -> bool {
        self.budget.is_some_and(|budget| self.errors >= budget)
    }

    /// Try to write `nation` at `(row, col)`.
    ///
    /// Uniqueness is checked before the cell's allow-list, then the whole grid is
    /// revalidated and is the sole source of the "solved" decision.
    pub fn place(
        &mut self,
        problem: &GridProblem,
        row: usize,
        col: usize,
        nation: &str,
    ) -> PlacementOutcome {
        if self.contains(nation) {
            return self.reject(PlacementRejection::Duplicate);
        }
        if !problem.allows(row, col, nation) {
            return self.reject(PlacementRejection::NotAllowed);
        }

        self.cells[row][col] = Some(nation.to_owned());

        let validation = self.validate(problem);
        if !validation.is_valid {
            self.cells[row][col] = None;
            return self.reject(PlacementRejection::Inconsistent);
        }
        if validation.is_finished {
            PlacementOutcome::Solved
        } else {
            PlacementOutcome::Placed
        }
    }

    /// Check the whole grid against uniqueness and the per-cell allow-lists.
    pub fn validate(&self, problem: &GridProblem) -> GridValidation {
        let occupied: Vec<(usize, usize, &str)> = self
            .cells
            .iter()
            .enumerate()
            .flat_map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .filter_map(move |(col, cell)| cell.as_deref().map(|name| (row, col, name)))
            })
            .collect();

        let mut names: Vec<&str> = occupied.iter().map(|(_, _, name)| *name).collect();
        names.sort_unstable();
        names.dedup();
        let unique = names.len() == occupied.len();
        let allowed = occupied
            .iter()
            .all(|(row, col, name)| problem.allows(*row, *col, name));

        GridValidation {
            is_finished: occupied.len() == GRID_SIZE * GRID_SIZE,
            is_valid: unique && allowed,
        }
    }

    /// Empty every cell; the error counter is kept.
    pub fn reset(&mut self) {
        self.cells = Grid::default();
    }

    fn contains(&self, nation: &str) -> bool {
        self.cells
            .iter()
            .flatten()
            .any(|cell| cell.as_deref() == Some(nation))
    }

    fn reject(&mut self, reason: PlacementRejection) -> PlacementOutcome {
        self.errors += 1;
        PlacementOutcome::Rejected {
            reason,
            budget_exhausted: self.is_exhausted(),
        }
    }
}
