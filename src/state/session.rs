//! Per-player session: identity, phase, the active round and the streak.
//!
//! Every mutation goes through [`PlayerSession`]; phase changes are computed by
//! [`compute_transition`] so that an operation either moves to a valid phase or
//! leaves the session untouched.

use std::{collections::BTreeSet, time::Instant};

use rand::{
    Rng,
    seq::{IndexedRandom, IteratorRandom},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::{
    catalog::{GRID_SIZE, GameCatalog, GridProblem, PhotoProblem},
    directory::{NationDirectory, StationDirectory},
    grid::{GridPuzzleState, PlacementOutcome},
    leaderboard::Module,
    scoring::{CountryComparison, StationComparison, score_country, score_station},
};

/// The three mini-games a player can pick from the menu.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    /// Guess the Shanghai metro station.
    MetroGuess,
    /// Guess the country a photo was taken in.
    CountryPhoto,
    /// Fill the 3×3 country grid.
    CountryGrid,
}

impl GameKind {
    /// Name used in URLs and payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            GameKind::MetroGuess => "metro_guess",
            GameKind::CountryPhoto => "country_photo",
            GameKind::CountryGrid => "country_grid",
        }
    }
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    /// The answer was found, or every grid problem was solved.
    Won,
    /// Attempts or the grid error budget ran out.
    Lost,
}

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No identity registered yet.
    Idle,
    /// Logged in, no round running.
    Menu,
    /// A round of the given game is running.
    InProgress(GameKind),
    /// The last round of the given game is over.
    Over {
        kind: GameKind,
        outcome: RoundOutcome,
    },
    /// The player tried to restart a game they just lost and must go back to the menu first.
    LockedOut(GameKind),
}

/// Events applied to a session's phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Identity registered; always lands on the menu.
    Login,
    /// A round of the given game begins.
    StartGame(GameKind),
    /// A start request hit a lockout.
    StartRefused(GameKind),
    /// The running round reached a terminal state.
    Finish(RoundOutcome),
    /// Back to the menu.
    EndGame,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the session was in.
    pub from: SessionPhase,
    /// Event that was refused.
    pub event: SessionEvent,
}

/// Compute the phase reached by applying `event` to `phase`.
pub fn compute_transition(
    phase: SessionPhase,
    event: SessionEvent,
) -> Result<SessionPhase, InvalidTransition> {
    let next = match (phase, event) {
        (_, SessionEvent::Login) => SessionPhase::Menu,
        (SessionPhase::Menu | SessionPhase::Over { .. }, SessionEvent::StartGame(kind)) => {
            SessionPhase::InProgress(kind)
        }
        (SessionPhase::Menu | SessionPhase::Over { .. }, SessionEvent::StartRefused(kind)) => {
            SessionPhase::LockedOut(kind)
        }
        (SessionPhase::InProgress(kind), SessionEvent::Finish(outcome)) => {
            SessionPhase::Over { kind, outcome }
        }
        (
            SessionPhase::Menu
            | SessionPhase::InProgress(_)
            | SessionPhase::Over { .. }
            | SessionPhase::LockedOut(_),
            SessionEvent::EndGame,
        ) => SessionPhase::Menu,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

/// Errors raised by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A station or country name that is not in the reference tables.
    #[error("`{0}` is not a known name")]
    EntityNotFound(String),
    /// A required field was blank.
    #[error("missing input: {0}")]
    MissingInput(&'static str),
    /// The round is already won, lost or locked out.
    #[error("the round is already over")]
    AlreadyTerminal,
    /// The reference table a round needs is empty.
    #[error("no {0} available")]
    DataUnavailable(&'static str),
    /// The operation does not fit the current phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// The operation targets a game that is not running.
    #[error("no {} round in progress", .0.as_str())]
    NotInGame(GameKind),
    /// Every grid problem has already been solved.
    #[error("every grid problem has been solved")]
    PuzzleCompleted,
    /// Grid coordinates outside the board.
    #[error("cell ({row}, {col}) is outside the grid")]
    InvalidCell { row: usize, col: usize },
}

/// Who is playing; leaderboard rows are keyed by this pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlayerIdentity {
    pub class: String,
    pub name: String,
}

/// Round parameters coming from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRules {
    /// Guesses allowed in a metro or photo round.
    pub max_attempts: u32,
    /// Error budget per grid problem, by problem index; `None` means unlimited.
    pub grid_budgets: Vec<Option<u32>>,
}

impl RoundRules {
    /// Budget of grid problem `index`; problems past the configured list are unlimited.
    pub fn grid_budget(&self, index: usize) -> Option<u32> {
        self.grid_budgets.get(index).copied().flatten()
    }
}

impl Default for RoundRules {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            grid_budgets: vec![Some(5), Some(10), None],
        }
    }
}

/// One finished round (or solved grid problem) to record on the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub module: Module,
    pub success: bool,
    pub attempts: u32,
}

/// A running or just-finished metro round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetroRound {
    answer: String,
    guesses: Vec<StationComparison>,
}

impl MetroRound {
    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn guesses(&self) -> &[StationComparison] {
        &self.guesses
    }
}

/// A running or just-finished photo round.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRound {
    problem: PhotoProblem,
    guesses: Vec<CountryComparison>,
}

impl PhotoRound {
    pub fn problem(&self) -> &PhotoProblem {
        &self.problem
    }

    pub fn guesses(&self) -> &[CountryComparison] {
        &self.guesses
    }
}

/// Round state, tagged by game.
#[derive(Debug, Clone, PartialEq)]
pub enum Round {
    Metro(MetroRound),
    Photo(PhotoRound),
    Grid(GridPuzzleState),
}

/// Grid progress that outlives a single visit to the grid game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct GridProgress {
    /// Index of the first unsolved problem.
    next_problem: usize,
    /// Unfinished puzzle put aside when the player went back to the menu.
    parked: Option<GridPuzzleState>,
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A fresh (or resumed) round is running.
    Started,
    /// The game is locked out; the player must return to the menu first.
    Wait,
}

/// Result of one metro or photo guess.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessOutcome<T> {
    pub comparison: T,
    pub attempts_used: u32,
    pub attempts_left: u32,
    pub outcome: Option<RoundOutcome>,
    /// The secret, only revealed when the round was lost.
    pub revealed_answer: Option<String>,
    pub streak: u32,
    pub score: Option<ScoreUpdate>,
}

/// Result of one grid placement.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMoveOutcome {
    pub placement: PlacementOutcome,
    /// Index of the problem the move was played on.
    pub problem_index: usize,
    pub errors_left: Option<u32>,
    pub outcome: Option<RoundOutcome>,
    /// Set when the move solved a problem and the following one was loaded.
    pub next_problem: Option<usize>,
    pub score: Option<ScoreUpdate>,
}

/// State of one connected player.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    identity: Option<PlayerIdentity>,
    phase: SessionPhase,
    round: Option<Round>,
    streak: u32,
    lockouts: BTreeSet<GameKind>,
    grid: GridProgress,
    rules: RoundRules,
    last_seen: Instant,
}

impl PlayerSession {
    /// Anonymous session in the idle phase.
    pub fn new(rules: RoundRules) -> Self {
        Self {
            identity: None,
            phase: SessionPhase::Idle,
            round: None,
            streak: 0,
            lockouts: BTreeSet::new(),
            grid: GridProgress::default(),
            rules,
            last_seen: Instant::now(),
        }
    }

    /// Record activity on this session.
    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }

    /// Last time the player sent a request.
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    pub fn identity(&self) -> Option<&PlayerIdentity> {
        self.identity.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn lockouts(&self) -> impl Iterator<Item = GameKind> + '_ {
        self.lockouts.iter().copied()
    }

    /// Index of the first grid problem not solved yet.
    pub fn grid_next_problem(&self) -> usize {
        self.grid.next_problem
    }

    /// Register an identity; every previous field of the session is dropped.
    pub fn login(&mut self, class: &str, name: &str) -> Result<&PlayerIdentity, SessionError> {
        let class = class.trim();
        let name = name.trim();
        if class.is_empty() {
            return Err(SessionError::MissingInput("class"));
        }
        if name.is_empty() {
            return Err(SessionError::MissingInput("name"));
        }

        let phase = compute_transition(self.phase, SessionEvent::Login)?;
        *self = Self::new(self.rules.clone());
        self.phase = phase;
        Ok(self.identity.insert(PlayerIdentity {
            class: class.to_owned(),
            name: name.to_owned(),
        }))
    }

    /// Begin a round of `kind`, drawing its secret from `catalog`.
    pub fn start_game<R: Rng + ?Sized>(
        &mut self,
        kind: GameKind,
        catalog: &GameCatalog,
        rng: &mut R,
    ) -> Result<StartOutcome, SessionError> {
        if self.lockouts.contains(&kind) {
            self.phase = compute_transition(self.phase, SessionEvent::StartRefused(kind))?;
            self.round = None;
            return Ok(StartOutcome::Wait);
        }

        let next = compute_transition(self.phase, SessionEvent::StartGame(kind))?;
        let round = match kind {
            GameKind::MetroGuess => {
                let answer = catalog
                    .stations
                    .names()
                    .choose(rng)
                    .ok_or(SessionError::DataUnavailable("stations"))?;
                Round::Metro(MetroRound {
                    answer: answer.to_owned(),
                    guesses: Vec::new(),
                })
            }
            GameKind::CountryPhoto => {
                let problem = catalog
                    .photo_problems
                    .choose(rng)
                    .ok_or(SessionError::DataUnavailable("photo problems"))?;
                Round::Photo(PhotoRound {
                    problem: problem.clone(),
                    guesses: Vec::new(),
                })
            }
            GameKind::CountryGrid => Round::Grid(self.resume_grid(&catalog.grid_problems)?),
        };

        self.round = Some(round);
        self.phase = next;
        Ok(StartOutcome::Started)
    }

    /// Score a station guess against the running metro round.
    pub fn submit_station_guess(
        &mut self,
        stations: &StationDirectory,
        input: &str,
    ) -> Result<GuessOutcome<StationComparison>, SessionError> {
        self.ensure_running(GameKind::MetroGuess)?;
        let input = input.trim();
        if input.is_empty() {
            return Err(SessionError::MissingInput("station"));
        }

        let Some(Round::Metro(round)) = self.round.as_mut() else {
            return Err(SessionError::NotInGame(GameKind::MetroGuess));
        };
        let comparison = score_station(stations, input, &round.answer)?;
        round.guesses.push(comparison.clone());
        let used = round.guesses.len() as u32;
        let answer = round.answer.clone();

        self.settle_guess(
            GameKind::MetroGuess,
            comparison.is_correct,
            used,
            answer,
            comparison,
        )
    }

    /// Score a country guess against the running photo round.
    pub fn submit_country_guess(
        &mut self,
        nations: &NationDirectory,
        input: &str,
    ) -> Result<GuessOutcome<CountryComparison>, SessionError> {
        self.ensure_running(GameKind::CountryPhoto)?;
        if input.trim().is_empty() {
            return Err(SessionError::MissingInput("country"));
        }

        let Some(Round::Photo(round)) = self.round.as_mut() else {
            return Err(SessionError::NotInGame(GameKind::CountryPhoto));
        };
        let comparison = score_country(
            nations,
            input,
            &round.problem.nation,
            round.problem.target,
        )?;
        round.guesses.push(comparison.clone());
        let used = round.guesses.len() as u32;
        let answer = round.problem.nation.clone();

        self.settle_guess(
            GameKind::CountryPhoto,
            comparison.is_correct,
            used,
            answer,
            comparison,
        )
    }

    /// Place a country on the running grid.
    pub fn select_grid_cell(
        &mut self,
        nations: &NationDirectory,
        problems: &[GridProblem],
        row: usize,
        col: usize,
        input: &str,
    ) -> Result<GridMoveOutcome, SessionError> {
        self.ensure_running(GameKind::CountryGrid)?;
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return Err(SessionError::InvalidCell { row, col });
        }
        if input.trim().is_empty() {
            return Err(SessionError::MissingInput("country"));
        }
        let nation = nations
            .resolve(input)
            .ok_or_else(|| SessionError::EntityNotFound(input.trim().to_owned()))?;

        let Some(Round::Grid(puzzle)) = self.round.as_mut() else {
            return Err(SessionError::NotInGame(GameKind::CountryGrid));
        };
        let problem_index = puzzle.problem_index();
        let problem = problems
            .get(problem_index)
            .ok_or(SessionError::DataUnavailable("grid problems"))?;
        let module = Module::GridPuzzle(problem_index as u32 + 1);

        let placement = puzzle.place(problem, row, col, &nation.canonical);
        let errors = puzzle.errors();

        let mut result = GridMoveOutcome {
            placement,
            problem_index,
            errors_left: puzzle.errors_left(),
            outcome: None,
            next_problem: None,
            score: None,
        };

        match placement {
            PlacementOutcome::Rejected {
                budget_exhausted: true,
                ..
            } => {
                self.lockouts.insert(GameKind::CountryGrid);
                self.finish(RoundOutcome::Lost)?;
                result.outcome = Some(RoundOutcome::Lost);
                result.score = Some(ScoreUpdate {
                    module,
                    success: false,
                    attempts: errors,
                });
            }
            PlacementOutcome::Solved => {
                result.score = Some(ScoreUpdate {
                    module,
                    success: true,
                    attempts: errors,
                });
                let next = problem_index + 1;
                self.grid.next_problem = next;
                if next < problems.len() {
                    let fresh = GridPuzzleState::new(next, self.rules.grid_budget(next));
                    result.errors_left = fresh.errors_left();
                    self.round = Some(Round::Grid(fresh));
                    result.next_problem = Some(next);
                } else {
                    self.finish(RoundOutcome::Won)?;
                    result.outcome = Some(RoundOutcome::Won);
                }
            }
            PlacementOutcome::Rejected { .. } | PlacementOutcome::Placed => {}
        }

        Ok(result)
    }

    /// Empty the running grid; the error count is kept.
    pub fn reset_grid(&mut self) -> Result<&GridPuzzleState, SessionError> {
        self.ensure_running(GameKind::CountryGrid)?;
        match self.round.as_mut() {
            Some(Round::Grid(puzzle)) => {
                puzzle.reset();
                Ok(puzzle)
            }
            _ => Err(SessionError::NotInGame(GameKind::CountryGrid)),
        }
    }

    /// Return to the menu, clearing the lockout being waited on.
    pub fn end_game(&mut self) -> Result<SessionPhase, SessionError> {
        let from = self.phase;
        let next = compute_transition(from, SessionEvent::EndGame)?;
        if let SessionPhase::LockedOut(kind) = from {
            self.lockouts.remove(&kind);
        }
        self.park_grid();
        self.phase = next;
        self.round = None;
        Ok(self.phase)
    }

    fn ensure_running(&self, kind: GameKind) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::InProgress(running) if running == kind => Ok(()),
            SessionPhase::Over { .. } | SessionPhase::LockedOut(_) => {
                Err(SessionError::AlreadyTerminal)
            }
            _ => Err(SessionError::NotInGame(kind)),
        }
    }

    fn finish(&mut self, outcome: RoundOutcome) -> Result<(), SessionError> {
        self.phase = compute_transition(self.phase, SessionEvent::Finish(outcome))?;
        Ok(())
    }

    fn settle_guess<T>(
        &mut self,
        kind: GameKind,
        correct: bool,
        used: u32,
        answer: String,
        comparison: T,
    ) -> Result<GuessOutcome<T>, SessionError> {
        let module = match kind {
            GameKind::MetroGuess => Module::MetroGuess,
            _ => Module::CountryPhoto,
        };
        let outcome = if correct {
            Some(RoundOutcome::Won)
        } else if used >= self.rules.max_attempts {
            Some(RoundOutcome::Lost)
        } else {
            None
        };

        if let Some(outcome) = outcome {
            self.finish(outcome)?;
            match outcome {
                RoundOutcome::Won => self.streak += 1,
                RoundOutcome::Lost => {
                    self.lockouts.insert(kind);
                }
            }
        }

        Ok(GuessOutcome {
            comparison,
            attempts_used: used,
            attempts_left: self.rules.max_attempts.saturating_sub(used),
            outcome,
            revealed_answer: (outcome == Some(RoundOutcome::Lost)).then_some(answer),
            streak: self.streak,
            score: outcome.map(|outcome| ScoreUpdate {
                module,
                success: outcome == RoundOutcome::Won,
                attempts: used,
            }),
        })
    }

    fn resume_grid(&mut self, problems: &[GridProblem]) -> Result<GridPuzzleState, SessionError> {
        if problems.is_empty() {
            return Err(SessionError::DataUnavailable("grid problems"));
        }
        if self.grid.next_problem >= problems.len() {
            return Err(SessionError::PuzzleCompleted);
        }
        if let Some(parked) = self.grid.parked.take() {
            return Ok(parked);
        }
        let index = self.grid.next_problem;
        Ok(GridPuzzleState::new(index, self.rules.grid_budget(index)))
    }

    fn park_grid(&mut self) {
        if let (SessionPhase::InProgress(GameKind::CountryGrid), Some(Round::Grid(puzzle))) =
            (self.phase, &self.round)
        {
            self.grid.parked = Some(puzzle.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::state::{catalog::fixtures, grid::PlacementRejection};

    fn logged_in() -> PlayerSession {
        let mut session = PlayerSession::new(RoundRules::default());
        session.login("3A", "Alice").unwrap();
        session
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn metro_answer(session: &PlayerSession) -> String {
        match session.round() {
            Some(Round::Metro(round)) => round.answer().to_owned(),
            other => panic!("expected a metro round, got {other:?}"),
        }
    }

    fn wrong_stations(catalog: &GameCatalog, answer: &str) -> Vec<String> {
        catalog
            .stations
            .names()
            .filter(|name| *name != answer)
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn transitions_follow_the_session_lifecycle() {
        use SessionPhase::*;
        let metro = GameKind::MetroGuess;

        assert_eq!(compute_transition(Idle, SessionEvent::Login), Ok(Menu));
        assert_eq!(
            compute_transition(Menu, SessionEvent::StartGame(metro)),
            Ok(InProgress(metro))
        );
        assert_eq!(
            compute_transition(InProgress(metro), SessionEvent::Finish(RoundOutcome::Lost)),
            Ok(Over {
                kind: metro,
                outcome: RoundOutcome::Lost,
            })
        );
        assert_eq!(
            compute_transition(
                Over {
                    kind: metro,
                    outcome: RoundOutcome::Lost,
                },
                SessionEvent::StartRefused(metro)
            ),
            Ok(LockedOut(metro))
        );
        assert_eq!(
            compute_transition(LockedOut(metro), SessionEvent::EndGame),
            Ok(Menu)
        );
        assert!(compute_transition(Idle, SessionEvent::EndGame).is_err());
        assert!(compute_transition(InProgress(metro), SessionEvent::StartGame(metro)).is_err());
        assert!(compute_transition(LockedOut(metro), SessionEvent::StartGame(metro)).is_err());
    }

    #[test]
    fn login_requires_both_fields_and_clears_the_session() {
        let mut session = PlayerSession::new(RoundRules::default());
        assert!(matches!(
            session.login(" ", "Alice"),
            Err(SessionError::MissingInput("class"))
        ));
        assert_eq!(session.phase(), SessionPhase::Idle);

        let catalog = fixtures::catalog();
        session.login("3A", "Alice").unwrap();
        session
            .start_game(GameKind::MetroGuess, &catalog, &mut rng())
            .unwrap();

        let identity = session.login("3B", " Bob ").unwrap();
        assert_eq!(identity.name, "Bob");
        assert_eq!(session.phase(), SessionPhase::Menu);
        assert!(session.round().is_none());
    }

    #[test]
    fn start_requires_login() {
        let catalog = fixtures::catalog();
        let mut session = PlayerSession::new(RoundRules::default());
        assert!(matches!(
            session.start_game(GameKind::MetroGuess, &catalog, &mut rng()),
            Err(SessionError::InvalidTransition(_))
        ));
    }

    #[test]
    fn start_fails_without_reference_data() {
        let mut session = logged_in();
        let empty = GameCatalog::default();
        assert!(matches!(
            session.start_game(GameKind::MetroGuess, &empty, &mut rng()),
            Err(SessionError::DataUnavailable(_))
        ));
        assert_eq!(session.phase(), SessionPhase::Menu);
    }

    #[test]
    fn metro_win_on_last_attempt_after_five_misses() {
        let catalog = fixtures::catalog();
        let mut session = logged_in();
        session
            .start_game(GameKind::MetroGuess, &catalog, &mut rng())
            .unwrap();
        let answer = metro_answer(&session);
        let wrong = wrong_stations(&catalog, &answer);

        for attempt in 0..5 {
            let guess = &wrong[attempt % wrong.len()];
            let outcome = session
                .submit_station_guess(&catalog.stations, guess)
                .unwrap();
            assert_eq!(outcome.outcome, None);
            assert_eq!(outcome.attempts_left, 5 - attempt as u32);
            assert!(outcome.score.is_none());
        }

        let outcome = session
            .submit_station_guess(&catalog.stations, &answer)
            .unwrap();
        assert!(outcome.comparison.is_correct);
        assert_eq!(outcome.outcome, Some(RoundOutcome::Won));
        assert_eq!(outcome.revealed_answer, None);
        assert_eq!(outcome.streak, 1);
        assert_eq!(
            outcome.score,
            Some(ScoreUpdate {
                module: Module::MetroGuess,
                success: true,
                attempts: 6,
            })
        );
        assert!(matches!(
            session.submit_station_guess(&catalog.stations, &answer),
            Err(SessionError::AlreadyTerminal)
        ));
    }

    #[test]
    fn metro_loss_reveals_answer_and_locks_out_until_menu() {
        let catalog = fixtures::catalog();
        let mut session = logged_in();
        session
            .start_game(GameKind::MetroGuess, &catalog, &mut rng())
            .unwrap();
        let answer = metro_answer(&session);
        let wrong = wrong_stations(&catalog, &answer);

        let mut last = None;
        for attempt in 0..6 {
            last = Some(
                session
                    .submit_station_guess(&catalog.stations, &wrong[attempt % wrong.len()])
                    .unwrap(),
            );
        }
        let last = last.unwrap();
        assert_eq!(last.outcome, Some(RoundOutcome::Lost));
        assert_eq!(last.revealed_answer.as_deref(), Some(answer.as_str()));
        assert_eq!(last.streak, 0);
        assert_eq!(last.score.map(|score| score.success), Some(false));

        assert_eq!(
            session
                .start_game(GameKind::MetroGuess, &catalog, &mut rng())
                .unwrap(),
            StartOutcome::Wait
        );
        assert_eq!(
            session.phase(),
            SessionPhase::LockedOut(GameKind::MetroGuess)
        );

        assert_eq!(session.end_game().unwrap(), SessionPhase::Menu);
        assert_eq!(
            session
                .start_game(GameKind::MetroGuess, &catalog, &mut rng())
                .unwrap(),
            StartOutcome::Started
        );
    }

    #[test]
    fn lockout_only_applies_to_the_lost_game() {
        let catalog = fixtures::catalog();
        let mut session = logged_in();
        session
            .start_game(GameKind::MetroGuess, &catalog, &mut rng())
            .unwrap();
        let answer = metro_answer(&session);
        let wrong = wrong_stations(&catalog, &answer);
        for attempt in 0..6 {
            session
                .submit_station_guess(&catalog.stations, &wrong[attempt % wrong.len()])
                .unwrap();
        }

        assert_eq!(
            session
                .start_game(GameKind::CountryPhoto, &catalog, &mut rng())
                .unwrap(),
            StartOutcome::Started
        );
    }

    #[test]
    fn unknown_station_does_not_consume_an_attempt() {
        let catalog = fixtures::catalog();
        let mut session = logged_in();
        session
            .start_game(GameKind::MetroGuess, &catalog, &mut rng())
            .unwrap();

        assert!(matches!(
            session.submit_station_guess(&catalog.stations, "不存在站"),
            Err(SessionError::EntityNotFound(_))
        ));
        assert!(matches!(
            session.submit_station_guess(&catalog.stations, "  "),
            Err(SessionError::MissingInput(_))
        ));
        match session.round() {
            Some(Round::Metro(round)) => assert!(round.guesses().is_empty()),
            other => panic!("unexpected round {other:?}"),
        }
    }

    #[test]
    fn guess_for_another_game_is_refused() {
        let catalog = fixtures::catalog();
        let mut session = logged_in();
        session
            .start_game(GameKind::CountryPhoto, &catalog, &mut rng())
            .unwrap();
        assert!(matches!(
            session.submit_station_guess(&catalog.stations, "人民广场"),
            Err(SessionError::NotInGame(GameKind::MetroGuess))
        ));
    }

    #[test]
    fn photo_round_accepts_aliases_and_counts_streak() {
        let catalog = fixtures::catalog();
        let mut session = logged_in();
        session
            .start_game(GameKind::CountryPhoto, &catalog, &mut rng())
            .unwrap();

        let miss = session
            .submit_country_guess(&catalog.nations, "japan")
            .unwrap();
        assert!(!miss.comparison.is_correct);
        assert_eq!(miss.attempts_left, 5);

        let hit = session
            .submit_country_guess(&catalog.nations, "China")
            .unwrap();
        assert_eq!(hit.outcome, Some(RoundOutcome::Won));
        assert_eq!(hit.streak, 1);
        assert_eq!(
            hit.score,
            Some(ScoreUpdate {
                module: Module::CountryPhoto,
                success: true,
                attempts: 2,
            })
        );

        session
            .start_game(GameKind::CountryPhoto, &catalog, &mut rng())
            .unwrap();
        let again = session
            .submit_country_guess(&catalog.nations, "中国")
            .unwrap();
        assert_eq!(again.streak, 2);
    }

    fn solve(session: &mut PlayerSession, catalog: &GameCatalog) -> GridMoveOutcome {
        let names = [
            "中国", "日本", "法国", "德国", "英国", "美国", "巴西", "印度", "埃及",
        ];
        let mut last = None;
        for (position, name) in names.iter().enumerate() {
            last = Some(
                session
                    .select_grid_cell(
                        &catalog.nations,
                        &catalog.grid_problems,
                        position / 3,
                        position % 3,
                        name,
                    )
                    .unwrap(),
            );
        }
        last.unwrap()
    }

    #[test]
    fn grid_solves_advance_to_next_problem_then_complete() {
        let catalog = fixtures::catalog();
        let mut session = logged_in();
        session
            .start_game(GameKind::CountryGrid, &catalog, &mut rng())
            .unwrap();

        let first = solve(&mut session, &catalog);
        assert_eq!(first.placement, PlacementOutcome::Solved);
        assert_eq!(first.next_problem, Some(1));
        assert_eq!(first.outcome, None);
        assert_eq!(first.errors_left, Some(10));
        assert_eq!(
            first.score,
            Some(ScoreUpdate {
                module: Module::GridPuzzle(1),
                success: true,
                attempts: 0,
            })
        );

        let second = solve(&mut session, &catalog);
        assert_eq!(second.outcome, Some(RoundOutcome::Won));
        assert_eq!(second.score.map(|score| score.module), Some(Module::GridPuzzle(2)));
        assert_eq!(session.streak(), 0);

        session.end_game().unwrap();
        assert!(matches!(
            session.start_game(GameKind::CountryGrid, &catalog, &mut rng()),
            Err(SessionError::PuzzleCompleted)
        ));
    }

    #[test]
    fn grid_rejections_count_errors_until_the_budget_is_spent() {
        let catalog = fixtures::catalog();
        let mut session = PlayerSession::new(RoundRules {
            max_attempts: 6,
            grid_budgets: vec![Some(2)],
        });
        session.login("3A", "Alice").unwrap();
        session
            .start_game(GameKind::CountryGrid, &catalog, &mut rng())
            .unwrap();

        let first = session
            .select_grid_cell(&catalog.nations, &catalog.grid_problems, 2, 2, "China")
            .unwrap();
        assert_eq!(
            first.placement,
            PlacementOutcome::Rejected {
                reason: PlacementRejection::NotAllowed,
                budget_exhausted: false,
            }
        );
        assert_eq!(first.errors_left, Some(1));

        let second = session
            .select_grid_cell(&catalog.nations, &catalog.grid_problems, 2, 2, "日本")
            .unwrap();
        assert_eq!(second.outcome, Some(RoundOutcome::Lost));
        assert_eq!(
            second.score,
            Some(ScoreUpdate {
                module: Module::GridPuzzle(1),
                success: false,
                attempts: 2,
            })
        );

        assert_eq!(
            session
                .start_game(GameKind::CountryGrid, &catalog, &mut rng())
                .unwrap(),
            StartOutcome::Wait
        );
        session.end_game().unwrap();
        session
            .start_game(GameKind::CountryGrid, &catalog, &mut rng())
            .unwrap();
        match session.round() {
            Some(Round::Grid(puzzle)) => {
                assert_eq!(puzzle.problem_index(), 0);
                assert_eq!(puzzle.errors(), 0);
            }
            other => panic!("unexpected round {other:?}"),
        }
    }

    #[test]
    fn grid_progress_is_kept_across_menu_trips() {
        let catalog = fixtures::catalog();
        let mut session = logged_in();
        session
            .start_game(GameKind::CountryGrid, &catalog, &mut rng())
            .unwrap();
        session
            .select_grid_cell(&catalog.nations, &catalog.grid_problems, 0, 0, "中国")
            .unwrap();
        session
            .select_grid_cell(&catalog.nations, &catalog.grid_problems, 0, 1, "中国")
            .unwrap();

        session.end_game().unwrap();
        session
            .start_game(GameKind::MetroGuess, &catalog, &mut rng())
            .unwrap();
        session.end_game().unwrap();
        session
            .start_game(GameKind::CountryGrid, &catalog, &mut rng())
            .unwrap();

        match session.round() {
            Some(Round::Grid(puzzle)) => {
                assert_eq!(puzzle.cells()[0][0].as_deref(), Some("中国"));
                assert_eq!(puzzle.errors(), 1);
            }
            other => panic!("unexpected round {other:?}"),
        }
    }

    #[test]
    fn grid_cell_outside_board_is_refused() {
        let catalog = fixtures::catalog();
        let mut session = logged_in();
        session
            .start_game(GameKind::CountryGrid, &catalog, &mut rng())
            .unwrap();
        assert!(matches!(
            session.select_grid_cell(&catalog.nations, &catalog.grid_problems, 3, 0, "中国"),
            Err(SessionError::InvalidCell { row: 3, col: 0 })
        ));
    }

    #[test]
    fn reset_grid_keeps_errors() {
        let catalog = fixtures::catalog();
        let mut session = logged_in();
        session
            .start_game(GameKind::CountryGrid, &catalog, &mut rng())
            .unwrap();
        session
            .select_grid_cell(&catalog.nations, &catalog.grid_problems, 0, 0, "中国")
            .unwrap();
        session
            .select_grid_cell(&catalog.nations, &catalog.grid_problems, 2, 2, "中国")
            .unwrap();

        let puzzle = session.reset_grid().unwrap();
        assert!(puzzle.cells().iter().flatten().all(Option::is_none));
        assert_eq!(puzzle.errors(), 1);
    }
}
