//! Per-player, per-module pass/attempt counters and their ranking.

use std::fmt;

use indexmap::IndexMap;
use time::{OffsetDateTime, macros::format_description};
use tracing::warn;

use crate::dao::models::{CounterEntity, LeaderboardRowEntity, LeaderboardTableEntity};

/// A scored mini-game module, as it appears in leaderboard column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Module {
    /// Guess the metro station.
    MetroGuess,
    /// Guess the country from a photo.
    CountryPhoto,
    /// Country grid, 1-based problem number.
    GridPuzzle(u32),
}

impl Module {
    /// Column prefix used in the leaderboard file.
    pub fn key(self) -> String {
        match self {
            Module::MetroGuess => "metro-guess".into(),
            Module::CountryPhoto => "country-photo".into(),
            Module::GridPuzzle(number) => format!("grid-puzzle-{number}"),
        }
    }

    /// Parse a column prefix back into a module.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "metro-guess" => Some(Module::MetroGuess),
            "country-photo" => Some(Module::CountryPhoto),
            other => other
                .strip_prefix("grid-puzzle-")
                .and_then(|number| number.parse().ok())
                .filter(|number| *number > 0)
                .map(Module::GridPuzzle),
        }
    }

    /// Timed guessing rounds, the only ones whose attempts feed the ranking average.
    pub fn is_timed(self) -> bool {
        matches!(self, Module::MetroGuess | Module::CountryPhoto)
    }

    /// Module set of a deployment with `grid_problems` grid problems.
    pub fn standard_set(grid_problems: usize) -> Vec<Module> {
        let mut modules = vec![Module::MetroGuess, Module::CountryPhoto];
        modules.extend((1..=grid_problems as u32).map(Module::GridPuzzle));
        modules
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Cumulative counters of one player on one module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleScore {
    /// Rounds passed.
    pub passed: u32,
    /// Attempts spent over every round, failed ones included.
    pub attempts: u32,
}

/// Leaderboard row of one `(class, name)` player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Last update, formatted `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub class: String,
    pub name: String,
    pub scores: IndexMap<Module, ModuleScore>,
}

impl LeaderboardEntry {
    fn new(class: &str, name: &str, timestamp: String) -> Self {
        Self {
            timestamp,
            class: class.to_owned(),
            name: name.to_owned(),
            scores: IndexMap::new(),
        }
    }

    /// Counters for `module`, zero when never played.
    pub fn score(&self, module: Module) -> ModuleScore {
        self.scores.get(&module).copied().unwrap_or_default()
    }
}

/// Ranking keys of an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standing {
    /// Rounds passed across the module set.
    pub passed: u32,
    /// Attempts per passed timed round; `0.0` when no timed round was passed.
    pub average_attempts: f64,
}

/// An entry with its ranking keys, in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry<'a> {
    pub rank: usize,
    pub entry: &'a LeaderboardEntry,
    pub standing: Standing,
}

/// One page of the ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardPage<'a> {
    pub page: usize,
    pub total_pages: usize,
    pub total_entries: usize,
    pub entries: Vec<RankedEntry<'a>>,
}

/// In-memory leaderboard; persistence is handled by a store.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    modules: Vec<Module>,
    entries: Vec<LeaderboardEntry>,
    page_size: usize,
}

impl Leaderboard {
    /// Empty leaderboard over a fixed module set.
    pub fn new(modules: Vec<Module>, page_size: usize) -> Self {
        Self {
            modules,
            entries: Vec::new(),
            page_size: page_size.max(1),
        }
    }

    /// Install previously stored entries, extending the module set with any module they mention.
    pub fn with_entries(mut self, entries: Vec<LeaderboardEntry>) -> Self {
        for entry in &entries {
            for module in entry.scores.keys() {
                self.register_module(*module);
            }
        }
        self.entries = entries;
        self
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Find the entry of a player.
    pub fn find(&self, class: &str, name: &str) -> Option<&LeaderboardEntry> {
        self.entries
            .iter()
            .find(|entry| entry.class == class && entry.name == name)
    }

    /// Record one finished round.
    ///
    /// A pass bumps the pass counter; attempts are added whether the round passed or not.
    pub fn add_score(
        &mut self,
        class: &str,
        name: &str,
        module: Module,
        success: bool,
        attempts: u32,
        timestamp: String,
    ) -> &LeaderboardEntry {
        self.register_module(module);

        let entry = self.entry_mut(class, name, &timestamp);
        let score = entry.scores.entry(module).or_default();
        if success {
            score.passed = score.passed.saturating_add(1);
        }
        score.attempts = score.attempts.saturating_add(attempts);
        entry.timestamp = timestamp;
        entry
    }

    /// Ranking keys of `entry` over this leaderboard's module set.
    pub fn standing(&self, entry: &LeaderboardEntry) -> Standing {
        let passed = self
            .modules
            .iter()
            .map(|module| entry.score(*module).passed)
            .fold(0u32, u32::saturating_add);

        let (timed_passed, timed_attempts) = self
            .modules
            .iter()
            .filter(|module| module.is_timed())
            .map(|module| entry.score(*module))
            .filter(|score| score.passed > 0)
            .fold((0u64, 0u64), |(passed, attempts), score| {
                (
                    passed + u64::from(score.passed),
                    attempts + u64::from(score.attempts),
                )
            });

        // Zero-success players average 0.0 and therefore sort ahead within their tier.
        let average_attempts = if timed_passed > 0 {
            timed_attempts as f64 / timed_passed as f64
        } else {
            0.0
        };

        Standing {
            passed,
            average_attempts,
        }
    }

    /// Every entry sorted by passes (descending), then average attempts (ascending).
    pub fn ranked(&self) -> Vec<RankedEntry<'_>> {
        let mut ranked: Vec<(&LeaderboardEntry, Standing)> = self
            .entries
            .iter()
            .map(|entry| (entry, self.standing(entry)))
            .collect();

        ranked.sort_by(|(_, a), (_, b)| {
            b.passed
                .cmp(&a.passed)
                .then(a.average_attempts.total_cmp(&b.average_attempts))
        });

        ranked
            .into_iter()
            .enumerate()
            .map(|(index, (entry, standing))| RankedEntry {
                rank: index + 1,
                entry,
                standing,
            })
            .collect()
    }

    /// 1-indexed page of the ranking; page `0` is treated as the first page.
    pub fn page(&self, page: usize) -> LeaderboardPage<'_> {
        let page = page.max(1);
        let ranked = self.ranked();
        let total_entries = ranked.len();
        let total_pages = total_entries.div_ceil(self.page_size);
        let entries = ranked
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .collect();

        LeaderboardPage {
            page,
            total_pages,
            total_entries,
            entries,
        }
    }

    /// Fold every counter of `other` into this board, matching players by class and name.
    ///
    /// Timestamps of players present in `other` are taken from it.
    pub fn merge(&mut self, other: Leaderboard) {
        for module in other.modules {
            self.register_module(module);
        }
        for incoming in other.entries {
            let entry = self.entry_mut(&incoming.class, &incoming.name, &incoming.timestamp);
            for (module, score) in &incoming.scores {
                let target = entry.scores.entry(*module).or_default();
                target.passed = target.passed.saturating_add(score.passed);
                target.attempts = target.attempts.saturating_add(score.attempts);
            }
            entry.timestamp = incoming.timestamp;
        }
    }

    fn entry_mut(&mut self, class: &str, name: &str, timestamp: &str) -> &mut LeaderboardEntry {
        let position = match self
            .entries
            .iter()
            .position(|entry| entry.class == class && entry.name == name)
        {
            Some(position) => position,
            None => {
                self.entries
                    .push(LeaderboardEntry::new(class, name, timestamp.to_owned()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[position]
    }

    fn register_module(&mut self, module: Module) {
        if !self.modules.contains(&module) {
            self.modules.push(module);
        }
    }
}

impl Leaderboard {
    /// Rebuild a leaderboard from its stored form; columns of unknown modules are dropped.
    pub fn from_entity(
        table: LeaderboardTableEntity,
        modules: Vec<Module>,
        page_size: usize,
    ) -> Self {
        let entries = table
            .rows
            .into_iter()
            .map(|row| LeaderboardEntry {
                timestamp: row.timestamp,
                class: row.class,
                name: row.name,
                scores: row
                    .counters
                    .into_iter()
                    .filter(|(_, counter)| *counter != CounterEntity::default())
                    .filter_map(|(key, counter)| {
                        let Some(module) = Module::from_key(&key) else {
                            warn!(column = %key, "ignoring unknown leaderboard module");
                            return None;
                        };
                        Some((
                            module,
                            ModuleScore {
                                passed: counter.success,
                                attempts: counter.attempts,
                            },
                        ))
                    })
                    .collect(),
            })
            .collect();

        Leaderboard::new(modules, page_size).with_entries(entries)
    }
}

impl From<&Leaderboard> for LeaderboardTableEntity {
    fn from(board: &Leaderboard) -> Self {
        Self {
            modules: board.modules.iter().map(|module| module.key()).collect(),
            rows: board
                .entries
                .iter()
                .map(|entry| LeaderboardRowEntity {
                    timestamp: entry.timestamp.clone(),
                    class: entry.class.clone(),
                    name: entry.name.clone(),
                    counters: board
                        .modules
                        .iter()
                        .map(|module| {
                            let score = entry.score(*module);
                            (
                                module.key(),
                                CounterEntity {
                                    success: score.passed,
                                    attempts: score.attempts,
                                },
                            )
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Format a timestamp the way the leaderboard file stores it.
pub fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| "invalid-timestamp".into())
}

/// Current UTC time in leaderboard format.
pub fn now_timestamp() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}
