pub mod catalog;
pub mod directory;
pub mod grid;
pub mod leaderboard;
pub mod network;
pub mod scoring;
pub mod session;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::one::RefMut};
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{leaderboard_store::LeaderboardStore, models::LeaderboardTableEntity},
    state::{
        catalog::GameCatalog,
        leaderboard::{Leaderboard, Module},
        session::PlayerSession,
    },
};

pub type SharedState = Arc<AppState>;

/// Central application state: reference data, player sessions and the leaderboard.
pub struct AppState {
    config: AppConfig,
    catalog: Arc<GameCatalog>,
    sessions: DashMap<Uuid, PlayerSession>,
    leaderboard: Mutex<Leaderboard>,
    store: Arc<dyn LeaderboardStore>,
    /// The stored history was never read; saving now would overwrite it.
    history_unloaded: AtomicBool,
    /// The last save failed and nothing has been written since.
    write_failed: AtomicBool,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The stored leaderboard is loaded once here; when it cannot be read the
    /// application starts empty and in degraded mode until [`AppState::recover_store`]
    /// manages to read it.
    pub async fn new(
        config: AppConfig,
        catalog: GameCatalog,
        store: Arc<dyn LeaderboardStore>,
    ) -> SharedState {
        let modules = Module::standard_set(catalog.grid_problems.len());
        let (leaderboard, unloaded) = match store.load().await {
            Ok(table) => {
                info!(rows = table.rows.len(), "leaderboard loaded");
                (
                    Leaderboard::from_entity(table, modules, config.page_size),
                    false,
                )
            }
            Err(err) => {
                warn!(error = %err, "failed to load leaderboard; starting empty in degraded mode");
                (Leaderboard::new(modules, config.page_size), true)
            }
        };
        let (degraded_tx, _rx) = watch::channel(unloaded);

        Arc::new(Self {
            config,
            catalog: Arc::new(catalog),
            sessions: DashMap::new(),
            leaderboard: Mutex::new(leaderboard),
            store,
            history_unloaded: AtomicBool::new(unloaded),
            write_failed: AtomicBool::new(false),
            degraded: degraded_tx,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Immutable reference tables.
    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    /// Fresh session id with an anonymous session behind it.
    pub fn open_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .insert(id, PlayerSession::new(self.config.rules.clone()));
        id
    }

    /// Exclusive access to one session, marking it active.
    ///
    /// The guard must not be held across an await nor while calling other session methods.
    pub fn session_mut(&self, id: Uuid) -> Option<RefMut<'_, Uuid, PlayerSession>> {
        let mut session = self.sessions.get_mut(&id)?;
        session.touch(Instant::now());
        Some(session)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions idle for longer than `max_idle` as of `now`; returns how many went.
    pub fn evict_idle_sessions(&self, max_idle: Duration, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now.saturating_duration_since(session.last_seen()) <= max_idle);
        before.saturating_sub(self.sessions.len())
    }

    /// The in-memory leaderboard; writes go through [`AppState::persist_leaderboard`].
    pub fn leaderboard(&self) -> &Mutex<Leaderboard> {
        &self.leaderboard
    }

    /// Save `board` to the store, flipping degraded mode according to the outcome.
    ///
    /// Nothing is written while the stored history is still unread.
    pub async fn persist_leaderboard(&self, board: &Leaderboard) -> bool {
        if self.history_unloaded.load(Ordering::SeqCst) {
            warn!("stored leaderboard not loaded yet; keeping scores in memory");
            self.update_degraded(true);
            return false;
        }

        let table = LeaderboardTableEntity::from(board);
        match self.store.save(table).await {
            Ok(()) => {
                self.write_failed.store(false, Ordering::SeqCst);
                self.update_degraded(false);
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to persist leaderboard; entering degraded mode");
                self.write_failed.store(true, Ordering::SeqCst);
                self.update_degraded(true);
                false
            }
        }
    }

    /// Check the leaderboard store and update degraded mode accordingly.
    ///
    /// A reachable store does not clear a pending load or write failure; only
    /// [`AppState::recover_store`] or a later successful save does.
    pub async fn probe_store(&self) -> bool {
        let reachable = self.store.health_check().await.is_ok();
        let healthy = reachable
            && !self.history_unloaded.load(Ordering::SeqCst)
            && !self.write_failed.load(Ordering::SeqCst);
        self.update_degraded(!healthy);
        healthy
    }

    /// Retry whatever failed against the store: reading the history, then saving the board.
    ///
    /// Scores recorded while the history was unreadable are merged into it.
    pub async fn recover_store(&self) -> bool {
        if self.history_unloaded.load(Ordering::SeqCst) {
            let table = match self.store.load().await {
                Ok(table) => table,
                Err(err) => {
                    warn!(error = %err, "leaderboard still unreadable");
                    self.update_degraded(true);
                    return false;
                }
            };

            let mut board = self.leaderboard.lock().await;
            let mut stored = Leaderboard::from_entity(
                table,
                board.modules().to_vec(),
                self.config.page_size,
            );
            let recent = std::mem::replace(&mut *board, Leaderboard::new(Vec::new(), 1));
            stored.merge(recent);
            *board = stored;
            self.history_unloaded.store(false, Ordering::SeqCst);
            info!(rows = board.entries().len(), "stored leaderboard recovered");
            self.persist_leaderboard(&board).await;
        } else if self.write_failed.load(Ordering::SeqCst) {
            let board = self.leaderboard.lock().await;
            self.persist_leaderboard(&board).await;
        }

        self.probe_store().await
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::{
        dao::{
            leaderboard_store::memory::MemoryLeaderboardStore,
            models::{CounterEntity, LeaderboardRowEntity},
        },
        state::catalog::fixtures,
    };

    fn modules() -> Vec<String> {
        Module::standard_set(fixtures::catalog().grid_problems.len())
            .into_iter()
            .map(Module::key)
            .collect()
    }

    async fn state_with(store: &MemoryLeaderboardStore) -> SharedState {
        AppState::new(
            AppConfig::default(),
            fixtures::catalog(),
            Arc::new(store.clone()),
        )
        .await
    }

    async fn record_metro_win(state: &AppState, class: &str, name: &str) -> bool {
        let mut board = state.leaderboard().lock().await;
        board.add_score(
            class,
            name,
            Module::MetroGuess,
            true,
            4,
            "2026-10-16 09:00:00".into(),
        );
        state.persist_leaderboard(&board).await
    }

    #[tokio::test]
    async fn failed_save_stays_degraded_while_the_store_answers_health_checks() {
        let store = MemoryLeaderboardStore::new(modules());
        let state = state_with(&store).await;
        store.set_failing_saves(true);

        assert!(!record_metro_win(&state, "3A", "Lin").await);
        assert!(state.is_degraded());
        assert!(!state.probe_store().await);
        assert!(state.is_degraded());

        store.set_failing_saves(false);
        assert!(state.recover_store().await);
        assert!(!state.is_degraded());
        let saved = store.snapshot().await;
        assert_eq!(saved.rows.len(), 1);
        assert_eq!(saved.rows[0].name, "Lin");
    }

    #[tokio::test]
    async fn unreadable_history_is_merged_instead_of_overwritten() {
        let store = MemoryLeaderboardStore::new(modules());
        let mut counters = IndexMap::new();
        counters.insert(
            Module::MetroGuess.key(),
            CounterEntity {
                success: 2,
                attempts: 9,
            },
        );
        store
            .save(LeaderboardTableEntity {
                modules: modules(),
                rows: vec![LeaderboardRowEntity {
                    timestamp: "2026-10-01 08:00:00".into(),
                    class: "3A".into(),
                    name: "Lin".into(),
                    counters,
                }],
            })
            .await
            .unwrap();
        store.set_failing_loads(true);

        let state = state_with(&store).await;
        assert!(state.is_degraded());
        assert!(!record_metro_win(&state, "3A", "Lin").await);
        assert!(!record_metro_win(&state, "3B", "Wu").await);
        assert_eq!(store.snapshot().await.rows.len(), 1);
        assert!(!state.recover_store().await);

        store.set_failing_loads(false);
        assert!(state.recover_store().await);
        assert!(!state.is_degraded());

        let saved = store.snapshot().await;
        assert_eq!(saved.rows.len(), 2);
        assert_eq!(saved.rows[0].name, "Lin");
        assert_eq!(
            saved.rows[0].counters[&Module::MetroGuess.key()],
            CounterEntity {
                success: 3,
                attempts: 13,
            }
        );
        assert_eq!(saved.rows[1].name, "Wu");
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_and_active_ones_kept() {
        let store = MemoryLeaderboardStore::new(modules());
        let state = state_with(&store).await;
        let idle = state.open_session();
        let active = state.open_session();
        let max_idle = Duration::from_secs(60);

        assert_eq!(state.evict_idle_sessions(max_idle, Instant::now()), 0);

        let later = Instant::now() + max_idle + Duration::from_secs(1);
        state
            .session_mut(active)
            .expect("session exists")
            .touch(later);

        assert_eq!(state.evict_idle_sessions(max_idle, later), 1);
        assert!(state.session_mut(idle).is_none());
        assert_eq!(state.session_count(), 1);
    }
}
