//! Application-level configuration loading: data file locations and round rules.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::session::RoundRules;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GEOQUIZ_CONFIG_PATH";
/// Guesses allowed per metro or photo round.
const DEFAULT_MAX_ATTEMPTS: u32 = 6;
/// Leaderboard rows per page.
const DEFAULT_PAGE_SIZE: usize = 10;
/// Minutes without a request after which a session is dropped.
const DEFAULT_SESSION_IDLE_MINUTES: u64 = 120;

/// Where each reference table and the leaderboard live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub stations: PathBuf,
    pub min_stops: PathBuf,
    pub min_transfers: PathBuf,
    pub nations: PathBuf,
    pub photo_problems: PathBuf,
    pub grid_problems: PathBuf,
    pub leaderboard: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            stations: "data/stations.csv".into(),
            min_stops: "data/min_stops.csv".into(),
            min_transfers: "data/min_transfers.csv".into(),
            nations: "data/nations.json".into(),
            photo_problems: "data/photo_problems.json".into(),
            grid_problems: "data/grid_problems.json".into(),
            leaderboard: "data/leaderboard.csv".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub data: DataPaths,
    pub rules: RoundRules,
    pub page_size: usize,
    /// Sessions idle for longer than this are evicted.
    pub session_idle: Duration,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration from `path`; any failure is logged and yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        max_attempts = app_config.rules.max_attempts,
                        grid_budgets = ?app_config.rules.grid_budgets,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataPaths::default(),
            rules: RoundRules {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                grid_budgets: vec![Some(5), Some(10), None],
            },
            page_size: DEFAULT_PAGE_SIZE,
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_MINUTES * 60),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    data: RawDataPaths,
    max_attempts: Option<u32>,
    /// `null` entries mean an unlimited budget.
    grid_error_budgets: Option<Vec<Option<u32>>>,
    leaderboard_page_size: Option<usize>,
    session_idle_minutes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the `data` section; missing entries keep their default path.
struct RawDataPaths {
    stations: Option<PathBuf>,
    min_stops: Option<PathBuf>,
    min_transfers: Option<PathBuf>,
    nations: Option<PathBuf>,
    photo_problems: Option<PathBuf>,
    grid_problems: Option<PathBuf>,
    leaderboard: Option<PathBuf>,
}

impl From<RawDataPaths> for DataPaths {
    fn from(value: RawDataPaths) -> Self {
        let defaults = DataPaths::default();
        Self {
            stations: value.stations.unwrap_or(defaults.stations),
            min_stops: value.min_stops.unwrap_or(defaults.min_stops),
            min_transfers: value.min_transfers.unwrap_or(defaults.min_transfers),
            nations: value.nations.unwrap_or(defaults.nations),
            photo_problems: value.photo_problems.unwrap_or(defaults.photo_problems),
            grid_problems: value.grid_problems.unwrap_or(defaults.grid_problems),
            leaderboard: value.leaderboard.unwrap_or(defaults.leaderboard),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            data: value.data.into(),
            rules: RoundRules {
                max_attempts: value
                    .max_attempts
                    .filter(|attempts| *attempts > 0)
                    .unwrap_or(defaults.rules.max_attempts),
                grid_budgets: value
                    .grid_error_budgets
                    .unwrap_or(defaults.rules.grid_budgets),
            },
            page_size: value
                .leaderboard_page_size
                .filter(|size| *size > 0)
                .unwrap_or(defaults.page_size),
            session_idle: value
                .session_idle_minutes
                .filter(|minutes| *minutes > 0)
                .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
                .unwrap_or(defaults.session_idle),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
