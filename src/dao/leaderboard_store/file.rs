use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tempfile::NamedTempFile;
use tracing::info;

use crate::dao::{
    leaderboard_store::LeaderboardStore,
    models::{CounterEntity, LeaderboardRowEntity, LeaderboardTableEntity},
    storage::{StorageError, StorageResult},
};

const SUCCESS_SUFFIX: &str = "_success";
const ATTEMPTS_SUFFIX: &str = "_attempts";
const FIXED_COLUMNS: [&str; 3] = ["timestamp", "class", "name"];

/// Leaderboard kept in a single CSV file, rewritten atomically on every save.
#[derive(Clone)]
pub struct CsvLeaderboardStore {
    path: Arc<Path>,
    modules: Arc<[String]>,
}

impl CsvLeaderboardStore {
    /// Store backed by `path`; `modules` are the columns written even when nobody played them.
    pub fn new(path: impl Into<PathBuf>, modules: Vec<String>) -> Self {
        Self {
            path: Arc::from(path.into()),
            modules: Arc::from(modules),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> StorageResult<LeaderboardTableEntity> {
        let mut reader = match csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
        {
            Ok(reader) => reader,
            Err(err) if is_not_found(&err) => {
                let table = LeaderboardTableEntity {
                    modules: self.modules.to_vec(),
                    rows: Vec::new(),
                };
                self.write_table(&table)?;
                info!(path = %self.path.display(), "created empty leaderboard file");
                return Ok(table);
            }
            Err(err) => return Err(self.unavailable("failed to open leaderboard", err)),
        };

        let headers = reader
            .headers()
            .map_err(|err| self.unavailable("failed to read leaderboard header", err))?
            .clone();
        let columns: Vec<&str> = headers.iter().collect();
        if let Some(missing) = FIXED_COLUMNS
            .into_iter()
            .find(|fixed| !columns.contains(fixed))
        {
            return Err(StorageError::Malformed(format!(
                "`{}` has no `{missing}` column",
                self.path.display()
            )));
        }

        let mut modules: Vec<String> = self.modules.to_vec();
        for column in columns.iter().skip(FIXED_COLUMNS.len()) {
            let module = column
                .strip_suffix(SUCCESS_SUFFIX)
                .or_else(|| column.strip_suffix(ATTEMPTS_SUFFIX));
            if let Some(module) = module
                && !modules.iter().any(|known| known == module)
            {
                modules.push(module.to_owned());
            }
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| self.unavailable("failed to read leaderboard row", err))?;
            let field = |name: &str| {
                columns
                    .iter()
                    .position(|column| *column == name)
                    .and_then(|index| record.get(index))
                    .unwrap_or_default()
            };

            let class = field("class");
            let name = field("name");
            if class.is_empty() && name.is_empty() {
                continue;
            }

            let counters = modules
                .iter()
                .map(|module| {
                    let counter = CounterEntity {
                        success: parse_count(field(&format!("{module}{SUCCESS_SUFFIX}"))),
                        attempts: parse_count(field(&format!("{module}{ATTEMPTS_SUFFIX}"))),
                    };
                    (module.clone(), counter)
                })
                .collect::<IndexMap<_, _>>();

            rows.push(LeaderboardRowEntity {
                timestamp: field("timestamp").to_owned(),
                class: class.to_owned(),
                name: name.to_owned(),
                counters,
            });
        }

        Ok(LeaderboardTableEntity { modules, rows })
    }

    fn write_table(&self, table: &LeaderboardTableEntity) -> StorageResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .map_err(|err| self.unavailable("failed to create leaderboard directory", err))?;

        let mut temp = NamedTempFile::new_in(&parent)
            .map_err(|err| self.unavailable("failed to create temporary leaderboard", err))?;
        {
            let mut writer = csv::Writer::from_writer(temp.as_file_mut());

            let header = FIXED_COLUMNS.iter().map(|column| column.to_string()).chain(
                table.modules.iter().flat_map(|module| {
                    [
                        format!("{module}{SUCCESS_SUFFIX}"),
                        format!("{module}{ATTEMPTS_SUFFIX}"),
                    ]
                }),
            );
            writer
                .write_record(header)
                .map_err(|err| self.unavailable("failed to write leaderboard header", err))?;

            for row in &table.rows {
                let counters = table.modules.iter().flat_map(|module| {
                    let counter = row.counters.get(module).copied().unwrap_or_default();
                    [counter.success.to_string(), counter.attempts.to_string()]
                });
                let record = [row.timestamp.clone(), row.class.clone(), row.name.clone()]
                    .into_iter()
                    .chain(counters);
                writer
                    .write_record(record)
                    .map_err(|err| self.unavailable("failed to write leaderboard row", err))?;
            }
            writer
                .flush()
                .map_err(|err| self.unavailable("failed to flush leaderboard", err))?;
        }

        temp.persist(&self.path)
            .map_err(|err| self.unavailable("failed to replace leaderboard file", err))?;
        Ok(())
    }

    fn unavailable(
        &self,
        what: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> StorageError {
        StorageError::unavailable(format!("{what} `{}`", self.path.display()), source)
    }
}

impl LeaderboardStore for CsvLeaderboardStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<LeaderboardTableEntity>> {
        let store = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || store.read_table())
                .await
                .map_err(|err| StorageError::unavailable("leaderboard read task failed".into(), err))?
        })
    }

    fn save(&self, table: LeaderboardTableEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || store.write_table(&table))
                .await
                .map_err(|err| StorageError::unavailable("leaderboard write task failed".into(), err))?
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let metadata = tokio::fs::metadata(&store.path)
                .await
                .map_err(|err| store.unavailable("leaderboard file is not accessible", err))?;
            if !metadata.is_file() {
                return Err(store.unavailable(
                    "leaderboard path is not a regular file",
                    std::io::Error::from(ErrorKind::InvalidInput),
                ));
            }
            if metadata.permissions().readonly() {
                return Err(store.unavailable(
                    "leaderboard file is read-only",
                    std::io::Error::from(ErrorKind::PermissionDenied),
                ));
            }
            Ok(())
        })
    }
}

/// Counters written by hand may hold `N/A`, blanks or decimals; anything unreadable counts as zero.
fn parse_count(raw: &str) -> u32 {
    raw.parse::<u32>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite() && *value >= 0.0)
                .map(|value| value as u32)
        })
        .unwrap_or(0)
}

fn is_not_found(err: &csv::Error) -> bool {
    matches!(err.kind(), csv::ErrorKind::Io(io) if io.kind() == ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store(dir: &TempDir) -> CsvLeaderboardStore {
        CsvLeaderboardStore::new(
            dir.path().join("scores").join("leaderboard.csv"),
            vec!["metro-guess".into(), "country-photo".into()],
        )
    }

    #[tokio::test]
    async fn missing_file_is_created_with_header() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let table = store.load().await.unwrap();
        assert!(table.rows.is_empty());

        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            contents.lines().next(),
            Some(
                "timestamp,class,name,metro-guess_success,metro-guess_attempts,\
                 country-photo_success,country-photo_attempts"
            )
        );
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn saved_rows_are_read_back() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut counters = IndexMap::new();
        counters.insert(
            "metro-guess".to_string(),
            CounterEntity {
                success: 2,
                attempts: 9,
            },
        );
        let table = LeaderboardTableEntity {
            modules: vec!["metro-guess".into(), "country-photo".into()],
            rows: vec![LeaderboardRowEntity {
                timestamp: "2025-01-01 08:00:00".into(),
                class: "3A".into(),
                name: "Alice".into(),
                counters,
            }],
        };

        store.save(table).await.unwrap();
        let loaded = store.load().await.unwrap();

        let row = &loaded.rows[0];
        assert_eq!(row.name, "Alice");
        assert_eq!(row.counters["metro-guess"].attempts, 9);
        assert_eq!(row.counters["country-photo"], CounterEntity::default());
    }

    #[tokio::test]
    async fn unreadable_counters_count_as_zero_and_extra_columns_are_kept() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            "timestamp,class,name,metro-guess_success,metro-guess_attempts,grid-puzzle-1_success,grid-puzzle-1_attempts\n\
             2025-01-01 08:00:00,3A,Bob,N/A,4.0,1,\n",
        )
        .unwrap();

        let table = store.load().await.unwrap();
        assert!(table.modules.contains(&"grid-puzzle-1".to_string()));
        let row = &table.rows[0];
        assert_eq!(row.counters["metro-guess"].success, 0);
        assert_eq!(row.counters["metro-guess"].attempts, 4);
        assert_eq!(row.counters["grid-puzzle-1"].success, 1);
        assert_eq!(row.counters["grid-puzzle-1"].attempts, 0);
    }

    #[tokio::test]
    async fn header_without_identity_columns_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "when,who\n2025-01-01,Bob\n").unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));
    }

    #[tokio::test]
    async fn directory_in_place_of_the_file_is_unhealthy() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path()).unwrap();

        assert!(store.health_check().await.is_err());
        assert!(store.save(LeaderboardTableEntity::default()).await.is_err());
    }

    #[test]
    fn counts_parse_leniently() {
        assert_eq!(parse_count("7"), 7);
        assert_eq!(parse_count("3.0"), 3);
        assert_eq!(parse_count("N/A"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("-2"), 0);
    }
}
