//! Persistent storage using SQLite (rusqlite).
//!
//! This module provides:
//! - OS-standard data directory location (via `directories` crate)
//! - credential checking against salted password digests
//! - the player's saved board, score and won flag
//! - per-slot statistics accumulation into lifetime totals
//!
//! Schema: `users` (credentials), `player_data` (one row per player),
//! `stats_current` (last session snapshot) and `stats_global` (lifetime
//! accumulation, summed for counters and min/max-merged for extrema).

use crate::auth;
use crate::game::{spawn, Board};
use crate::stats::{Accumulation, Stat, Stats};
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// Database error from SQLite, with the operation that caused it.
    Database {
        context: &'static str,
        source: rusqlite::Error,
    },
    /// Could not determine a data directory for the database file.
    NoDataDirectory,
    /// Failed to create the data directory.
    CreateDirFailed(std::io::Error),
    /// Account name already taken.
    UserExists(String),
    /// No saved player row for this id; the session requested data
    /// without a valid login.
    NoPlayerData(i64),
    /// A stored row did not decode (bad board text or stats slot).
    CorruptRow(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Database { context, source } => {
                write!(f, "database error during {context}: {source}")
            }
            StorageError::NoDataDirectory => write!(f, "could not determine data directory"),
            StorageError::CreateDirFailed(e) => {
                write!(f, "failed to create data directory: {e}")
            }
            StorageError::UserExists(name) => write!(f, "user {name:?} already exists"),
            StorageError::NoPlayerData(id) => write!(f, "no saved data for player {id}"),
            StorageError::CorruptRow(what) => write!(f, "corrupt stored row: {what}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StorageError::Database { source, .. } => Some(source),
            StorageError::CreateDirFailed(e) => Some(e),
            _ => None,
        }
    }
}

fn db_err(context: &'static str) -> impl FnOnce(rusqlite::Error) -> StorageError {
    move |source| StorageError::Database { context, source }
}

/// Everything persisted for one player, as loaded on `DAT-REQ`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    /// Serialized board, `|`-joined cell exponents.
    pub board: String,
    pub won: bool,
    pub score: i64,
    /// Lifetime statistics accumulated over all sessions.
    pub stats: Stats,
}

/// Handle to the server's SQLite database.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Store, StorageError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(StorageError::CreateDirFailed)?;
        }
        let conn = Connection::open(path).map_err(db_err("open"))?;
        let store = Store { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Store, StorageError> {
        let conn = Connection::open_in_memory().map_err(db_err("open"))?;
        let store = Store { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Default on-disk database location, in the OS-standard data
    /// directory.
    pub fn default_path() -> Result<PathBuf, StorageError> {
        ProjectDirs::from("", "", "slide48")
            .map(|dirs| dirs.data_dir().join("slide48.db"))
            .ok_or(StorageError::NoDataDirectory)
    }

    fn initialize_schema(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     name TEXT NOT NULL UNIQUE,
                     salt BLOB NOT NULL,
                     passwd TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS player_data (
                     id INTEGER PRIMARY KEY,
                     data TEXT NOT NULL,
                     won INTEGER NOT NULL,
                     score INTEGER NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS stats_current (
                     player_id INTEGER NOT NULL,
                     stats_id INTEGER NOT NULL,
                     value INTEGER NOT NULL,
                     PRIMARY KEY (player_id, stats_id)
                 );
                 CREATE TABLE IF NOT EXISTS stats_global (
                     player_id INTEGER NOT NULL,
                     stats_id INTEGER NOT NULL,
                     value INTEGER NOT NULL,
                     PRIMARY KEY (player_id, stats_id)
                 );",
            )
            .map_err(db_err("schema init"))
    }

    /// Create a new account and its starting board (the default initial
    /// spawns on an empty grid).
    pub fn create_user(&self, name: &str, password_hash: &str) -> Result<i64, StorageError> {
        let salt = auth::generate_salt();
        let digest = auth::salted_digest(&salt, password_hash);
        self.conn
            .execute(
                "INSERT INTO users (name, salt, passwd) VALUES (?1, ?2, ?3)",
                params![name, salt.as_slice(), digest],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StorageError::UserExists(name.to_string())
                }
                other => StorageError::Database {
                    context: "create user",
                    source: other,
                },
            })?;
        let id = self.conn.last_insert_rowid();

        let mut board = Board::empty();
        spawn::initial_blocks(&mut board);
        self.conn
            .execute(
                "INSERT INTO player_data (id, data, won, score) VALUES (?1, ?2, 0, 0)",
                params![id, board.serialize()],
            )
            .map_err(db_err("seed player data"))?;
        Ok(id)
    }

    /// Verify credentials. Returns the player id on success, `None` on an
    /// unknown user or a wrong password.
    pub fn check_login(
        &self,
        name: &str,
        password_hash: &str,
    ) -> Result<Option<i64>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, salt, passwd FROM users WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(StorageError::Database {
                    context: "check login",
                    source: other,
                }),
            })?;

        Ok(row.and_then(|(id, salt, digest)| {
            if auth::verify(&salt, &digest, password_hash) {
                Some(id)
            } else {
                None
            }
        }))
    }

    /// Load a player's saved board, flags, score and lifetime stats.
    pub fn load_player(&self, id: i64) -> Result<PlayerRow, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT data, won, score FROM player_data WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Err(StorageError::NoPlayerData(id)),
                other => Err(StorageError::Database {
                    context: "load player",
                    source: other,
                }),
            })?;

        Ok(PlayerRow {
            board: row.0,
            won: row.1,
            score: row.2,
            stats: self.load_lifetime_stats(id)?,
        })
    }

    fn load_lifetime_stats(&self, id: i64) -> Result<Stats, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT stats_id, value FROM stats_global WHERE player_id = ?1")
            .map_err(db_err("load stats"))?;
        let rows = stmt
            .query_map(params![id], |row| {
                Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)?))
            })
            .map_err(db_err("load stats"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err("load stats"))?;

        Stats::from_slots(&rows)
            .ok_or_else(|| StorageError::CorruptRow(format!("stats slots for player {id}")))
    }

    /// Flush a finished session: replace the board row, snapshot the
    /// session stats and fold them into the lifetime totals.
    pub fn save_player(
        &self,
        id: i64,
        board: &str,
        won: bool,
        score: i64,
        session_stats: &Stats,
    ) -> Result<(), StorageError> {
        self.conn
            .execute(
                "REPLACE INTO player_data (id, data, won, score) VALUES (?1, ?2, ?3, ?4)",
                params![id, board, won, score],
            )
            .map_err(db_err("save player"))?;
        self.save_stats(id, session_stats)
    }

    /// Store the session stats snapshot and accumulate each slot into the
    /// lifetime table: sum for counters, max for high-water extrema, min
    /// for "fastest" extrema (which only ever see non-zero values).
    pub fn save_stats(&self, id: i64, stats: &Stats) -> Result<(), StorageError> {
        for stat in Stat::ALL {
            let value = stats.get(stat);
            self.conn
                .execute(
                    "REPLACE INTO stats_current (player_id, stats_id, value)
                     VALUES (?1, ?2, ?3)",
                    params![id, stat.index() as i64, value],
                )
                .map_err(db_err("save stats snapshot"))?;

            let accumulate = match stat.accumulation() {
                Accumulation::Sum => {
                    "INSERT INTO stats_global (player_id, stats_id, value)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT (player_id, stats_id)
                     DO UPDATE SET value = value + excluded.value"
                }
                Accumulation::Max => {
                    if value == 0 {
                        continue;
                    }
                    "INSERT INTO stats_global (player_id, stats_id, value)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT (player_id, stats_id)
                     DO UPDATE SET value = MAX(value, excluded.value)"
                }
                Accumulation::Min => {
                    if value == 0 {
                        continue;
                    }
                    "INSERT INTO stats_global (player_id, stats_id, value)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT (player_id, stats_id)
                     DO UPDATE SET value = MIN(value, excluded.value)"
                }
            };
            self.conn
                .execute(accumulate, params![id, stat.index() as i64, value])
                .map_err(db_err("accumulate stats"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Direction;

    fn store_with_user(name: &str, password: &str) -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .create_user(name, &auth::hash_password(password))
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_create_user_seeds_a_starting_board() {
        let (store, id) = store_with_user("ada", "pw");
        let row = store.load_player(id).unwrap();
        let board = Board::deserialize(&row.board).unwrap();
        assert_eq!(board.empty_cells().len(), 16 - 2);
        assert!(!row.won);
        assert_eq!(row.score, 0);
        assert_eq!(row.stats, Stats::default());
    }

    #[test]
    fn test_duplicate_user_is_rejected() {
        let (store, _) = store_with_user("ada", "pw");
        let result = store.create_user("ada", &auth::hash_password("other"));
        assert!(matches!(result, Err(StorageError::UserExists(_))));
    }

    #[test]
    fn test_check_login_accepts_only_the_right_hash() {
        let (store, id) = store_with_user("ada", "pw");
        let good = auth::hash_password("pw");
        let bad = auth::hash_password("guess");
        assert_eq!(store.check_login("ada", &good).unwrap(), Some(id));
        assert_eq!(store.check_login("ada", &bad).unwrap(), None);
        assert_eq!(store.check_login("nobody", &good).unwrap(), None);
    }

    #[test]
    fn test_load_player_without_row_is_an_error() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.load_player(99),
            Err(StorageError::NoPlayerData(99))
        ));
    }

    #[test]
    fn test_save_player_round_trips_board_and_score() {
        let (store, id) = store_with_user("ada", "pw");
        let mut board = Board::empty();
        board.set(crate::game::Coord::new(0, 0), crate::game::Block::SECOND);
        store
            .save_player(id, &board.serialize(), true, 4096, &Stats::default())
            .unwrap();

        let row = store.load_player(id).unwrap();
        assert_eq!(row.board, board.serialize());
        assert!(row.won);
        assert_eq!(row.score, 4096);
    }

    #[test]
    fn test_stats_accumulate_across_sessions() {
        let (store, id) = store_with_user("ada", "pw");

        let mut first = Stats::default();
        first.record_play(Direction::Left);
        first.add_score(100);
        first.note_highest_score(800);
        first.record_win(120);
        store.save_stats(id, &first).unwrap();

        let mut second = Stats::default();
        second.record_play(Direction::Left);
        second.add_score(50);
        second.note_highest_score(300);
        second.record_win(60);
        store.save_stats(id, &second).unwrap();

        let lifetime = store.load_player(id).unwrap().stats;
        assert_eq!(lifetime.get(Stat::LeftMoves), 2);
        assert_eq!(lifetime.get(Stat::TotalScore), 150);
        assert_eq!(lifetime.get(Stat::HighestScore), 800);
        assert_eq!(lifetime.get(Stat::GameWins), 2);
        assert_eq!(lifetime.get(Stat::FastestWin), 60);
        assert_eq!(lifetime.get(Stat::SlowestWin), 120);
    }

    #[test]
    fn test_zero_extrema_do_not_touch_lifetime_minima() {
        let (store, id) = store_with_user("ada", "pw");

        let mut with_win = Stats::default();
        with_win.record_win(90);
        store.save_stats(id, &with_win).unwrap();

        // A later session without a win must leave the minima alone.
        store.save_stats(id, &Stats::default()).unwrap();

        let lifetime = store.load_player(id).unwrap().stats;
        assert_eq!(lifetime.get(Stat::FastestWin), 90);
    }
}
