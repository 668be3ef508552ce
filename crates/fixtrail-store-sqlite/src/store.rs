// crates/fixtrail-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Sample Store
// Description: Durable SampleStore backed by SQLite WAL.
// Purpose: Persist buffered fixes with crash-safe, all-or-nothing writes.
// Dependencies: fixtrail-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`SampleStore`] using `SQLite`. Fixes live
//! in a single `fixes` table whose `AUTOINCREMENT` key doubles as the
//! [`FixId`], so identifiers are never reused even after a clear. Reads are
//! ordered by capture time descending with the id as tie-breaker. Rows that
//! fail validation on read are reported as corruption instead of being
//! silently skipped.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use fixtrail_core::Fix;
use fixtrail_core::FixId;
use fixtrail_core::SampleStore;
use fixtrail_core::StoreError;
use fixtrail_core::StoredFix;
use fixtrail_core::Timestamp;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Column list shared by every fix query.
const FIX_COLUMNS: &str = "id, latitude, longitude, accuracy, altitude, speed, captured_at";

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode; every commit reaches stable storage.
    #[default]
    Full,
    /// Normal synchronous mode; the last commits may roll back on power loss.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` sample store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with durable defaults for `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row fails validation.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Maps an engine error into a store error.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err adapter.")]
fn db_err(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed sample store with WAL support.
#[derive(Clone)]
pub struct SqliteSampleStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteSampleStore {
    /// Opens (or creates) an `SQLite`-backed sample store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized, or carries an unsupported schema version.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Inserts one fix in its own transaction.
    fn insert_fix(&self, fix: &Fix) -> Result<FixId, SqliteStoreError> {
        fix.validate().map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_err)?;
        tx.execute(
            "INSERT INTO fixes (latitude, longitude, accuracy, altitude, speed, captured_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                fix.latitude,
                fix.longitude,
                fix.accuracy,
                fix.altitude,
                fix.speed,
                fix.captured_at.as_unix_millis()
            ],
        )
        .map_err(db_err)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(db_err)?;
        drop(guard);
        Ok(FixId::new(id))
    }

    /// Loads every fix, newest first.
    fn load_fixes(&self) -> Result<Vec<StoredFix>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!(
                "SELECT {FIX_COLUMNS} FROM fixes ORDER BY captured_at DESC, id DESC"
            ))
            .map_err(db_err)?;
        let rows = statement
            .query_map(params![], |row| {
                Ok(StoredFix {
                    id: FixId::new(row.get(0)?),
                    fix: Fix {
                        latitude: row.get(1)?,
                        longitude: row.get(2)?,
                        accuracy: row.get(3)?,
                        altitude: row.get(4)?,
                        speed: row.get(5)?,
                        captured_at: Timestamp::from_unix_millis(row.get(6)?),
                    },
                })
            })
            .map_err(db_err)?;
        let mut fixes = Vec::new();
        for row in rows {
            let stored = row.map_err(db_err)?;
            stored.fix.validate().map_err(|err| {
                SqliteStoreError::Corrupt(format!("fix {}: {err}", stored.id.get()))
            })?;
            fixes.push(stored);
        }
        Ok(fixes)
    }

    /// Counts stored fixes.
    fn count_fixes(&self) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 =
            guard.query_row("SELECT COUNT(*) FROM fixes", params![], |row| row.get(0)).map_err(db_err)?;
        drop(guard);
        u64::try_from(count).map_err(|_| SqliteStoreError::Corrupt("negative fix count".to_string()))
    }

    /// Deletes fixes with `id <= last` (every fix when `last` is `None`).
    fn delete_fixes(&self, last: Option<FixId>) -> Result<u64, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_err)?;
        let removed = match last {
            None => tx.execute("DELETE FROM fixes", params![]),
            Some(last) => tx.execute("DELETE FROM fixes WHERE id <= ?1", params![last.get()]),
        }
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        drop(guard);
        u64::try_from(removed).map_err(|_| SqliteStoreError::Db("row count overflow".to_string()))
    }

    /// Runs a trivial query against the connection.
    fn ping(&self) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard.query_row("SELECT 1", params![], |row| row.get::<_, i64>(0)).map_err(db_err)?;
        Ok(())
    }
}

impl SampleStore for SqliteSampleStore {
    fn append(&self, fix: &Fix) -> Result<FixId, StoreError> {
        self.insert_fix(fix).map_err(StoreError::from)
    }

    fn read_all(&self) -> Result<Vec<StoredFix>, StoreError> {
        self.load_fixes().map_err(StoreError::from)
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.count_fixes().map_err(StoreError::from)
    }

    fn clear(&self) -> Result<u64, StoreError> {
        self.delete_fixes(None).map_err(StoreError::from)
    }

    fn clear_through(&self, last: FixId) -> Result<u64, StoreError> {
        self.delete_fixes(Some(last)).map_err(StoreError::from)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.ping().map_err(StoreError::from)
    }
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must be non-empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_err)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_err)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_err)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_err)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_err)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_err)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_err)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_err)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS fixes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    latitude REAL NOT NULL,
                    longitude REAL NOT NULL,
                    accuracy REAL NOT NULL,
                    altitude REAL NOT NULL,
                    speed REAL NOT NULL,
                    captured_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_fixes_captured_at
                    ON fixes (captured_at DESC, id DESC);",
            )
            .map_err(db_err)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_err)?;
    Ok(())
}
