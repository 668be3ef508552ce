//! `SQLite` crash writer for store durability tests.
// crates/fixtrail-store-sqlite/src/bin/sqlite_crash_writer.rs
// ============================================================================
// Binary: SQLite Crash Writer
// Description: Commits some fixes, then crashes during an uncommitted append.
// Purpose: Support durability tests for crash recovery behavior.
// Dependencies: fixtrail-core, fixtrail-store-sqlite, rusqlite
// ============================================================================

use std::env;
use std::path::PathBuf;

use fixtrail_core::Fix;
use fixtrail_core::SampleStore;
use fixtrail_core::Timestamp;
use fixtrail_store_sqlite::SqliteSampleStore;
use fixtrail_store_sqlite::SqliteStoreConfig;
use rusqlite::params;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let path = args.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing sqlite path")
    })?;
    let committed: i64 = args.next().map_or(Ok(3), |value| value.parse())?;
    let path = PathBuf::from(path);

    let store = SqliteSampleStore::new(&SqliteStoreConfig::at(&path))?;
    for index in 0 .. committed {
        store.append(&sample_fix(index))?;
    }

    let mut conn = rusqlite::Connection::open(&path)?;
    conn.execute_batch("PRAGMA journal_mode = wal; PRAGMA synchronous = full;")?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO fixes (latitude, longitude, accuracy, altitude, speed, captured_at) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6)",
        params![0.0_f64, 0.0_f64, 1.0_f64, 0.0_f64, 0.0_f64, i64::MAX],
    )?;

    std::process::abort();
}

/// Builds the fix committed at position `index`, 30 seconds apart.
fn sample_fix(index: i64) -> Fix {
    Fix {
        latitude: -23.55,
        longitude: -46.63,
        accuracy: 5.0,
        altitude: 760.0,
        speed: 0.0,
        captured_at: Timestamp::from_unix_millis(1_700_000_000_000 + index * 30_000),
    }
}
