pub mod migrations;
pub mod models;
pub mod queries;

use std::path::Path;
use std::sync::Mutex;

use courier_types::{Error, Result};
use rusqlite::{Connection, Transaction};
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(map_sqlite_err)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(map_sqlite_err)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(map_sqlite_err)?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by the test suites.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_err)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(map_sqlite_err)?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Storage(format!("DB lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Run `f` inside a transaction. The write and everything `f` does with
    /// it commit together or not at all; an `Err` from `f` rolls the whole
    /// transaction back.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| Error::Storage(format!("DB lock poisoned: {e}")))?;
        let tx = conn.transaction().map_err(map_sqlite_err)?;
        let out = f(&tx)?;
        tx.commit().map_err(map_sqlite_err)?;
        Ok(out)
    }
}

/// Map a rusqlite error onto the engine taxonomy. Constraint failures are
/// dangling foreign keys from the caller's point of view.
pub(crate) fn map_sqlite_err(e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(ffi, msg)
            if ffi.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::IntegrityViolation(
                msg.unwrap_or_else(|| "constraint violation".to_string()),
            )
        }
        other => Error::Storage(other.to_string()),
    }
}
