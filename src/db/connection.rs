use rusqlite::Connection;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crate::errors::StorageError;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

// Thread-local connection slot, remembered together with the file it points at.
thread_local! {
    static DB_CONN: RefCell<Option<(PathBuf, Connection)>> = RefCell::new(None);
}

#[derive(Clone, Debug)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Provides a mutable connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError>,
    {
        DB_CONN
            .try_with(|cell| {
                let mut slot = cell.borrow_mut();

                let stale = match slot.as_ref() {
                    Some((path, _)) => path != &self.path,
                    None => true,
                };
                if stale {
                    let conn = Connection::open(&self.path).map_err(|e| {
                        StorageError::Unavailable(format!(
                            "open {} failed: {e}",
                            self.path.display()
                        ))
                    })?;
                    *slot = Some((self.path.clone(), conn));
                }

                match slot.as_mut() {
                    Some((_, conn)) => f(conn),
                    None => Err(StorageError::Unavailable("no connection".to_string())),
                }
            })
            .map_err(|_| StorageError::Unavailable("connection slot torn down".to_string()))?
    }
}

/// Creates the listing and scrape-run tables if they are missing.
pub fn init_db(db: &Database) -> Result<(), StorageError> {
    db.with_conn(|conn| {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StorageError::Schema(e.to_string()))
    })?;

    log::info!("Database ready at {}", db.path().display());
    Ok(())
}
