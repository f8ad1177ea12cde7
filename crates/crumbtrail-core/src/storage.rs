//! Persistent storage for the trail.
//!
//! The trail is an append-only log: points can be inserted and replayed in
//! insertion order, never updated or deleted. [`SqliteStore`] keeps it in a
//! single SQLite table:
//!
//! ```sql
//! CREATE TABLE points (
//!     id  INTEGER PRIMARY KEY AUTOINCREMENT,
//!     lat REAL NOT NULL,
//!     lng REAL NOT NULL
//! );
//! ```
//!
//! The schema version lives in `PRAGMA user_version`. Opening a database
//! whose version differs from [`SCHEMA_VERSION`] drops the table and creates
//! it again. Old trail data is discarded on a version change.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::Point;

/// Current on-disk schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Name of the trail table.
pub const TABLE_NAME: &str = "points";

/// Storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The SQLite engine rejected an operation (disk full, corruption, locked file).
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The directory holding the database could not be created.
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A thread panicked while holding the store lock.
    #[error("Storage lock poisoned")]
    LockPoisoned,

    /// A low-level I/O error from a non-SQLite backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Durable, ordered, append-only store of trail points.
///
/// Implementations must be safe to call from several threads at once:
/// inserts are serialized against each other and against reads, so ids are
/// assigned without collisions and `get_all` never sees a half-written point.
pub trait PointStore: Send + Sync {
    /// Append a point and return its id.
    ///
    /// The point must be durable when this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the medium cannot be written.
    fn insert(&self, latitude: f64, longitude: f64) -> StorageResult<i64>;

    /// All points in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the medium cannot be read.
    fn get_all(&self) -> StorageResult<Vec<Point>>;
}

impl<T: PointStore + ?Sized> PointStore for Arc<T> {
    fn insert(&self, latitude: f64, longitude: f64) -> StorageResult<i64> {
        (**self).insert(latitude, longitude)
    }

    fn get_all(&self) -> StorageResult<Vec<Point>> {
        (**self).get_all()
    }
}

/// SQLite-backed [`PointStore`].
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a trail database at `path`.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened and initialized.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        info!(path = %path.display(), "Opened trail database");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Create a store backed by an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Path of the database file, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Schema version recorded in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read.
    pub fn schema_version(&self) -> StorageResult<i32> {
        let conn = self.lock()?;
        Ok(read_user_version(&conn)?)
    }

    fn init(conn: &Connection) -> StorageResult<()> {
        // Every insert must reach the disk before it is acknowledged.
        conn.execute_batch("PRAGMA synchronous = FULL;")?;

        let version = read_user_version(conn)?;
        if version == SCHEMA_VERSION {
            conn.execute_batch(&create_table_sql())?;
            return Ok(());
        }

        if version == 0 {
            debug!("Initializing trail schema v{SCHEMA_VERSION}");
        } else {
            warn!(
                from = version,
                to = SCHEMA_VERSION,
                "Upgrading trail database, which will destroy all old data"
            );
        }

        conn.execute_batch(&format!(
            "BEGIN;
             DROP TABLE IF EXISTS {TABLE_NAME};
             {create}
             PRAGMA user_version = {SCHEMA_VERSION};
             COMMIT;",
            create = create_table_sql(),
        ))?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl PointStore for SqliteStore {
    fn insert(&self, latitude: f64, longitude: f64) -> StorageResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            &format!("INSERT INTO {TABLE_NAME} (lat, lng) VALUES (?1, ?2)"),
            params![latitude, longitude],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, latitude, longitude, "Stored point");
        Ok(id)
    }

    fn get_all(&self) -> StorageResult<Vec<Point>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT id, lat, lng FROM {TABLE_NAME} ORDER BY id ASC"
        ))?;
        let points = stmt
            .query_map([], |row| {
                Ok(Point {
                    id: row.get(0)?,
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(points)
    }
}

fn create_table_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
            id  INTEGER PRIMARY KEY AUTOINCREMENT,
            lat REAL NOT NULL,
            lng REAL NOT NULL
        );"
    )
}

fn read_user_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}
