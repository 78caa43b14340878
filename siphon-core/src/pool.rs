//! Process-wide SQLite connection pool.
//!
//! Opened once at startup with a fixed number of connections and shared by
//! all workers; each worker checks out its own session for the duration of
//! one record, so no session is ever used by two workers at once. Dropping
//! the pool closes the connections.
//!
//! SQLite serializes writers, so the pool bounds concurrency rather than
//! providing parallel writes; WAL mode plus a busy timeout keep concurrent
//! workers from failing on lock contention.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{Result, SiphonError};

struct PoolInner {
    idle: Mutex<Vec<Connection>>,
    available: Condvar,
}

/// Fixed-size pool of SQLite connections to one database file.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
    size: usize,
    db_path: PathBuf,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("db_path", &self.db_path)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl ConnectionPool {
    /// Open a pool of `config.pool_size` connections to the database at
    /// `path`, creating the file if needed and applying pragmas.
    ///
    /// # Errors
    /// Returns [`SiphonError::Config`] if the pool size is zero, or
    /// [`SiphonError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &DatabaseConfig) -> Result<Self> {
        if config.pool_size == 0 {
            return Err(SiphonError::Config("pool_size must be at least 1".into()));
        }
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let mut connections = Vec::with_capacity(config.pool_size);
        for _ in 0..config.pool_size {
            let conn = Connection::open_with_flags(&db_path, flags)?;
            if config.wal_mode {
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            }
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
            conn.execute_batch(&format!(
                "PRAGMA busy_timeout = {};",
                config.busy_timeout_ms
            ))?;
            connections.push(conn);
        }

        info!(
            path = %db_path.display(),
            size = config.pool_size,
            wal = config.wal_mode,
            "Connection pool opened"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(connections),
                available: Condvar::new(),
            }),
            size: config.pool_size,
            db_path,
        })
    }

    /// Check out a connection, blocking until one is free.
    ///
    /// The returned guard hands the connection back on drop.
    #[must_use]
    pub fn checkout(&self) -> PooledConnection {
        let mut idle = self.inner.idle.lock();
        let conn = loop {
            if let Some(conn) = idle.pop() {
                break conn;
            }
            self.inner.available.wait(&mut idle);
        };
        drop(idle);
        debug!("Connection checked out");
        PooledConnection {
            conn: Some(conn),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Total number of connections the pool was opened with.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Path to the underlying database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `PRAGMA integrity_check` on one pooled connection.
    ///
    /// Returns `Ok(true)` if the database passes.
    ///
    /// # Errors
    /// Returns [`SiphonError::Database`] if the check query itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let conn = self.checkout();
        let result: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

/// RAII guard for a checked-out connection.
///
/// Dereferences to [`Connection`]; returned to the pool on drop.
pub struct PooledConnection {
    conn: Option<Connection>,
    inner: Arc<PoolInner>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // `conn` is only None after drop has run.
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.inner.idle.lock().push(conn);
            self.inner.available.notify_one();
        }
    }
}
