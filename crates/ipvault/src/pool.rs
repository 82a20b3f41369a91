//! Bounded pool of store connections shared by all callers.
//!
//! Connections are created lazily up to `size + max_overflow`, handed out
//! exclusively, and returned to the idle set on drop. Connections older
//! than `recycle` are closed instead of being reused; a replacement is
//! opened lazily by a later acquire. Acquisition is the only operation
//! that may block, and only up to `timeout`.

use std::collections::VecDeque;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Notify;
use tokio_rusqlite::Connection;

use ipvault_core::{Result, StoreError};

/// Pool sizing and lifetime parameters.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Connections kept persistently in the pool.
    pub size: usize,
    /// Extra transient connections allowed beyond `size`.
    pub max_overflow: usize,
    /// Maximum wait for a connection before `PoolTimeout`.
    pub timeout: Duration,
    /// Maximum connection age before forced replacement.
    pub recycle: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 5,
            max_overflow: 10,
            timeout: Duration::from_secs(30),
            recycle: Duration::from_secs(3600),
        }
    }
}

/// A bounded, reusable set of store connections.
///
/// Cheap to clone; all clones share the same bookkeeping.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    path: PathBuf,
    config: PoolConfig,
    state: Mutex<PoolState>,
    released: Notify,
}

struct PoolState {
    idle: VecDeque<IdleConn>,
    live: usize,
    closed: bool,
}

struct IdleConn {
    conn: Connection,
    opened_at: Instant,
}

enum AcquirePlan {
    Reuse(IdleConn),
    Open,
    Wait,
}

impl ConnectionPool {
    /// Creates a pool for the database at `path`.
    ///
    /// No connections are opened until the first acquire.
    pub fn new(path: impl AsRef<Path>, config: PoolConfig) -> Self {
        tracing::info!(
            path = %path.as_ref().display(),
            size = config.size,
            max_overflow = config.max_overflow,
            timeout_ms = config.timeout.as_millis() as u64,
            recycle_ms = config.recycle.as_millis() as u64,
            "Connection pool created"
        );

        Self {
            inner: Arc::new(PoolInner {
                path: path.as_ref().to_path_buf(),
                config,
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    live: 0,
                    closed: false,
                }),
                released: Notify::new(),
            }),
        }
    }

    /// Acquires a connection, blocking the calling task up to `timeout`.
    ///
    /// Reuses an idle connection younger than `recycle` when one exists,
    /// opens a new connection while capacity remains, and otherwise waits
    /// for a release. A pool whose total capacity is zero can never
    /// satisfy a request and fails with `PoolExhausted` immediately.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let capacity = self.inner.config.size + self.inner.config.max_overflow;
        if capacity == 0 {
            return Err(StoreError::PoolExhausted);
        }

        let deadline = Instant::now() + self.inner.config.timeout;

        loop {
            let plan = {
                let mut state = self.inner.state.lock().expect("pool state lock poisoned");
                if state.closed {
                    return Err(StoreError::Connection("connection pool is closed".into()));
                }

                // Discard idle connections past their recycle age; a
                // replacement is opened lazily below.
                let mut reuse = None;
                while let Some(idle) = state.idle.pop_front() {
                    if idle.opened_at.elapsed() >= self.inner.config.recycle {
                        state.live -= 1;
                        tracing::debug!("Recycled stale idle connection");
                        continue;
                    }
                    reuse = Some(idle);
                    break;
                }

                match reuse {
                    Some(idle) => AcquirePlan::Reuse(idle),
                    None if state.live < capacity => {
                        // Reserve the slot before opening so concurrent
                        // acquirers cannot exceed capacity.
                        state.live += 1;
                        AcquirePlan::Open
                    }
                    None => AcquirePlan::Wait,
                }
            };

            match plan {
                AcquirePlan::Reuse(idle) => {
                    return Ok(PooledConnection {
                        conn: Some(idle.conn),
                        opened_at: idle.opened_at,
                        pool: Arc::clone(&self.inner),
                    });
                }
                AcquirePlan::Open => match Connection::open(&self.inner.path).await {
                    Ok(conn) => {
                        tracing::debug!(path = %self.inner.path.display(), "Opened store connection");
                        return Ok(PooledConnection {
                            conn: Some(conn),
                            opened_at: Instant::now(),
                            pool: Arc::clone(&self.inner),
                        });
                    }
                    Err(e) => {
                        let mut state =
                            self.inner.state.lock().expect("pool state lock poisoned");
                        state.live -= 1;
                        drop(state);
                        // The freed slot may satisfy a blocked acquirer.
                        self.inner.released.notify_one();
                        return Err(StoreError::Connection(e.to_string()));
                    }
                },
                AcquirePlan::Wait => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(StoreError::PoolTimeout(self.inner.config.timeout));
                    }
                    let released = self.inner.released.notified();
                    if tokio::time::timeout(deadline - now, released).await.is_err() {
                        return Err(StoreError::PoolTimeout(self.inner.config.timeout));
                    }
                    // Woken by a release; loop and race for the connection.
                }
            }
        }
    }

    /// Connections in use beyond the persistent `size`.
    pub fn overflow(&self) -> usize {
        self.status().overflow
    }

    /// Snapshot of the pool's bookkeeping (passive - no I/O).
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state.lock().expect("pool state lock poisoned");
        let checked_out = state.live - state.idle.len();
        PoolStatus {
            live: state.live,
            idle: state.idle.len(),
            checked_out,
            overflow: checked_out.saturating_sub(self.inner.config.size),
        }
    }

    /// Closes the pool: drains the idle set and rejects further acquires.
    ///
    /// Checked-out connections are closed as their holders release them.
    pub fn close(&self) {
        let drained = {
            let mut state = self.inner.state.lock().expect("pool state lock poisoned");
            state.closed = true;
            let drained: Vec<IdleConn> = state.idle.drain(..).collect();
            state.live -= drained.len();
            drained
        };
        tracing::info!(drained = drained.len(), "Connection pool closed");
        // Wake all waiters so they observe the closed flag.
        self.inner.released.notify_waiters();
    }
}

/// Pool bookkeeping snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolStatus {
    pub live: usize,
    pub idle: usize,
    pub checked_out: usize,
    pub overflow: usize,
}

/// A connection checked out of the pool, exclusively owned by the caller.
///
/// Dropping the guard releases the connection: back to the idle set when
/// still younger than `recycle`, closed otherwise.
pub struct PooledConnection {
    conn: Option<Connection>,
    opened_at: Instant,
    pool: Arc<PoolInner>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection already released")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        let stale = self.opened_at.elapsed() >= self.pool.config.recycle;
        {
            let mut state = self.pool.state.lock().expect("pool state lock poisoned");
            if stale || state.closed {
                state.live -= 1;
                tracing::debug!(stale, "Closed connection on release");
            } else {
                state.idle.push_back(IdleConn {
                    conn,
                    opened_at: self.opened_at,
                });
            }
        }
        // Either an idle connection or a free slot is now available.
        self.pool.released.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool(config: PoolConfig) -> (ConnectionPool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnectionPool::new(dir.path().join("pool.db"), config);
        (pool, dir)
    }

    fn quick_config() -> PoolConfig {
        PoolConfig {
            size: 2,
            max_overflow: 1,
            timeout: Duration::from_millis(200),
            recycle: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn test_pool_starts_with_zero_connections() {
        let (pool, _dir) = test_pool(quick_config());

        let status = pool.status();

        assert_eq!(status.live, 0);
        assert_eq!(status.idle, 0);
        assert_eq!(status.checked_out, 0);
    }

    #[tokio::test]
    async fn test_release_returns_connection_to_idle_set() {
        let (pool, _dir) = test_pool(quick_config());

        let conn = pool.acquire().await.unwrap();
        assert_eq!(pool.status().checked_out, 1);

        drop(conn);

        let status = pool.status();
        assert_eq!(status.live, 1);
        assert_eq!(status.idle, 1);
        assert_eq!(status.checked_out, 0);
    }

    #[tokio::test]
    async fn test_acquire_reuses_idle_connection() {
        let (pool, _dir) = test_pool(quick_config());

        let conn = pool.acquire().await.unwrap();
        drop(conn);
        let _conn = pool.acquire().await.unwrap();

        // Reuse, not a second open.
        assert_eq!(pool.status().live, 1);
    }

    #[tokio::test]
    async fn test_overflow_counts_connections_beyond_size() {
        let (pool, _dir) = test_pool(quick_config());

        let _a = pool.acquire().await.unwrap();
        let _b = pool.acquire().await.unwrap();
        assert_eq!(pool.overflow(), 0);

        let _c = pool.acquire().await.unwrap();
        assert_eq!(pool.overflow(), 1);
    }

    #[tokio::test]
    async fn test_saturated_pool_times_out_no_earlier_than_configured() {
        let (pool, _dir) = test_pool(quick_config());

        // size + max_overflow = 3 holders, none released.
        let _a = pool.acquire().await.unwrap();
        let _b = pool.acquire().await.unwrap();
        let _c = pool.acquire().await.unwrap();

        let started = Instant::now();
        let result = pool.acquire().await;

        assert_eq!(
            result.err(),
            Some(StoreError::PoolTimeout(Duration::from_millis(200)))
        );
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_release_unblocks_waiting_acquirer() {
        let (pool, _dir) = test_pool(PoolConfig {
            size: 1,
            max_overflow: 0,
            timeout: Duration::from_secs(5),
            recycle: Duration::from_secs(3600),
        });

        let held = pool.acquire().await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);

        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_zero_capacity_pool_is_exhausted_immediately() {
        let (pool, _dir) = test_pool(PoolConfig {
            size: 0,
            max_overflow: 0,
            timeout: Duration::from_secs(5),
            recycle: Duration::from_secs(3600),
        });

        let started = Instant::now();
        let result = pool.acquire().await;

        assert_eq!(result.err(), Some(StoreError::PoolExhausted));
        // Fails before the timeout, not after it.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_stale_connection_is_closed_on_release() {
        let (pool, _dir) = test_pool(PoolConfig {
            size: 1,
            max_overflow: 0,
            timeout: Duration::from_secs(5),
            recycle: Duration::ZERO,
        });

        let conn = pool.acquire().await.unwrap();
        drop(conn);

        // Recycled instead of returned to the idle set.
        let status = pool.status();
        assert_eq!(status.live, 0);
        assert_eq!(status.idle, 0);

        // The next acquire opens a fresh replacement.
        let _conn = pool.acquire().await.unwrap();
        assert_eq!(pool.status().live, 1);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_acquire() {
        let (pool, _dir) = test_pool(quick_config());

        let conn = pool.acquire().await.unwrap();
        drop(conn);
        pool.close();

        let result = pool.acquire().await;

        assert!(matches!(result, Err(StoreError::Connection(_))));
        assert_eq!(pool.status().live, 0);
    }

    #[tokio::test]
    async fn test_checked_out_connection_is_usable() {
        let (pool, _dir) = test_pool(quick_config());

        let conn = pool.acquire().await.unwrap();
        let answer: i64 = conn
            .call(|conn| Ok(conn.query_row("SELECT 41 + 1", [], |row| row.get(0))?))
            .await
            .unwrap();

        assert_eq!(answer, 42);
    }
}
