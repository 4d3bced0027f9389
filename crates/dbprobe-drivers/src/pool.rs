//! Generic async connection pool with RAII checkout
//!
//! Every backend plugs its native client in through [`ConnectionManager`].
//! The pool bounds concurrency with a semaphore sized `max_open`, keeps up to
//! `max_idle` returned connections for reuse (most recently returned first),
//! and retires connections that outlived `max_lifetime` or sat idle longer
//! than `max_idle_time`.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dbprobe_core::{BoxError, Config};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Opens, validates and tears down native connections for the pool
#[async_trait]
pub trait ConnectionManager: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Open a brand new connection
    async fn connect(&self) -> Result<Self::Connection, BoxError>;

    /// Cheap synchronous check run before an idle connection is reused
    fn has_broken(&self, _conn: &Self::Connection) -> bool {
        false
    }

    /// Gracefully release a connection the pool no longer keeps
    async fn disconnect(&self, conn: Self::Connection) {
        drop(conn);
    }
}

/// Pool errors
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("connection pool is closed")]
    Closed,

    #[error(transparent)]
    Connect(BoxError),
}

/// Sizing and expiry knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// 0 = unlimited
    pub max_open: u32,
    /// 0 = keep no idle connections
    pub max_idle: u32,
    pub max_lifetime: Option<Duration>,
    pub max_idle_time: Option<Duration>,
}

impl PoolOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_open: config.max_open_conns,
            max_idle: config.max_idle_conns,
            max_lifetime: config.conn_max_lifetime,
            max_idle_time: config.conn_max_idle_time,
        }
    }

    /// `max_idle` capped at `max_open` when the latter is bounded
    pub fn effective_max_idle(&self) -> usize {
        if self.max_open > 0 {
            self.max_idle.min(self.max_open) as usize
        } else {
            self.max_idle as usize
        }
    }
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    /// Connections currently open (idle plus checked out)
    pub open: usize,
    pub idle: usize,
    pub in_use: usize,
}

struct Tracked<C> {
    conn: C,
    created_at: Instant,
    returned_at: Instant,
}

struct Shared<M: ConnectionManager> {
    manager: M,
    options: PoolOptions,
    idle: Mutex<VecDeque<Tracked<M::Connection>>>,
    semaphore: Option<Arc<Semaphore>>,
    closed: AtomicBool,
    open: AtomicUsize,
}

impl<M: ConnectionManager> Shared<M> {
    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<Tracked<M::Connection>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn outlived(&self, tracked: &Tracked<M::Connection>, now: Instant) -> bool {
        self.options
            .max_lifetime
            .is_some_and(|limit| now.duration_since(tracked.created_at) >= limit)
    }

    fn idled_out(&self, tracked: &Tracked<M::Connection>, now: Instant) -> bool {
        self.options
            .max_idle_time
            .is_some_and(|limit| now.duration_since(tracked.returned_at) >= limit)
    }

    fn release(&self, mut tracked: Tracked<M::Connection>) {
        let now = Instant::now();
        if !self.outlived(&tracked, now) {
            let mut idle = self.lock_idle();
            // checked under the lock so `close` cannot miss this connection
            if !self.closed.load(Ordering::Acquire)
                && idle.len() < self.options.effective_max_idle()
            {
                tracked.returned_at = now;
                idle.push_back(tracked);
                return;
            }
        }
        self.open.fetch_sub(1, Ordering::AcqRel);
        drop(tracked);
    }

    /// Close a connection whose last operation never completed
    fn retire(&self, tracked: Tracked<M::Connection>) {
        tracing::debug!("closing connection abandoned mid-operation");
        self.open.fetch_sub(1, Ordering::AcqRel);
        drop(tracked);
    }
}

/// Async connection pool
pub struct ConnectionPool<M: ConnectionManager> {
    shared: Arc<Shared<M>>,
}

impl<M: ConnectionManager> Clone for ConnectionPool<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: ConnectionManager> ConnectionPool<M> {
    /// Create an empty pool; connections are opened lazily by [`get`](Self::get)
    pub fn new(manager: M, options: PoolOptions) -> Self {
        let semaphore =
            (options.max_open > 0).then(|| Arc::new(Semaphore::new(options.max_open as usize)));
        Self {
            shared: Arc::new(Shared {
                manager,
                options,
                idle: Mutex::new(VecDeque::new()),
                semaphore,
                closed: AtomicBool::new(false),
                open: AtomicUsize::new(0),
            }),
        }
    }

    pub fn options(&self) -> &PoolOptions {
        &self.shared.options
    }

    pub fn manager(&self) -> &M {
        &self.shared.manager
    }

    /// Check out a connection, waiting while `max_open` are in use
    pub async fn get(&self) -> Result<PooledConnection<M>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let permit = match &self.shared.semaphore {
            Some(semaphore) => Some(
                Arc::clone(semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|_| PoolError::Closed)?,
            ),
            None => None,
        };

        loop {
            let candidate = self.shared.lock_idle().pop_back();
            let Some(tracked) = candidate else {
                break;
            };

            let now = Instant::now();
            if self.shared.outlived(&tracked, now)
                || self.shared.idled_out(&tracked, now)
                || self.shared.manager.has_broken(&tracked.conn)
            {
                tracing::debug!("retiring expired pooled connection");
                self.shared.open.fetch_sub(1, Ordering::AcqRel);
                self.shared.manager.disconnect(tracked.conn).await;
                continue;
            }

            return Ok(PooledConnection {
                tracked: Some(tracked),
                shared: Arc::clone(&self.shared),
                poisoned: false,
                _permit: permit,
            });
        }

        let conn = self
            .shared
            .manager
            .connect()
            .await
            .map_err(PoolError::Connect)?;
        self.shared.open.fetch_add(1, Ordering::AcqRel);

        let now = Instant::now();
        Ok(PooledConnection {
            tracked: Some(Tracked {
                conn,
                created_at: now,
                returned_at: now,
            }),
            shared: Arc::clone(&self.shared),
            poisoned: false,
            _permit: permit,
        })
    }

    /// Close the pool and disconnect every idle connection.
    ///
    /// Checked-out connections are dropped when their guards are.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(semaphore) = &self.shared.semaphore {
            semaphore.close();
        }

        let drained: Vec<_> = self.shared.lock_idle().drain(..).collect();
        self.shared.open.fetch_sub(drained.len(), Ordering::AcqRel);
        for tracked in drained {
            self.shared.manager.disconnect(tracked.conn).await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PoolState {
        let idle = self.shared.lock_idle().len();
        let open = self.shared.open.load(Ordering::Acquire);
        PoolState {
            open,
            idle,
            in_use: open.saturating_sub(idle),
        }
    }
}

/// A checked-out connection, returned to the pool on drop.
///
/// A poisoned connection is closed on drop instead. Callers poison the guard
/// before a request and clear it once the request completes; a guard dropped
/// in between, whether by a deadline or an error, is never reused.
pub struct PooledConnection<M: ConnectionManager> {
    tracked: Option<Tracked<M::Connection>>,
    shared: Arc<Shared<M>>,
    poisoned: bool,
    _permit: Option<OwnedSemaphorePermit>,
}

impl<M: ConnectionManager> PooledConnection<M> {
    /// Mark the connection as mid-request
    pub fn poison(&mut self) {
        self.poisoned = true;
    }

    /// The request completed; the connection may be pooled again
    pub fn clear_poison(&mut self) {
        self.poisoned = false;
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Drop the connection instead of returning it to the pool
    pub fn discard(mut self) {
        self.poison();
    }
}

impl<M: ConnectionManager> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        match &self.tracked {
            Some(tracked) => &tracked.conn,
            None => unreachable!("pooled connection accessed after release"),
        }
    }
}

impl<M: ConnectionManager> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.tracked {
            Some(tracked) => &mut tracked.conn,
            None => unreachable!("pooled connection accessed after release"),
        }
    }
}

impl<M: ConnectionManager> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(tracked) = self.tracked.take() {
            if self.poisoned {
                self.shared.retire(tracked);
            } else {
                self.shared.release(tracked);
            }
        }
    }
}
