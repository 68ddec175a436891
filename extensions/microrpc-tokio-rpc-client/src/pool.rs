use futures::future::BoxFuture;
use microrpc_service::{CallOptions, ContextError};
use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::oneshot;

pub const DEFAULT_INITIAL_CONNECTIONS: usize = 1;
pub const DEFAULT_MAX_IDLE: usize = 10;
pub const DEFAULT_MAX_LIVE: usize = 30;
pub const DEFAULT_MAX_IDLE_AGE: Duration = Duration::from_secs(60);

/// Connection pool configuration.
///
/// # Default Configuration
///
/// - `initial_connections`: 1
/// - `max_idle`: 10
/// - `max_live`: 30
/// - `max_idle_age`: 60 seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Connections dialed when the pool is created.
    pub initial_connections: usize,
    /// Upper bound on connections parked in the idle queue.
    pub max_idle: usize,
    /// Upper bound on connections in existence, idle or in use.
    pub max_live: usize,
    /// Idle connections older than this are closed instead of reused.
    pub max_idle_age: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_connections: DEFAULT_INITIAL_CONNECTIONS,
            max_idle: DEFAULT_MAX_IDLE,
            max_live: DEFAULT_MAX_LIVE,
            max_idle_age: DEFAULT_MAX_IDLE_AGE,
        }
    }
}

impl PoolConfig {
    pub fn with_initial_connections(mut self, initial_connections: usize) -> Self {
        self.initial_connections = initial_connections;
        self
    }

    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn with_max_live(mut self, max_live: usize) -> Self {
        self.max_live = max_live;
        self
    }

    pub fn with_max_idle_age(mut self, max_idle_age: Duration) -> Self {
        self.max_idle_age = max_idle_age;
        self
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_live == 0 {
            return Err(PoolError::InvalidConfig("max_live must be at least 1".into()));
        }
        if self.initial_connections > self.max_idle {
            return Err(PoolError::InvalidConfig(format!(
                "initial_connections ({}) exceeds max_idle ({})",
                self.initial_connections, self.max_idle
            )));
        }
        if self.initial_connections > self.max_live {
            return Err(PoolError::InvalidConfig(format!(
                "initial_connections ({}) exceeds max_live ({})",
                self.initial_connections, self.max_live
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// The connection factory failed.
    #[error("failed to create connection: {0}")]
    Connect(#[source] io::Error),

    /// The caller gave up while waiting for a connection.
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// A snapshot of the pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Connections in existence, idle or in use.
    pub live: usize,
    pub idle: usize,
    /// Acquirers parked until a connection is released.
    pub waiting: usize,
}

type ConnectionFactory<C> = Arc<dyn Fn() -> BoxFuture<'static, io::Result<C>> + Send + Sync>;

/// What a releasing holder passes to the oldest waiter.
enum Handoff<C> {
    /// A ready connection.
    Connection(C),
    /// A reserved live slot; the waiter dials its own connection.
    Slot,
}

struct IdleConnection<C> {
    conn: C,
    last_active: Instant,
}

struct PoolState<C> {
    idle: VecDeque<IdleConnection<C>>,
    waiting: VecDeque<oneshot::Sender<Handoff<C>>>,
    live_count: usize,
}

struct PoolShared<C> {
    config: PoolConfig,
    factory: ConnectionFactory<C>,
    state: Mutex<PoolState<C>>,
}

impl<C: Send + 'static> PoolShared<C> {
    /// The lock is never held across an await, so a poisoned state is still
    /// consistent.
    fn lock(&self) -> MutexGuard<'_, PoolState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Passes a returned connection (or a freed live slot) to the oldest
    /// waiter still listening. With no waiters the connection is parked if
    /// the idle queue has room and closed otherwise.
    fn hand_off(&self, mut item: Handoff<C>) {
        loop {
            let waiter = {
                let mut state = self.lock();
                match state.waiting.pop_front() {
                    Some(waiter) => waiter,
                    None => {
                        match item {
                            Handoff::Connection(conn) if state.idle.len() < self.config.max_idle => {
                                state.idle.push_back(IdleConnection {
                                    conn,
                                    last_active: Instant::now(),
                                });
                            }
                            Handoff::Connection(conn) => {
                                state.live_count -= 1;
                                drop(state);
                                tracing::trace!("Idle queue full; closing connection");
                                drop(conn);
                            }
                            Handoff::Slot => state.live_count -= 1,
                        }
                        return;
                    }
                }
            };

            // Sending happens outside the lock. A waiter that gave up hands
            // the item straight back.
            match waiter.send(item) {
                Ok(()) => return,
                Err(returned) => item = returned,
            }
        }
    }
}

/// Owns one unit of `live_count`. Dropping it while armed frees the slot.
struct LiveSlot<C: Send + 'static> {
    shared: Arc<PoolShared<C>>,
    armed: bool,
}

impl<C: Send + 'static> LiveSlot<C> {
    fn new(shared: &Arc<PoolShared<C>>) -> Self {
        Self {
            shared: Arc::clone(shared),
            armed: true,
        }
    }

    fn release_with(mut self, conn: C) {
        self.armed = false;
        self.shared.hand_off(Handoff::Connection(conn));
    }
}

impl<C: Send + 'static> Drop for LiveSlot<C> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.hand_off(Handoff::Slot);
        }
    }
}

/// A parked acquirer. If it is dropped after a handoff was sent but before
/// it was received, the handoff goes back to the pool.
struct PendingAcquire<C: Send + 'static> {
    receiver: oneshot::Receiver<Handoff<C>>,
    shared: Arc<PoolShared<C>>,
}

impl<C: Send + 'static> Drop for PendingAcquire<C> {
    fn drop(&mut self) {
        self.receiver.close();
        if let Ok(item) = self.receiver.try_recv() {
            self.shared.hand_off(item);
        }
    }
}

/// A connection checked out of a [`ConnectionPool`].
///
/// Call [`release`](Self::release) once the connection is known to be clean
/// (no partial frame written or unread). Dropping the guard, or calling
/// [`discard`](Self::discard), closes the connection and frees its slot.
pub struct PooledConnection<C: Send + 'static> {
    conn: C,
    slot: LiveSlot<C>,
}

impl<C: Send + 'static> PooledConnection<C> {
    /// Returns the connection to the pool for reuse.
    pub fn release(self) {
        let PooledConnection { conn, slot } = self;
        slot.release_with(conn);
    }

    /// Closes the connection and frees its slot.
    pub fn discard(self) {
        let PooledConnection { conn, slot } = self;
        drop(conn);
        drop(slot);
    }
}

impl<C: Send + 'static> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.conn
    }
}

impl<C: Send + 'static> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.conn
    }
}

enum AcquireStep<C: Send + 'static> {
    Ready(C),
    Stale(C),
    Create,
    Wait(PendingAcquire<C>),
}

/// A bounded pool of reusable connections produced by an async factory.
///
/// At most `max_live` connections exist at any time. Acquirers beyond that
/// bound wait in FIFO order and are handed a connection directly by whoever
/// releases one. Idle connections older than `max_idle_age` are closed on the
/// next acquire that finds them.
pub struct ConnectionPool<C: Send + 'static> {
    shared: Arc<PoolShared<C>>,
}

impl<C: Send + 'static> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Send + 'static> ConnectionPool<C> {
    /// Creates a pool and dials `initial_connections` connections up front.
    pub async fn new<F, Fut>(config: PoolConfig, factory: F) -> Result<Self, PoolError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = io::Result<C>> + Send + 'static,
    {
        config.validate()?;

        let factory: ConnectionFactory<C> =
            Arc::new(move || -> BoxFuture<'static, io::Result<C>> { Box::pin(factory()) });
        let pool = Self {
            shared: Arc::new(PoolShared {
                config,
                factory,
                state: Mutex::new(PoolState {
                    idle: VecDeque::with_capacity(config.max_idle),
                    waiting: VecDeque::new(),
                    live_count: 0,
                }),
            }),
        };

        for _ in 0..config.initial_connections {
            let conn = (pool.shared.factory)()
                .await
                .map_err(PoolError::Connect)?;

            let mut state = pool.shared.lock();
            state.live_count += 1;
            state.idle.push_back(IdleConnection {
                conn,
                last_active: Instant::now(),
            });
        }

        tracing::debug!(
            "Connection pool ready with {} connection(s)",
            config.initial_connections
        );

        Ok(pool)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    pub fn status(&self) -> PoolStatus {
        let mut state = self.shared.lock();
        state.waiting.retain(|waiter| !waiter.is_closed());
        PoolStatus {
            live: state.live_count,
            idle: state.idle.len(),
            waiting: state.waiting.len(),
        }
    }

    /// Checks out a connection.
    ///
    /// Reuses the oldest fresh idle connection, else dials a new one while
    /// under `max_live`, else waits for a release. Waiting ends early with
    /// [`PoolError::Context`] when `options` is cancelled or its deadline
    /// passes.
    pub async fn acquire(&self, options: &CallOptions) -> Result<PooledConnection<C>, PoolError> {
        options.check()?;

        loop {
            let step = {
                let mut state = self.shared.lock();
                if let Some(idle) = state.idle.pop_front() {
                    if idle.last_active.elapsed() > self.shared.config.max_idle_age {
                        state.live_count -= 1;
                        AcquireStep::Stale(idle.conn)
                    } else {
                        AcquireStep::Ready(idle.conn)
                    }
                } else if state.live_count < self.shared.config.max_live {
                    state.live_count += 1;
                    AcquireStep::Create
                } else {
                    let (sender, receiver) = oneshot::channel();
                    state.waiting.retain(|waiter| !waiter.is_closed());
                    state.waiting.push_back(sender);
                    AcquireStep::Wait(PendingAcquire {
                        receiver,
                        shared: Arc::clone(&self.shared),
                    })
                }
            };

            match step {
                AcquireStep::Ready(conn) => return Ok(self.checked_out(conn)),
                AcquireStep::Stale(conn) => {
                    tracing::debug!("Closing stale idle connection");
                    drop(conn);
                }
                AcquireStep::Create => return self.create().await,
                AcquireStep::Wait(mut pending) => {
                    tokio::select! {
                        handoff = &mut pending.receiver => match handoff {
                            Ok(Handoff::Connection(conn)) => return Ok(self.checked_out(conn)),
                            Ok(Handoff::Slot) => return self.create().await,
                            Err(_) => continue,
                        },
                        reason = options.done() => return Err(PoolError::Context(reason)),
                    }
                }
            }
        }
    }

    /// Dials a connection into a slot the caller already reserved.
    async fn create(&self) -> Result<PooledConnection<C>, PoolError> {
        let slot = LiveSlot::new(&self.shared);
        match (self.shared.factory)().await {
            Ok(conn) => Ok(PooledConnection { conn, slot }),
            Err(err) => {
                tracing::warn!("Failed to create pooled connection: {}", err);
                Err(PoolError::Connect(err))
            }
        }
    }

    fn checked_out(&self, conn: C) -> PooledConnection<C> {
        PooledConnection {
            conn,
            slot: LiveSlot::new(&self.shared),
        }
    }
}
