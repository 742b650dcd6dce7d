use crate::base::neterror::NetError;
use crate::socket::address::Address;
use crate::socket::connection::Connection;
use serde::{Deserialize, Deserializer};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 5;
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(5 * 60);
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

fn duration_ms<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Pool limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on pooled connections, idle and shared together.
    pub max_idle_connections: usize,
    /// How long a connection may sit idle before it is evicted.
    #[serde(rename = "keep_alive_ms", deserialize_with = "duration_ms")]
    pub keep_alive: Duration,
    /// Period of the optional background sweep.
    #[serde(rename = "cleanup_interval_ms", deserialize_with = "duration_ms")]
    pub cleanup_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: DEFAULT_MAX_IDLE_CONNECTIONS,
            keep_alive: DEFAULT_KEEP_ALIVE,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl PoolConfig {
    /// Create config from environment variables.
    ///
    /// Checks `HTTP_KEEP_ALIVE` (any value other than `true` disables pooling),
    /// `HTTP_MAX_CONNECTIONS` and `HTTP_KEEP_ALIVE_DURATION` (milliseconds).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PoolConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("HTTP_MAX_CONNECTIONS") {
            match raw.trim().parse::<usize>() {
                Ok(max) => config.max_idle_connections = max,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid HTTP_MAX_CONNECTIONS"),
            }
        }

        if let Some(raw) = lookup("HTTP_KEEP_ALIVE_DURATION") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.keep_alive = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid HTTP_KEEP_ALIVE_DURATION"),
            }
        }

        if let Some(raw) = lookup("HTTP_KEEP_ALIVE") {
            if !raw.trim().eq_ignore_ascii_case("true") {
                config.max_idle_connections = 0;
            }
        }

        config
    }
}

/// Pooled connection with the time it entered (or was last promoted in) the pool.
struct IdleEntry {
    connection: Arc<Connection>,
    idle_since: Instant,
}

/// Keep-alive pool of physical connections, keyed by [`Address`].
///
/// Entries are kept in recency order, most recently used first. Exclusive
/// (HTTP/1.x) connections leave the pool while in use; shareable (multiplexed)
/// connections stay pooled and are only promoted on use. Every public
/// operation first runs the same eviction sweep as the background task.
pub struct ConnectionPool {
    max_idle_connections: usize,
    keep_alive: Duration,
    cleanup_interval: Duration,
    entries: Mutex<VecDeque<IdleEntry>>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("max_idle_connections", &self.max_idle_connections)
            .field("keep_alive", &self.keep_alive)
            .field("connection_count", &self.connection_count())
            .finish()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::with_config(PoolConfig::default())
    }
}

impl ConnectionPool {
    pub fn new(max_idle_connections: usize, keep_alive: Duration) -> Self {
        Self::with_config(PoolConfig {
            max_idle_connections,
            keep_alive,
            ..PoolConfig::default()
        })
    }

    /// A zero `cleanup_interval` falls back to the default period.
    pub fn with_config(config: PoolConfig) -> Self {
        let cleanup_interval = if config.cleanup_interval.is_zero() {
            tracing::warn!(
                fallback_ms = DEFAULT_CLEANUP_INTERVAL.as_millis() as u64,
                "ignoring zero cleanup interval"
            );
            DEFAULT_CLEANUP_INTERVAL
        } else {
            config.cleanup_interval
        };
        Self {
            max_idle_connections: config.max_idle_connections,
            keep_alive: config.keep_alive,
            cleanup_interval,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Process-wide pool configured from the environment.
    pub fn global() -> Arc<ConnectionPool> {
        static GLOBAL: OnceLock<Arc<ConnectionPool>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::with_config(PoolConfig::from_env()))))
    }

    pub fn max_idle_connections(&self) -> usize {
        self.max_idle_connections
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<IdleEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop dead and expired entries, then trim least recently used entries
    /// down to capacity. Returns the evicted connections; callers close them
    /// after releasing the lock.
    fn sweep(&self, entries: &mut VecDeque<IdleEntry>, now: Instant) -> Vec<Arc<Connection>> {
        let mut evicted = Vec::new();
        entries.retain(|entry| {
            let expired = now.saturating_duration_since(entry.idle_since) >= self.keep_alive;
            if expired || !entry.connection.is_alive() {
                tracing::debug!(conn = entry.connection.id(), expired, "evicting pooled connection");
                evicted.push(Arc::clone(&entry.connection));
                false
            } else {
                true
            }
        });
        self.trim(entries, &mut evicted);
        evicted
    }

    fn trim(&self, entries: &mut VecDeque<IdleEntry>, evicted: &mut Vec<Arc<Connection>>) {
        while entries.len() > self.max_idle_connections {
            if let Some(entry) = entries.pop_back() {
                tracing::debug!(conn = entry.connection.id(), "evicting least recently used connection");
                evicted.push(entry.connection);
            }
        }
    }

    fn close_all(connections: Vec<Arc<Connection>>) {
        for connection in connections {
            connection.close();
        }
    }

    /// Returns the oldest reusable connection to `address`, or `None`.
    ///
    /// An exclusive connection is removed from the pool and belongs to the
    /// caller. A shareable connection stays pooled and moves to the most
    /// recently used position.
    pub fn acquire(&self, address: &Address) -> Option<Arc<Connection>> {
        let now = Instant::now();
        let (found, evicted) = {
            let mut entries = self.lock();
            let evicted = self.sweep(&mut entries, now);
            let position = entries
                .iter()
                .rposition(|entry| entry.connection.address() == address);
            let found = position.and_then(|index| {
                let mut entry = entries.remove(index)?;
                let connection = Arc::clone(&entry.connection);
                if connection.is_shareable() {
                    entry.idle_since = now;
                    entries.push_front(entry);
                }
                Some(connection)
            });
            (found, evicted)
        };
        Self::close_all(evicted);

        if let Some(connection) = &found {
            tracing::debug!(
                conn = connection.id(),
                shared = connection.is_shareable(),
                host = %address.host(),
                "reusing pooled connection"
            );
        }
        found
    }

    /// Return an exclusive connection to the pool after an exchange.
    ///
    /// Dead connections are closed instead of pooled. If the pool overflows,
    /// its least recently used entry is closed regardless of protocol.
    /// Shareable connections are ignored; they enter through
    /// [`ConnectionPool::admit_shared`].
    pub fn release(&self, connection: Arc<Connection>) {
        if connection.is_shareable() {
            return;
        }

        let now = Instant::now();
        let evicted = {
            let mut entries = self.lock();
            let mut evicted = self.sweep(&mut entries, now);
            if connection.is_alive() {
                entries.retain(|entry| entry.connection.id() != connection.id());
                tracing::debug!(conn = connection.id(), "connection returned to pool");
                entries.push_front(IdleEntry {
                    connection,
                    idle_since: now,
                });
                self.trim(&mut entries, &mut evicted);
            } else {
                tracing::debug!(conn = connection.id(), "discarding dead connection");
                evicted.push(connection);
            }
            evicted
        };
        Self::close_all(evicted);
    }

    /// Pool a multiplexed connection so concurrent exchanges can share it.
    ///
    /// Fails with [`NetError::InvalidArgument`] for exclusive connections,
    /// leaving the pool untouched.
    pub fn admit_shared(&self, connection: Arc<Connection>) -> Result<(), NetError> {
        if !connection.is_shareable() {
            return Err(NetError::InvalidArgument);
        }

        let now = Instant::now();
        let evicted = {
            let mut entries = self.lock();
            let mut evicted = self.sweep(&mut entries, now);
            entries.retain(|entry| entry.connection.id() != connection.id());
            tracing::debug!(conn = connection.id(), "shared connection admitted");
            entries.push_front(IdleEntry {
                connection,
                idle_since: now,
            });
            self.trim(&mut entries, &mut evicted);
            evicted
        };
        Self::close_all(evicted);
        Ok(())
    }

    /// Close and remove every pooled connection.
    pub fn evict_all(&self) {
        let drained: Vec<_> = self.lock().drain(..).map(|entry| entry.connection).collect();
        tracing::debug!(count = drained.len(), "evicting all pooled connections");
        Self::close_all(drained);
    }

    /// Run the eviction sweep now.
    pub fn cleanup(&self) {
        let evicted = {
            let mut entries = self.lock();
            self.sweep(&mut entries, Instant::now())
        };
        Self::close_all(evicted);
    }

    /// Start a background task that periodically runs [`ConnectionPool::cleanup`],
    /// for pools that may go untouched for long stretches.
    /// The task ends once the pool is dropped.
    pub fn start_cleanup_task(self: &Arc<Self>) -> JoinHandle<()> {
        let pool: Weak<Self> = Arc::downgrade(self);
        let interval = self.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(pool) = pool.upgrade() else {
                    break;
                };
                pool.cleanup();
            }
        })
    }

    /// Total pooled connections.
    pub fn connection_count(&self) -> usize {
        self.lock().len()
    }

    /// Pooled exclusive (HTTP/1.x) connections.
    pub fn exclusive_connection_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|entry| !entry.connection.is_shareable())
            .count()
    }

    /// Pooled shareable (multiplexed) connections.
    pub fn shareable_connection_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|entry| entry.connection.is_shareable())
            .count()
    }

    /// Pooled connections from most to least recently used.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.lock()
            .iter()
            .map(|entry| Arc::clone(&entry.connection))
            .collect()
    }
}
