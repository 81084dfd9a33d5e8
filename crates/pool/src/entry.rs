use std::fmt;
use std::time::Duration;

use nio_http::connection::ClientConnection;
use nio_http::session::Session;
use tokio::time::Instant;

/// What the pool needs from a pooled connection.
pub trait PoolConnection: Send + 'static {
    fn is_open(&self) -> bool;

    /// Closes the connection once pending output is written.
    fn close(&mut self);

    fn shutdown(&mut self);

    fn socket_timeout(&self) -> Option<Duration>;

    fn set_socket_timeout(&mut self, timeout: Option<Duration>);

    /// Checks whether a connection can still be used. Called when the connection is
    /// released, and on lease for entries idle longer than the configured inactivity
    /// period.
    fn is_stale(&self) -> bool {
        !self.is_open()
    }
}

impl<S: Session + Send + 'static> PoolConnection for ClientConnection<S> {
    fn is_open(&self) -> bool {
        ClientConnection::is_open(self)
    }

    fn close(&mut self) {
        ClientConnection::close(self);
    }

    fn shutdown(&mut self) {
        ClientConnection::shutdown(self);
    }

    fn socket_timeout(&self) -> Option<Duration> {
        ClientConnection::socket_timeout(self)
    }

    fn set_socket_timeout(&mut self, timeout: Option<Duration>) {
        ClientConnection::set_socket_timeout(self, timeout);
    }

    fn is_stale(&self) -> bool {
        // bytes arriving on an idle connection, or a half read response, make it unusable
        !self.is_open() || self.session().is_closed() || self.has_buffered_input() || self.is_request_submitted()
    }
}

/// A pooled connection together with its route and bookkeeping.
///
/// Leased entries are owned by the caller until they are handed back with
/// [`ConnPool::release`](crate::ConnPool::release).
pub struct PoolEntry<R, C> {
    id: u64,
    route: R,
    conn: C,
    state: Option<String>,
    created: Instant,
    updated: Instant,
    valid_until: Option<Instant>,
    expiry: Option<Instant>,
    socket_timeout: Option<Duration>,
}

impl<R, C: PoolConnection> PoolEntry<R, C> {
    pub(crate) fn new(id: u64, route: R, conn: C, time_to_live: Option<Duration>) -> Self {
        let now = Instant::now();
        let socket_timeout = conn.socket_timeout();
        Self {
            id,
            route,
            conn,
            state: None,
            created: now,
            updated: now,
            valid_until: time_to_live.map(|ttl| now + ttl),
            expiry: None,
            socket_timeout,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn route(&self) -> &R {
        &self.route
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Opaque token a lease has to present to get this entry back, e.g. a user identity.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn set_state(&mut self, state: Option<String>) {
        self.state = state;
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    /// Last time the entry was released to the pool.
    pub fn updated(&self) -> Instant {
        self.updated
    }

    /// When the entry expires, the earlier of its time to live and the last
    /// [`update_expiry`](Self::update_expiry).
    pub fn expiry(&self) -> Option<Instant> {
        match (self.valid_until, self.expiry) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Keeps the entry for `keep_alive` from now at most, `None` removes the bound.
    pub fn update_expiry(&mut self, keep_alive: Option<Duration>) {
        self.updated = Instant::now();
        self.expiry = keep_alive.map(|keep_alive| self.updated + keep_alive);
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiry().is_some_and(|expiry| now >= expiry)
    }

    /// Socket timeout restored on every lease.
    pub fn socket_timeout(&self) -> Option<Duration> {
        self.socket_timeout
    }

    pub fn is_closed(&self) -> bool {
        !self.conn.is_open()
    }

    pub fn close(&mut self) {
        self.conn.close();
    }

    pub fn shutdown(&mut self) {
        self.conn.shutdown();
    }

    pub(crate) fn on_lease(&mut self) {
        self.conn.set_socket_timeout(self.socket_timeout);
    }

    pub(crate) fn on_release(&mut self) {
        self.socket_timeout = self.conn.socket_timeout();
        self.conn.set_socket_timeout(None);
        self.updated = Instant::now();
    }

    pub(crate) fn matches(&self, state: Option<&str>) -> bool {
        self.state.as_deref() == state
    }
}

impl<R: fmt::Debug, C> fmt::Debug for PoolEntry<R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolEntry")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("state", &self.state)
            .field("created", &self.created)
            .field("updated", &self.updated)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}
