use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::entry::{PoolConnection, PoolEntry};
use crate::error::PoolError;
use crate::factory::ConnFactory;
use crate::id::{AtomicIdGenerator, IdGenerator};
use crate::lease::{Lease, LeaseResult, Reclaim};
use crate::route::Route;
use crate::route_pool::RoutePool;
use crate::stats::PoolStats;

/// A lease request waiting for an entry.
struct Waiter<R, C> {
    route: R,
    state: Option<String>,
    tx: oneshot::Sender<LeaseResult<R, C>>,
    /// connect attempt started on behalf of this request
    connect: Option<u64>,
}

struct PoolState<R, C> {
    routes: HashMap<R, RoutePool<R, C>>,
    waiters: VecDeque<Waiter<R, C>>,
    max_total: usize,
    default_max_per_route: usize,
    max_per_route: HashMap<R, usize>,
    next_connect: u64,
    shutdown: bool,
}

impl<R: Route, C: PoolConnection> PoolState<R, C> {
    fn route_pool(&mut self, route: &R) -> &mut RoutePool<R, C> {
        self.routes.entry(route.clone()).or_insert_with(RoutePool::new)
    }

    fn max_for(&self, route: &R) -> usize {
        self.max_per_route.get(route).copied().unwrap_or(self.default_max_per_route)
    }

    fn leased_or_pending(&self) -> usize {
        self.routes.values().map(|pool| pool.leased + pool.pending).sum()
    }

    fn available(&self) -> usize {
        self.routes.values().map(RoutePool::available).sum()
    }

    /// Closes the least recently used idle entry of the whole pool.
    fn evict_last_used(&mut self) -> bool {
        let oldest = self
            .routes
            .iter()
            .filter_map(|(route, pool)| pool.last_used().map(|updated| (updated, route)))
            .min_by_key(|(updated, _)| *updated)
            .map(|(_, route)| route.clone());

        match oldest.and_then(|route| self.routes.get_mut(&route)?.take_last_used()) {
            Some(mut entry) => {
                debug!(id = entry.id(), route = ?entry.route(), "evicting idle entry");
                entry.close();
                true
            }
            None => false,
        }
    }

    fn is_settled(&self) -> bool {
        self.routes.values().all(|pool| pool.leased == 0 && pool.pending == 0)
    }

    fn stats(&self, route: &R) -> PoolStats {
        let max = self.max_for(route);
        self.routes.get(route).map_or(PoolStats { max, ..PoolStats::default() }, |pool| PoolStats {
            leased: pool.leased,
            pending: pool.pending,
            available: pool.available(),
            max,
        })
    }

    fn purge_unused(&mut self) {
        self.routes.retain(|_, pool| !pool.is_unused());
    }
}

struct PoolInner<R, C, F> {
    factory: F,
    ids: Arc<dyn IdGenerator>,
    config: PoolConfig,
    state: Mutex<PoolState<R, C>>,
    settled: Notify,
    me: Weak<Self>,
}

/// Route keyed pool of client connections.
///
/// At most `max_per_route` entries are leased or being connected per route, and at most
/// `max_total` in the whole pool. Requests above the limits wait in FIFO order until an
/// entry is released, an idle entry can be evicted or their deadline passes.
///
/// The handle is cheap to clone. Leasing spawns connect attempts on the current Tokio
/// runtime.
pub struct ConnPool<R, C, F> {
    inner: Arc<PoolInner<R, C, F>>,
}

impl<R, C, F> Clone for ConnPool<R, C, F> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<R, C, F> ConnPool<R, C, F>
where
    R: Route,
    C: PoolConnection,
    F: ConnFactory<R, C>,
{
    pub fn new(factory: F, config: PoolConfig) -> Self {
        Self::with_id_generator(factory, config, Arc::new(AtomicIdGenerator::default()))
    }

    pub fn with_id_generator(factory: F, config: PoolConfig, ids: Arc<dyn IdGenerator>) -> Self {
        let state = PoolState {
            routes: HashMap::new(),
            waiters: VecDeque::new(),
            max_total: config.max_total(),
            default_max_per_route: config.default_max_per_route(),
            max_per_route: HashMap::new(),
            next_connect: 0,
            shutdown: false,
        };
        let inner = Arc::new_cyclic(|me| PoolInner {
            factory,
            ids,
            config,
            state: Mutex::new(state),
            settled: Notify::new(),
            me: Weak::clone(me),
        });
        Self { inner }
    }

    /// Requests an entry for `route`.
    ///
    /// An idle entry is handed out right away, the returned future is then already
    /// complete. Otherwise a new connection is established if the limits allow it, or
    /// the request waits for a release. `timeout` bounds the whole wait, connect
    /// attempts are bounded separately by the configured connect timeout.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn lease(&self, route: R, state: Option<String>, timeout: Option<Duration>) -> Lease<R, C> {
        let (tx, rx) = oneshot::channel();
        let deadline = timeout.map(|timeout| Box::pin(tokio::time::sleep(timeout)));

        {
            let mut st = self.inner.state.lock();
            if st.shutdown {
                let _ = tx.send(Err(PoolError::Shutdown));
            } else {
                debug!(?route, ?state, "lease requested");
                st.waiters.push_back(Waiter { route, state, tx, connect: None });
                self.inner.process_pending(&mut st);
            }
        }

        let pool: Weak<dyn Reclaim<R, C>> = Arc::downgrade(&self.inner) as Weak<dyn Reclaim<R, C>>;
        Lease::new(rx, deadline, pool)
    }

    /// Hands a leased entry back.
    ///
    /// A reusable entry whose connection is still open becomes idle, anything else is
    /// closed and frees its slot.
    pub fn release(&self, entry: PoolEntry<R, C>, reusable: bool) {
        self.inner.release(entry, reusable);
    }

    pub fn max_total(&self) -> usize {
        self.inner.state.lock().max_total
    }

    pub fn set_max_total(&self, max: usize) {
        let mut st = self.inner.state.lock();
        st.max_total = max;
        self.inner.process_pending(&mut st);
    }

    pub fn default_max_per_route(&self) -> usize {
        self.inner.state.lock().default_max_per_route
    }

    pub fn set_default_max_per_route(&self, max: usize) {
        let mut st = self.inner.state.lock();
        st.default_max_per_route = max;
        self.inner.process_pending(&mut st);
    }

    pub fn max_per_route(&self, route: &R) -> usize {
        self.inner.state.lock().max_for(route)
    }

    /// Overrides the limit of one route, `None` falls back to the default.
    pub fn set_max_per_route(&self, route: R, max: Option<usize>) {
        let mut st = self.inner.state.lock();
        match max {
            Some(max) => st.max_per_route.insert(route, max),
            None => st.max_per_route.remove(&route),
        };
        self.inner.process_pending(&mut st);
    }

    pub fn stats(&self, route: &R) -> PoolStats {
        self.inner.state.lock().stats(route)
    }

    pub fn total_stats(&self) -> PoolStats {
        let st = self.inner.state.lock();
        let (leased, pending) = st.routes.values().fold((0, 0), |(l, p), pool| (l + pool.leased, p + pool.pending));
        PoolStats { leased, pending, available: st.available(), max: st.max_total }
    }

    pub fn routes(&self) -> Vec<R> {
        self.inner.state.lock().routes.keys().cloned().collect()
    }

    /// Closes idle entries unused for at least `idle`, returns how many.
    pub fn close_idle(&self, idle: Duration) -> usize {
        let now = Instant::now();
        self.close_where(|entry| now.saturating_duration_since(entry.updated()) >= idle)
    }

    /// Closes idle entries past their expiry, returns how many.
    pub fn close_expired(&self) -> usize {
        let now = Instant::now();
        self.close_where(|entry| entry.is_expired(now))
    }

    fn close_where<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&PoolEntry<R, C>) -> bool,
    {
        let mut st = self.inner.state.lock();
        let closed: usize = st.routes.values_mut().map(|pool| pool.close_where(&mut predicate)).sum();
        if closed > 0 {
            debug!(closed, "closed idle entries");
            st.purge_unused();
            self.inner.process_pending(&mut st);
        }
        closed
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.state.lock().shutdown
    }

    /// Fails all waiting requests and closes idle entries, then waits up to `timeout`
    /// for leased entries to come back and connect attempts to finish.
    ///
    /// Entries released afterwards are closed, connections completing afterwards are
    /// shut down.
    pub async fn shutdown(&self, timeout: Duration) {
        {
            let mut st = self.inner.state.lock();
            if !st.shutdown {
                st.shutdown = true;
                for waiter in st.waiters.drain(..) {
                    let _ = waiter.tx.send(Err(PoolError::Shutdown));
                }
                let closed: usize = st.routes.values_mut().map(|pool| pool.close_where(|_| true)).sum();
                debug!(closed, "connection pool shutting down");
            }
        }

        let settled = async {
            loop {
                let notified = self.inner.settled.notified();
                if self.inner.state.lock().is_settled() {
                    break;
                }
                notified.await;
            }
        };
        if tokio::time::timeout(timeout, settled).await.is_err() {
            warn!(stats = %self.total_stats(), "connection pool shut down with entries still in use");
        }
    }
}

impl<R, C, F> PoolInner<R, C, F>
where
    R: Route,
    C: PoolConnection,
    F: ConnFactory<R, C>,
{
    /// Serves waiting requests in arrival order as far as the limits allow.
    fn process_pending(&self, st: &mut PoolState<R, C>) {
        let now = Instant::now();
        let mut index = 0;
        while let Some(waiter) = st.waiters.remove(index) {
            if waiter.tx.is_closed() {
                // cancelled or timed out, a running connect ends up idle
                continue;
            }
            if waiter.connect.is_some() {
                st.waiters.insert(index, waiter);
                index += 1;
                continue;
            }
            if let Some(waiter) = self.serve(st, waiter, now) {
                st.waiters.insert(index, waiter);
                index += 1;
            }
        }
    }

    /// Hands `waiter` an idle entry or starts a connect for it. Returns the waiter
    /// when it has to keep waiting.
    fn serve(&self, st: &mut PoolState<R, C>, mut waiter: Waiter<R, C>, now: Instant) -> Option<Waiter<R, C>> {
        let max = st.max_for(&waiter.route);
        let validate_after = self.config.validate_after_inactivity();
        let route_pool = st.route_pool(&waiter.route);

        let (free, discarded) = route_pool.take_free(waiter.state.as_deref(), validate_after, now);
        if discarded > 0 {
            debug!(route = ?waiter.route, discarded, "dropped unusable idle entries");
        }
        if let Some(entry) = free {
            Self::deliver(route_pool, waiter.tx, entry);
            return None;
        }

        // idle entries left on the route do not match the state, make room for a new one
        let excess = (route_pool.allocated() + 1).saturating_sub(max);
        for _ in 0..excess {
            let Some(mut entry) = route_pool.take_last_used() else {
                break;
            };
            debug!(id = entry.id(), "closing idle entry to make room on the route");
            entry.close();
        }
        if route_pool.allocated() >= max {
            return Some(waiter);
        }

        let free_capacity = st.max_total.saturating_sub(st.leased_or_pending());
        if free_capacity == 0 {
            return Some(waiter);
        }
        if st.available() >= free_capacity && !st.evict_last_used() {
            return Some(waiter);
        }

        let connect = st.next_connect;
        st.next_connect += 1;
        st.route_pool(&waiter.route).pending += 1;
        waiter.connect = Some(connect);
        self.spawn_connect(waiter.route.clone(), connect);
        Some(waiter)
    }

    fn deliver(route_pool: &mut RoutePool<R, C>, tx: oneshot::Sender<LeaseResult<R, C>>, mut entry: PoolEntry<R, C>) {
        route_pool.leased += 1;
        entry.on_lease();
        debug!(id = entry.id(), route = ?entry.route(), "entry leased");
        if let Err(Ok(mut entry)) = tx.send(Ok(entry)) {
            route_pool.leased -= 1;
            entry.on_release();
            route_pool.put(entry);
        }
    }

    fn spawn_connect(&self, route: R, connect: u64) {
        let Some(inner) = self.me.upgrade() else {
            return;
        };
        debug!(?route, connect, "establishing new connection");
        tokio::spawn(async move {
            let result = inner.connect(&route).await;
            inner.connect_completed(&route, connect, result);
        });
    }

    async fn connect(&self, route: &R) -> Result<C, PoolError> {
        let connecting = self.factory.create(route);
        match self.config.connect_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, connecting)
                .await
                .unwrap_or(Err(PoolError::ConnectTimeout { timeout })),
            None => connecting.await,
        }
    }

    fn connect_completed(&self, route: &R, connect: u64, result: Result<C, PoolError>) {
        let mut st = self.state.lock();
        let waiter = st
            .waiters
            .iter()
            .position(|waiter| waiter.connect == Some(connect))
            .and_then(|index| st.waiters.remove(index));
        let shutdown = st.shutdown;
        let route_pool = st.route_pool(route);
        route_pool.pending = route_pool.pending.saturating_sub(1);

        match result {
            Ok(conn) => {
                let mut entry = PoolEntry::new(self.ids.next_id(), route.clone(), conn, self.config.time_to_live());
                debug!(id = entry.id(), ?route, "connection established");
                if shutdown {
                    entry.shutdown();
                } else if let Some(waiter) = waiter {
                    Self::deliver(route_pool, waiter.tx, entry);
                } else {
                    entry.on_release();
                    route_pool.put(entry);
                }
            }
            Err(e) => {
                debug!(?route, error = %e, "connect failed");
                if let Some(waiter) = waiter {
                    let _ = waiter.tx.send(Err(e));
                }
                if route_pool.is_unused() {
                    st.routes.remove(route);
                }
            }
        }

        if !shutdown {
            self.process_pending(&mut st);
        }
        drop(st);
        self.settled.notify_waiters();
    }

    fn release(&self, mut entry: PoolEntry<R, C>, reusable: bool) {
        let mut st = self.state.lock();
        let shutdown = st.shutdown;
        let route = entry.route().clone();
        let route_pool = st.route_pool(&route);
        route_pool.leased = route_pool.leased.saturating_sub(1);

        if reusable && !shutdown && !entry.connection().is_stale() {
            entry.on_release();
            debug!(id = entry.id(), ?route, "entry released");
            route_pool.put(entry);
        } else {
            debug!(id = entry.id(), ?route, reusable, "entry discarded");
            entry.close();
            if route_pool.is_unused() {
                st.routes.remove(&route);
            }
        }

        if !shutdown {
            self.process_pending(&mut st);
        }
        drop(st);
        self.settled.notify_waiters();
    }
}

impl<R, C, F> Reclaim<R, C> for PoolInner<R, C, F>
where
    R: Route,
    C: PoolConnection,
    F: ConnFactory<R, C>,
{
    fn reclaim(&self, entry: PoolEntry<R, C>) {
        self.release(entry, true);
    }
}

impl<R, C, F> fmt::Debug for ConnPool<R, C, F>
where
    R: Route,
    C: PoolConnection,
    F: ConnFactory<R, C>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnPool")
            .field("config", &self.inner.config)
            .field("ids", &self.inner.ids)
            .field("stats", &self.total_stats())
            .finish_non_exhaustive()
    }
}
