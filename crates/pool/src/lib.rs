//! Route keyed connection pool for [`nio_http`] client connections
//!
//! Connections are grouped by route (scheme, host and port). A [`ConnPool`] bounds the
//! number of connections leased or being established per route and in total, hands out
//! idle connections first and establishes new ones through a [`ConnFactory`] when the
//! limits allow it. Lease requests above the limits wait until an entry comes back.
//!
//! ```no_run
//! # use nio_http::config::ConnectionConfig;
//! # use nio_http_pool::{BasicNioConnFactory, ConnPool, HttpHost, PoolConfig, SessionConnector};
//! # async fn example<K: SessionConnector>(connector: K) -> Result<(), nio_http_pool::PoolError> {
//! let factory = BasicNioConnFactory::new(connector, ConnectionConfig::default());
//! let pool: ConnPool<HttpHost, _, _> = ConnPool::new(factory, PoolConfig::default().with_max_total(50));
//!
//! let entry = pool.lease(HttpHost::http("localhost"), None, None).await?;
//! // hand entry.connection_mut() to the reactor, submit a request ...
//! pool.release(entry, true);
//! # Ok(())
//! # }
//! ```
//!
//! Idle entries are validated when they are leased, never in the background. An
//! application that wants idle connections reaped calls [`ConnPool::close_idle`] and
//! [`ConnPool::close_expired`] from its own timer.

mod config;
mod entry;
mod error;
mod factory;
mod id;
mod lease;
mod pool;
mod route;
mod route_pool;
mod stats;

pub use config::PoolConfig;
pub use entry::PoolConnection;
pub use entry::PoolEntry;
pub use error::PoolError;
pub use factory::AddressResolver;
pub use factory::BasicNioConnFactory;
pub use factory::ConnFactory;
pub use factory::NoTls;
pub use factory::SessionConnector;
pub use factory::SystemResolver;
pub use id::AtomicIdGenerator;
pub use id::IdGenerator;
pub use lease::Lease;
pub use pool::ConnPool;
pub use route::HttpHost;
pub use route::Route;
pub use stats::PoolStats;
