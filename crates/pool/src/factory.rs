//! Establishing new pooled connections.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::BytesMut;
use nio_http::config::ConnectionConfig;
use nio_http::connection::{ClientConnection, ConnectionFactory, DefaultClientConnectionFactory, SslClientConnectionFactory};
use nio_http::session::{BoxSession, Session, TlsEngine};
use tracing::debug;

use crate::entry::PoolConnection;
use crate::error::PoolError;
use crate::route::{HttpHost, Route};

/// Creates the physical connection for a new pool entry.
#[async_trait]
pub trait ConnFactory<R: Route, C: PoolConnection>: Send + Sync + 'static {
    async fn create(&self, route: &R) -> Result<C, PoolError>;
}

/// The reactor side of connecting: opens a non-blocking channel to `remote` and
/// registers it with the event loop.
#[async_trait]
pub trait SessionConnector: Send + Sync + 'static {
    type Session: Session + Send + 'static;

    async fn connect(&self, remote: SocketAddr) -> io::Result<Self::Session>;
}

/// Maps a route to the address to connect to.
#[async_trait]
pub trait AddressResolver: Send + Sync + 'static {
    async fn resolve(&self, route: &HttpHost) -> Result<SocketAddr, PoolError>;
}

/// Resolves host names through the system resolver, using the default port of
/// the scheme when the route has none.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl AddressResolver for SystemResolver {
    async fn resolve(&self, route: &HttpHost) -> Result<SocketAddr, PoolError> {
        let port = route.effective_port().ok_or_else(|| PoolError::unsupported_scheme(route.scheme()))?;
        let mut addrs = tokio::net::lookup_host((route.host(), port)).await?;
        addrs
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no address for {route}")).into())
    }
}

/// Stands in for the TLS engine type when no TLS factory is configured.
#[derive(Debug)]
pub enum NoTls {}

impl TlsEngine for NoTls {
    fn read_tls(&mut self, _src: &[u8]) -> io::Result<usize> {
        match *self {}
    }

    fn read_plain(&mut self, _dst: &mut [u8]) -> io::Result<usize> {
        match *self {}
    }

    fn write_plain(&mut self, _src: &[u8]) -> io::Result<usize> {
        match *self {}
    }

    fn write_tls(&mut self, _dst: &mut BytesMut) -> io::Result<usize> {
        match *self {}
    }

    fn wants_write(&self) -> bool {
        match *self {}
    }

    fn is_handshaking(&self) -> bool {
        match *self {}
    }

    fn send_close_notify(&mut self) {
        match *self {}
    }
}

/// Builds HTTP client connections for [`HttpHost`] routes.
///
/// The route is resolved, the connector opens the session and the route is put into
/// the session attachment, where a TLS setup handler can read it (e.g. for SNI). `http`
/// routes get a plain connection, `https` routes a TLS one, which requires a TLS
/// factory.
pub struct BasicNioConnFactory<K, E = NoTls, A = SystemResolver> {
    connector: K,
    resolver: A,
    plain: DefaultClientConnectionFactory,
    ssl: Option<SslClientConnectionFactory<E>>,
}

impl<K: SessionConnector> BasicNioConnFactory<K> {
    pub fn new(connector: K, config: ConnectionConfig) -> Self {
        Self { connector, resolver: SystemResolver, plain: DefaultClientConnectionFactory::new(config), ssl: None }
    }
}

impl<K: SessionConnector, E: TlsEngine> BasicNioConnFactory<K, E> {
    pub fn with_ssl(connector: K, config: ConnectionConfig, ssl: SslClientConnectionFactory<E>) -> Self {
        Self { connector, resolver: SystemResolver, plain: DefaultClientConnectionFactory::new(config), ssl: Some(ssl) }
    }
}

impl<K, E, A> BasicNioConnFactory<K, E, A> {
    pub fn with_resolver<B: AddressResolver>(self, resolver: B) -> BasicNioConnFactory<K, E, B> {
        BasicNioConnFactory { connector: self.connector, resolver, plain: self.plain, ssl: self.ssl }
    }
}

impl<K, E, A> BasicNioConnFactory<K, E, A>
where
    K: SessionConnector,
    E: TlsEngine + Send + 'static,
{
    fn build(&self, route: &HttpHost, mut session: K::Session) -> Result<ClientConnection<BoxSession>, PoolError> {
        session.set_attachment(Box::new(route.clone()));
        let (session, factory) = match route.scheme() {
            "http" => (Box::new(session) as BoxSession, self.plain),
            "https" => {
                let ssl = self.ssl.as_ref().ok_or_else(|| PoolError::unsupported_scheme(route.scheme()))?;
                let session = ssl.wrap_session(session)?;
                (Box::new(session) as BoxSession, DefaultClientConnectionFactory::new(ssl.config()))
            }
            scheme => return Err(PoolError::unsupported_scheme(scheme)),
        };
        Ok(factory.create_connection(session)?)
    }
}

#[async_trait]
impl<K, E, A> ConnFactory<HttpHost, ClientConnection<BoxSession>> for BasicNioConnFactory<K, E, A>
where
    K: SessionConnector,
    E: TlsEngine + Send + Sync + 'static,
    A: AddressResolver,
{
    async fn create(&self, route: &HttpHost) -> Result<ClientConnection<BoxSession>, PoolError> {
        if route.is_secure() && self.ssl.is_none() {
            return Err(PoolError::unsupported_scheme(route.scheme()));
        }
        let remote = self.resolver.resolve(route).await?;
        debug!(%route, %remote, "connecting");
        let session = self.connector.connect(remote).await?;
        self.build(route, session)
    }
}

impl<K, E, A> std::fmt::Debug for BasicNioConnFactory<K, E, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicNioConnFactory").field("plain", &self.plain).field("ssl", &self.ssl.is_some()).finish()
    }
}
