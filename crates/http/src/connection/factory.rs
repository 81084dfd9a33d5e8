//! Builds connections on top of freshly connected or accepted sessions.

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::connection::{ClientConnection, ServerConnection};
use crate::session::{Session, SslMode, SslSession, SslSetupHandler, TlsEngine};

/// Wraps a session into a connection.
pub trait ConnectionFactory<S> {
    type Connection;

    fn create_connection(&self, session: S) -> io::Result<Self::Connection>;
}

/// Creates a TLS engine for every new session.
pub type EngineFactory<E> = Arc<dyn Fn(SslMode) -> io::Result<E> + Send + Sync>;

/// Shared hook applied to every new TLS engine.
pub type SetupHandler<E> = Arc<dyn SslSetupHandler<E> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultServerConnectionFactory {
    config: ConnectionConfig,
}

impl DefaultServerConnectionFactory {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

impl<S: Session> ConnectionFactory<S> for DefaultServerConnectionFactory {
    type Connection = ServerConnection<S>;

    fn create_connection(&self, session: S) -> io::Result<Self::Connection> {
        Ok(ServerConnection::new(session, self.config))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClientConnectionFactory {
    config: ConnectionConfig,
}

impl DefaultClientConnectionFactory {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

impl<S: Session> ConnectionFactory<S> for DefaultClientConnectionFactory {
    type Connection = ClientConnection<S>;

    fn create_connection(&self, session: S) -> io::Result<Self::Connection> {
        Ok(ClientConnection::new(session, self.config))
    }
}

/// Server connections over TLS, the session is wrapped into an [`SslSession`] in server mode.
pub struct SslServerConnectionFactory<E> {
    config: ConnectionConfig,
    engine_factory: EngineFactory<E>,
    setup: Option<SetupHandler<E>>,
}

impl<E> SslServerConnectionFactory<E> {
    pub fn new(config: ConnectionConfig, engine_factory: EngineFactory<E>) -> Self {
        Self { config, engine_factory, setup: None }
    }

    #[must_use]
    pub fn with_setup_handler(mut self, setup: SetupHandler<E>) -> Self {
        self.setup = Some(setup);
        self
    }
}

impl<E> fmt::Debug for SslServerConnectionFactory<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SslServerConnectionFactory")
            .field("config", &self.config)
            .field("setup", &self.setup.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: Session, E: TlsEngine> ConnectionFactory<S> for SslServerConnectionFactory<E> {
    type Connection = ServerConnection<SslSession<S, E>>;

    fn create_connection(&self, session: S) -> io::Result<Self::Connection> {
        let session = ssl_session(session, SslMode::Server, &self.engine_factory, self.setup.as_ref())?;
        Ok(ServerConnection::new(session, self.config))
    }
}

/// Client connections over TLS, the setup handler sees the attachment of the session as
/// the endpoint it connects to.
pub struct SslClientConnectionFactory<E> {
    config: ConnectionConfig,
    engine_factory: EngineFactory<E>,
    setup: Option<SetupHandler<E>>,
}

impl<E> SslClientConnectionFactory<E> {
    pub fn new(config: ConnectionConfig, engine_factory: EngineFactory<E>) -> Self {
        Self { config, engine_factory, setup: None }
    }

    #[must_use]
    pub fn with_setup_handler(mut self, setup: SetupHandler<E>) -> Self {
        self.setup = Some(setup);
        self
    }
}

impl<E: TlsEngine> SslClientConnectionFactory<E> {
    pub fn config(&self) -> ConnectionConfig {
        self.config
    }

    /// Layers TLS over `session` without building a connection on top of it.
    pub fn wrap_session<S: Session>(&self, session: S) -> io::Result<SslSession<S, E>> {
        ssl_session(session, SslMode::Client, &self.engine_factory, self.setup.as_ref())
    }
}

impl<E> fmt::Debug for SslClientConnectionFactory<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SslClientConnectionFactory")
            .field("config", &self.config)
            .field("setup", &self.setup.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: Session, E: TlsEngine> ConnectionFactory<S> for SslClientConnectionFactory<E> {
    type Connection = ClientConnection<SslSession<S, E>>;

    fn create_connection(&self, session: S) -> io::Result<Self::Connection> {
        Ok(ClientConnection::new(self.wrap_session(session)?, self.config))
    }
}

fn ssl_session<S: Session, E: TlsEngine>(
    session: S,
    mode: SslMode,
    engine_factory: &EngineFactory<E>,
    setup: Option<&SetupHandler<E>>,
) -> io::Result<SslSession<S, E>> {
    let engine = engine_factory(mode)?;
    let setup = setup.map(|setup| &**setup as &dyn SslSetupHandler<E>);
    SslSession::new(session, mode, engine, setup)
}
