//! Adapters between reactor readiness events and connections.
//!
//! The reactor creates a connection through [`IoEventDispatch::connected`] when a session
//! is established, keeps it next to the session and forwards every later event for that
//! session. Handler errors never leave the dispatch layer, they end up in the `exception`
//! callback of the same handler.
//!
//! A reactor has to call `input_ready` again while the connection reports
//! `has_buffered_input()` and its session still asks for read events, pipelined messages
//! already sitting in the input buffer do not produce a new read event.

use std::io;
use std::marker::PhantomData;

use tracing::{debug, warn};

use crate::connection::{ClientConnection, ConnectionFactory, ServerConnection};
use crate::handler::{ClientEventHandler, ServerEventHandler};
use crate::protocol::HttpError;
use crate::session::Session;

/// Session events as delivered by a reactor.
pub trait IoEventDispatch {
    /// The session type of the reactor.
    type Session;
    type Connection;

    fn connected(&mut self, session: Self::Session) -> io::Result<Self::Connection>;

    fn input_ready(&mut self, conn: &mut Self::Connection);

    fn output_ready(&mut self, conn: &mut Self::Connection);

    fn timeout(&mut self, conn: &mut Self::Connection);

    fn disconnected(&mut self, conn: &mut Self::Connection);

    /// A transport failure reported by the reactor itself.
    fn exception(&mut self, conn: &mut Self::Connection, error: io::Error);
}

#[derive(Debug)]
pub struct ServerIoDispatch<S, H, F> {
    handler: H,
    factory: F,
    _session: PhantomData<fn(S)>,
}

impl<S, H, F> ServerIoDispatch<S, H, F> {
    pub fn new(handler: H, factory: F) -> Self {
        Self { handler, factory, _session: PhantomData }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

impl<S, T, H, F> IoEventDispatch for ServerIoDispatch<S, H, F>
where
    T: Session,
    H: ServerEventHandler<T>,
    F: ConnectionFactory<S, Connection = ServerConnection<T>>,
{
    type Session = S;
    type Connection = ServerConnection<T>;

    fn connected(&mut self, session: S) -> io::Result<Self::Connection> {
        let mut conn = self.factory.create_connection(session)?;
        debug!(remote_addr = ?conn.session().remote_addr(), "server connection established");
        if let Err(e) = self.handler.connected(&mut conn) {
            self.handler.exception(&mut conn, e);
        }
        Ok(conn)
    }

    fn input_ready(&mut self, conn: &mut Self::Connection) {
        conn.consume_input(&mut self.handler);
    }

    fn output_ready(&mut self, conn: &mut Self::Connection) {
        conn.produce_output(&mut self.handler);
    }

    fn timeout(&mut self, conn: &mut Self::Connection) {
        if let Err(e) = self.handler.timeout(conn) {
            self.handler.exception(conn, e);
        }
    }

    fn disconnected(&mut self, conn: &mut Self::Connection) {
        self.handler.closed(conn);
    }

    fn exception(&mut self, conn: &mut Self::Connection, error: io::Error) {
        warn!(cause = %error, "transport failure on server connection");
        self.handler.exception(conn, HttpError::from(error));
    }
}

#[derive(Debug)]
pub struct ClientIoDispatch<S, H, F> {
    handler: H,
    factory: F,
    _session: PhantomData<fn(S)>,
}

impl<S, H, F> ClientIoDispatch<S, H, F> {
    pub fn new(handler: H, factory: F) -> Self {
        Self { handler, factory, _session: PhantomData }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

impl<S, T, H, F> IoEventDispatch for ClientIoDispatch<S, H, F>
where
    T: Session,
    H: ClientEventHandler<T>,
    F: ConnectionFactory<S, Connection = ClientConnection<T>>,
{
    type Session = S;
    type Connection = ClientConnection<T>;

    fn connected(&mut self, session: S) -> io::Result<Self::Connection> {
        let mut conn = self.factory.create_connection(session)?;
        debug!(remote_addr = ?conn.session().remote_addr(), "client connection established");
        if let Err(e) = self.handler.connected(&mut conn) {
            self.handler.exception(&mut conn, e);
        }
        Ok(conn)
    }

    fn input_ready(&mut self, conn: &mut Self::Connection) {
        conn.consume_input(&mut self.handler);
    }

    fn output_ready(&mut self, conn: &mut Self::Connection) {
        conn.produce_output(&mut self.handler);
    }

    fn timeout(&mut self, conn: &mut Self::Connection) {
        if let Err(e) = self.handler.timeout(conn) {
            self.handler.exception(conn, e);
        }
    }

    fn disconnected(&mut self, conn: &mut Self::Connection) {
        self.handler.closed(conn);
    }

    fn exception(&mut self, conn: &mut Self::Connection, error: io::Error) {
        warn!(cause = %error, "transport failure on client connection");
        self.handler.exception(conn, HttpError::from(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ContentDecoder, ContentEncoder};
    use crate::config::ConnectionConfig;
    use crate::connection::{ConnectionStatus, DefaultServerConnectionFactory};
    use crate::session::EventMask;
    use crate::session::mock::QueueSession;

    /// Fails every callback it can, so every path ends in `exception`.
    #[derive(Default)]
    struct FailingHandler {
        exceptions: Vec<String>,
        closed: bool,
    }

    impl ServerEventHandler<QueueSession> for FailingHandler {
        fn connected(&mut self, _conn: &mut ServerConnection<QueueSession>) -> Result<(), HttpError> {
            Err(HttpError::handler("refusing connection"))
        }

        fn request_received(&mut self, _conn: &mut ServerConnection<QueueSession>) -> Result<(), HttpError> {
            Err(HttpError::handler("no requests today"))
        }

        fn input_ready(
            &mut self,
            _conn: &mut ServerConnection<QueueSession>,
            _decoder: &mut ContentDecoder<'_>,
        ) -> Result<(), HttpError> {
            Ok(())
        }

        fn response_ready(&mut self, _conn: &mut ServerConnection<QueueSession>) -> Result<(), HttpError> {
            Err(HttpError::handler("no responses either"))
        }

        fn output_ready(
            &mut self,
            _conn: &mut ServerConnection<QueueSession>,
            _encoder: &mut ContentEncoder<'_>,
        ) -> Result<(), HttpError> {
            Ok(())
        }

        fn exception(&mut self, _conn: &mut ServerConnection<QueueSession>, error: HttpError) {
            self.exceptions.push(error.to_string());
        }

        fn closed(&mut self, _conn: &mut ServerConnection<QueueSession>) {
            self.closed = true;
        }
    }

    fn dispatch() -> ServerIoDispatch<QueueSession, FailingHandler, DefaultServerConnectionFactory> {
        ServerIoDispatch::new(FailingHandler::default(), DefaultServerConnectionFactory::new(ConnectionConfig::default()))
    }

    #[test]
    fn handler_errors_are_routed_to_exception() {
        let mut dispatch = dispatch();
        let mut session = QueueSession::with_input(b"GET / HTTP/1.1\r\n\r\n");
        session.mask = EventMask::READ_WRITE;

        let mut conn = dispatch.connected(session).unwrap();
        dispatch.input_ready(&mut conn);
        dispatch.output_ready(&mut conn);
        dispatch.exception(&mut conn, io::Error::from(io::ErrorKind::ConnectionReset));

        let exceptions = &dispatch.handler().exceptions;
        assert_eq!(exceptions.len(), 4);
        assert!(exceptions[0].contains("refusing connection"));
        assert!(exceptions[1].contains("no requests today"));
        assert!(exceptions[2].contains("no responses either"));
        assert!(exceptions[3].starts_with("transport error"));
    }

    #[test]
    fn timeout_closes_then_shuts_down() {
        let mut dispatch = dispatch();
        let mut conn = dispatch.connected(QueueSession::default()).unwrap();

        dispatch.timeout(&mut conn);
        assert_eq!(conn.status(), ConnectionStatus::Closed);
        assert!(conn.session().closed);

        dispatch.disconnected(&mut conn);
        assert!(dispatch.handler().closed);
    }
}
