//! Event handler capabilities implemented by the application.
//!
//! A connection calls back into its handler from `consume_input`, `produce_output` and
//! the dispatch layer. Every callback receives the connection itself, so a handler can
//! submit the next message, suspend input or close from inside the callback. Body bytes
//! are read and written through the [`ContentDecoder`] / [`ContentEncoder`] lent to
//! `input_ready` and `output_ready`, the handles are only valid for that one call.
//!
//! Errors returned from a callback are routed to [`exception`](ServerEventHandler::exception)
//! of the same handler, they never reach the reactor.

use tracing::{debug, error};

use crate::codec::{ContentDecoder, ContentEncoder};
use crate::connection::{ClientConnection, ServerConnection};
use crate::protocol::HttpError;
use crate::session::Session;

/// Callbacks of the server side of a connection.
pub trait ServerEventHandler<S: Session> {
    fn connected(&mut self, conn: &mut ServerConnection<S>) -> Result<(), HttpError> {
        let _ = conn;
        Ok(())
    }

    /// A request head arrived, it is available through [`ServerConnection::http_request`].
    fn request_received(&mut self, conn: &mut ServerConnection<S>) -> Result<(), HttpError>;

    /// Body bytes of the current request are buffered.
    fn input_ready(&mut self, conn: &mut ServerConnection<S>, decoder: &mut ContentDecoder<'_>) -> Result<(), HttpError>;

    /// The connection can take the next response, see [`ServerConnection::submit_response`].
    fn response_ready(&mut self, conn: &mut ServerConnection<S>) -> Result<(), HttpError>;

    /// The output buffer has room for body bytes of the current response.
    fn output_ready(&mut self, conn: &mut ServerConnection<S>, encoder: &mut ContentEncoder<'_>) -> Result<(), HttpError>;

    /// The peer closed its side and no request is pending.
    fn end_of_input(&mut self, conn: &mut ServerConnection<S>) -> Result<(), HttpError> {
        debug!("peer closed the connection");
        conn.close();
        Ok(())
    }

    fn timeout(&mut self, conn: &mut ServerConnection<S>) -> Result<(), HttpError> {
        if conn.is_open() {
            conn.close();
        } else {
            conn.shutdown();
        }
        Ok(())
    }

    fn exception(&mut self, conn: &mut ServerConnection<S>, error: HttpError) {
        error!(cause = %error, "server connection failed");
        conn.shutdown();
    }

    fn closed(&mut self, conn: &mut ServerConnection<S>) {
        let _ = conn;
    }
}

/// Callbacks of the client side of a connection.
pub trait ClientEventHandler<S: Session> {
    fn connected(&mut self, conn: &mut ClientConnection<S>) -> Result<(), HttpError> {
        let _ = conn;
        Ok(())
    }

    /// The connection can take the next request, see [`ClientConnection::submit_request`].
    fn request_ready(&mut self, conn: &mut ClientConnection<S>) -> Result<(), HttpError>;

    /// The output buffer has room for body bytes of the current request.
    fn output_ready(&mut self, conn: &mut ClientConnection<S>, encoder: &mut ContentEncoder<'_>) -> Result<(), HttpError>;

    /// A response head arrived, it is available through [`ClientConnection::http_response`].
    fn response_received(&mut self, conn: &mut ClientConnection<S>) -> Result<(), HttpError>;

    /// Body bytes of the current response are buffered.
    fn input_ready(&mut self, conn: &mut ClientConnection<S>, decoder: &mut ContentDecoder<'_>) -> Result<(), HttpError>;

    fn end_of_input(&mut self, conn: &mut ClientConnection<S>) -> Result<(), HttpError> {
        debug!("peer closed the connection");
        conn.close();
        Ok(())
    }

    fn timeout(&mut self, conn: &mut ClientConnection<S>) -> Result<(), HttpError> {
        if conn.is_open() {
            conn.close();
        } else {
            conn.shutdown();
        }
        Ok(())
    }

    fn exception(&mut self, conn: &mut ClientConnection<S>, error: HttpError) {
        error!(cause = %error, "client connection failed");
        conn.shutdown();
    }

    fn closed(&mut self, conn: &mut ClientConnection<S>) {
        let _ = conn;
    }
}
