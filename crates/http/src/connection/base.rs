use std::io;
use std::time::Duration;

use http::Extensions;
use tracing::{debug, trace};

use crate::buffer::{Fill, SessionInputBuffer, SessionOutputBuffer};
use crate::config::ConnectionConfig;
use crate::connection::ConnectionMetrics;
use crate::session::{EventMask, Session};

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Active,
    /// `close()` was requested while output was still buffered.
    Closing,
    Closed,
}

/// State shared by the server and the client side of a connection: the session, both
/// session buffers and the lifecycle status.
#[derive(Debug)]
pub(crate) struct ConnectionBase<S> {
    pub(crate) session: S,
    pub(crate) status: ConnectionStatus,
    pub(crate) inbuf: SessionInputBuffer,
    pub(crate) outbuf: SessionOutputBuffer,
    pub(crate) metrics: ConnectionMetrics,
    pub(crate) context: Extensions,
    pub(crate) config: ConnectionConfig,
    /// set while the output buffer is lent to an `output_ready` callback
    pub(crate) output_busy: bool,
}

impl<S: Session> ConnectionBase<S> {
    pub(crate) fn new(session: S, config: ConnectionConfig) -> Self {
        Self {
            session,
            status: ConnectionStatus::Active,
            inbuf: SessionInputBuffer::new(config.buffer_size),
            outbuf: SessionOutputBuffer::new(config.buffer_size),
            metrics: ConnectionMetrics::default(),
            context: Extensions::new(),
            config,
            output_busy: false,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.status == ConnectionStatus::Active
    }

    /// Graceful close, buffered output is flushed by the following `produce_output` calls.
    pub(crate) fn close(&mut self) {
        if self.status != ConnectionStatus::Active {
            return;
        }
        self.status = ConnectionStatus::Closing;
        if self.outbuf.has_data() || self.output_busy {
            debug!(pending = self.outbuf.len(), "closing connection once the output is flushed");
            self.session.set_event(EventMask::WRITE);
        } else {
            self.close_session();
        }
    }

    pub(crate) fn shutdown(&mut self) {
        debug!("shutting down connection");
        self.status = ConnectionStatus::Closed;
        self.session.shutdown();
    }

    pub(crate) fn close_session(&mut self) {
        debug!("closing connection");
        self.session.close();
        self.status = ConnectionStatus::Closed;
    }

    pub(crate) fn fill_input(&mut self) -> io::Result<Fill> {
        let fill = self.inbuf.fill(&mut self.session)?;
        self.metrics.add_bytes_received(fill.bytes_read());
        Ok(fill)
    }

    pub(crate) fn flush_output(&mut self) -> io::Result<usize> {
        if !self.outbuf.has_data() {
            return Ok(0);
        }
        let written = self.outbuf.flush(&mut self.session)?;
        self.metrics.add_bytes_sent(written);
        trace!(written, pending = self.outbuf.len(), "flushed output buffer");
        Ok(written)
    }

    pub(crate) fn socket_timeout(&self) -> Option<Duration> {
        self.session.socket_timeout()
    }

    pub(crate) fn set_socket_timeout(&mut self, timeout: Option<Duration>) {
        self.session.set_socket_timeout(timeout);
    }
}

/// Generates the connection operations both roles expose, delegating to `self.base`.
macro_rules! delegate_base {
    () => {
        pub fn status(&self) -> $crate::connection::ConnectionStatus {
            self.base.status
        }

        /// True while the connection is `Active`.
        pub fn is_open(&self) -> bool {
            self.base.is_open()
        }

        /// Closes the connection once buffered output has been written out.
        pub fn close(&mut self) {
            self.base.close();
        }

        /// Closes the connection immediately, buffered output is dropped.
        pub fn shutdown(&mut self) {
            self.base.shutdown();
        }

        pub fn request_input(&mut self) {
            self.base.session.set_event($crate::session::EventMask::READ);
        }

        pub fn suspend_input(&mut self) {
            self.base.session.clear_event($crate::session::EventMask::READ);
        }

        pub fn request_output(&mut self) {
            self.base.session.set_event($crate::session::EventMask::WRITE);
        }

        pub fn suspend_output(&mut self) {
            self.base.session.clear_event($crate::session::EventMask::WRITE);
        }

        pub fn socket_timeout(&self) -> Option<std::time::Duration> {
            self.base.socket_timeout()
        }

        pub fn set_socket_timeout(&mut self, timeout: Option<std::time::Duration>) {
            self.base.set_socket_timeout(timeout);
        }

        /// Unconsumed bytes are buffered, the reactor has to call `consume_input` again
        /// even without a new read event.
        pub fn has_buffered_input(&self) -> bool {
            self.base.inbuf.has_data()
        }

        pub fn has_buffered_output(&self) -> bool {
            self.base.outbuf.has_data()
        }

        pub fn metrics(&self) -> &$crate::connection::ConnectionMetrics {
            &self.base.metrics
        }

        /// Per connection attributes.
        pub fn context(&self) -> &http::Extensions {
            &self.base.context
        }

        pub fn context_mut(&mut self) -> &mut http::Extensions {
            &mut self.base.context
        }

        pub fn config(&self) -> &$crate::config::ConnectionConfig {
            &self.base.config
        }

        pub fn session(&self) -> &S {
            &self.base.session
        }

        pub fn session_mut(&mut self) -> &mut S {
            &mut self.base.session
        }
    };
}

pub(crate) use delegate_base;
