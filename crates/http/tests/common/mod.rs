#![allow(dead_code, reason = "each test binary uses a different part of the helpers")]

use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use nio_http::connection::{ClientConnection, ConnectionStatus, ServerConnection};
use nio_http::handler::{ClientEventHandler, ServerEventHandler};
use nio_http::session::{EventMask, Session, SessionStatus};
use parking_lot::Mutex;

const ROUNDS: usize = 64;

#[derive(Debug, Default)]
struct Pipe {
    data: VecDeque<u8>,
    closed: bool,
}

/// One end of an in-memory, full duplex byte channel.
#[derive(Debug)]
pub struct MemorySession {
    incoming: Arc<Mutex<Pipe>>,
    outgoing: Arc<Mutex<Pipe>>,
    mask: EventMask,
    status: SessionStatus,
    /// upper bound for a single read, simulates small TCP segments
    pub read_limit: usize,
    timeout: Option<Duration>,
    attachment: Option<Box<dyn Any + Send>>,
}

impl MemorySession {
    /// Creates two connected ends, both asking for read events.
    pub fn pair() -> (MemorySession, MemorySession) {
        let a = Arc::new(Mutex::new(Pipe::default()));
        let b = Arc::new(Mutex::new(Pipe::default()));
        (MemorySession::new(Arc::clone(&a), Arc::clone(&b)), MemorySession::new(b, a))
    }

    fn new(incoming: Arc<Mutex<Pipe>>, outgoing: Arc<Mutex<Pipe>>) -> Self {
        Self {
            incoming,
            outgoing,
            mask: EventMask::READ,
            status: SessionStatus::Active,
            read_limit: usize::MAX,
            timeout: None,
            attachment: None,
        }
    }

    /// Bytes are waiting to be read or the peer closed, a closed channel stays readable.
    pub fn has_pending_input(&self) -> bool {
        let pipe = self.incoming.lock();
        !pipe.data.is_empty() || pipe.closed
    }

    /// Closes only the sending direction, the peer reads an end of stream.
    pub fn close_output(&mut self) {
        self.outgoing.lock().closed = true;
    }

    /// Drains everything the peer sent so far.
    pub fn read_available(&mut self) -> Vec<u8> {
        self.incoming.lock().data.drain(..).collect()
    }

    /// The peer closed its sending direction.
    pub fn peer_closed(&self) -> bool {
        self.incoming.lock().closed
    }
}

impl Session for MemorySession {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let mut pipe = self.incoming.lock();
        if pipe.data.is_empty() {
            if pipe.closed {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = dst.len().min(pipe.data.len()).min(self.read_limit);
        for (slot, byte) in dst.iter_mut().zip(pipe.data.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        if self.status == SessionStatus::Closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.outgoing.lock().data.extend(src);
        Ok(src.len())
    }

    fn event_mask(&self) -> EventMask {
        self.mask
    }

    fn set_event_mask(&mut self, mask: EventMask) {
        self.mask = mask;
    }

    fn close(&mut self) {
        self.status = SessionStatus::Closed;
        self.outgoing.lock().closed = true;
    }

    fn shutdown(&mut self) {
        self.close();
    }

    fn status(&self) -> SessionStatus {
        self.status
    }

    fn socket_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_socket_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn attachment(&self) -> Option<&(dyn Any + Send)> {
        self.attachment.as_deref()
    }

    fn set_attachment(&mut self, attachment: Box<dyn Any + Send>) {
        self.attachment = Some(attachment);
    }
}

/// One pass of a readiness loop over a server connection.
pub fn step_server<H: ServerEventHandler<MemorySession>>(conn: &mut ServerConnection<MemorySession>, handler: &mut H) {
    if conn.status() == ConnectionStatus::Closed {
        return;
    }
    if conn.session().event_mask().is_readable() && (conn.has_buffered_input() || conn.session().has_pending_input()) {
        conn.consume_input(handler);
    }
    if conn.session().event_mask().is_writable() {
        conn.produce_output(handler);
    }
}

/// One pass of a readiness loop over a client connection.
pub fn step_client<H: ClientEventHandler<MemorySession>>(conn: &mut ClientConnection<MemorySession>, handler: &mut H) {
    if conn.status() == ConnectionStatus::Closed {
        return;
    }
    if conn.session().event_mask().is_readable() && (conn.has_buffered_input() || conn.session().has_pending_input()) {
        conn.consume_input(handler);
    }
    if conn.session().event_mask().is_writable() {
        conn.produce_output(handler);
    }
}

pub fn run_server<H: ServerEventHandler<MemorySession>>(conn: &mut ServerConnection<MemorySession>, handler: &mut H) {
    for _ in 0..ROUNDS {
        step_server(conn, handler);
    }
}

pub fn run_pair<SH, CH>(
    server: &mut ServerConnection<MemorySession>,
    server_handler: &mut SH,
    client: &mut ClientConnection<MemorySession>,
    client_handler: &mut CH,
) where
    SH: ServerEventHandler<MemorySession>,
    CH: ClientEventHandler<MemorySession>,
{
    for _ in 0..ROUNDS {
        step_client(client, client_handler);
        step_server(server, server_handler);
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
}
