//! TLS layered over another session.
//!
//! The record layer and handshake are supplied from outside through [`TlsEngine`],
//! [`SslSession`] only moves ciphertext between the engine and the inner session and
//! exposes the plaintext side as an ordinary [`Session`].

use std::any::Any;
use std::io;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use super::{EventMask, Session, SessionStatus};

const CIPHER_READ_SIZE: usize = 4 * 1024;

/// Ciphertext held back for a blocked inner session before plaintext writes are refused
const OUTBOUND_HIGH_WATER: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Client,
    Server,
}

/// An opaque TLS record layer.
pub trait TlsEngine {
    /// Feeds ciphertext received from the peer, returns how many bytes were consumed.
    fn read_tls(&mut self, src: &[u8]) -> io::Result<usize>;

    /// Copies decrypted application data into `dst`.
    ///
    /// `ErrorKind::WouldBlock` when more ciphertext is needed, `Ok(0)` once the peer
    /// closed the TLS session.
    fn read_plain(&mut self, dst: &mut [u8]) -> io::Result<usize>;

    /// Accepts application data for encryption.
    fn write_plain(&mut self, src: &[u8]) -> io::Result<usize>;

    /// Moves pending ciphertext into `dst`.
    fn write_tls(&mut self, dst: &mut BytesMut) -> io::Result<usize>;

    fn wants_write(&self) -> bool;

    fn is_handshaking(&self) -> bool;

    fn send_close_notify(&mut self);
}

/// Hook invoked once when the engine of a new [`SslSession`] is set up.
///
/// `endpoint` is the attachment of the inner session for client sessions (the
/// connector puts the target route there) and `None` for server sessions.
pub trait SslSetupHandler<E> {
    fn initialize(&self, mode: SslMode, endpoint: Option<&(dyn Any + Send)>, engine: &mut E) -> io::Result<()>;
}

#[derive(Debug)]
pub struct SslSession<S, E> {
    inner: S,
    engine: E,
    mode: SslMode,
    inbound: BytesMut,
    outbound: BytesMut,
    inner_eof: bool,
}

impl<S: Session, E: TlsEngine> SslSession<S, E> {
    pub fn new(inner: S, mode: SslMode, mut engine: E, setup: Option<&dyn SslSetupHandler<E>>) -> io::Result<Self> {
        if let Some(setup) = setup {
            let endpoint = match mode {
                SslMode::Client => inner.attachment(),
                SslMode::Server => None,
            };
            setup.initialize(mode, endpoint, &mut engine)?;
        }

        debug!(?mode, "tls session created");
        Ok(Self { inner, engine, mode, inbound: BytesMut::new(), outbound: BytesMut::new(), inner_eof: false })
    }

    pub fn mode(&self) -> SslMode {
        self.mode
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn is_handshaking(&self) -> bool {
        self.engine.is_handshaking()
    }

    /// Takes ciphertext from the engine until `limit` bytes are buffered.
    fn drain_engine(&mut self, limit: usize) -> io::Result<()> {
        while self.outbound.len() < limit && self.engine.wants_write() {
            if self.engine.write_tls(&mut self.outbound)? == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Moves pending ciphertext to the inner session until it stops accepting bytes.
    fn flush_tls(&mut self) -> io::Result<()> {
        self.drain_engine(OUTBOUND_HIGH_WATER)?;

        while !self.outbound.is_empty() {
            match self.inner.write(&self.outbound) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => {
                    trace!(size = n, "flushed ciphertext");
                    self.outbound.advance(n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    self.inner.set_event(EventMask::WRITE);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<S: Session, E: TlsEngine> Session for SslSession<S, E> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let mut cipher = [0u8; CIPHER_READ_SIZE];
        loop {
            match self.engine.read_plain(dst) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => return Err(e),
            }

            // the handshake may be waiting on our side of the conversation
            self.flush_tls()?;

            if self.inner_eof {
                return Ok(0);
            }

            match self.inner.read(&mut cipher) {
                Ok(0) => {
                    debug!("inner session reached end of stream");
                    self.inner_eof = true;
                }
                Ok(n) => {
                    self.inbound.extend_from_slice(&cipher[..n]);
                    let consumed = self.engine.read_tls(&self.inbound)?;
                    self.inbound.advance(consumed);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.flush_tls()?;
        if self.outbound.len() >= OUTBOUND_HIGH_WATER {
            trace!(pending = self.outbound.len(), "ciphertext backlog, refusing plaintext");
            return Err(ErrorKind::WouldBlock.into());
        }
        let written = self.engine.write_plain(src)?;
        self.flush_tls()?;
        Ok(written)
    }

    fn event_mask(&self) -> EventMask {
        self.inner.event_mask()
    }

    fn set_event_mask(&mut self, mask: EventMask) {
        if self.outbound.is_empty() && !self.engine.wants_write() {
            self.inner.set_event_mask(mask);
        } else {
            self.inner.set_event_mask(mask | EventMask::WRITE);
        }
    }

    fn close(&mut self) {
        self.engine.send_close_notify();
        if let Err(e) = self.drain_engine(usize::MAX).and_then(|()| self.flush_tls()) {
            debug!(cause = %e, "failed to flush close notify");
        }
        self.inner.close();
    }

    fn shutdown(&mut self) {
        self.inner.shutdown();
    }

    fn status(&self) -> SessionStatus {
        self.inner.status()
    }

    fn socket_timeout(&self) -> Option<Duration> {
        self.inner.socket_timeout()
    }

    fn set_socket_timeout(&mut self, timeout: Option<Duration>) {
        self.inner.set_socket_timeout(timeout);
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr()
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.inner.remote_addr()
    }

    fn attachment(&self) -> Option<&(dyn Any + Send)> {
        self.inner.attachment()
    }

    fn set_attachment(&mut self, attachment: Box<dyn Any + Send>) {
        self.inner.set_attachment(attachment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::QueueSession;
    use std::collections::VecDeque;

    /// Toy record layer: every byte is xor-ed with a key, close notify is a lone 0xFF byte
    /// which never collides because payload bytes are restricted to ASCII in the tests.
    #[derive(Default)]
    struct XorEngine {
        key: u8,
        plain_in: VecDeque<u8>,
        cipher_out: Vec<u8>,
        peer_closed: bool,
        server_name: Option<String>,
    }

    impl TlsEngine for XorEngine {
        fn read_tls(&mut self, src: &[u8]) -> io::Result<usize> {
            for byte in src {
                if *byte == 0xFF {
                    self.peer_closed = true;
                } else {
                    self.plain_in.push_back(byte ^ self.key);
                }
            }
            Ok(src.len())
        }

        fn read_plain(&mut self, dst: &mut [u8]) -> io::Result<usize> {
            if self.plain_in.is_empty() {
                return if self.peer_closed { Ok(0) } else { Err(ErrorKind::WouldBlock.into()) };
            }
            let n = dst.len().min(self.plain_in.len());
            for (slot, byte) in dst.iter_mut().zip(self.plain_in.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }

        fn write_plain(&mut self, src: &[u8]) -> io::Result<usize> {
            self.cipher_out.extend(src.iter().map(|b| b ^ self.key));
            Ok(src.len())
        }

        fn write_tls(&mut self, dst: &mut BytesMut) -> io::Result<usize> {
            let n = self.cipher_out.len();
            dst.extend_from_slice(&self.cipher_out);
            self.cipher_out.clear();
            Ok(n)
        }

        fn wants_write(&self) -> bool {
            !self.cipher_out.is_empty()
        }

        fn is_handshaking(&self) -> bool {
            false
        }

        fn send_close_notify(&mut self) {
            self.cipher_out.push(0xFF);
        }
    }

    struct SniSetup;

    impl SslSetupHandler<XorEngine> for SniSetup {
        fn initialize(&self, mode: SslMode, endpoint: Option<&(dyn Any + Send)>, engine: &mut XorEngine) -> io::Result<()> {
            assert_eq!(mode, SslMode::Client);
            engine.key = 0x20;
            engine.server_name = endpoint.and_then(|e| e.downcast_ref::<String>()).cloned();
            Ok(())
        }
    }

    #[test]
    fn plaintext_round_trips_through_engine() {
        let mut inner = QueueSession::default();
        inner.set_attachment(Box::new(String::from("example.com")));
        inner.incoming.extend(b"hello".iter().map(|b| b ^ 0x20));

        let mut session = SslSession::new(inner, SslMode::Client, XorEngine::default(), Some(&SniSetup)).unwrap();
        assert_eq!(session.engine().server_name.as_deref(), Some("example.com"));

        let mut dst = [0u8; 16];
        let n = session.read(&mut dst).unwrap();
        assert_eq!(&dst[..n], b"hello");

        let err = session.read(&mut dst).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);

        assert_eq!(session.write(b"world").unwrap(), 5);
        let sent: Vec<u8> = session.inner().outgoing.iter().map(|b| b ^ 0x20).collect();
        assert_eq!(&sent[..], b"world");
    }

    #[test]
    fn close_sends_close_notify_and_closes_inner() {
        let mut session = SslSession::new(QueueSession::default(), SslMode::Server, XorEngine::default(), None).unwrap();
        session.close();
        assert_eq!(session.inner().outgoing, vec![0xFF]);
        assert!(session.is_closed());
    }

    #[test]
    fn blocked_inner_session_bounds_buffered_ciphertext() {
        let mut inner = QueueSession::default();
        inner.write_limit = 0;
        let mut session = SslSession::new(inner, SslMode::Server, XorEngine::default(), None).unwrap();

        let block = [b'x'; 4096];
        let mut accepted = 0;
        let err = loop {
            match session.write(&block) {
                Ok(n) => accepted += n,
                Err(e) => break e,
            }
            assert!(accepted <= 2 * OUTBOUND_HIGH_WATER, "plaintext accepted without bound");
        };
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
        assert!(session.outbound.len() < OUTBOUND_HIGH_WATER + block.len());
        assert!(session.inner().mask.is_writable());

        // once the inner session drains, plaintext is accepted again
        session.inner.write_limit = usize::MAX;
        assert_eq!(session.write(b"y").unwrap(), 1);
        assert!(session.outbound.is_empty());
        assert_eq!(session.inner().outgoing.len(), accepted + 1);
    }

    #[test]
    fn inner_end_of_stream_is_end_of_stream() {
        let mut inner = QueueSession::default();
        inner.eof = true;
        let mut session = SslSession::new(inner, SslMode::Server, XorEngine::default(), None).unwrap();
        let mut dst = [0u8; 4];
        assert_eq!(session.read(&mut dst).unwrap(), 0);
    }
}
