//! The non-blocking session contract consumed from the reactor.
//!
//! A [`Session`] is a non-blocking channel plus the readiness controls of the event
//! loop driving it. The reactor itself (selector, epoll, io_uring ...) lives outside
//! of this crate, the connections in [`crate::connection`] are written against this
//! trait only and do not know whether they sit on a plain socket or on an
//! [`SslSession`] wrapping one.

mod ssl;

#[cfg(test)]
pub(crate) mod mock;

pub use ssl::SslMode;
pub use ssl::SslSession;
pub use ssl::SslSetupHandler;
pub use ssl::TlsEngine;

use std::any::Any;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::ops::{BitOr, BitOrAssign};
use std::time::Duration;

/// The readiness interest of a session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventMask(u8);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const READ: EventMask = EventMask(0b01);
    pub const WRITE: EventMask = EventMask(0b10);
    pub const READ_WRITE: EventMask = EventMask(0b11);

    #[inline]
    pub const fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    #[inline]
    #[must_use]
    pub const fn remove(self, other: EventMask) -> EventMask {
        EventMask(self.0 & !other.0)
    }

    #[inline]
    pub const fn is_readable(self) -> bool {
        self.contains(EventMask::READ)
    }

    #[inline]
    pub const fn is_writable(self) -> bool {
        self.contains(EventMask::WRITE)
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventMask {
    fn bitor_assign(&mut self, rhs: EventMask) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_readable(), self.is_writable()) {
            (true, true) => f.write_str("READ | WRITE"),
            (true, false) => f.write_str("READ"),
            (false, true) => f.write_str("WRITE"),
            (false, false) => f.write_str("NONE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Closing,
    Closed,
}

/// A non-blocking channel driven by a readiness event loop.
///
/// `read` and `write` follow the non-blocking `std::io` conventions: `Ok(0)` from
/// `read` signals end of stream, `ErrorKind::WouldBlock` means nothing can be moved
/// right now.
pub trait Session {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize>;

    fn write(&mut self, src: &[u8]) -> io::Result<usize>;

    fn event_mask(&self) -> EventMask;

    fn set_event_mask(&mut self, mask: EventMask);

    fn set_event(&mut self, op: EventMask) {
        let mask = self.event_mask() | op;
        self.set_event_mask(mask);
    }

    fn clear_event(&mut self, op: EventMask) {
        let mask = self.event_mask().remove(op);
        self.set_event_mask(mask);
    }

    /// Closes the channel gracefully, pending output of a layered session is still flushed.
    fn close(&mut self);

    /// Closes the channel immediately.
    fn shutdown(&mut self);

    fn status(&self) -> SessionStatus;

    fn is_closed(&self) -> bool {
        self.status() == SessionStatus::Closed
    }

    /// `None` disables the timeout.
    fn socket_timeout(&self) -> Option<Duration>;

    fn set_socket_timeout(&mut self, timeout: Option<Duration>);

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// Opaque value the reactor or a connector associated with this session.
    fn attachment(&self) -> Option<&(dyn Any + Send)>;

    fn set_attachment(&mut self, attachment: Box<dyn Any + Send>);
}

pub type BoxSession = Box<dyn Session + Send>;

impl<S: Session + ?Sized> Session for Box<S> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        (**self).read(dst)
    }

    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        (**self).write(src)
    }

    fn event_mask(&self) -> EventMask {
        (**self).event_mask()
    }

    fn set_event_mask(&mut self, mask: EventMask) {
        (**self).set_event_mask(mask);
    }

    fn set_event(&mut self, op: EventMask) {
        (**self).set_event(op);
    }

    fn clear_event(&mut self, op: EventMask) {
        (**self).clear_event(op);
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn shutdown(&mut self) {
        (**self).shutdown();
    }

    fn status(&self) -> SessionStatus {
        (**self).status()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn socket_timeout(&self) -> Option<Duration> {
        (**self).socket_timeout()
    }

    fn set_socket_timeout(&mut self, timeout: Option<Duration>) {
        (**self).set_socket_timeout(timeout);
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        (**self).local_addr()
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        (**self).remote_addr()
    }

    fn attachment(&self) -> Option<&(dyn Any + Send)> {
        (**self).attachment()
    }

    fn set_attachment(&mut self, attachment: Box<dyn Any + Send>) {
        (**self).set_attachment(attachment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_mask_ops() {
        let mask = EventMask::READ | EventMask::WRITE;
        assert_eq!(mask, EventMask::READ_WRITE);
        assert!(mask.is_readable());
        assert!(mask.is_writable());

        let mask = mask.remove(EventMask::READ);
        assert!(!mask.is_readable());
        assert!(mask.is_writable());
        assert_eq!(format!("{mask:?}"), "WRITE");

        assert!(!EventMask::NONE.contains(EventMask::NONE));
    }
}
