use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::io::ErrorKind;
use std::time::Duration;

use super::{EventMask, Session, SessionStatus};

/// Byte session backed by two queues, reads are capped by `read_limit` and writes by
/// `write_limit` to simulate a channel that moves only part of a buffer per call.
pub(crate) struct QueueSession {
    pub(crate) incoming: VecDeque<u8>,
    pub(crate) outgoing: Vec<u8>,
    pub(crate) eof: bool,
    pub(crate) mask: EventMask,
    pub(crate) closed: bool,
    pub(crate) read_limit: usize,
    pub(crate) write_limit: usize,
    pub(crate) timeout: Option<Duration>,
    pub(crate) attachment: Option<Box<dyn Any + Send>>,
}

impl Default for QueueSession {
    fn default() -> Self {
        Self {
            incoming: VecDeque::new(),
            outgoing: Vec::new(),
            eof: false,
            mask: EventMask::NONE,
            closed: false,
            read_limit: usize::MAX,
            write_limit: usize::MAX,
            timeout: None,
            attachment: None,
        }
    }
}

impl QueueSession {
    pub(crate) fn with_input(input: &[u8]) -> Self {
        let mut session = Self::default();
        session.incoming.extend(input);
        session
    }
}

impl Session for QueueSession {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        if self.incoming.is_empty() {
            return if self.eof { Ok(0) } else { Err(ErrorKind::WouldBlock.into()) };
        }
        let n = dst.len().min(self.incoming.len()).min(self.read_limit);
        for (slot, byte) in dst.iter_mut().zip(self.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        if self.write_limit == 0 {
            return Err(ErrorKind::WouldBlock.into());
        }
        let n = src.len().min(self.write_limit);
        self.outgoing.extend_from_slice(&src[..n]);
        Ok(n)
    }

    fn event_mask(&self) -> EventMask {
        self.mask
    }

    fn set_event_mask(&mut self, mask: EventMask) {
        self.mask = mask;
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn shutdown(&mut self) {
        self.closed = true;
    }

    fn status(&self) -> SessionStatus {
        if self.closed { SessionStatus::Closed } else { SessionStatus::Active }
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
