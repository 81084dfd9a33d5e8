use std::io;
use std::mem;

use http::header::CONTENT_LENGTH;
use tokio_util::codec::Encoder;
use tracing::{debug, trace};

use crate::codec::{
    ContentDecoder, ContentEncoder, MessageWriter, PayloadDecoder, PayloadEncoder, RequestParser, request_payload,
    status_has_body,
};
use crate::config::ConnectionConfig;
use crate::connection::base::{ConnectionBase, ConnectionStatus, delegate_base};
use crate::ensure;
use crate::handler::ServerEventHandler;
use crate::protocol::{HttpError, ParseError, PayloadSize, ProtocolError, RequestHeader, ResponseHeader, SendError};
use crate::session::{EventMask, Session};

/// Server side of an HTTP/1.1 connection.
///
/// Requests are parsed one head at a time in arrival order, at most one response is in
/// flight. The reactor calls [`consume_input`](Self::consume_input) on read readiness and
/// again while [`has_buffered_input`](Self::has_buffered_input) holds, and
/// [`produce_output`](Self::produce_output) on write readiness.
#[derive(Debug)]
pub struct ServerConnection<S> {
    base: ConnectionBase<S>,
    parser: RequestParser,
    request: Option<RequestHeader>,
    decoder: Option<PayloadDecoder>,
    encoder: Option<PayloadEncoder>,
    /// the last submitted response is close delimited
    close_after_response: bool,
}

impl<S: Session> ServerConnection<S> {
    pub fn new(session: S, config: ConnectionConfig) -> Self {
        Self {
            parser: RequestParser::new(config.constraints),
            base: ConnectionBase::new(session, config),
            request: None,
            decoder: None,
            encoder: None,
            close_after_response: false,
        }
    }

    delegate_base!();

    /// The head of the request being received.
    pub fn http_request(&self) -> Option<&RequestHeader> {
        self.request.as_ref()
    }

    /// A response body is still being written.
    pub fn is_response_submitted(&self) -> bool {
        self.encoder.is_some() || self.base.output_busy
    }

    pub fn consume_input<H: ServerEventHandler<S> + ?Sized>(&mut self, handler: &mut H) {
        if self.base.status != ConnectionStatus::Active {
            self.base.session.clear_event(EventMask::READ);
            return;
        }

        if let Err(e) = self.do_consume_input(handler) {
            if e.as_parse_error().is_some() {
                self.reset_input();
            }
            handler.exception(self, e);
        }
    }

    fn do_consume_input<H: ServerEventHandler<S> + ?Sized>(&mut self, handler: &mut H) -> Result<(), HttpError> {
        if self.request.is_none() {
            let mut eof = false;
            let head = loop {
                let fill = self.base.fill_input()?;
                eof |= fill.is_eof();
                if let Some(head) = self.parser.parse(&mut self.base.inbuf)? {
                    break Some(head);
                }
                if fill.bytes_read() == 0 {
                    break None;
                }
            };

            match head {
                Some(head) => self.on_request_head(head, handler)?,
                None if eof && !self.base.inbuf.has_data() => {
                    if self.parser.is_in_progress() {
                        let e = io::Error::new(io::ErrorKind::UnexpectedEof, "closed in the middle of a request head");
                        return Err(ParseError::io(e).into());
                    }
                    handler.end_of_input(self)?;
                }
                None => {}
            }
        }

        if self.decoder.is_some() && self.base.session.event_mask().is_readable() {
            self.base.fill_input()?;
            self.dispatch_input(handler)?;
        }
        Ok(())
    }

    fn on_request_head<H: ServerEventHandler<S> + ?Sized>(
        &mut self,
        head: RequestHeader,
        handler: &mut H,
    ) -> Result<(), HttpError> {
        let payload = request_payload(&head)?;
        debug!(method = %head.method(), uri = %head.uri(), ?payload, "request received");

        let decoder = PayloadDecoder::from(payload);
        self.decoder = if decoder.is_finished() { None } else { Some(decoder) };
        self.request = Some(head);
        self.base.metrics.incr_request_count();

        handler.request_received(self)?;
        if self.decoder.is_none() {
            self.reset_input();
        }
        Ok(())
    }

    fn dispatch_input<H: ServerEventHandler<S> + ?Sized>(&mut self, handler: &mut H) -> Result<(), HttpError> {
        let Some(mut decoder) = self.decoder.take() else {
            return Ok(());
        };
        let mut inbuf = mem::take(&mut self.base.inbuf);
        let result = handler.input_ready(self, &mut ContentDecoder::new(&mut inbuf, &mut decoder));
        self.base.inbuf = inbuf;

        if decoder.is_finished() {
            trace!("request body complete");
            self.reset_input();
        } else {
            self.decoder = Some(decoder);
        }
        result
    }

    fn reset_input(&mut self) {
        self.request = None;
        self.decoder = None;
        self.parser.reset();
    }

    pub fn produce_output<H: ServerEventHandler<S> + ?Sized>(&mut self, handler: &mut H) {
        if let Err(e) = self.do_produce_output(handler) {
            handler.exception(self, e);
        }
    }

    fn do_produce_output<H: ServerEventHandler<S> + ?Sized>(&mut self, handler: &mut H) -> Result<(), HttpError> {
        if self.base.status == ConnectionStatus::Active {
            if self.encoder.is_none() && !self.base.outbuf.has_data() {
                handler.response_ready(self)?;
            }
            if self.encoder.is_some() {
                self.dispatch_output(handler)?;
            }
        }

        self.base.flush_output()?;

        if !self.base.outbuf.has_data() {
            if self.base.status == ConnectionStatus::Closing {
                self.base.close_session();
                self.reset_output();
            } else if self.encoder.is_none() && self.base.status != ConnectionStatus::Closed {
                self.base.session.clear_event(EventMask::WRITE);
            }
        }
        Ok(())
    }

    fn dispatch_output<H: ServerEventHandler<S> + ?Sized>(&mut self, handler: &mut H) -> Result<(), HttpError> {
        let Some(mut encoder) = self.encoder.take() else {
            return Ok(());
        };
        let mut outbuf = mem::take(&mut self.base.outbuf);
        self.base.output_busy = true;
        let hint = self.base.config.fragment_size_hint;
        let result = handler.output_ready(self, &mut ContentEncoder::new(&mut outbuf, &mut encoder, hint));
        self.base.output_busy = false;
        self.base.outbuf = outbuf;

        if encoder.is_finish() {
            trace!("response body complete");
            self.reset_output();
            if mem::take(&mut self.close_after_response) {
                self.base.close();
            }
        } else {
            self.encoder = Some(encoder);
        }
        result
    }

    fn reset_output(&mut self) {
        self.encoder = None;
    }

    /// Writes the response head and installs the body encoder.
    ///
    /// Interim (1xx) responses never carry a body and do not end the exchange. A final
    /// response with `PayloadSize::Empty` and no Content-Length is sent with
    /// `Content-Length: 0` so the peer does not wait for the connection to close.
    pub fn submit_response(&mut self, response: ResponseHeader, payload: PayloadSize) -> Result<(), HttpError> {
        ensure!(self.base.is_open(), ProtocolError::ConnectionClosed.into());
        ensure!(!self.is_response_submitted(), ProtocolError::ResponseAlreadySubmitted.into());

        let status = response.status();
        let interim = response.is_interim();
        let payload = if interim {
            PayloadSize::Empty
        } else if !status_has_body(status) {
            ensure!(
                payload.is_empty() || payload == PayloadSize::Length(0),
                SendError::invalid_body(format!("status {status} can't carry a body")).into()
            );
            PayloadSize::Empty
        } else if payload.is_empty() && !response.headers().contains_key(CONTENT_LENGTH) {
            PayloadSize::Length(0)
        } else {
            payload
        };

        debug!(%status, ?payload, "submitting response");
        MessageWriter.encode((response, payload), self.base.outbuf.buf_mut())?;

        if !interim {
            self.base.metrics.incr_response_count();
            if !matches!(payload, PayloadSize::Empty | PayloadSize::Length(0)) {
                self.encoder = Some(PayloadEncoder::from(payload));
                self.close_after_response = payload.is_identity();
            }
        }
        self.base.session.set_event(EventMask::WRITE);
        Ok(())
    }
}
