use std::io;
use std::mem;

use http::Method;
use tokio_util::codec::Encoder;
use tracing::{debug, trace};

use crate::codec::{
    ContentDecoder, ContentEncoder, MessageWriter, PayloadDecoder, PayloadEncoder, ResponseParser, response_payload,
};
use crate::config::ConnectionConfig;
use crate::connection::base::{ConnectionBase, ConnectionStatus, delegate_base};
use crate::ensure;
use crate::handler::ClientEventHandler;
use crate::protocol::{HttpError, ParseError, PayloadSize, ProtocolError, RequestHeader, ResponseHeader, SendError};
use crate::session::{EventMask, Session};

/// Client side of an HTTP/1.1 connection.
///
/// One request is in flight at a time: a new request can only be submitted once the
/// final response to the previous one has been received completely.
#[derive(Debug)]
pub struct ClientConnection<S> {
    base: ConnectionBase<S>,
    parser: ResponseParser,
    response: Option<ResponseHeader>,
    decoder: Option<PayloadDecoder>,
    encoder: Option<PayloadEncoder>,
    /// method of the request in flight, a response to HEAD has no body
    request_method: Option<Method>,
    awaiting_response: bool,
}

impl<S: Session> ClientConnection<S> {
    pub fn new(session: S, config: ConnectionConfig) -> Self {
        Self {
            parser: ResponseParser::new(config.constraints),
            base: ConnectionBase::new(session, config),
            response: None,
            decoder: None,
            encoder: None,
            request_method: None,
            awaiting_response: false,
        }
    }

    delegate_base!();

    /// The head of the response being received.
    pub fn http_response(&self) -> Option<&ResponseHeader> {
        self.response.as_ref()
    }

    /// A request was submitted and its final response has not been fully received yet.
    pub fn is_request_submitted(&self) -> bool {
        self.awaiting_response
    }

    pub fn consume_input<H: ClientEventHandler<S> + ?Sized>(&mut self, handler: &mut H) {
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

    fn do_consume_input<H: ClientEventHandler<S> + ?Sized>(&mut self, handler: &mut H) -> Result<(), HttpError> {
        if self.response.is_none() {
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
                Some(head) => self.on_response_head(head, handler)?,
                None if eof && !self.base.inbuf.has_data() => {
                    if self.parser.is_in_progress() {
                        let e = io::Error::new(io::ErrorKind::UnexpectedEof, "closed in the middle of a response head");
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

    fn on_response_head<H: ClientEventHandler<S> + ?Sized>(
        &mut self,
        head: ResponseHeader,
        handler: &mut H,
    ) -> Result<(), HttpError> {
        if head.is_interim() {
            debug!(status = %head.status(), "interim response received");
            self.decoder = None;
        } else {
            let payload = response_payload(&head, self.request_method.as_ref())?;
            debug!(status = %head.status(), ?payload, "response received");
            let decoder = PayloadDecoder::from(payload);
            self.decoder = if decoder.is_finished() { None } else { Some(decoder) };
            self.base.metrics.incr_response_count();
        }
        self.response = Some(head);

        handler.response_received(self)?;
        if self.decoder.is_none() {
            self.reset_input();
        }
        Ok(())
    }

    fn dispatch_input<H: ClientEventHandler<S> + ?Sized>(&mut self, handler: &mut H) -> Result<(), HttpError> {
        let Some(mut decoder) = self.decoder.take() else {
            return Ok(());
        };
        let mut inbuf = mem::take(&mut self.base.inbuf);
        let result = handler.input_ready(self, &mut ContentDecoder::new(&mut inbuf, &mut decoder));
        self.base.inbuf = inbuf;

        if decoder.is_finished() {
            trace!("response body complete");
            self.reset_input();
        } else {
            self.decoder = Some(decoder);
        }
        result
    }

    fn reset_input(&mut self) {
        if self.response.take().is_some_and(|response| !response.is_interim()) {
            self.awaiting_response = false;
            self.request_method = None;
        }
        self.decoder = None;
        self.parser.reset();
    }

    pub fn produce_output<H: ClientEventHandler<S> + ?Sized>(&mut self, handler: &mut H) {
        if let Err(e) = self.do_produce_output(handler) {
            handler.exception(self, e);
        }
    }

    fn do_produce_output<H: ClientEventHandler<S> + ?Sized>(&mut self, handler: &mut H) -> Result<(), HttpError> {
        if self.base.status == ConnectionStatus::Active {
            if self.encoder.is_none() && !self.base.outbuf.has_data() {
                handler.request_ready(self)?;
            }
            if self.encoder.is_some() {
                self.dispatch_output(handler)?;
            }
        }

        self.base.flush_output()?;

        if !self.base.outbuf.has_data() {
            if self.base.status == ConnectionStatus::Closing {
                self.base.close_session();
                self.encoder = None;
            } else if self.encoder.is_none() && self.base.status != ConnectionStatus::Closed {
                self.base.session.clear_event(EventMask::WRITE);
            }
        }
        Ok(())
    }

    fn dispatch_output<H: ClientEventHandler<S> + ?Sized>(&mut self, handler: &mut H) -> Result<(), HttpError> {
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
            trace!("request body complete");
        } else {
            self.encoder = Some(encoder);
        }
        result
    }

    /// Writes the request head and installs the body encoder.
    ///
    /// Fails with [`ProtocolError::RequestAlreadySubmitted`] until the final response to
    /// the previous request has been received. A request body has to be framed by
    /// Content-Length or chunked coding.
    pub fn submit_request(&mut self, request: RequestHeader, payload: PayloadSize) -> Result<(), HttpError> {
        ensure!(self.base.is_open(), ProtocolError::ConnectionClosed.into());
        ensure!(!self.awaiting_response, ProtocolError::RequestAlreadySubmitted.into());
        ensure!(!payload.is_identity(), SendError::IdentityRequestBody.into());

        let method = request.method().clone();
        debug!(%method, uri = %request.uri(), ?payload, "submitting request");
        MessageWriter.encode((request, payload), self.base.outbuf.buf_mut())?;

        if !matches!(payload, PayloadSize::Empty | PayloadSize::Length(0)) {
            self.encoder = Some(PayloadEncoder::from(payload));
        }
        self.request_method = Some(method);
        self.awaiting_response = true;
        self.base.metrics.incr_request_count();
        self.base.session.set_event(EventMask::WRITE);
        Ok(())
    }
}
