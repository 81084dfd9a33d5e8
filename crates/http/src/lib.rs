//! A readiness driven, non-blocking HTTP/1.1 protocol engine
//!
//! This crate contains the protocol half of an event driven HTTP/1.1 client and server:
//! message parsing and writing, body framing, and the per connection state machines.
//! The reactor (the readiness loop over sockets) is not part of it, connections are
//! written against the [`session::Session`] trait and are driven by calling
//! `consume_input` / `produce_output` whenever the session becomes readable / writable.
//!
//! # Features
//!
//! - HTTP/1.1 request and response parsing with configurable limits
//! - Content-Length, chunked (with trailers) and close delimited bodies
//! - Keep-alive and pipelined requests
//! - Interim (1xx) responses
//! - TLS through a session decorator over an externally supplied record layer
//! - Handler errors are routed to the handler, never to the reactor
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use http::{StatusCode, Version};
//! use nio_http::codec::{ContentDecoder, ContentEncoder};
//! use nio_http::connection::ServerConnection;
//! use nio_http::handler::ServerEventHandler;
//! use nio_http::protocol::{HttpError, PayloadSize, ResponseHeader};
//! use nio_http::session::Session;
//!
//! /// Answers every request with a short greeting.
//! struct Hello {
//!     pending: bool,
//! }
//!
//! impl<S: Session> ServerEventHandler<S> for Hello {
//!     fn request_received(&mut self, _conn: &mut ServerConnection<S>) -> Result<(), HttpError> {
//!         self.pending = true;
//!         Ok(())
//!     }
//!
//!     fn input_ready(&mut self, _conn: &mut ServerConnection<S>, decoder: &mut ContentDecoder<'_>) -> Result<(), HttpError> {
//!         // the request body is not needed, drain it
//!         decoder.read(&mut BytesMut::new())?;
//!         Ok(())
//!     }
//!
//!     fn response_ready(&mut self, conn: &mut ServerConnection<S>) -> Result<(), HttpError> {
//!         if self.pending {
//!             let response = ResponseHeader::new(StatusCode::OK, Version::HTTP_11);
//!             conn.submit_response(response, PayloadSize::Length(14))?;
//!         }
//!         Ok(())
//!     }
//!
//!     fn output_ready(&mut self, _conn: &mut ServerConnection<S>, encoder: &mut ContentEncoder<'_>) -> Result<(), HttpError> {
//!         if self.pending && encoder.write(b"Hello World!\r\n")? == 14 {
//!             encoder.complete()?;
//!             self.pending = false;
//!         }
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`session`]: the non-blocking channel contract and the TLS decorator
//! - [`buffer`]: bounded input and output buffers between a session and the codec
//! - [`codec`]: head parser and writer, body decoders and encoders
//! - [`connection`]: server and client state machines, connection factories
//! - [`handler`]: the event handler capabilities applications implement
//! - [`dispatch`]: adapters from reactor events to connections
//! - [`protocol`]: message heads, payload types and errors
//! - [`config`]: connection tunables
//!
//! # Error Handling
//!
//! - [`protocol::HttpError`]: top level error handed to `exception`
//! - [`protocol::ParseError`]: inbound framing errors, truncated bodies included
//! - [`protocol::SendError`]: outbound framing errors
//! - [`protocol::ProtocolError`]: API misuse such as a second response in flight
//!
//! # Limitations
//!
//! - HTTP/1.1 only
//! - One response in flight per server connection, one request per client connection

pub mod buffer;
pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod handler;
pub mod protocol;
pub mod session;

mod utils;
pub(crate) use utils::ensure;
