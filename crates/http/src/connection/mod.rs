//! HTTP/1.1 connection state machines.
//!
//! # Components
//!
//! - [`ServerConnection`]: parses requests, writes responses
//! - [`ClientConnection`]: writes requests, parses responses
//! - [`ConnectionFactory`] and its plain and TLS implementations
//!
//! A connection owns its session, both session buffers and at most one body decoder and
//! one body encoder at a time. It never blocks: [`consume_input`](ServerConnection::consume_input)
//! and [`produce_output`](ServerConnection::produce_output) move what the session offers
//! right now and call back into the event handler.
//!
//! # Lifecycle
//!
//! `Active -> Closing -> Closed`. A close requested while output is still buffered moves
//! the connection to `Closing`, the session is closed by the `produce_output` call that
//! flushes the last byte.

mod base;
mod client;
mod factory;
mod metrics;
mod server;

pub use base::ConnectionStatus;
pub use client::ClientConnection;
pub use factory::ConnectionFactory;
pub use factory::DefaultClientConnectionFactory;
pub use factory::DefaultServerConnectionFactory;
pub use factory::EngineFactory;
pub use factory::SetupHandler;
pub use factory::SslClientConnectionFactory;
pub use factory::SslServerConnectionFactory;
pub use metrics::ConnectionMetrics;
pub use server::ServerConnection;
