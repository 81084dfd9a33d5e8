//! Bounded byte buffers sitting between a [`Session`](crate::session::Session) and the codec.
//!
//! Neither buffer ever blocks: `fill` and `flush` move what the session accepts right now
//! and report how much that was.

mod input;
mod output;

pub use input::Fill;
pub use input::SessionInputBuffer;
pub use output::SessionOutputBuffer;
