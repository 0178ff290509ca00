//! Channel abstraction for message I/O.

pub mod buffer;
pub mod channel;
pub mod cli;

pub use buffer::BufferChannel;
pub use channel::*;
pub use cli::CliChannel;
