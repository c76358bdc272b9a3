//! TCP transport for framed messages
//!
//! Each accepted connection owns one [`FrameDecoder`](lzo_frame::FrameDecoder). Framing
//! errors are fatal for that connection only.

mod connection;
mod handler;
mod server;
mod stats;

pub use handler::{LogHandler, MessageHandler};
pub use server::Server;
pub use stats::{Stats, StatsSnapshot};
