#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Network I/O for creepline sessions.
//!
//! Messages travel as length-prefixed archive frames over TCP. Each side runs
//! its sockets on a dedicated thread with a single-threaded `tokio` runtime
//! and talks to the simulation thread exclusively through unbounded queues,
//! so the tick loop never blocks on the network.

mod client;
mod frame;
mod server;

use std::time::Duration;

use creepline_archive::ArchiveError;
use thiserror::Error;

pub use client::NetClient;
pub use frame::{encode_frame, FrameDecoder, FRAME_HEADER_LEN, MAX_FRAME_LEN};
pub use server::NetServer;

/// Longest a network thread waits for socket activity before rechecking its running flag.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(5);

/// Grace period a disconnecting client gives the server to close the connection.
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Silence after which the server drops a peer.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures raised by the network layer.
#[derive(Debug, Error)]
pub enum NetError {
    /// Socket or runtime failure.
    #[error("network i/o failed")]
    Io(#[from] std::io::Error),
    /// A frame announced or required more than [`MAX_FRAME_LEN`] bytes.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Length of the offending frame body.
        len: usize,
        /// Largest accepted frame body.
        max: usize,
    },
    /// A frame body did not decode as the expected message.
    #[error("malformed frame")]
    Decode(#[from] ArchiveError),
    /// The peer stayed silent for longer than the allowed period.
    #[error("peer silent for {0:?}")]
    Timeout(Duration),
    /// The network thread is no longer running.
    #[error("connection closed")]
    Closed,
    /// The network thread panicked.
    #[error("network thread panicked")]
    Panicked,
}
