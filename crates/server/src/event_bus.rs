//! Chat and report distribution.
//!
//! Everything any player should see (chat lines, join/leave notices, draw
//! completion reports) is published to one shared `tokio::sync::broadcast`
//! channel. Each connection subscribes and forwards lines to its client,
//! skipping lines it originated itself.

use std::sync::Arc;

/// Recommended capacity for the broadcast channel. A slow client that falls
/// further behind than this starts losing lines (broadcast lag), not memory.
pub const BUS_CAPACITY: usize = 256;

/// One line of text for every connected player.
///
/// Uses `Arc<str>` so cloning per subscriber is just a refcount bump.
#[derive(Clone, Debug)]
pub struct Broadcast {
    /// Connection that originated the line; that connection already printed
    /// its own copy and skips the broadcast.
    pub source_conn: Option<u64>,
    pub text: Arc<str>,
}

/// A player's chat line.
pub fn chat(conn_id: u64, name: &str, message: &str) -> Broadcast {
    Broadcast {
        source_conn: Some(conn_id),
        text: format!("<{name}> {message}").into(),
    }
}
