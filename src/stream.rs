//! Frame log tailing: cursor, entries, and the reader capability
//!
//! The external store keeps synthesized audio in an append-only per-key log.
//! This worker tails it: the cursor remembers the last consumed entry id and
//! how long the next read may block. Entry ids are opaque, server-assigned,
//! and monotonically increasing, so the cursor position is monotone within a
//! session.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Position component of the stream cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPosition {
    /// Only entries appended after now; the session-start sentinel
    FutureOnly,
    /// Last consumed entry id; the next read starts just after it
    After(String),
}

impl StreamPosition {
    /// Wire representation of the position for the tailing read.
    pub fn as_arg(&self) -> &str {
        match self {
            StreamPosition::FutureOnly => "$",
            StreamPosition::After(id) => id,
        }
    }
}

/// Remembered log position plus the blocking budget for the next read.
///
/// Cold-start-once semantics: the timeout starts at the configured default
/// when a session begins and is cleared to non-blocking after the first
/// successful read that returns data. Only the very first read of a session
/// may block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCursor {
    position: StreamPosition,
    block_timeout: Duration,
}

impl StreamCursor {
    /// Cursor for a fresh session: future-only position, default timeout.
    pub fn new(block_timeout: Duration) -> Self {
        Self {
            position: StreamPosition::FutureOnly,
            block_timeout,
        }
    }

    /// Reset for a new session, discarding any prior position.
    pub fn reset(&mut self, block_timeout: Duration) {
        self.position = StreamPosition::FutureOnly;
        self.block_timeout = block_timeout;
    }

    /// Record a consumed entry. Ids arrive in ascending order, so this keeps
    /// the position monotone.
    pub fn advance(&mut self, id: String) {
        self.position = StreamPosition::After(id);
    }

    /// Clear the blocking budget for the rest of the session.
    pub fn clear_block_timeout(&mut self) {
        self.block_timeout = Duration::ZERO;
    }

    /// True while the next read is still allowed to block.
    pub fn is_blocking(&self) -> bool {
        !self.block_timeout.is_zero()
    }

    pub fn position(&self) -> &StreamPosition {
        &self.position
    }

    pub fn block_timeout(&self) -> Duration {
        self.block_timeout
    }
}

/// One log entry: opaque id plus a byte payload holding raw f32 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: String,
    pub payload: Vec<u8>,
}

/// Capability for the tailing read against the external frame log.
///
/// Implementations return up to `count` entries positioned after the cursor,
/// in ascending id order, blocking for at most the cursor's timeout when one
/// is set. A connectivity failure comes back as an `Err` value; it never
/// panics or aborts the caller's loop.
#[async_trait]
pub trait FrameLog {
    async fn read(&mut self, cursor: &StreamCursor, count: usize) -> Result<Vec<Entry>>;
}
