//! Redis-backed implementations of the store capabilities
//!
//! The shared state store is a Redis instance: the playback mode lives in a
//! plain key holding a text-encoded integer, and the frame log is a stream
//! whose entries carry the raw audio bytes in an `audio` field. Both
//! capabilities share one multiplexed connection; the loop is strictly
//! sequential, so the bounded `BLOCK` on the tailing read never starves the
//! mode read.

use crate::error::{Error, Result};
use crate::state::StateSource;
use crate::stream::{Entry, FrameLog, StreamCursor};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info};

/// Stream entry field holding the raw audio payload
const AUDIO_FIELD: &str = "audio";

/// Connection to the external state store.
///
/// Connecting is part of bootstrap: failure here is fatal and the process
/// exits non-zero before the core loop starts.
#[derive(Clone)]
pub struct StoreConnection {
    conn: MultiplexedConnection,
}

impl StoreConnection {
    /// Connect over TCP, or over a unix socket when a path is given.
    pub async fn connect(host: &str, port: u16, socket: Option<&str>) -> Result<Self> {
        let url = match socket {
            Some(path) => format!("redis+unix://{}", path),
            None => format!("redis://{}:{}/", host, port),
        };

        let client = redis::Client::open(url.as_str())?;
        let conn = client.get_multiplexed_tokio_connection().await?;

        match socket {
            Some(path) => info!("State store connection established on socket: {}", path),
            None => info!("State store connection established on host: {}, port: {}", host, port),
        }

        Ok(Self { conn })
    }

    /// Mode-scalar reader bound to the given key
    pub fn state_source(&self, state_key: &str) -> RedisStateSource {
        RedisStateSource {
            conn: self.conn.clone(),
            state_key: state_key.to_string(),
        }
    }

    /// Frame-log reader bound to the given stream key
    pub fn frame_log(&self, stream_key: &str) -> RedisFrameLog {
        RedisFrameLog {
            conn: self.conn.clone(),
            stream_key: stream_key.to_string(),
        }
    }
}

/// Reads the playback-mode scalar with `GET`.
pub struct RedisStateSource {
    conn: MultiplexedConnection,
    state_key: String,
}

#[async_trait]
impl StateSource for RedisStateSource {
    async fn read_mode(&mut self) -> Result<i64> {
        let value: Option<String> = self.conn.get(&self.state_key).await?;

        let text = value.ok_or_else(|| {
            Error::InvalidState(format!("state key '{}' not set", self.state_key))
        })?;

        text.trim()
            .parse::<i64>()
            .map_err(|e| Error::InvalidState(format!("unparseable mode '{}': {}", text, e)))
    }
}

/// Tails the frame log with `XREAD`.
pub struct RedisFrameLog {
    conn: MultiplexedConnection,
    stream_key: String,
}

#[async_trait]
impl FrameLog for RedisFrameLog {
    async fn read(&mut self, cursor: &StreamCursor, count: usize) -> Result<Vec<Entry>> {
        let mut options = StreamReadOptions::default().count(count);

        // BLOCK 0 means "block forever" on the wire, so a cleared timeout
        // omits the option entirely.
        if cursor.is_blocking() {
            options = options.block(cursor.block_timeout().as_millis() as usize);
        }

        let reply: StreamReadReply = self
            .conn
            .xread_options(&[&self.stream_key], &[cursor.position().as_arg()], &options)
            .await?;

        let mut entries = Vec::new();
        for key in reply.keys {
            // Entries arrive in ascending id order per stream
            for id in key.ids {
                // An entry without the audio field still has to advance the
                // cursor, so it comes back with an empty payload instead of
                // failing the whole read.
                let payload: Vec<u8> = match id.get(AUDIO_FIELD) {
                    Some(bytes) => bytes,
                    None => {
                        debug!("Entry {} missing '{}' field, treating as empty", id.id, AUDIO_FIELD);
                        Vec::new()
                    }
                };
                entries.push(Entry { id: id.id, payload });
            }
        }

        if !entries.is_empty() {
            debug!("Tailing read returned {} entries", entries.len());
        }
        Ok(entries)
    }
}
