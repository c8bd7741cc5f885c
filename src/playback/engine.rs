//! The real-time playback cycle
//!
//! One cycle: read the playback mode, handle session edges, tail the frame
//! log while playing, decode, and write to the device. Every failure mode
//! degrades to "treat as idle" or "skip this cycle"; device buffer
//! continuity (silence) is the safe default throughout.

use crate::audio::output::AudioSink;
use crate::audio::FrameDecoder;
use crate::config::Config;
use crate::error::Result;
use crate::playback::ResilienceMonitor;
use crate::state::{PlaybackMode, StateSource, StateTracker};
use crate::stream::{FrameLog, StreamCursor};
use crate::worker::Worker;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, trace};

/// The playback worker: session lifecycle, stream tailing, decode, and the
/// failure-resilient sink write, composed from injected capabilities.
pub struct PlayerWorker<S: StateSource, L: FrameLog, A: AudioSink> {
    tracker: StateTracker<S>,
    log: L,
    sink: A,
    decoder: FrameDecoder,
    cursor: StreamCursor,
    monitor: ResilienceMonitor,
    read_batch_size: usize,
    default_block_timeout: Duration,
    dropped_samples: u64,
}

impl<S: StateSource, L: FrameLog, A: AudioSink> PlayerWorker<S, L, A> {
    pub fn new(config: &Config, source: S, log: L, sink: A) -> Self {
        Self {
            tracker: StateTracker::new(source),
            log,
            sink,
            decoder: FrameDecoder::new(
                config.norm_divisor,
                (config.clip_min, config.clip_max),
                config.aggregation,
            ),
            cursor: StreamCursor::new(config.default_block_timeout()),
            monitor: ResilienceMonitor::new(),
            read_batch_size: config.read_batch_size,
            default_block_timeout: config.default_block_timeout(),
            dropped_samples: 0,
        }
    }

    /// Run one playback cycle.
    ///
    /// Mode is always evaluated before any read/write decision; entries
    /// within a read are processed in ascending id order.
    async fn cycle(&mut self) -> Result<()> {
        let transition = self.tracker.poll().await;

        // Every non-playing mode shares one behavior: keep the device
        // buffer saturated with silence.
        if transition.current != PlaybackMode::Playing {
            if transition.left_playing() {
                info!("Playback ended");
            }
            return self.sink.write_silence();
        }

        if transition.entered_playing() {
            self.cursor.reset(self.default_block_timeout);
            info!("Playback started");
        }

        // While the session's first read may still block, top the device up
        // beforehand so the bounded block cannot cause an underrun.
        if self.cursor.is_blocking() {
            self.sink.write_silence()?;
        }

        let entries = match self.log.read(&self.cursor, self.read_batch_size).await {
            Ok(entries) => {
                self.monitor.record_success();
                entries
            }
            Err(e) => {
                // Skip-cycle condition; the monitor owns the edge logging
                self.monitor.record_failure(&e);
                return Ok(());
            }
        };

        if entries.is_empty() {
            // Non-blocking read timed out with no data; keep the device fed
            return self.sink.write_silence();
        }

        // First successful data read of the session clears the blocking
        // budget for all subsequent reads.
        self.cursor.clear_block_timeout();

        let samples = self.decoder.decode_batch(&entries);
        for entry in entries {
            self.cursor.advance(entry.id);
        }

        // The sink contract forbids writing past the reported free space;
        // overflow samples are dropped rather than blocking the cycle.
        let free = self.sink.free_space();
        let writable = samples.len().min(free);
        if writable < samples.len() {
            self.dropped_samples += (samples.len() - writable) as u64;
            trace!(
                "Dropped {} samples beyond device free space (total: {})",
                samples.len() - writable,
                self.dropped_samples
            );
        }
        self.sink.write(&samples[..writable])
    }

    /// Most recently observed playback mode
    pub fn current_mode(&self) -> PlaybackMode {
        self.tracker.current()
    }

    /// Current tailing cursor
    pub fn cursor(&self) -> &StreamCursor {
        &self.cursor
    }

    /// Whether the last tailing read succeeded
    pub fn is_connected(&self) -> bool {
        self.monitor.is_connected()
    }

    /// Total samples dropped because they exceeded device free space
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    /// Access the sink (primarily for tests and shutdown paths)
    pub fn sink_mut(&mut self) -> &mut A {
        &mut self.sink
    }

    /// Access the frame log capability (primarily for tests)
    pub fn log_ref(&self) -> &L {
        &self.log
    }
}

#[async_trait(?Send)]
impl<S: StateSource, L: FrameLog, A: AudioSink> Worker for PlayerWorker<S, L, A> {
    async fn initialize(&mut self) -> Result<()> {
        // Prime the device buffer so playback starts from saturated silence
        self.sink.write_silence()?;
        info!("Playback worker initialized");
        Ok(())
    }

    async fn step(&mut self) -> Result<()> {
        self.cycle().await
    }

    async fn shutdown(&mut self) -> Result<()> {
        info!("Playback worker shutting down");
        self.sink.close()
    }
}
