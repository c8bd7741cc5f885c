//! End-to-end playback cycle tests with in-memory capabilities
//!
//! Exercises the session lifecycle, cursor semantics, batch decoding, and
//! connectivity resilience through the full worker step, using fake
//! implementations of the store and sink seams.

use std::collections::VecDeque;

use async_trait::async_trait;
use audio_bridge::audio::output::AudioSink;
use audio_bridge::config::{Aggregation, Config};
use audio_bridge::error::{Error, Result};
use audio_bridge::playback::PlayerWorker;
use audio_bridge::state::{PlaybackMode, StateSource};
use audio_bridge::stream::{Entry, FrameLog, StreamCursor, StreamPosition};
use audio_bridge::worker::Worker;

/// Scripted mode source: one value per cycle.
struct FakeStateSource {
    modes: VecDeque<Result<i64>>,
}

impl FakeStateSource {
    fn new(modes: Vec<i64>) -> Self {
        Self {
            modes: modes.into_iter().map(Ok).collect(),
        }
    }
}

#[async_trait]
impl StateSource for FakeStateSource {
    async fn read_mode(&mut self) -> Result<i64> {
        self.modes
            .pop_front()
            .unwrap_or(Err(Error::InvalidState("mode script exhausted".into())))
    }
}

/// What the log observed about the cursor at each read call.
#[derive(Debug, Clone, PartialEq)]
struct ObservedRead {
    position: String,
    blocking: bool,
}

/// Scripted frame log: one scripted result per read, recording the cursor
/// it was called with.
struct FakeFrameLog {
    results: VecDeque<Result<Vec<Entry>>>,
    observed: Vec<ObservedRead>,
}

impl FakeFrameLog {
    fn new(results: Vec<Result<Vec<Entry>>>) -> Self {
        Self {
            results: results.into(),
            observed: Vec::new(),
        }
    }
}

#[async_trait]
impl FrameLog for FakeFrameLog {
    async fn read(&mut self, cursor: &StreamCursor, _count: usize) -> Result<Vec<Entry>> {
        self.observed.push(ObservedRead {
            position: cursor.position().as_arg().to_string(),
            blocking: cursor.is_blocking(),
        });
        self.results
            .pop_front()
            .unwrap_or(Err(Error::InvalidState("log script exhausted".into())))
    }
}

/// Recording sink with a fixed per-cycle free space.
struct FakeSink {
    free: usize,
    writes: Vec<Vec<f32>>,
    closed: bool,
}

impl FakeSink {
    fn new(free: usize) -> Self {
        Self {
            free,
            writes: Vec::new(),
            closed: false,
        }
    }
}

impl AudioSink for FakeSink {
    fn free_space(&self) -> usize {
        self.free
    }

    fn write(&mut self, samples: &[f32]) -> Result<()> {
        if samples.len() > self.free {
            return Err(Error::AudioOutput(format!(
                "over-write: {} > {}",
                samples.len(),
                self.free
            )));
        }
        self.writes.push(samples.to_vec());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

fn entry(id: &str, samples: &[f32]) -> Entry {
    Entry {
        id: id.to_string(),
        payload: samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
    }
}

fn worker(
    modes: Vec<i64>,
    reads: Vec<Result<Vec<Entry>>>,
    free: usize,
    aggregation: Aggregation,
) -> PlayerWorker<FakeStateSource, FakeFrameLog, FakeSink> {
    let config = Config {
        aggregation,
        ..Config::default()
    };
    PlayerWorker::new(
        &config,
        FakeStateSource::new(modes),
        FakeFrameLog::new(reads),
        FakeSink::new(free),
    )
}

#[tokio::test]
async fn test_non_playing_modes_silence_fill_every_cycle() {
    // PAUSED for three cycles: three silence writes, each sized to the
    // cycle's reported free space.
    let mut player = worker(vec![4, 4, 4], vec![], 64, Aggregation::Concatenate);

    for _ in 0..3 {
        player.step().await.unwrap();
    }

    let sink = player.sink_mut();
    assert_eq!(sink.writes.len(), 3);
    for write in &sink.writes {
        assert_eq!(write.len(), 64);
        assert!(write.iter().all(|s| *s == 0.0));
    }
}

#[tokio::test]
async fn test_end_to_end_batch_decode_in_id_order() {
    // Two batched entries, one sample each, divisor 50000: normalized and
    // clipped output lands in ascending id order.
    let reads = vec![Ok(vec![
        entry("1-0", &[-100000.0]),
        entry("2-0", &[25000.0]),
    ])];
    let mut player = worker(vec![1], reads, 64, Aggregation::Concatenate);

    player.step().await.unwrap();

    let sink = player.sink_mut();
    // First write is the pre-read silence top-up (the session's first read
    // may block); the data write follows it.
    let data = sink.writes.last().unwrap();
    assert_eq!(data.as_slice(), &[-1.0, 0.5]);
}

#[tokio::test]
async fn test_session_start_resets_cursor_and_blocks_only_once() {
    let reads = vec![
        Ok(vec![entry("7-0", &[1000.0])]),
        Ok(vec![]),
        Ok(vec![entry("8-0", &[1000.0])]),
    ];
    let mut player = worker(vec![1, 1, 1], reads, 64, Aggregation::Concatenate);

    for _ in 0..3 {
        player.step().await.unwrap();
    }

    // Cursor followed the consumed ids
    assert_eq!(
        player.cursor().position(),
        &StreamPosition::After("8-0".to_string())
    );
    assert!(!player.cursor().is_blocking());
}

#[tokio::test]
async fn test_first_read_blocks_then_timeout_stays_cleared() {
    let reads = vec![
        Ok(vec![entry("1-0", &[0.0])]),
        Ok(vec![]), // zero entries must not resurrect the blocking budget
        Ok(vec![entry("2-0", &[0.0])]),
    ];

    let mut player = worker(vec![1, 1, 1], reads, 64, Aggregation::Concatenate);

    for _ in 0..3 {
        player.step().await.unwrap();
    }

    let observed = &player.log_ref().observed;
    assert_eq!(observed.len(), 3);
    // Session start: future-only sentinel, blocking allowed
    assert_eq!(observed[0].position, "$");
    assert!(observed[0].blocking);
    // After the first data read: positioned, non-blocking
    assert_eq!(observed[1].position, "1-0");
    assert!(!observed[1].blocking);
    // Still non-blocking after an empty read
    assert_eq!(observed[2].position, "1-0");
    assert!(!observed[2].blocking);
}

#[tokio::test]
async fn test_reentering_playing_resets_cursor() {
    let reads = vec![
        Ok(vec![entry("5-0", &[0.0])]), // session 1
        Ok(vec![]),                     // session 2, after the reset
    ];
    // PLAYING, then ARMED, then PLAYING again
    let mut player = worker(vec![1, 0, 1], reads, 64, Aggregation::Concatenate);

    for _ in 0..3 {
        player.step().await.unwrap();
    }

    let observed = &player.log_ref().observed;
    assert_eq!(observed.len(), 2);
    assert_eq!(observed[0].position, "$");
    // The new session starts from the sentinel with a fresh blocking budget,
    // regardless of where the previous session's cursor ended up
    assert_eq!(observed[1].position, "$");
    assert!(observed[1].blocking);
}

#[tokio::test]
async fn test_connectivity_failures_skip_cycles_without_raising() {
    let reads = vec![
        Ok(vec![]),
        Err(Error::InvalidState("store down".into())),
        Err(Error::InvalidState("store down".into())),
        Ok(vec![]),
    ];
    let mut player = worker(vec![1, 1, 1, 1], reads, 64, Aggregation::Concatenate);

    player.step().await.unwrap();
    assert!(player.is_connected());
    assert_eq!(player.current_mode(), PlaybackMode::Playing);

    player.step().await.unwrap();
    assert!(!player.is_connected());

    player.step().await.unwrap();
    assert!(!player.is_connected());

    player.step().await.unwrap();
    assert!(player.is_connected());
}

#[tokio::test]
async fn test_writes_never_exceed_free_space() {
    // Device only has room for one sample; the second decoded sample is
    // dropped rather than violating the sink contract.
    let reads = vec![Ok(vec![entry("1-0", &[25000.0, 25000.0])])];
    let mut player = worker(vec![1], reads, 1, Aggregation::Concatenate);

    player.step().await.unwrap();

    assert_eq!(player.dropped_samples(), 1);
    let sink = player.sink_mut();
    assert!(sink.writes.iter().all(|w| w.len() <= 1));
    assert_eq!(sink.writes.last().unwrap().as_slice(), &[0.5]);
}

#[tokio::test]
async fn test_keep_last_aggregation_through_full_cycle() {
    let reads = vec![Ok(vec![
        entry("1-0", &[-100000.0]),
        entry("2-0", &[25000.0]),
    ])];
    let mut player = worker(vec![1], reads, 64, Aggregation::KeepLast);

    player.step().await.unwrap();

    // Only the last entry's audio survives, but the cursor consumed both
    assert_eq!(player.sink_mut().writes.last().unwrap().as_slice(), &[0.5]);
    assert_eq!(
        player.cursor().position(),
        &StreamPosition::After("2-0".to_string())
    );
}

#[tokio::test]
async fn test_shutdown_closes_sink() {
    let mut player = worker(vec![], vec![], 64, Aggregation::Concatenate);
    player.shutdown().await.unwrap();
    assert!(player.sink_mut().closed);
}
