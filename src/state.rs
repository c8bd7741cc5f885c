//! Playback mode tracking
//!
//! The playback mode is a single scalar published by an external writer; this
//! worker only ever reads it. There is no subscription mechanism: the tracker
//! re-reads the value every cycle and detects session edges by comparing it
//! against the previously recorded value.

use crate::error::Result;
use async_trait::async_trait;
use tracing::debug;

/// Externally-published playback mode.
///
/// The numeric values are the wire encoding used by the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Startup / idle default; also the fail-open value for unreadable state
    Initializing,
    /// Task armed but not yet streaming
    Armed,
    /// Actively streaming audio; the only mode that reads the frame log
    Playing,
    /// Task finished
    Ended,
    /// Task paused
    Paused,
}

impl PlaybackMode {
    /// Decode the wire value. Unknown values yield None; callers fail open
    /// to `Initializing`.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            -1 => Some(PlaybackMode::Initializing),
            0 => Some(PlaybackMode::Armed),
            1 => Some(PlaybackMode::Playing),
            3 => Some(PlaybackMode::Ended),
            4 => Some(PlaybackMode::Paused),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> i64 {
        match self {
            PlaybackMode::Initializing => -1,
            PlaybackMode::Armed => 0,
            PlaybackMode::Playing => 1,
            PlaybackMode::Ended => 3,
            PlaybackMode::Paused => 4,
        }
    }
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackMode::Initializing => write!(f, "initializing"),
            PlaybackMode::Armed => write!(f, "armed"),
            PlaybackMode::Playing => write!(f, "playing"),
            PlaybackMode::Ended => write!(f, "ended"),
            PlaybackMode::Paused => write!(f, "paused"),
        }
    }
}

/// Capability for reading the shared mode scalar.
///
/// Injected into the tracker so tests can supply an in-memory source.
#[async_trait]
pub trait StateSource {
    /// Read the current raw mode value. Implementations may fail; the
    /// tracker maps any failure to `Initializing`.
    async fn read_mode(&mut self) -> Result<i64>;
}

/// One tracker observation: the mode before and after this cycle's read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub previous: PlaybackMode,
    pub current: PlaybackMode,
}

impl ModeTransition {
    /// Edge into PLAYING: a session starts this cycle.
    pub fn entered_playing(&self) -> bool {
        self.previous != PlaybackMode::Playing && self.current == PlaybackMode::Playing
    }

    /// Edge out of PLAYING: a session ends this cycle.
    pub fn left_playing(&self) -> bool {
        self.previous == PlaybackMode::Playing && self.current != PlaybackMode::Playing
    }
}

/// Polls a `StateSource` once per cycle and records the previous mode so
/// session edges can be detected by value comparison.
pub struct StateTracker<S: StateSource> {
    source: S,
    current: PlaybackMode,
}

impl<S: StateSource> StateTracker<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: PlaybackMode::Initializing,
        }
    }

    /// Read the mode and return the (previous, current) pair for this cycle.
    ///
    /// Read or parse failures never surface: the mode degrades to
    /// `Initializing`, which the engine treats as idle.
    pub async fn poll(&mut self) -> ModeTransition {
        let previous = self.current;

        let current = match self.source.read_mode().await {
            Ok(raw) => match PlaybackMode::from_raw(raw) {
                Some(mode) => mode,
                None => {
                    debug!("Unknown playback mode value {}, treating as initializing", raw);
                    PlaybackMode::Initializing
                }
            },
            Err(e) => {
                debug!("Failed to read playback mode ({}), treating as initializing", e);
                PlaybackMode::Initializing
            }
        };

        self.current = current;
        ModeTransition { previous, current }
    }

    /// Most recently observed mode
    pub fn current(&self) -> PlaybackMode {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::VecDeque;

    struct ScriptedSource {
        values: VecDeque<Result<i64>>,
    }

    #[async_trait]
    impl StateSource for ScriptedSource {
        async fn read_mode(&mut self) -> Result<i64> {
            self.values
                .pop_front()
                .unwrap_or(Err(Error::InvalidState("script exhausted".into())))
        }
    }

    fn scripted(values: Vec<Result<i64>>) -> StateTracker<ScriptedSource> {
        StateTracker::new(ScriptedSource {
            values: values.into(),
        })
    }

    #[test]
    fn test_mode_round_trip() {
        for raw in [-1, 0, 1, 3, 4] {
            let mode = PlaybackMode::from_raw(raw).unwrap();
            assert_eq!(mode.as_raw(), raw);
        }
        assert!(PlaybackMode::from_raw(2).is_none());
        assert!(PlaybackMode::from_raw(99).is_none());
    }

    #[tokio::test]
    async fn test_edges_for_mode_sequence() {
        // Sequence [-1, -1, 1, 1, 0]: start edge at index 2, end edge at
        // index 4, nothing at indexes 1 and 3.
        let mut tracker = scripted(vec![Ok(-1), Ok(-1), Ok(1), Ok(1), Ok(0)]);

        let t0 = tracker.poll().await;
        assert!(!t0.entered_playing() && !t0.left_playing());

        let t1 = tracker.poll().await;
        assert!(!t1.entered_playing() && !t1.left_playing());

        let t2 = tracker.poll().await;
        assert!(t2.entered_playing());
        assert!(!t2.left_playing());

        let t3 = tracker.poll().await;
        assert!(!t3.entered_playing() && !t3.left_playing());

        let t4 = tracker.poll().await;
        assert!(t4.left_playing());
        assert!(!t4.entered_playing());
    }

    #[tokio::test]
    async fn test_read_failure_degrades_to_initializing() {
        let mut tracker = scripted(vec![
            Ok(1),
            Err(Error::InvalidState("unreachable".into())),
        ]);

        let t0 = tracker.poll().await;
        assert_eq!(t0.current, PlaybackMode::Playing);

        // Failure while playing looks like leaving the session, not a crash
        let t1 = tracker.poll().await;
        assert_eq!(t1.current, PlaybackMode::Initializing);
        assert!(t1.left_playing());
    }

    #[tokio::test]
    async fn test_unparseable_value_degrades_to_initializing() {
        let mut tracker = scripted(vec![Ok(7)]);
        let t = tracker.poll().await;
        assert_eq!(t.current, PlaybackMode::Initializing);
    }
}
