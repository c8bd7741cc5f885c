//! Worker capability and the scheduling harness
//!
//! Lifecycle is composition, not inheritance: the harness owns the generic
//! plumbing (tick scheduling, cancellation, shutdown ordering) and drives a
//! pluggable `Worker`. The playback core only implements `step()`.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A unit of work driven by the harness.
///
/// `?Send` because workers may own audio device handles that are pinned to
/// the thread they were created on.
#[async_trait(?Send)]
pub trait Worker {
    /// One-time setup before the first cycle
    async fn initialize(&mut self) -> Result<()>;

    /// One cycle of work. Errors are logged by the harness; they never stop
    /// the loop.
    async fn step(&mut self) -> Result<()>;

    /// Release resources. Called exactly once, after the loop exits.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Drives a worker at a fixed cadence until cancelled.
pub struct Harness {
    interval: Duration,
}

impl Harness {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Run the worker loop.
    ///
    /// Ticks `step()` on each interval until the token is cancelled, then
    /// shuts the worker down. A cycle may overrun its tick (the tailing
    /// read's bounded block); delayed ticks are not replayed.
    pub async fn run<W: Worker>(&self, worker: &mut W, cancel: CancellationToken) -> Result<()> {
        worker.initialize().await?;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Worker loop started ({:?} interval)", self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Cancellation requested, stopping worker loop");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = worker.step().await {
                        // Cycle state is safely abandoned; the next tick
                        // starts fresh
                        warn!("Cycle failed: {}", e);
                    }
                }
            }
        }

        worker.shutdown().await?;
        info!("Worker loop stopped");
        Ok(())
    }
}
