//! Playback core: the state-driven real-time cycle

pub mod engine;
pub mod monitor;

pub use engine::PlayerWorker;
pub use monitor::ResilienceMonitor;
