//! # audio-bridge
//!
//! Real-time bridge between an externally-produced stream of synthesized
//! audio frames and the local audio output device.
//!
//! **Purpose:** Tail the frame log in the shared state store while the
//! externally-published playback mode says PLAYING, normalize and clip the
//! samples, and keep the device buffer saturated (audio or silence) at all
//! times.
//!
//! **Architecture:** Single cooperative loop built from injected
//! capabilities (`StateSource`, `FrameLog`, `AudioSink`), driven by a
//! tick-scheduled harness, with a Redis-backed store and a cpal + ringbuf
//! output path.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod state;
pub mod store;
pub mod stream;
pub mod worker;

pub use config::Config;
pub use error::{Error, Result};
pub use playback::PlayerWorker;
