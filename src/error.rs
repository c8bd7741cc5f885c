//! Error types for audio-bridge
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//!
//! The core loop never lets one of these escape a cycle: state-read failures
//! degrade to the idle mode, connectivity failures skip the cycle, and only
//! bootstrap failures (before the loop starts) are fatal.

use thiserror::Error;

/// Main error type for audio-bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// State store connection or command errors (tailing read, mode scalar)
    #[error("State store error: {0}")]
    Store(#[from] redis::RedisError),

    /// Frame payload decoding errors
    #[error("Frame decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Convenience Result type using audio-bridge Error
pub type Result<T> = std::result::Result<T, Error>;
