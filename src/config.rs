//! Configuration for the audio-bridge worker
//!
//! All runtime parameters are fixed at startup: built-in defaults, optionally
//! overridden per-field by a small TOML file. Nothing here changes while the
//! loop is running.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Policy for combining the decoded payloads of a multi-entry read batch.
///
/// The cursor always advances through every entry in the batch; this only
/// controls which samples reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Aggregation {
    /// Concatenate every entry's samples in ascending id order (no data loss).
    #[default]
    Concatenate,
    /// Keep only the last entry's samples, discarding earlier ones in the
    /// same batch. Matches the legacy player; lossy when batches exceed one
    /// entry.
    KeepLast,
}

/// Static worker configuration.
///
/// The normalization divisor is a calibration constant tied to the upstream
/// synthesizer's quantization range; change it only together with the
/// producer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key of the append-only frame log in the external store
    pub input_stream: String,

    /// Key of the shared playback-mode scalar
    pub state_key: String,

    /// Output sample rate in Hz
    pub sample_rate: u32,

    /// Output channel count
    pub channels: u16,

    /// Core loop cycle interval in seconds
    pub interval_secs: f64,

    /// Device buffer scaler (buffer frames = sample_rate * interval * scaler)
    pub buffer_scaler: usize,

    /// Normalization divisor applied to every raw sample before clipping
    pub norm_divisor: f32,

    /// Lower clip bound for normalized samples
    pub clip_min: f32,

    /// Upper clip bound for normalized samples
    pub clip_max: f32,

    /// Maximum entries fetched per tailing read
    pub read_batch_size: usize,

    /// Blocking timeout for the first read of a session, in milliseconds
    pub default_block_timeout_ms: u64,

    /// Batch aggregation policy for multi-entry reads
    pub aggregation: Aggregation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_stream: "pred_audio".to_string(),
            state_key: "task_state_current".to_string(),
            sample_rate: 16000,
            channels: 1,
            interval_secs: 0.01,
            buffer_scaler: 1,
            norm_divisor: 50000.0,
            clip_min: -1.0,
            clip_max: 1.0,
            read_batch_size: 10,
            default_block_timeout_ms: 1,
            aggregation: Aggregation::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults for any
    /// field the file omits.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter sanity before the device and loop are built.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be non-zero".into()));
        }
        if self.channels == 0 {
            return Err(Error::Config("channels must be non-zero".into()));
        }
        if !(self.interval_secs > 0.0) {
            return Err(Error::Config("interval_secs must be positive".into()));
        }
        if self.buffer_scaler == 0 {
            return Err(Error::Config("buffer_scaler must be non-zero".into()));
        }
        if self.norm_divisor == 0.0 {
            return Err(Error::Config("norm_divisor must be non-zero".into()));
        }
        if !(self.clip_min < self.clip_max) {
            return Err(Error::Config("clip_min must be below clip_max".into()));
        }
        if self.read_batch_size == 0 {
            return Err(Error::Config("read_batch_size must be non-zero".into()));
        }
        Ok(())
    }

    /// Cycle interval as a Duration
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    /// Blocking timeout used at session start
    pub fn default_block_timeout(&self) -> Duration {
        Duration::from_millis(self.default_block_timeout_ms)
    }

    /// Device buffer size in frames (sample_rate * interval * buffer_scaler)
    pub fn device_buffer_frames(&self) -> usize {
        let frames = (self.sample_rate as f64 * self.interval_secs) as usize * self.buffer_scaler;
        frames.max(1)
    }

    /// Device buffer size in samples (frames * channels)
    pub fn device_buffer_samples(&self) -> usize {
        self.device_buffer_frames() * self.channels as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.input_stream, "pred_audio");
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.norm_divisor, 50000.0);
        assert_eq!(config.aggregation, Aggregation::Concatenate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_device_buffer_samples() {
        let config = Config::default();
        // 16000 Hz * 0.01 s * 1 = 160 frames, mono
        assert_eq!(config.device_buffer_samples(), 160);

        let config = Config {
            buffer_scaler: 4,
            channels: 2,
            ..Config::default()
        };
        assert_eq!(config.device_buffer_samples(), 160 * 4 * 2);
    }

    #[test]
    fn test_partial_toml_overlay() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "input_stream = \"synth_out\"\nnorm_divisor = 32768.0\naggregation = \"keep-last\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.input_stream, "synth_out");
        assert_eq!(config.norm_divisor, 32768.0);
        assert_eq!(config.aggregation, Aggregation::KeepLast);
        // Unspecified fields keep their defaults
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.read_batch_size, 10);
    }

    #[test]
    fn test_validation_rejects_zero_divisor() {
        let config = Config {
            norm_divisor: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
