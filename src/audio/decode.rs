//! Frame decoding: raw log payloads to normalized sample buffers
//!
//! Entry payloads are little-endian f32 samples as produced by the upstream
//! synthesizer. Decoding divides every sample by the configured normalization
//! divisor and clips the result into the configured range (by default
//! [-1.0, 1.0]), yielding a contiguous buffer ready for the device.

use crate::config::Aggregation;
use crate::stream::Entry;

/// Decodes entry payloads into normalized, clipped sample buffers.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    divisor: f32,
    clip_min: f32,
    clip_max: f32,
    aggregation: Aggregation,
}

impl FrameDecoder {
    pub fn new(divisor: f32, clip: (f32, f32), aggregation: Aggregation) -> Self {
        Self {
            divisor,
            clip_min: clip.0,
            clip_max: clip.1,
            aggregation,
        }
    }

    /// Decode one payload.
    ///
    /// Yields exactly as many samples as the byte length allows; trailing
    /// bytes that do not form a whole sample are ignored.
    pub fn decode_payload(&self, payload: &[u8]) -> Vec<f32> {
        payload
            .chunks_exact(4)
            .map(|bytes| {
                let raw = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                (raw / self.divisor).clamp(self.clip_min, self.clip_max)
            })
            .collect()
    }

    /// Decode a read batch into one device-ready buffer.
    ///
    /// Entries are already in ascending id order. `Concatenate` joins every
    /// entry's samples in that order; `KeepLast` keeps only the final
    /// entry's samples, matching the legacy player's lossy behavior.
    pub fn decode_batch(&self, entries: &[Entry]) -> Vec<f32> {
        match self.aggregation {
            Aggregation::Concatenate => {
                let mut samples = Vec::new();
                for entry in entries {
                    samples.extend(self.decode_payload(&entry.payload));
                }
                samples
            }
            Aggregation::KeepLast => entries
                .last()
                .map(|entry| self.decode_payload(&entry.payload))
                .unwrap_or_default(),
        }
    }
}
