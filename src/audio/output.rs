//! Audio output using cpal
//!
//! The device is fed through a lock-free single-producer single-consumer
//! ring buffer sized to the configured device buffer: the core loop pushes
//! normalized samples (or silence), and the real-time callback pops them,
//! substituting silence on underrun. The ring's free slot count is the
//! sink's reported free space, so the loop can never over-write the device
//! buffer.

use crate::config::Config;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleRate, Stream, StreamConfig};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use tracing::{debug, info, warn};

/// Device sink contract used by the playback engine.
///
/// `write` accepts at most `free_space()` samples; callers size every write
/// (including silence fills) to the currently reported free space. `close`
/// must be safe to call from the shutdown path.
pub trait AudioSink {
    /// Number of samples the device buffer can currently accept
    fn free_space(&self) -> usize;

    /// Write samples to the device buffer. Writing more than `free_space()`
    /// is a contract violation and fails without touching the device.
    fn write(&mut self, samples: &[f32]) -> Result<()>;

    /// Stop and release the device. Idempotent.
    fn close(&mut self) -> Result<()>;

    /// Fill the currently free buffer space with zero-valued samples.
    ///
    /// Keeps the device saturated and glitch-free while idle, and makes
    /// silence immediately supersede stale audio when a session ends.
    fn write_silence(&mut self) -> Result<()> {
        let free = self.free_space();
        if free > 0 {
            self.write(&vec![0.0f32; free])?;
        }
        Ok(())
    }
}

/// One enumerable audio device, reported at startup for diagnostics.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    /// Maximum input channel count (0 for output-only devices)
    pub input_channels: u16,
}

/// cpal-backed audio sink.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    producer: HeapProd<f32>,
    /// Held until `start()` moves it into the device callback
    consumer: Option<HeapCons<f32>>,
}

impl CpalOutput {
    /// List available audio devices with their input-channel capability.
    ///
    /// Diagnostics only; playback always uses the default output device.
    pub fn list_devices() -> Result<Vec<DeviceInfo>> {
        let host = cpal::default_host();

        let devices = host
            .devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

        let mut infos = Vec::new();
        for device in devices {
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
            let input_channels = device
                .supported_input_configs()
                .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
                .unwrap_or(0);
            infos.push(DeviceInfo {
                name,
                input_channels,
            });
        }

        debug!("Found {} audio devices", infos.len());
        Ok(infos)
    }

    /// Open the default output device with the configured format.
    ///
    /// The ring buffer capacity is sample_rate * interval * buffer_scaler
    /// frames, the same sizing the device buffer is opened with.
    pub fn new(config: &Config) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;

        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using default audio device: {}", name);

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: BufferSize::Fixed(config.device_buffer_frames() as u32),
        };

        // Single-precision float is the only format the payload carries;
        // check the device advertises it at our rate before opening.
        let supported = device
            .supported_output_configs()
            .map(|mut configs| {
                configs.any(|c| {
                    c.sample_format() == cpal::SampleFormat::F32
                        && c.channels() == config.channels
                        && c.min_sample_rate().0 <= config.sample_rate
                        && c.max_sample_rate().0 >= config.sample_rate
                })
            })
            .unwrap_or(false);
        if !supported {
            warn!(
                "Device does not advertise f32 {} ch @ {} Hz, attempting anyway",
                config.channels, config.sample_rate
            );
        }

        let capacity = config.device_buffer_samples();
        debug!(
            "Audio config: sample_rate={}, channels={}, buffer={} samples",
            config.sample_rate, config.channels, capacity
        );

        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

        Ok(Self {
            device,
            config: stream_config,
            stream: None,
            producer,
            consumer: Some(consumer),
        })
    }

    /// Start the output stream.
    ///
    /// The callback runs on the real-time audio thread: it pops from the
    /// ring without locks and zero-fills whatever the ring cannot supply.
    pub fn start(&mut self) -> Result<()> {
        let mut consumer = self
            .consumer
            .take()
            .ok_or_else(|| Error::InvalidState("audio stream already started".to_string()))?;

        info!("Starting audio stream");

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let filled = consumer.pop_slice(data);
                    for sample in &mut data[filled..] {
                        *sample = 0.0;
                    }
                },
                move |err| {
                    warn!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        info!("Audio stream started successfully");
        Ok(())
    }

    /// Get device name.
    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }
}

impl AudioSink for CpalOutput {
    fn free_space(&self) -> usize {
        self.producer.vacant_len()
    }

    fn write(&mut self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        if samples.len() > self.producer.vacant_len() {
            return Err(Error::AudioOutput(format!(
                "write of {} samples exceeds free space {}",
                samples.len(),
                self.producer.vacant_len()
            )));
        }
        self.producer.push_slice(samples);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
            drop(stream);
        }
        Ok(())
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        // Ensure stream is stopped on drop
        let _ = self.close();
    }
}
