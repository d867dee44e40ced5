use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::error::DeviceAccessError;

/// One fixed-size block of mono float samples in [-1.0, 1.0]
#[derive(Debug, Clone)]
pub struct AudioBlock {
    /// Samples at the configured capture rate
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started, derived from sample count
    pub timestamp_ms: u64,
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (input is resampled if the device differs)
    pub sample_rate: u32,
    /// Target channel count (the wire format carries mono)
    pub channels: u16,
    /// Samples per block handed to the pipeline
    pub block_size: usize,
    /// Capacity of the block channel; blocks beyond it are dropped
    pub channel_capacity: usize,
    /// Platform voice processing, requested best-effort
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // backend STT expects 16kHz
            channels: 1,        // Mono
            block_size: 512,    // 32ms at 16kHz
            channel_capacity: 64,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

impl CaptureConfig {
    /// Duration of one block in milliseconds
    pub fn block_duration_ms(&self) -> u64 {
        (self.block_size as u64 * 1000) / self.sample_rate.max(1) as u64
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal default input device
/// - File: WAV file streamed as if it were live input (testing/batch)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio blocks
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBlock>, DeviceAccessError>;

    /// Stop capturing and release the input device. Safe to call when idle.
    async fn stop(&mut self) -> Result<(), DeviceAccessError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Default microphone (all platforms)
    Microphone,
    /// WAV file input, optionally paced at real-time speed
    File { path: PathBuf, realtime: bool },
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    /// Create capture backend based on source and configuration
    pub fn create(source: AudioSource, config: CaptureConfig) -> Box<dyn CaptureBackend> {
        match source {
            AudioSource::Microphone => Box::new(super::microphone::MicrophoneBackend::new(config)),
            AudioSource::File { path, realtime } => {
                Box::new(super::file::FileBackend::new(path, config, realtime))
            }
        }
    }
}
