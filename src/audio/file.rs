use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioBlock, CaptureBackend, CaptureConfig};
use super::block::BlockShaper;
use crate::error::DeviceAccessError;

/// A WAV file loaded into memory as float samples
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to read audio samples")?
            }
        };

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split into mono blocks at the capture rate; the trailing partial block is dropped
    pub fn to_blocks(&self, config: &CaptureConfig) -> Vec<AudioBlock> {
        let mut shaper = BlockShaper::new(
            self.sample_rate,
            self.channels,
            config.sample_rate,
            config.block_size,
        );
        shaper.push(&self.samples)
    }
}

/// Capture backend that streams a WAV file as if it were live input
pub struct FileBackend {
    path: PathBuf,
    config: CaptureConfig,
    realtime: bool,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig, realtime: bool) -> Self {
        Self {
            path: path.into(),
            config,
            realtime,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBlock>, DeviceAccessError> {
        if self.is_capturing() {
            return Err(DeviceAccessError::Stream("Already capturing".to_string()));
        }

        let file = AudioFile::open(&self.path)
            .map_err(|e| DeviceAccessError::File(format!("{:#}", e)))?;
        let blocks = file.to_blocks(&self.config);
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);

        let pace = self
            .realtime
            .then(|| Duration::from_millis(self.config.block_duration_ms().max(1)));

        info!(
            "Streaming {} blocks from {} ({})",
            blocks.len(),
            file.path,
            if pace.is_some() { "real-time" } else { "unpaced" }
        );

        self.task = Some(tokio::spawn(async move {
            let mut ticker = pace.map(tokio::time::interval);
            for block in blocks {
                if let Some(ticker) = ticker.as_mut() {
                    ticker.tick().await;
                }
                if tx.send(block).await.is_err() {
                    warn!("Capture consumer went away, ending file stream");
                    break;
                }
            }
            info!("File capture reached end of input");
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), DeviceAccessError> {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            info!("File capture stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn name(&self) -> &str {
        "wav file"
    }
}
