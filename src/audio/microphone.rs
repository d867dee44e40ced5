// Microphone capture backend using cpal
//
// cpal streams are not `Send`, so the stream is created, played and
// dropped on a dedicated thread. The thread parks until `stop()` signals
// it; dropping the stream there releases the hardware handle.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::backend::{AudioBlock, CaptureBackend, CaptureConfig};
use super::block::BlockShaper;
use crate::error::DeviceAccessError;

struct StreamWorker {
    stop_tx: std_mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

/// Default-input-device capture backend
pub struct MicrophoneBackend {
    config: CaptureConfig,
    worker: Option<StreamWorker>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBlock>, DeviceAccessError> {
        if self.worker.is_some() {
            return Err(DeviceAccessError::Stream("Already capturing".to_string()));
        }

        info!(
            "Starting microphone capture ({}Hz, {} channel, {} samples/block)",
            self.config.sample_rate, self.config.channels, self.config.block_size
        );

        let (block_tx, block_rx) = mpsc::channel(self.config.channel_capacity);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || match open_input_stream(&config, block_tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Blocks until stop() or the backend is dropped
                    let _ = stop_rx.recv();
                    drop(stream);
                    debug!("Microphone stream released");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| DeviceAccessError::Stream(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(StreamWorker { stop_tx, thread });
                info!("Microphone capture started");
                Ok(block_rx)
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(DeviceAccessError::Stream(
                "Capture thread exited before the stream opened".to_string(),
            )),
        }
    }

    async fn stop(&mut self) -> Result<(), DeviceAccessError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        info!("Stopping microphone capture");
        let _ = worker.stop_tx.send(());

        match tokio::task::spawn_blocking(move || worker.thread.join()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => error!("Microphone capture thread panicked"),
            Err(e) => error!("Failed to join microphone capture thread: {}", e),
        }

        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

fn open_input_stream(
    config: &CaptureConfig,
    block_tx: mpsc::Sender<AudioBlock>,
) -> Result<cpal::Stream, DeviceAccessError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(DeviceAccessError::NoInputDevice)?;

    info!("Audio input device: {}", device.name().unwrap_or_default());

    if config.echo_cancellation || config.noise_suppression || config.auto_gain_control {
        // cpal exposes raw device streams only; voice processing is up to the OS
        debug!(
            "Voice processing requested (aec={}, ns={}, agc={}) but not available through cpal",
            config.echo_cancellation, config.noise_suppression, config.auto_gain_control
        );
    }

    let supported = device
        .default_input_config()
        .map_err(|e| DeviceAccessError::Unsupported(e.to_string()))?;
    let device_rate = supported.sample_rate().0;
    let device_channels = supported.channels();

    info!(
        "Input stream config: {}Hz, {} channels, {:?} (resampling to {}Hz mono)",
        device_rate,
        device_channels,
        supported.sample_format(),
        config.sample_rate
    );

    let mut shaper = BlockShaper::new(
        device_rate,
        device_channels,
        config.sample_rate,
        config.block_size,
    );
    let stream_config: cpal::StreamConfig = supported.config();
    let err_fn = |err| error!("An error occurred on the input stream: {}", err);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                forward_blocks(shaper.push(data), &block_tx);
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let floats: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                forward_blocks(shaper.push(&floats), &block_tx);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(DeviceAccessError::Unsupported(format!(
                "sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| DeviceAccessError::Stream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| DeviceAccessError::Stream(e.to_string()))?;

    Ok(stream)
}

fn forward_blocks(blocks: Vec<AudioBlock>, block_tx: &mpsc::Sender<AudioBlock>) {
    for block in blocks {
        // Never block the audio callback; a full channel means the consumer is behind
        if let Err(e) = block_tx.try_send(block) {
            warn!("Dropping captured block: {}", e);
        }
    }
}
