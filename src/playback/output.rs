// Audio output sinks
//
// `CpalOutput` owns the output device on a dedicated thread (cpal streams
// are not `Send`) and opens one stream per buffer, so buffers that arrive
// close together overlap instead of queueing. `NullOutput` only waits for
// the buffer's duration and is used when running headless.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, error, info, warn};

use super::decoder::DecodedAudio;
use crate::audio::block::LinearResampler;
use crate::error::DeviceAccessError;

/// Destination for decoded audio
#[async_trait::async_trait]
pub trait AudioOutput: Send + Sync {
    /// Play one buffer; resolves once it has finished (or the output closed)
    async fn play(&self, buffer: DecodedAudio) -> Result<(), DeviceAccessError>;

    /// Release the output context. Further `play` calls return immediately.
    fn close(&self);

    /// Get output name for logging
    fn name(&self) -> &str;
}

/// Output that plays nothing but takes as long as the audio would
#[derive(Default)]
pub struct NullOutput {
    closed: AtomicBool,
    closed_notify: Notify,
}

impl NullOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AudioOutput for NullOutput {
    async fn play(&self, buffer: DecodedAudio) -> Result<(), DeviceAccessError> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(buffer.duration()) => {}
            _ = self.closed_notify.notified() => {}
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.closed_notify.notify_waiters();
    }

    fn name(&self) -> &str {
        "null"
    }
}

enum OutputCommand {
    Play {
        buffer: DecodedAudio,
        done: oneshot::Sender<()>,
    },
    Finished(u64),
    Close,
}

/// Default-output-device sink
pub struct CpalOutput {
    commands: std_mpsc::Sender<OutputCommand>,
    closed: AtomicBool,
}

impl CpalOutput {
    /// Open the default output device
    pub fn open() -> Result<Self, DeviceAccessError> {
        let (commands, command_rx) = std_mpsc::channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let loop_tx = commands.clone();

        std::thread::Builder::new()
            .name("audio-out".to_string())
            .spawn(move || output_loop(command_rx, loop_tx, ready_tx))
            .map_err(|e| DeviceAccessError::Stream(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands,
                closed: AtomicBool::new(false),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DeviceAccessError::Stream(
                "Output thread exited during setup".to_string(),
            )),
        }
    }
}

#[async_trait::async_trait]
impl AudioOutput for CpalOutput {
    async fn play(&self, buffer: DecodedAudio) -> Result<(), DeviceAccessError> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (done, finished) = oneshot::channel();
        self.commands
            .send(OutputCommand::Play { buffer, done })
            .map_err(|_| DeviceAccessError::Stream("Output thread is gone".to_string()))?;

        // Sender dropped means the output closed mid-buffer
        let _ = finished.await;
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.commands.send(OutputCommand::Close);
        }
    }

    fn name(&self) -> &str {
        "cpal output"
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.close();
    }
}

fn output_loop(
    commands: std_mpsc::Receiver<OutputCommand>,
    loop_tx: std_mpsc::Sender<OutputCommand>,
    ready: std_mpsc::Sender<Result<(), DeviceAccessError>>,
) {
    let host = cpal::default_host();
    let Some(device) = host.default_output_device() else {
        let _ = ready.send(Err(DeviceAccessError::NoOutputDevice));
        return;
    };

    let supported = match device.default_output_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready.send(Err(DeviceAccessError::Unsupported(e.to_string())));
            return;
        }
    };

    info!(
        "Audio output device: {} ({}Hz, {} channels, {:?})",
        device.name().unwrap_or_default(),
        supported.sample_rate().0,
        supported.channels(),
        supported.sample_format()
    );
    let _ = ready.send(Ok(()));

    let mut next_id: u64 = 0;
    let mut active: HashMap<u64, (cpal::Stream, oneshot::Sender<()>)> = HashMap::new();

    while let Ok(command) = commands.recv() {
        match command {
            OutputCommand::Play { buffer, done } => {
                let id = next_id;
                next_id += 1;

                match open_buffer_stream(&device, &supported, buffer, id, loop_tx.clone()) {
                    Ok(stream) => {
                        active.insert(id, (stream, done));
                    }
                    Err(e) => {
                        warn!("Failed to start playback: {}", e);
                        let _ = done.send(());
                    }
                }
            }
            OutputCommand::Finished(id) => {
                if let Some((stream, done)) = active.remove(&id) {
                    drop(stream);
                    let _ = done.send(());
                }
            }
            OutputCommand::Close => break,
        }
    }

    debug!("Audio output closed ({} buffers cut short)", active.len());
}

/// Convert a decoded buffer to the device's rate and channel layout
fn fit_to_device(buffer: DecodedAudio, device_rate: u32, device_channels: u16) -> Vec<f32> {
    let mono: Vec<f32> = if buffer.channels <= 1 {
        buffer.samples
    } else {
        crate::audio::block::downmix_to_mono(&buffer.samples, buffer.channels)
    };

    let mut resampled = Vec::with_capacity(mono.len());
    LinearResampler::new(buffer.sample_rate, device_rate).process(&mono, &mut resampled);

    resampled
        .iter()
        .flat_map(|&s| std::iter::repeat(s).take(device_channels.max(1) as usize))
        .collect()
}

fn open_buffer_stream(
    device: &cpal::Device,
    supported: &cpal::SupportedStreamConfig,
    buffer: DecodedAudio,
    id: u64,
    finished_tx: std_mpsc::Sender<OutputCommand>,
) -> Result<cpal::Stream, DeviceAccessError> {
    let config: cpal::StreamConfig = supported.config();
    let samples = fit_to_device(buffer, config.sample_rate.0, config.channels);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, &config, samples, id, finished_tx),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, &config, samples, id, finished_tx),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, &config, samples, id, finished_tx),
        other => {
            return Err(DeviceAccessError::Unsupported(format!(
                "sample format {:?}",
                other
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| DeviceAccessError::Stream(e.to_string()))?;

    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples: Vec<f32>,
    id: u64,
    finished_tx: std_mpsc::Sender<OutputCommand>,
) -> Result<cpal::Stream, DeviceAccessError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut cursor = 0usize;
    let mut signalled = false;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for out in data.iter_mut() {
                    let sample = samples.get(cursor).copied().unwrap_or(0.0);
                    cursor += 1;
                    *out = T::from_sample(sample);
                }
                if cursor >= samples.len() && !signalled {
                    signalled = true;
                    let _ = finished_tx.send(OutputCommand::Finished(id));
                }
            },
            |err| error!("An error occurred on the output stream: {}", err),
            None,
        )
        .map_err(|e| DeviceAccessError::Stream(e.to_string()))
}
